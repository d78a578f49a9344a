// Shorebreak surf photography storefront library

pub mod cart;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod upload;
pub mod watermark;
