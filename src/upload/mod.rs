//! Contributor upload flow: decode a selected photo, keep a watermarked
//! preview converging on the latest settings, and hand the displayed
//! preview over on submit.
//!
//! The pieces fit together like this: [`source::SourceImage`] is the
//! immutable decoded photo, [`resources::ResourceStore`] owns every
//! preview generated for it, and [`controller::PreviewController`] drives
//! renders through the [`controller::PreviewRenderer`] seam and publishes
//! [`controller::PreviewSnapshot`] updates over a watch channel.

pub mod controller;
pub mod form;
pub mod resources;
pub mod source;

pub use controller::{
    PreviewController, PreviewRenderer, PreviewSnapshot, RenderState, UploadArtifact,
};
pub use form::UploadForm;
pub use resources::{PreviewHandle, ResourceKind, ResourceStats, ResourceStore};
pub use source::{DecodeLimits, SourceImage, SourceImageInfo};
