use bytes::Bytes;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use shorebreak::catalog::{Catalog, Category};
use shorebreak::config::Config;
use shorebreak::upload::SourceImage;
use shorebreak::watermark::{load_font, Compositor, WatermarkPosition};

/// Shorebreak - Surf photography storefront with watermarked upload previews
#[derive(Parser, Debug)]
#[command(name = "shorebreak")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compose a watermarked preview of a photo and write it to a file
    Preview {
        /// Input image file (PNG, JPEG, GIF, or WebP)
        #[arg(long)]
        image: PathBuf,

        /// Watermark text to draw
        #[arg(long)]
        text: String,

        /// Anchor position, e.g. bottom-right or center
        #[arg(long)]
        position: Option<WatermarkPosition>,

        /// Opacity in percent (clamped to 10-100)
        #[arg(long)]
        opacity: Option<u32>,

        /// Font size in pixels (clamped to 12-72)
        #[arg(long)]
        font_size: Option<u32>,

        /// Text color as #RGB or #RRGGBB
        #[arg(long)]
        color: Option<String>,

        /// Output file for the composed PNG
        #[arg(long)]
        out: PathBuf,
    },

    /// Print the built-in catalog as JSON
    Catalog {
        /// Only list photos in this category
        #[arg(long)]
        category: Option<Category>,
    },
}

fn main() {
    // Initialize logging subsystem
    shorebreak::logging::init_subscriber().expect("Failed to initialize logging subsystem");

    // Parse command-line arguments
    let args = Args::parse();

    // Load configuration, falling back to defaults when no file is present
    let config = if args.config.exists() {
        Config::from_file(&args.config).unwrap_or_else(|e| {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        })
    } else {
        Config::default()
    };

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    tracing::info!(
        config_file = %args.config.display(),
        preview_margin = config.preview.margin,
        upload_max_mb = config.upload.max_file_size_mb,
        "Configuration loaded successfully"
    );

    let result = match args.command {
        Command::Preview {
            image,
            text,
            position,
            opacity,
            font_size,
            color,
            out,
        } => run_preview(&config, image, text, position, opacity, font_size, color, out),
        Command::Catalog { category } => run_catalog(category),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

#[allow(clippy::too_many_arguments)]
fn run_preview(
    config: &Config,
    image: PathBuf,
    text: String,
    position: Option<WatermarkPosition>,
    opacity: Option<u32>,
    font_size: Option<u32>,
    color: Option<String>,
    out: PathBuf,
) -> Result<(), String> {
    let bytes = std::fs::read(&image)
        .map_err(|e| format!("Failed to read {}: {}", image.display(), e))?;

    let source = SourceImage::decode(Bytes::from(bytes), &config.decode_limits())
        .map_err(|e| e.to_string())?;
    tracing::info!(
        source = %source.id(),
        width = source.width(),
        height = source.height(),
        "decoded input image"
    );

    let mut settings = config.watermark.clone();
    settings.set_text(text);
    settings.set_enabled(true);
    if let Some(position) = position {
        settings.set_position(position);
    }
    if let Some(opacity) = opacity {
        settings.set_opacity(opacity);
    }
    if let Some(font_size) = font_size {
        settings.set_font_size(font_size);
    }
    if let Some(color) = color {
        settings.set_color(color);
    }

    let font = load_font(config.preview.font_path.as_deref()).map_err(|e| e.to_string())?;
    let compositor = Compositor::new(font, config.preview.margin);

    let preview = compositor
        .compose(&source.raster(), &settings)
        .map_err(|e| e.to_string())?;

    std::fs::write(&out, &preview.data)
        .map_err(|e| format!("Failed to write {}: {}", out.display(), e))?;

    tracing::info!(
        output = %out.display(),
        bytes = preview.data.len(),
        width = preview.width,
        height = preview.height,
        "wrote watermarked preview"
    );
    println!(
        "Wrote {} ({}x{}, {} bytes)",
        out.display(),
        preview.width,
        preview.height,
        preview.data.len()
    );
    Ok(())
}

fn run_catalog(category: Option<Category>) -> Result<(), String> {
    let catalog = Catalog::builtin();
    let photos = catalog.by_category(category);
    let json = serde_json::to_string_pretty(&photos)
        .map_err(|e| format!("Failed to serialize catalog: {}", e))?;
    println!("{}", json);
    Ok(())
}
