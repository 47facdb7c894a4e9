use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use plate_reader::{LayoutRule, PlateConfig, PlateReaderBuilder};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Layout {
    CountOnly,
    LettersBeforeDigits,
}

impl From<Layout> for LayoutRule {
    fn from(layout: Layout) -> Self {
        match layout {
            Layout::CountOnly => LayoutRule::CountOnly,
            Layout::LettersBeforeDigits => LayoutRule::LettersBeforeDigits,
        }
    }
}

/// Egyptian license plate recognition
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Path to the input image
    image: PathBuf,
    /// TOML configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,
    /// License plate detection model
    #[arg(long)]
    plate_model: Option<PathBuf>,
    /// Character detection model
    #[arg(long)]
    ocr_model: Option<PathBuf>,
    /// Class labels of the character model, one per line
    #[arg(long)]
    ocr_labels: Option<PathBuf>,
    #[arg(long, value_enum)]
    layout: Option<Layout>,
    /// Where to save the annotated plate crop
    #[arg(long, short)]
    output: Option<PathBuf>,
    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

fn sibling_path(image: &Path, suffix: &str) -> PathBuf {
    let stem = image
        .file_stem()
        .map(|it| it.to_string_lossy())
        .unwrap_or_default();
    let name = match image.extension() {
        Some(ext) => format!("{stem}_{suffix}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{suffix}.png"),
    };
    image.with_file_name(name)
}

fn main() -> plate_reader::Result<()> {
    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => PlateConfig::load(path)?,
        None => PlateConfig::default(),
    };
    if let Some(path) = args.plate_model {
        config.models.plate_model = path;
    }
    if let Some(path) = args.ocr_model {
        config.models.ocr_model = path;
    }
    if let Some(path) = args.ocr_labels {
        config.models.ocr_labels = path;
    }
    if let Some(layout) = args.layout {
        config.reconstruction.layout = layout.into();
    }

    let reader = PlateReaderBuilder::from_config(&config)?.build()?;
    let reading = reader.read_path(&args.image)?;

    if args.json {
        let summary = serde_json::to_string_pretty(&reading.summary())?;
        println!("{summary}");
    } else if reading.success() {
        println!("License Plate: {}", reading.text());
        println!("Confidence: {:.4}", reading.confidence());
    } else if let Some(error) = reading.error() {
        println!("Error: {error}");
        if !reading.text().is_empty() {
            println!("Partial text: {}", reading.text());
        }
    }

    if let Some(annotated) = &reading.annotated_crop {
        let suffix = if reading.success() { "annotated" } else { "partial" };
        let output = args
            .output
            .unwrap_or_else(|| sibling_path(&args.image, suffix));
        annotated.save(&output)?;
        log::info!("Annotated image saved to {}", output.display());
        if !args.json {
            println!("Annotated image saved to: {}", output.display());
        }
    }
    Ok(())
}
