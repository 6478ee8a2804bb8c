use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use wildfire_risk_core::{AnalysisContext, Location, PipelineConfig, RiskPipeline};

/// Wildfire risk assessment for a single photo
#[derive(Parser, Debug)]
#[command(name = "risk-demo")]
#[command(about = "Assess wildfire hazard risk from a photo", long_about = None)]
struct Args {
    /// Photo to assess (JPEG or PNG)
    #[arg(short, long)]
    image: Option<PathBuf>,

    /// Latitude in decimal degrees
    #[arg(long, requires = "lng", allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Longitude in decimal degrees
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lng: Option<f64>,

    /// Description used as a hint instead of the file name
    #[arg(short, long)]
    description: Option<String>,

    /// Skip hosted inference and weather (heuristics and default weather only)
    #[arg(short, long)]
    offline: bool,

    /// Print the health-check payload and exit
    #[arg(long)]
    health: bool,

    /// Print only the assessment, not the full report
    #[arg(short, long)]
    summary: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = if args.offline {
        PipelineConfig::offline()
    } else {
        PipelineConfig::from_env()
    };
    let pipeline = RiskPipeline::from_config(&config);

    if args.health {
        println!("{}", serde_json::to_string_pretty(&pipeline.health_check())?);
        return Ok(());
    }

    let Some(path) = args.image else {
        bail!("--image is required unless --health is given");
    };
    let upload = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;

    let mut context = AnalysisContext::new();
    let hint = args
        .description
        .or_else(|| path.file_name().map(|n| n.to_string_lossy().into_owned()));
    if let Some(hint) = hint {
        context = context.with_filename(hint);
    }
    if let (Some(lat), Some(lng)) = (args.lat, args.lng) {
        context = context.with_location(Location::new(lat, lng)?);
    }

    let report = pipeline
        .assess(&upload, context)
        .await
        .map_err(|e| anyhow::anyhow!("{}: {}", e.user_message(), e))?;

    let assessment = &report.assessment;
    eprintln!(
        "Risk: {:.1} ({}), confidence {:.2}, data quality {:?}",
        assessment.composite_risk_score,
        assessment.risk_category,
        assessment.confidence_level,
        assessment.metadata.data_quality
    );
    if let Some(kind) = assessment.emergency_type {
        eprintln!("EMERGENCY: {}", kind);
    }

    let json = if args.summary {
        serde_json::to_string_pretty(assessment)?
    } else {
        serde_json::to_string_pretty(&report)?
    };
    println!("{}", json);
    Ok(())
}
