use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};
use triage_core::{assess, TriageAssessment, TriageConfig, VitalField, VitalsInput};
use triage_fhir::assess_json_str;

#[derive(Parser, Debug)]
#[command(
    name = "triage-cli",
    version,
    about = "Assign a TTAS acuity level (1-5) and clinical alerts from vital signs."
)]
struct Cli {
    /// JSON file with threshold overrides (`{"thresholds": {...}, "alerts": {...}}`).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print the assessment as JSON.
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Assess a JSON file holding a vitals record or a FHIR bundle.
    Assess {
        /// Path to the JSON input.
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Assess vitals given on the command line.
    Vitals(VitalsArgs),
}

/// Raw form values; anything unparseable falls back to the field default.
#[derive(Args, Debug)]
struct VitalsArgs {
    #[arg(long)]
    sbp: Option<String>,
    #[arg(long)]
    hr: Option<String>,
    #[arg(long)]
    spo2: Option<String>,
    #[arg(long)]
    rr: Option<String>,
    #[arg(long)]
    temp: Option<String>,
    #[arg(long)]
    gcs: Option<String>,
}

impl From<VitalsArgs> for VitalsInput {
    fn from(args: VitalsArgs) -> Self {
        let mut input = VitalsInput::default();
        for (field, value) in [
            (VitalField::Sbp, args.sbp),
            (VitalField::Hr, args.hr),
            (VitalField::Spo2, args.spo2),
            (VitalField::Rr, args.rr),
            (VitalField::Temp, args.temp),
            (VitalField::Gcs, args.gcs),
        ] {
            if let Some(value) = value {
                input.set(field, value);
            }
        }
        input
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    init_tracing(cli.log_json, level);

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => TriageConfig::default(),
    };

    let assessment = match cli.command {
        Command::Assess { input } => {
            let data = std::fs::read_to_string(&input)
                .with_context(|| format!("Cannot read file {:?}", input))?;
            assess_json_str(&data, &config)
                .with_context(|| format!("Cannot assess {:?}", input))?
        }
        Command::Vitals(args) => assess(&VitalsInput::from(args), &config),
    };

    info!(
        acuity = assessment.level.as_u8(),
        alerts = assessment.alerts.len(),
        "assessment complete"
    );

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&assessment)?);
    } else {
        print_summary(&assessment);
    }

    Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<TriageConfig> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read config {:?}", path))?;
    let config: TriageConfig = serde_json::from_str(&data)
        .with_context(|| format!("Config {:?} is not valid JSON", path))?;
    config.validate()?;
    Ok(config)
}

fn print_summary(assessment: &TriageAssessment) {
    let level = assessment.level;
    let target = match level.target_minutes() {
        0 => "immediate".to_string(),
        minutes => format!("within {minutes} min"),
    };
    println!("Assessed at: {}", assessment.assessed_at);
    println!("Triage: {level} | physician {target}");

    let readings: Vec<String> = VitalField::ALL
        .iter()
        .filter(|field| assessment.vitals.get(**field) > 0.0)
        .map(|field| match field.unit() {
            Some(unit) => format!("{} {} {unit}", field.label(), assessment.vitals.get(*field)),
            None => format!("{} {}", field.label(), assessment.vitals.get(*field)),
        })
        .collect();
    if !readings.is_empty() {
        println!("Vitals: {}", readings.join(" | "));
    }

    if assessment.alerts.is_empty() {
        println!("Alerts: none (waiting for vital signs)");
        return;
    }

    println!("Alerts:");
    for alert in &assessment.alerts {
        println!("  [{:?}] {}", alert.severity, alert.message);
    }
}

/// Install the global subscriber; `RUST_LOG` overrides `level`.
fn init_tracing(json: bool, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr).json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
            .ok();
    }
}
