use clap::Parser;
use phosphom::config::toml_config::TomlConfig;
use phosphom::core::ConfigProvider;
use phosphom::utils::{logger, validation::Validate};
use phosphom::{LocalStorage, MotifDb, PhosphoPipeline, PipelineEngine};

#[derive(Parser)]
#[command(name = "toml-phosphom")]
#[command(about = "Phosphom analysis driven by a TOML configuration file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "phosphom.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Override the input document
    #[arg(short = 'w', long = "word")]
    word: Option<String>,

    /// Override the reference workbook or directory
    #[arg(short = 'r', long = "ref")]
    reference: Option<String>,

    /// Override the output directory
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// Override the minimum confidence
    #[arg(short = 'c', long = "confidence")]
    confidence: Option<f64>,

    /// Dry run - show what would be processed without executing
    #[arg(long)]
    dry_run: bool,
}

fn apply_overrides(config: &mut TomlConfig, args: &Args) {
    if let Some(word) = &args.word {
        config.input.word = word.clone();
        tracing::info!("🔧 Input overridden to: {}", word);
    }
    if let Some(reference) = &args.reference {
        config.input.reference = Some(reference.clone());
        tracing::info!("🔧 Reference overridden to: {}", reference);
    }
    if let Some(output) = &args.output {
        config.output.path = output.clone();
        tracing::info!("🔧 Output overridden to: {}", output);
    }
    if let Some(confidence) = args.confidence {
        config.analysis.min_confidence = Some(confidence);
        tracing::info!("🔧 Minimum confidence overridden to: {}", confidence);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    let verbose = args.verbose || config.verbose();
    if config.json_logs() {
        logger::init_json_logger(verbose);
    } else {
        logger::init_cli_logger(verbose);
    }

    tracing::info!("🚀 Starting TOML-based phosphom");
    tracing::info!("📁 Loaded configuration from: {}", args.config);

    apply_overrides(&mut config, &args);

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");
    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No actual processing will occur");
        perform_dry_run(&config)?;
        return Ok(());
    }

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let storage = LocalStorage::new(config.output_path().to_string());
    let pipeline = match PhosphoPipeline::new(storage, config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(e.exit_code());
        }
    };
    let engine = PipelineEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(summary) => {
            println!("✅ Phosphom analysis completed successfully!");
            println!(
                "📊 Accuracy: {:.2}% ({} / {} in PSP), F1: {:.4}",
                summary.metrics.accuracy.acc_percent,
                summary.metrics.accuracy.correct,
                summary.metrics.accuracy.matched_psp,
                summary.metrics.f1.f1_score
            );
            println!("📄 Mapped document: {}", summary.mapped_docx);
            println!("📁 Normalised CSV:  {}", summary.csv_path);
            println!("📦 Report:          {}", summary.report_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Analysis failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

            std::process::exit(e.exit_code());
        }
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!("  Input: {}", config.word_path());
    println!(
        "  Reference: {}",
        config.reference_path().unwrap_or("(default lookup)")
    );
    println!("  Output: {} (prefix '{}')", config.output_path(), config.base_name());
    println!("  Min confidence: {:.2}", config.min_confidence());
    println!("  Custom motifs: {}", config.custom_motifs().len());

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

fn perform_dry_run(config: &TomlConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Dry Run Analysis:");
    println!();

    // Compiling the database surfaces bad custom patterns before any file is touched
    let db = MotifDb::with_custom(config.custom_motifs())?;
    println!("🧬 Motif Database:");
    println!("  Entries: {}", db.entries().len());
    println!("  Kinases: {}", db.kinase_keys().len());
    let reported = db
        .entries()
        .iter()
        .filter(|e| e.specificity >= config.min_confidence())
        .count();
    println!(
        "  Reported at confidence >= {:.2}: {}",
        config.min_confidence(),
        reported
    );

    for motif in config.custom_motifs() {
        println!(
            "  + {} {} ({:.2}, {})",
            motif.kinase,
            motif.pattern,
            motif.specificity,
            motif.signal.as_deref().unwrap_or("no signal")
        );
    }

    println!();
    println!("💾 Outputs:");
    let base = config.base_name();
    for suffix in ["_mapped.docx", "_normalized.csv", "_report.zip"] {
        println!("  {}/{}{}", config.output_path(), base, suffix);
    }

    println!();
    println!("✅ Dry run analysis complete. Use --verbose for more details during actual run.");

    Ok(())
}
