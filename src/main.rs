use clap::Parser;
use phosphom::utils::{logger, validation::Validate};
use phosphom::{CliConfig, LocalStorage, PhosphoPipeline, PipelineEngine, RunSummary};

fn print_summary(summary: &RunSummary) {
    let m = &summary.metrics;
    println!("✅ Phosphom analysis completed successfully!");
    println!("==============================================");
    println!("  Mapped peptide lines : {}", m.mapped_items);
    println!("  Kinase rows          : {}", m.accuracy.total_motifs);
    println!("  Found in PSP         : {}", m.accuracy.matched_psp);
    println!("  Correct              : {}", m.accuracy.correct);
    println!("  Accuracy             : {:.2}%", m.accuracy.acc_percent);
    println!(
        "  Precision / Recall   : {:.4} / {:.4}",
        m.f1.precision, m.f1.recall
    );
    println!("  F1 score             : {:.4}", m.f1.f1_score);
    println!("==============================================");
    println!("📄 Mapped document: {}", summary.mapped_docx);
    println!("📁 Normalised CSV:  {}", summary.csv_path);
    println!("📦 Report:          {}", summary.report_path);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    if config.json_logs {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting phosphom CLI v{}", env!("CARGO_PKG_VERSION"));
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let monitor_enabled = config.monitor;
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let storage = LocalStorage::new(config.output_path.clone());
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
            tracing::info!("✅ Analysis completed, report at {}", summary.report_path);
            print_summary(&summary);
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
