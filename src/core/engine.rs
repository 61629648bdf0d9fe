use crate::core::Pipeline;
use crate::domain::model::RunSummary;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

/// Drives a pipeline through mapping/extraction, analysis and report writing.
pub struct PipelineEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> PipelineEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<RunSummary> {
        tracing::info!("🚀 Starting Phosphom analysis");
        self.monitor.log_stats("Start");

        tracing::info!("[1/3] Mapping phospho-sites and extracting motifs...");
        let extracted = self.pipeline.extract().await?;
        tracing::info!(
            "Mapped {} peptide lines, extracted {} motif rows",
            extracted.mapped_items,
            extracted.records.len()
        );
        self.monitor.log_stats("Extract");

        tracing::info!("[2/3] Normalising and validating against PhosphoSitePlus...");
        let analysed = self.pipeline.transform(extracted).await?;
        tracing::info!(
            "Validated {} kinase rows ({} found in PSP)",
            analysed.validated.len(),
            analysed.accuracy.matched_psp
        );
        self.monitor.log_stats("Transform");

        tracing::info!("[3/3] Writing reports...");
        let summary = self.pipeline.load(analysed).await?;
        tracing::info!("Report saved to: {}", summary.report_path);
        self.monitor.log_stats("Load");

        self.monitor.log_final_stats();
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{
        AccuracySummary, AnalysisResult, CellSignalTables, ExtractResult, F1Metrics, MotifRecord,
        RunMetadata, RunMetrics,
    };
    use crate::utils::error::PhosphomError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StagePipeline {
        calls: AtomicUsize,
        fail_extract: bool,
    }

    fn metadata() -> RunMetadata {
        RunMetadata {
            phosphom_version: "test".to_string(),
            timestamp: "now".to_string(),
            input_file: "in.docx".to_string(),
            reference_file: "ref.xlsx".to_string(),
            min_confidence: 0.0,
        }
    }

    #[async_trait]
    impl Pipeline for StagePipeline {
        async fn extract(&self) -> Result<ExtractResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_extract {
                return Err(PhosphomError::EmptyExtraction);
            }
            Ok(ExtractResult {
                mapped_docx: "out_mapped.docx".to_string(),
                mapped_items: 1,
                records: vec![MotifRecord {
                    gene: "Syn1".to_string(),
                    motif: "RRASLAA".to_string(),
                    kinases: "PKA".to_string(),
                    confidences: "0.60".to_string(),
                }],
                reference_path: "ref.xlsx".into(),
            })
        }

        async fn transform(&self, data: ExtractResult) -> Result<AnalysisResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(AnalysisResult {
                mapped_docx: data.mapped_docx,
                csv_path: "out_normalized.csv".to_string(),
                mapped_items: data.mapped_items,
                normalized: Vec::new(),
                validated: Vec::new(),
                accuracy: AccuracySummary::default(),
                f1: F1Metrics::default(),
                cell_signal: CellSignalTables::default(),
                metadata: metadata(),
            })
        }

        async fn load(&self, result: AnalysisResult) -> Result<RunSummary> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(RunSummary {
                mapped_docx: result.mapped_docx,
                csv_path: result.csv_path,
                report_path: "out_report.zip".to_string(),
                metrics: RunMetrics {
                    accuracy: result.accuracy,
                    f1: result.f1,
                    mapped_items: result.mapped_items,
                    metadata: result.metadata,
                },
            })
        }
    }

    #[tokio::test]
    async fn test_run_executes_all_stages() {
        let engine = PipelineEngine::new(StagePipeline {
            calls: AtomicUsize::new(0),
            fail_extract: false,
        });

        let summary = engine.run().await.unwrap();

        assert_eq!(engine.pipeline().calls.load(Ordering::SeqCst), 3);
        assert_eq!(summary.mapped_docx, "out_mapped.docx");
        assert_eq!(summary.report_path, "out_report.zip");
        assert_eq!(summary.metrics.mapped_items, 1);
    }

    #[tokio::test]
    async fn test_run_stops_at_failing_stage() {
        let engine = PipelineEngine::new_with_monitoring(
            StagePipeline {
                calls: AtomicUsize::new(0),
                fail_extract: true,
            },
            true,
        );

        let err = engine.run().await.unwrap_err();

        assert!(matches!(err, PhosphomError::EmptyExtraction));
        assert_eq!(engine.pipeline().calls.load(Ordering::SeqCst), 1);
    }
}
