use crate::adapters::docx::DocxDocument;
use crate::core::extractor::{extract_records, KinaseMatcher};
use crate::core::mapping::map_document;
use crate::core::motif_db::MotifDb;
use crate::core::normalization::{build_cell_signal_tables, normalize_kinase_rows};
use crate::core::reference::{load_reference, DEFAULT_REFERENCE_FILE};
use crate::core::validation::{calculate_f1_metrics, validate_predictions};
use crate::core::{ConfigProvider, Pipeline, Storage};
use crate::domain::model::{
    AnalysisResult, ExtractResult, RunMetadata, RunMetrics, RunSummary,
};
use crate::utils::error::{PhosphomError, Result};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::{FileOptions, ZipWriter};

pub struct PhosphoPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    motif_db: MotifDb,
}

impl<S: Storage, C: ConfigProvider> PhosphoPipeline<S, C> {
    /// Compiles the built-in motifs plus any configured custom ones.
    pub fn new(storage: S, config: C) -> Result<Self> {
        let motif_db = MotifDb::with_custom(config.custom_motifs())?;
        Ok(Self {
            storage,
            config,
            motif_db,
        })
    }

    pub fn motif_db(&self) -> &MotifDb {
        &self.motif_db
    }

    fn mapped_docx_name(&self) -> String {
        format!("{}_mapped.docx", self.config.base_name())
    }

    fn normalized_csv_name(&self) -> String {
        format!("{}_normalized.csv", self.config.base_name())
    }

    fn report_name(&self) -> String {
        format!("{}_report.zip", self.config.base_name())
    }

    /// Configured reference, else the default workbook in the working directory.
    async fn resolve_reference(&self) -> Result<PathBuf> {
        let path = match self.config.reference_path() {
            Some(path) => PathBuf::from(path),
            None => {
                let fallback = PathBuf::from(DEFAULT_REFERENCE_FILE);
                if !tokio::fs::try_exists(&fallback).await.unwrap_or(false) {
                    return Err(PhosphomError::MissingConfigError {
                        field: "reference".to_string(),
                    });
                }
                tracing::info!("Using default reference file: {}", DEFAULT_REFERENCE_FILE);
                fallback
            }
        };

        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(PhosphomError::ReferenceError {
                message: format!("Reference not found: {}", path.display()),
            });
        }
        Ok(path)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn to_csv<T: Serialize>(rows: &[T]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| PhosphomError::ProcessingError {
            message: format!("Failed to finish CSV output: {}", e),
        })
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for PhosphoPipeline<S, C> {
    async fn extract(&self) -> Result<ExtractResult> {
        let reference_path = self.resolve_reference().await?;

        let word_path = self.config.word_path();
        tracing::debug!("Reading input document: {}", word_path);
        let input = tokio::fs::read(word_path).await?;

        let mut doc = DocxDocument::from_bytes(&input)?;
        let outcome = map_document(&mut doc, &self.motif_db, self.config.min_confidence())?;

        let mapped_name = self.mapped_docx_name();
        self.storage.write_file(&mapped_name, &doc.to_bytes()?).await?;
        tracing::info!("Mapped document saved: {}", self.storage.location(&mapped_name));

        // Extraction works on what was written, not on the in-memory copy
        let mapped = DocxDocument::from_bytes(&self.storage.read_file(&mapped_name).await?)?;
        let matcher = KinaseMatcher::new(&self.motif_db.kinase_keys())?;
        let records = extract_records(&mapped, &matcher);
        if records.is_empty() {
            return Err(PhosphomError::EmptyExtraction);
        }

        Ok(ExtractResult {
            mapped_docx: self.storage.location(&mapped_name),
            mapped_items: outcome.processed,
            records,
            reference_path,
        })
    }

    async fn transform(&self, data: ExtractResult) -> Result<AnalysisResult> {
        let normalized = normalize_kinase_rows(&data.records);
        tracing::debug!("Normalised to {} kinase rows", normalized.len());

        let csv_name = self.normalized_csv_name();
        self.storage.write_file(&csv_name, &to_csv(&normalized)?).await?;
        tracing::info!("Normalised CSV saved: {}", self.storage.location(&csv_name));

        let reference_path = data.reference_path;
        let reference = load_reference(&reference_path, &self.motif_db.kinase_keys()).await?;

        let (validated, accuracy) = validate_predictions(&normalized, &reference);
        let f1 = calculate_f1_metrics(&validated);
        let cell_signal = build_cell_signal_tables(&normalized, &self.motif_db);

        let metadata = RunMetadata {
            phosphom_version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Local::now().to_rfc3339(),
            input_file: file_name(Path::new(self.config.word_path())),
            reference_file: file_name(&reference_path),
            min_confidence: self.config.min_confidence(),
        };

        Ok(AnalysisResult {
            mapped_docx: data.mapped_docx,
            csv_path: self.storage.location(&csv_name),
            mapped_items: data.mapped_items,
            normalized,
            validated,
            accuracy,
            f1,
            cell_signal,
            metadata,
        })
    }

    async fn load(&self, result: AnalysisResult) -> Result<RunSummary> {
        let metrics = RunMetrics {
            accuracy: result.accuracy,
            f1: result.f1,
            mapped_items: result.mapped_items,
            metadata: result.metadata,
        };

        let zip_data = {
            let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

            zip.start_file::<_, ()>("validated_data.csv", FileOptions::default())?;
            zip.write_all(&to_csv(&result.validated)?)?;

            zip.start_file::<_, ()>("metrics.json", FileOptions::default())?;
            zip.write_all(serde_json::to_string_pretty(&metrics)?.as_bytes())?;

            zip.start_file::<_, ()>("cell_signal_genes.csv", FileOptions::default())?;
            zip.write_all(&to_csv(&result.cell_signal.genes)?)?;

            zip.start_file::<_, ()>("cell_signal_overall.csv", FileOptions::default())?;
            zip.write_all(&to_csv(&result.cell_signal.overall)?)?;

            zip.start_file::<_, ()>("cell_signal_top_kinases.csv", FileOptions::default())?;
            zip.write_all(&to_csv(&result.cell_signal.top_kinases)?)?;

            zip.finish()?.into_inner()
        };

        let report_name = self.report_name();
        tracing::debug!("Writing report ({} bytes) to storage", zip_data.len());
        self.storage.write_file(&report_name, &zip_data).await?;

        Ok(RunSummary {
            mapped_docx: result.mapped_docx,
            csv_path: result.csv_path,
            report_path: self.storage.location(&report_name),
            metrics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::motif_db::MotifSpec;
    use crate::core::reference::SITE_COLUMN;
    use std::collections::HashMap;
    use std::io::Read;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio::sync::Mutex;

    const SEQ: &str = "MAAAAGGGGGAAAARRASLAAAAAAGGGGGGGGGG";

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                PhosphomError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }

        fn location(&self, path: &str) -> String {
            format!("mem://{}", path)
        }
    }

    struct MockConfig {
        word_path: String,
        reference_path: Option<String>,
        min_confidence: f64,
        motifs: Vec<MotifSpec>,
    }

    impl ConfigProvider for MockConfig {
        fn word_path(&self) -> &str {
            &self.word_path
        }

        fn reference_path(&self) -> Option<&str> {
            self.reference_path.as_deref()
        }

        fn output_path(&self) -> &str {
            "unused"
        }

        fn base_name(&self) -> &str {
            "run"
        }

        fn min_confidence(&self) -> f64 {
            self.min_confidence
        }

        fn custom_motifs(&self) -> &[MotifSpec] {
            &self.motifs
        }
    }

    struct Fixture {
        _dir: TempDir,
        config: MockConfig,
    }

    fn fixture(paragraphs: &[&str]) -> Fixture {
        let dir = TempDir::new().unwrap();
        let word = dir.path().join("input.docx");
        let doc = DocxDocument::from_paragraph_texts(paragraphs).unwrap();
        std::fs::write(&word, doc.to_bytes().unwrap()).unwrap();

        let reference = dir.path().join("psp");
        std::fs::create_dir(&reference).unwrap();
        std::fs::write(
            reference.join("PKA.csv"),
            format!("GENE,{}\nSyn1,GGAAAARRAsLAAAA\n", SITE_COLUMN),
        )
        .unwrap();

        let config = MockConfig {
            word_path: word.to_string_lossy().into_owned(),
            reference_path: Some(reference.to_string_lossy().into_owned()),
            min_confidence: 0.0,
            motifs: Vec::new(),
        };
        Fixture { _dir: dir, config }
    }

    fn unzip(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut out = String::new();
        file.read_to_string(&mut out).unwrap();
        out
    }

    #[tokio::test]
    async fn test_extract_maps_and_reads_back() {
        let fx = fixture(&["Mus musculus synapsin I (Syn1), mRNA", SEQ, "RRAS(0.912)LAA"]);
        let storage = MockStorage::new();
        let pipeline = PhosphoPipeline::new(storage.clone(), fx.config).unwrap();

        let result = pipeline.extract().await.unwrap();

        assert_eq!(result.mapped_docx, "mem://run_mapped.docx");
        assert_eq!(result.mapped_items, 1);
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].gene, "Syn1");
        assert_eq!(result.records[0].motif, "RRASLAA");
        assert_eq!(
            result.records[0].kinases,
            "PKA, RSK, CaMK2, Aurora A, Aurora B, Chk2"
        );

        let saved = storage.get_file("run_mapped.docx").await.unwrap();
        let doc = DocxDocument::from_bytes(&saved).unwrap();
        assert!(doc.paragraph_text(2).unwrap().starts_with("RRAS(0.912)LAA (18 "));
    }

    #[tokio::test]
    async fn test_extract_without_annotations_fails() {
        let fx = fixture(&["Mus musculus synapsin I (Syn1), mRNA", SEQ]);
        let pipeline = PhosphoPipeline::new(MockStorage::new(), fx.config).unwrap();

        let err = pipeline.extract().await.unwrap_err();

        assert!(matches!(err, PhosphomError::EmptyExtraction));
        assert_eq!(
            err.to_string(),
            "No motif data matching the criteria was found"
        );
    }

    #[tokio::test]
    async fn test_custom_motif_reaches_annotations() {
        let mut fx = fixture(&[SEQ, "RRAS(0.912)LAA"]);
        fx.config.min_confidence = 0.9;
        fx.config.motifs = vec![MotifSpec {
            kinase: "WNK1".to_string(),
            pattern: "RRA([ST])".to_string(),
            specificity: 0.95,
            description: None,
            signal: Some("Stress Response".to_string()),
        }];
        let pipeline = PhosphoPipeline::new(MockStorage::new(), fx.config).unwrap();

        let result = pipeline.extract().await.unwrap();

        assert_eq!(result.records[0].kinases, "WNK1");
        assert_eq!(result.records[0].confidences, "0.95");
    }

    #[tokio::test]
    async fn test_full_run_writes_csv_and_report() {
        let fx = fixture(&["Mus musculus synapsin I (Syn1), mRNA", SEQ, "RRAS(0.912)LAA"]);
        let storage = MockStorage::new();
        let pipeline = PhosphoPipeline::new(storage.clone(), fx.config).unwrap();

        let extracted = pipeline.extract().await.unwrap();
        let analysed = pipeline.transform(extracted).await.unwrap();
        assert_eq!(analysed.csv_path, "mem://run_normalized.csv");
        assert_eq!(analysed.normalized.len(), 6);
        assert_eq!(analysed.accuracy.matched_psp, 6);
        assert_eq!(analysed.accuracy.correct, 1);
        assert_eq!(analysed.metadata.input_file, "input.docx");
        assert_eq!(analysed.metadata.reference_file, "psp");

        let summary = pipeline.load(analysed).await.unwrap();
        assert_eq!(summary.csv_path, "mem://run_normalized.csv");
        assert_eq!(summary.report_path, "mem://run_report.zip");
        assert_eq!(summary.metrics.f1.tp, 1);
        assert_eq!(summary.metrics.f1.fp, 5);
        assert_eq!(summary.metrics.f1.fn_, 0);

        let csv = String::from_utf8(storage.get_file("run_normalized.csv").await.unwrap()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("Gene Name,Motif,Kinase Name,Confidence"));
        assert_eq!(lines.next(), Some("Syn1,RRASLAA,PKA,0.60"));

        let report = storage.get_file("run_report.zip").await.unwrap();
        let metrics: serde_json::Value =
            serde_json::from_str(&unzip(&report, "metrics.json")).unwrap();
        assert_eq!(metrics["total_motifs"], 6);
        assert_eq!(metrics["fn"], 0);
        assert_eq!(metrics["mapped_items"], 1);
        assert_eq!(metrics["min_confidence"], 0.0);

        let validated = unzip(&report, "validated_data.csv");
        assert!(validated.starts_with(
            "Gene Name,Motif,Kinase Name,Confidence,In_PSP,Correct,Actual_Kinases_in_PSP"
        ));
        assert!(validated.contains("Syn1,RRASLAA,PKA,0.60,true,true,PKA"));

        let overall = unzip(&report, "cell_signal_overall.csv");
        assert_eq!(overall.lines().count(), 9);
    }

    #[tokio::test]
    async fn test_missing_reference_fails_before_any_output() {
        let mut fx = fixture(&[SEQ, "RRAS(0.912)LAA"]);
        fx.config.reference_path = Some("/nonexistent/psp.xlsx".to_string());
        let storage = MockStorage::new();
        let pipeline = PhosphoPipeline::new(storage.clone(), fx.config).unwrap();

        let err = pipeline.extract().await.unwrap_err();

        assert!(matches!(err, PhosphomError::ReferenceError { .. }));
        assert!(storage.files.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_normalized_csv_written_before_validation() {
        let fx = fixture(&[SEQ, "RRAS(0.912)LAA"]);
        let reference = PathBuf::from(fx.config.reference_path.clone().unwrap());
        let storage = MockStorage::new();
        let pipeline = PhosphoPipeline::new(storage.clone(), fx.config).unwrap();

        let extracted = pipeline.extract().await.unwrap();
        // reference turns into a corrupt workbook between the stages
        std::fs::remove_dir_all(&reference).unwrap();
        std::fs::write(&reference, b"not a workbook").unwrap();

        assert!(pipeline.transform(extracted).await.is_err());
        assert!(storage.get_file("run_normalized.csv").await.is_some());
        assert!(storage.get_file("run_report.zip").await.is_none());
    }

    #[test]
    fn test_invalid_custom_motif_rejected() {
        let mut fx = fixture(&[SEQ]);
        fx.config.motifs = vec![MotifSpec {
            kinase: "Broken".to_string(),
            pattern: "([ST".to_string(),
            specificity: 0.5,
            description: None,
            signal: None,
        }];

        assert!(PhosphoPipeline::new(MockStorage::new(), fx.config).is_err());
    }
}
