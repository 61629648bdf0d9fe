use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One annotated peptide line pulled out of a mapped document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotifRecord {
    #[serde(rename = "Gene Name")]
    pub gene: String,
    #[serde(rename = "Motif")]
    pub motif: String,
    /// Comma-separated kinase names, in motif database order.
    #[serde(rename = "Kinase Name")]
    pub kinases: String,
    /// Comma-separated scores aligned with `kinases`; empty entries for legacy annotations.
    #[serde(rename = "Confidence")]
    pub confidences: String,
}

/// A single (motif, kinase) prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    #[serde(rename = "Gene Name")]
    pub gene: String,
    #[serde(rename = "Motif")]
    pub motif: String,
    #[serde(rename = "Kinase Name")]
    pub kinase: String,
    #[serde(rename = "Confidence")]
    pub confidence: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedRecord {
    #[serde(rename = "Gene Name")]
    pub gene: String,
    #[serde(rename = "Motif")]
    pub motif: String,
    #[serde(rename = "Kinase Name")]
    pub kinase: String,
    #[serde(rename = "Confidence")]
    pub confidence: String,
    #[serde(rename = "In_PSP")]
    pub in_psp: bool,
    #[serde(rename = "Correct")]
    pub correct: bool,
    #[serde(rename = "Actual_Kinases_in_PSP")]
    pub actual_kinases: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccuracySummary {
    pub total_motifs: usize,
    pub matched_psp: usize,
    pub correct: usize,
    pub acc_percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct F1Metrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub tp: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneSignalRow {
    #[serde(rename = "Gene Name")]
    pub gene: String,
    #[serde(rename = "Cell Signal")]
    pub signal: String,
    #[serde(rename = "Count")]
    pub count: usize,
    #[serde(rename = "Motifs")]
    pub motifs: String,
    #[serde(rename = "Kinases")]
    pub kinases: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallSignalRow {
    #[serde(rename = "Cell Signal")]
    pub signal: String,
    #[serde(rename = "Count")]
    pub count: usize,
    #[serde(rename = "Percent")]
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopKinaseRow {
    #[serde(rename = "Cell Signal")]
    pub signal: String,
    #[serde(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Kinase Name")]
    pub kinase: String,
    #[serde(rename = "Unique Motifs")]
    pub unique_motifs: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellSignalTables {
    pub genes: Vec<GeneSignalRow>,
    pub overall: Vec<OverallSignalRow>,
    pub top_kinases: Vec<TopKinaseRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub phosphom_version: String,
    pub timestamp: String,
    pub input_file: String,
    pub reference_file: String,
    pub min_confidence: f64,
}

/// Output of the extract stage: the mapped document plus the rows read back from it.
#[derive(Debug, Clone)]
pub struct ExtractResult {
    pub mapped_docx: String,
    pub mapped_items: usize,
    pub records: Vec<MotifRecord>,
    /// Reference resolved before any output was written.
    pub reference_path: PathBuf,
}

/// Output of the transform stage.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub mapped_docx: String,
    pub csv_path: String,
    pub mapped_items: usize,
    pub normalized: Vec<NormalizedRecord>,
    pub validated: Vec<ValidatedRecord>,
    pub accuracy: AccuracySummary,
    pub f1: F1Metrics,
    pub cell_signal: CellSignalTables,
    pub metadata: RunMetadata,
}

/// Everything written to `metrics.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    #[serde(flatten)]
    pub accuracy: AccuracySummary,
    #[serde(flatten)]
    pub f1: F1Metrics,
    pub mapped_items: usize,
    #[serde(flatten)]
    pub metadata: RunMetadata,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub mapped_docx: String,
    pub csv_path: String,
    pub report_path: String,
    pub metrics: RunMetrics,
}
