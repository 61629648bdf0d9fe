use crate::core::motif_db::MotifSpec;
use crate::domain::model::{AnalysisResult, ExtractResult, RunSummary};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// Display path of an entry, for log lines and run summaries.
    fn location(&self, path: &str) -> String;
}

pub trait ConfigProvider: Send + Sync {
    fn word_path(&self) -> &str;
    fn reference_path(&self) -> Option<&str>;
    fn output_path(&self) -> &str;
    fn base_name(&self) -> &str;
    fn min_confidence(&self) -> f64;
    fn custom_motifs(&self) -> &[MotifSpec] {
        &[]
    }
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<ExtractResult>;
    async fn transform(&self, data: ExtractResult) -> Result<AnalysisResult>;
    async fn load(&self, result: AnalysisResult) -> Result<RunSummary>;
}
