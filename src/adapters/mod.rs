// Adapters layer: Office Open XML packages read and written by the pipeline.

pub mod docx;
pub mod xlsx;
