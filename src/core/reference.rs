//! PhosphoSitePlus substrate windows per kinase.

use crate::adapters::xlsx::Workbook;
use crate::utils::error::{PhosphomError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

/// Column holding the 15-residue substrate window, `_`-padded at sequence ends.
pub const SITE_COLUMN: &str = "SITE_+/-7_AA";

/// Reference workbook looked up in the working directory when none is configured.
pub const DEFAULT_REFERENCE_FILE: &str = "Substrates of protein.xlsx";

static NAME_NOISE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[&\s\-_/]").expect("valid regex"));

/// Kinase name comparison key: separators and whitespace dropped, uppercase.
pub fn normalize_name_for_matching(name: &str) -> String {
    NAME_NOISE_RE.replace_all(name, "").to_uppercase()
}

/// Substrate windows per kinase, in kinase key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceData {
    kinases: Vec<(String, Vec<String>)>,
}

impl ReferenceData {
    pub fn new(kinases: Vec<(String, Vec<String>)>) -> Self {
        Self { kinases }
    }

    pub fn kinases(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.kinases.iter().map(|(k, s)| (k.as_str(), s.as_slice()))
    }

    pub fn sequences(&self, kinase: &str) -> Option<&[String]> {
        self.kinases
            .iter()
            .find(|(k, _)| k == kinase)
            .map(|(_, s)| s.as_slice())
    }

    pub fn len(&self) -> usize {
        self.kinases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinases.is_empty()
    }

    pub fn total_sequences(&self) -> usize {
        self.kinases.iter().map(|(_, s)| s.len()).sum()
    }
}

/// Loads from an `.xlsx` workbook (one sheet per kinase) or a directory of `<kinase>.csv` files.
pub async fn load_reference(path: &Path, keys: &[String]) -> Result<ReferenceData> {
    let is_dir = tokio::fs::metadata(path)
        .await
        .is_ok_and(|meta| meta.is_dir());

    let data = if is_dir {
        let dir = path.to_path_buf();
        let keys = keys.to_vec();
        tokio::task::spawn_blocking(move || load_from_csv_dir(&dir, &keys[..]))
            .await
            .map_err(|e| PhosphomError::ProcessingError {
                message: format!("Reference loading task failed: {}", e),
            })??
    } else {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| PhosphomError::ReferenceError {
                message: format!("Cannot read reference workbook {}: {}", path.display(), e),
            })?;
        load_from_workbook(bytes, keys)?
    };

    tracing::info!(
        "Loaded reference data for {} kinases ({} substrate windows) from {}",
        data.len(),
        data.total_sequences(),
        path.display()
    );
    Ok(data)
}

pub fn load_from_workbook<S: AsRef<str>>(bytes: Vec<u8>, keys: &[S]) -> Result<ReferenceData> {
    let mut workbook = Workbook::from_bytes(bytes)?;
    let sheet_names: Vec<String> = workbook
        .sheet_names()
        .into_iter()
        .map(str::to_string)
        .collect();

    let mut kinases = Vec::new();
    for key in keys {
        let key = key.as_ref();
        let Some(sheet) = find_source(&sheet_names, key) else {
            continue;
        };
        let rows = workbook.read_sheet(sheet)?;
        match site_sequences(&rows) {
            Some(sequences) => kinases.push((key.to_string(), sequences)),
            None => tracing::warn!("Sheet '{}' has no {} column, skipping", sheet, SITE_COLUMN),
        }
    }
    Ok(ReferenceData::new(kinases))
}

pub fn load_from_csv_dir<S: AsRef<str>>(dir: &Path, keys: &[S]) -> Result<ReferenceData> {
    let mut stems: Vec<String> = Vec::new();
    let entries = std::fs::read_dir(dir).map_err(|e| PhosphomError::ReferenceError {
        message: format!("Cannot list reference directory {}: {}", dir.display(), e),
    })?;
    for entry in entries {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if let (true, Some(stem)) = (is_csv, path.file_stem().and_then(|s| s.to_str())) {
            stems.push(stem.to_string());
        }
    }
    stems.sort();

    let mut kinases = Vec::new();
    for key in keys {
        let key = key.as_ref();
        let Some(stem) = find_source(&stems, key) else {
            continue;
        };
        let rows = read_csv_rows(&dir.join(format!("{}.csv", stem)))?;
        match site_sequences(&rows) {
            Some(sequences) => kinases.push((key.to_string(), sequences)),
            None => tracing::warn!("File '{}.csv' has no {} column, skipping", stem, SITE_COLUMN),
        }
    }
    Ok(ReferenceData::new(kinases))
}

/// First source name whose normalised form equals the normalised kinase key.
fn find_source<'a>(names: &'a [String], key: &str) -> Option<&'a str> {
    let target = normalize_name_for_matching(key);
    names
        .iter()
        .find(|name| normalize_name_for_matching(name) == target)
        .map(String::as_str)
}

fn read_csv_rows(path: &Path) -> Result<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

/// Cleaned, de-duplicated site windows; `None` when the header lacks the site column.
fn site_sequences(rows: &[Vec<String>]) -> Option<Vec<String>> {
    let (header, body) = rows.split_first()?;
    let col = header.iter().position(|h| h.trim() == SITE_COLUMN)?;

    let mut sequences: Vec<String> = Vec::new();
    for row in body {
        let Some(raw) = row.get(col) else {
            continue;
        };
        let cleaned = raw.replace('_', "").to_uppercase().trim().to_string();
        if !cleaned.is_empty() && !sequences.contains(&cleaned) {
            sequences.push(cleaned);
        }
    }
    Some(sequences)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::xlsx::fixtures::workbook_bytes;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_name_for_matching() {
        assert_eq!(normalize_name_for_matching("p38&MAPK"), "P38MAPK");
        assert_eq!(normalize_name_for_matching("ATM & ATR"), "ATMATR");
        assert_eq!(normalize_name_for_matching("GSK-3beta"), "GSK3BETA");
        assert_eq!(normalize_name_for_matching("Aurora_A/x"), "AURORAAX");
    }

    #[test]
    fn test_site_sequences_cleans_and_dedupes() {
        let rows = vec![
            vec!["GENE".to_string(), SITE_COLUMN.to_string()],
            vec!["Syn1".to_string(), "___aaRRAsLaaa".to_string()],
            vec!["Syn1".to_string(), "AARRASLAAA".to_string()],
            vec!["Syn2".to_string(), "  ".to_string()],
            vec!["Short".to_string()],
        ];
        assert_eq!(site_sequences(&rows), Some(vec!["AARRASLAAA".to_string()]));
        assert_eq!(site_sequences(&rows[1..]), None);
    }

    #[test]
    fn test_load_from_workbook_matches_normalized_sheet_names() {
        let bytes = workbook_bytes(&[
            ("p38 MAPK", vec![vec![SITE_COLUMN], vec!["aaLtsPaaa"]]),
            ("PKA", vec![vec![SITE_COLUMN], vec!["aaRRAsLaa"], vec!["aaKRAsVaa"]]),
            ("PKAx", vec![vec![SITE_COLUMN], vec!["wrong"]]),
            ("CK2", vec![vec!["OTHER"], vec!["x"]]),
        ]);

        let data = load_from_workbook(bytes, &["PKA", "p38&MAPK", "CK2", "AKT"]).unwrap();

        assert_eq!(data.len(), 2);
        let order: Vec<&str> = data.kinases().map(|(k, _)| k).collect();
        assert_eq!(order, vec!["PKA", "p38&MAPK"]);
        assert_eq!(
            data.sequences("PKA").unwrap(),
            &["AARRASLAA".to_string(), "AAKRASVAA".to_string()]
        );
        assert_eq!(data.sequences("p38&MAPK").unwrap(), &["AALTSPAAA".to_string()]);
        assert!(data.sequences("CK2").is_none());
    }

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[tokio::test]
    async fn test_load_reference_from_csv_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("Aurora A.csv"),
            format!("GENE,{}\nAurka,aaRRAsLaaa\n", SITE_COLUMN),
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let data = load_reference(dir.path(), &keys(&["PKA", "Aurora A"]))
            .await
            .unwrap();

        assert_eq!(data.len(), 1);
        assert_eq!(data.sequences("Aurora A").unwrap(), &["AARRASLAAA".to_string()]);
        assert_eq!(data.total_sequences(), 1);
    }

    #[tokio::test]
    async fn test_load_reference_from_workbook_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("psp.xlsx");
        std::fs::write(
            &path,
            workbook_bytes(&[("PKA", vec![vec![SITE_COLUMN], vec!["aaRRAsLaaa"]])]),
        )
        .unwrap();

        let data = load_reference(&path, &keys(&["PKA"])).await.unwrap();

        assert_eq!(data.sequences("PKA").unwrap(), &["AARRASLAAA".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_reference_file() {
        let dir = TempDir::new().unwrap();
        let err = load_reference(&dir.path().join("absent.xlsx"), &keys(&["PKA"]))
            .await
            .unwrap_err();
        assert!(matches!(err, PhosphomError::ReferenceError { .. }));
    }
}
