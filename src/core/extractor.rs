//! Reads annotated peptide lines back out of a mapped document.

use crate::adapters::docx::DocxDocument;
use crate::domain::model::MotifRecord;
use crate::utils::error::Result;
use once_cell::sync::Lazy;
use regex::Regex;

const UNKNOWN_GENE: &str = "Unknown";

const HEADER_KEYWORDS: &[&str] = &[
    "mrna",
    "protein",
    "isoform",
    "variant",
    "complete cds",
    "partial cds",
    "transcript",
    "homo sapiens",
    "mus musculus",
    "rattus norvegicus",
    "gene",
    "chromosome",
    "predicted",
    "uncharacterized",
];

static ACCESSION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?:sp|tr)\|[A-Z0-9]{6,10}\|",
        r"\b(?:NP|NM|XP|XM|YP|NC)_\d{3,}",
        r"\b[A-Z]{3}\d{5}(?:\.\d+)?\b",
        r"\bgi\|\d+",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

// Tried in order; the first capture wins.
static GENE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?:sp|tr)\|[A-Z0-9]+\|(\w+?)_",
        r"GN=(\S+)",
        r"(?i)\[gene=(\S+?)\]",
        r"\(([A-Za-z][A-Za-z0-9_-]{0,20})\)",
        r"^[>\s]*([A-Za-z][A-Za-z0-9_-]{1,20})",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

static PROBABILITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(0\.\d+\)|\(1\)").expect("valid regex"));
static NON_RESIDUE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Z]").expect("valid regex"));

/// Whether a paragraph introduces a new gene or protein entry.
pub fn is_header_line(text: &str) -> bool {
    if text.chars().count() < 10 {
        return false;
    }
    if text.starts_with('>') {
        return true;
    }
    if ACCESSION_PATTERNS.iter().any(|re| re.is_match(text)) {
        return true;
    }
    let lower = text.to_lowercase();
    HEADER_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

pub fn extract_gene_symbol(header: &str) -> String {
    GENE_PATTERNS
        .iter()
        .find_map(|re| re.captures(header).and_then(|c| c.get(1)))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| UNKNOWN_GENE.to_string())
}

/// Residue letters only, with probability markers removed.
pub fn clean_motif(motif: &str) -> String {
    let without_markers = PROBABILITY_RE.replace_all(motif, "");
    NON_RESIDUE_RE
        .replace_all(&without_markers.to_uppercase(), "")
        .into_owned()
}

/// Finds known kinase names inside an annotation such as `"18 PKA:0.60, RSK:0.60"`.
///
/// A name only counts when it is not glued to a preceding or following
/// letter/digit, so `CaMK2:0.55` never reports `MK2`. Names written without a
/// score are still recognised and get an empty confidence.
pub struct KinaseMatcher {
    kinases: Vec<(String, Regex, Regex)>,
}

impl KinaseMatcher {
    pub fn new<S: AsRef<str>>(keys: &[S]) -> Result<Self> {
        let mut kinases = Vec::with_capacity(keys.len());
        for key in keys {
            let key = key.as_ref();
            let escaped = regex::escape(key);
            let scored = Regex::new(&format!(r"(?i)(?:^|[^A-Za-z0-9]){}:(\d+\.\d+)", escaped))?;
            let bare = Regex::new(&format!(r"(?i)(?:^|[^A-Za-z0-9]){}(?:$|[^A-Za-z0-9])", escaped))?;
            kinases.push((key.to_string(), scored, bare));
        }
        Ok(Self { kinases })
    }

    /// Kinase names and their scores, in key order.
    pub fn find(&self, info: &str) -> (Vec<String>, Vec<String>) {
        let mut names = Vec::new();
        let mut scores = Vec::new();
        for (key, scored, bare) in &self.kinases {
            if let Some(score) = scored.captures(info).and_then(|c| c.get(1)) {
                names.push(key.clone());
                scores.push(score.as_str().to_string());
            } else if bare.is_match(info) {
                names.push(key.clone());
                scores.push(String::new());
            }
        }
        (names, scores)
    }
}

/// One record per annotated peptide line, tagged with the latest gene header.
pub fn extract_records(doc: &DocxDocument, matcher: &KinaseMatcher) -> Vec<MotifRecord> {
    let mut records = Vec::new();
    let mut current_gene = UNKNOWN_GENE.to_string();

    for text in doc.paragraph_texts().map(str::trim) {
        if text.is_empty() {
            continue;
        }

        if is_header_line(text) {
            current_gene = extract_gene_symbol(text);
            tracing::debug!("Gene header: {}", current_gene);
            continue;
        }

        if !(text.contains('(') && text.contains(')')) {
            continue;
        }
        let Some((motif_part, info)) = text.rsplit_once('(') else {
            continue;
        };

        let motif = clean_motif(motif_part.trim());
        let (kinases, confidences) = matcher.find(info.trim());
        if motif.len() > 3 && motif.len() < 100 {
            records.push(MotifRecord {
                gene: current_gene.clone(),
                motif,
                kinases: kinases.join(", "),
                confidences: confidences.join(", "),
            });
        }
    }

    tracing::info!("Extracted {} motif rows", records.len());
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::motif_db::MotifDb;

    fn matcher() -> KinaseMatcher {
        KinaseMatcher::new(&MotifDb::builtin().unwrap().kinase_keys()).unwrap()
    }

    #[test]
    fn test_is_header_line() {
        assert!(is_header_line(">sp|P17600|SYN1_HUMAN Synapsin-1"));
        assert!(is_header_line("Synapsin 1 NP_008881 isoform"));
        assert!(is_header_line("Homo sapiens synapsin I (SYN1), mRNA"));
        assert!(is_header_line("accession AAB12345.1 here"));
        assert!(!is_header_line("gene X"));
        assert!(!is_header_line("RRAS(0.912)LAA (18 PKA:0.60)"));
    }

    #[test]
    fn test_extract_gene_symbol_priority() {
        assert_eq!(extract_gene_symbol(">sp|P17600|SYN1_HUMAN Synapsin-1 GN=SYN1"), "SYN1");
        assert_eq!(extract_gene_symbol("Synapsin-1 OS=Homo sapiens GN=Syn1 PE=1"), "Syn1");
        assert_eq!(extract_gene_symbol("lcl|NC_000 [gene=Mapt] [protein=tau]"), "Mapt");
        assert_eq!(extract_gene_symbol("Mus musculus synapsin I (Syn1), mRNA"), "Syn1");
        assert_eq!(extract_gene_symbol(">Camk2a predicted protein"), "Camk2a");
        assert_eq!(extract_gene_symbol("12345 67890"), "Unknown");
    }

    #[test]
    fn test_clean_motif() {
        assert_eq!(clean_motif("RRAS(0.912)LAA"), "RRASLAA");
        assert_eq!(clean_motif("rrt(1)pS(0.45) lk"), "RRTPSLK");
    }

    #[test]
    fn test_kinase_matcher_scored_and_bare() {
        let (names, scores) = matcher().find("18 Aurora B:0.75, CaMK2:0.55, PKA)");
        assert_eq!(names, vec!["PKA", "CaMK2", "Aurora B"]);
        assert_eq!(scores, vec!["", "0.55", "0.75"]);
    }

    #[test]
    fn test_kinase_matcher_is_case_insensitive() {
        let (names, scores) = matcher().find("5 pka:0.60, erk:0.70)");
        assert_eq!(names, vec!["PKA", "Erk"]);
        assert_eq!(scores, vec!["0.60", "0.70"]);
    }

    #[test]
    fn test_extract_records_from_mapped_document() {
        let doc = DocxDocument::from_paragraph_texts(&[
            "Mus musculus synapsin I (Syn1), mRNA",
            "MAAAAGGGGGAAAARRASLAAAAAAGGGGGGGGGG",
            "RRAS(0.912)LAA (18 Aurora B:0.75, Aurora A:0.65, Chk2:0.65, PKA:0.60, RSK:0.60, CaMK2:0.55)",
            "",
            "AS(0.5)D (2)",
            "Homo sapiens tau (Mapt), mRNA",
            "PPS(0.81)PGS(0.4)PR (12 Erk:0.70, 15)",
        ])
        .unwrap();

        let records = extract_records(&doc, &matcher());

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].gene, "Syn1");
        assert_eq!(records[0].motif, "RRASLAA");
        assert_eq!(records[0].kinases, "PKA, RSK, CaMK2, Aurora A, Aurora B, Chk2");
        assert_eq!(records[0].confidences, "0.60, 0.60, 0.55, 0.65, 0.75, 0.65");

        assert_eq!(records[1].gene, "Mapt");
        assert_eq!(records[1].motif, "PPSPGSPR");
        assert_eq!(records[1].kinases, "Erk");
        assert_eq!(records[1].confidences, "0.70");
    }
}
