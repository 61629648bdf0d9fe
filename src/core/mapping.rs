//! Phospho-site mapping over a Word document.
//!
//! The document is read top to bottom. A paragraph that looks like a full
//! protein sequence becomes the active sequence; following paragraphs with
//! probability markers such as `S(0.477)` are peptides of that sequence.
//! Every marked residue is located in the sequence, matched against the
//! motif database, and labelled with its 1-based position and kinase hits.
//! Peptide lines and the sequence itself are re-rendered with highlights:
//! yellow for phospho-sites, light gray for peptide coverage, red for the
//! marked residue inside the peptide line.

use crate::adapters::docx::{DocxDocument, Highlight, Run};
use crate::core::motif_db::{KinaseHit, MotifDb};
use crate::utils::error::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Shortest paragraph (after whitespace removal) treated as a protein sequence.
pub const MIN_SEQUENCE_LENGTH: usize = 30;

/// Fraction of standard amino acids a sequence paragraph must reach.
const MIN_AMINO_ACID_FRACTION: f64 = 0.90;

const AMINO_ACIDS: &str = "ACDEFGHIKLMNPQRSTVWY";

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static ANNOTATED_DIGIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(\d").expect("valid regex"));
static TRAILING_POSITIONS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\([\d,\s]+\)$").expect("valid regex"));
static PAREN_GROUP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(.*?\)").expect("valid regex"));
static PROBABILITY_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\([0-9.]+\)").expect("valid regex"));

pub fn clean_all_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text, "").into_owned()
}

/// Whether `text` reads as a full amino-acid sequence rather than an annotated peptide.
pub fn is_protein_sequence(text: &str) -> bool {
    let cleaned = clean_all_whitespace(text).to_uppercase();
    let total = cleaned.chars().count();
    if total < MIN_SEQUENCE_LENGTH {
        return false;
    }

    let amino_acids = cleaned.chars().filter(|c| AMINO_ACIDS.contains(*c)).count();
    if (amino_acids as f64) / (total as f64) < MIN_AMINO_ACID_FRACTION {
        return false;
    }

    !ANNOTATED_DIGIT_RE.is_match(text)
}

/// One mapped phospho-site, traceable to its source paragraphs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteAnnotation {
    /// Index of the peptide paragraph carrying the marker.
    pub peptide_paragraph: usize,
    /// Index of the sequence paragraph the peptide was located in.
    pub sequence_paragraph: usize,
    /// 1-based residue position in the sequence.
    pub position: usize,
    pub residue: char,
    pub hits: Vec<KinaseHit>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingOutcome {
    /// Peptide lines that were located and annotated.
    pub processed: usize,
    pub sites: Vec<SiteAnnotation>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PeptidePart<'a> {
    Text(&'a str),
    Marker(&'a str),
}

/// Splits on probability markers, keeping them as their own parts.
fn split_markers(peptide: &str) -> Vec<PeptidePart<'_>> {
    let mut parts = Vec::new();
    let mut last = 0;
    for marker in PROBABILITY_MARKER_RE.find_iter(peptide) {
        if marker.start() > last {
            parts.push(PeptidePart::Text(&peptide[last..marker.start()]));
        }
        parts.push(PeptidePart::Marker(marker.as_str()));
        last = marker.end();
    }
    if last < peptide.len() {
        parts.push(PeptidePart::Text(&peptide[last..]));
    }
    parts
}

struct ActiveSequence {
    paragraph: usize,
    sequence: String,
    residues: Vec<char>,
    colors: Vec<Option<Highlight>>,
}

impl ActiveSequence {
    fn new(paragraph: usize, text: &str) -> Self {
        let sequence = clean_all_whitespace(text).to_uppercase();
        let residues: Vec<char> = sequence.chars().collect();
        let colors = vec![None; residues.len()];
        Self {
            paragraph,
            sequence,
            residues,
            colors,
        }
    }

    /// Consecutive residues of one colour collapse into a single run.
    fn runs(&self) -> Vec<Run> {
        let mut runs: Vec<Run> = Vec::new();
        for (&residue, color) in self.residues.iter().zip(self.colors.iter().copied()) {
            match runs.last_mut() {
                Some(run) if run.highlight == color => run.text.push(residue),
                _ => runs.push(Run {
                    text: residue.to_string(),
                    highlight: color,
                }),
            }
        }
        runs
    }

    fn flush(&self, doc: &mut DocxDocument) -> Result<()> {
        if self.colors.is_empty() {
            return Ok(());
        }
        doc.replace_runs(self.paragraph, self.runs())
    }
}

/// Annotates every peptide line of `doc` in place.
pub fn map_document(
    doc: &mut DocxDocument,
    db: &MotifDb,
    min_confidence: f64,
) -> Result<MappingOutcome> {
    let texts: Vec<String> = doc.paragraph_texts().map(|t| t.trim().to_string()).collect();
    let mut outcome = MappingOutcome::default();
    let mut active: Option<ActiveSequence> = None;

    for (idx, text) in texts.iter().enumerate() {
        if text.is_empty() {
            continue;
        }

        if is_protein_sequence(text) {
            if let Some(previous) = active.take() {
                previous.flush(doc)?;
            }
            let sequence = ActiveSequence::new(idx, text);
            tracing::debug!("Detected protein sequence: {} residues", sequence.colors.len());
            active = Some(sequence);
            continue;
        }

        let Some(sequence) = active.as_mut() else {
            continue;
        };
        if !text.contains('(') {
            continue;
        }

        if let Some(runs) = map_peptide(idx, text, sequence, db, min_confidence, &mut outcome.sites)
        {
            doc.replace_runs(idx, runs)?;
            outcome.processed += 1;
        }
    }

    if let Some(last) = active.take() {
        last.flush(doc)?;
    }

    tracing::info!(
        "Mapping complete: {} peptide lines processed, {} sites annotated",
        outcome.processed,
        outcome.sites.len()
    );
    Ok(outcome)
}

/// Returns the rewritten runs of the peptide line, or `None` when it cannot be placed.
fn map_peptide(
    paragraph: usize,
    text: &str,
    active: &mut ActiveSequence,
    db: &MotifDb,
    min_confidence: f64,
    sites: &mut Vec<SiteAnnotation>,
) -> Option<Vec<Run>> {
    let peptide = TRAILING_POSITIONS_RE.replace(text, "").trim().to_string();
    let pure = clean_all_whitespace(&PAREN_GROUP_RE.replace_all(&peptide, "")).to_uppercase();
    if pure.is_empty() {
        tracing::warn!("Paragraph {} has markers but no residues", paragraph);
        return None;
    }

    let Some(byte_start) = active.sequence.find(&pure) else {
        let preview: String = pure.chars().take(30).collect();
        tracing::warn!("Peptide not found in current sequence: {}", preview);
        return None;
    };
    let start = active.sequence[..byte_start].chars().count();
    let end = start + pure.chars().count();

    for color in &mut active.colors[start..end] {
        if *color != Some(Highlight::Yellow) {
            *color = Some(Highlight::LightGray);
        }
    }

    let parts = split_markers(&peptide);
    let mut labels: Vec<String> = Vec::new();
    let mut offset = 0;

    for part in &parts {
        match part {
            PeptidePart::Text(t) => offset += clean_all_whitespace(t).chars().count(),
            PeptidePart::Marker(_) => {
                let real_idx = start + offset;
                if real_idx == 0 || real_idx > active.colors.len() {
                    tracing::warn!(
                        "Phospho-site position out of bounds: {} (sequence length: {})",
                        real_idx as i64 - 1,
                        active.colors.len()
                    );
                    continue;
                }

                let site = real_idx - 1;
                active.colors[site] = Some(Highlight::Yellow);
                let hits = db.identify_kinases_in(&active.residues, site, min_confidence);

                let mut label = real_idx.to_string();
                if !hits.is_empty() {
                    let described: Vec<String> = hits.iter().map(ToString::to_string).collect();
                    label.push(' ');
                    label.push_str(&described.join(", "));
                }
                labels.push(label);

                sites.push(SiteAnnotation {
                    peptide_paragraph: paragraph,
                    sequence_paragraph: active.paragraph,
                    position: real_idx,
                    residue: active.residues[site],
                    hits,
                });
            }
        }
    }

    let mut runs = Vec::with_capacity(parts.len() + 2);
    for (i, part) in parts.iter().enumerate() {
        match part {
            PeptidePart::Marker(marker) => {
                runs.push(Run::highlighted(*marker, Highlight::Yellow));
            }
            PeptidePart::Text(t) => {
                let marked_next = matches!(parts.get(i + 1), Some(PeptidePart::Marker(_)));
                match t.char_indices().last() {
                    Some((last, _)) if marked_next => {
                        runs.push(Run::plain(&t[..last]));
                        runs.push(Run::highlighted(&t[last..], Highlight::Red));
                    }
                    _ => runs.push(Run::plain(*t)),
                }
            }
        }
    }
    runs.push(Run::plain(format!(" ({})", labels.join(", "))));

    Some(runs)
}
