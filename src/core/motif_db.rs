//! Kinase substrate recognition motifs and the window matcher built on them.
//!
//! Each entry pairs a consensus pattern with a hand-assigned specificity:
//!
//! | range     | meaning                                              |
//! |-----------|------------------------------------------------------|
//! | 0.80–1.00 | highly specific, several constrained positions       |
//! | 0.60–0.79 | moderately specific                                  |
//! | 0.40–0.59 | few constraints, common in any proteome              |
//! | 0.20–0.39 | very loose, needs priming evidence to mean anything  |
//!
//! Patterns are searched anywhere inside a ±7 residue window around the
//! phospho-site, matching the PhosphoSitePlus `SITE_+/-7_AA` format.

use crate::utils::error::{PhosphomError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Residues on either side of the site; 15-mer windows.
pub const WINDOW_HALF: usize = 7;

/// Kinases reported per cell signal in the top-kinase table.
pub const TOP_KINASES_N: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CellSignal {
    GrowthMetabolism,
    StressResponse,
    DnaDamageResponse,
    CellCycleMitosis,
    EnergyHomeostasis,
    SecondMessenger,
    InflammationImmunity,
    MultiFunctional,
}

impl CellSignal {
    /// Report order.
    pub const ALL: [CellSignal; 8] = [
        CellSignal::GrowthMetabolism,
        CellSignal::StressResponse,
        CellSignal::DnaDamageResponse,
        CellSignal::CellCycleMitosis,
        CellSignal::EnergyHomeostasis,
        CellSignal::SecondMessenger,
        CellSignal::InflammationImmunity,
        CellSignal::MultiFunctional,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CellSignal::GrowthMetabolism => "Growth & Metabolism",
            CellSignal::StressResponse => "Stress Response",
            CellSignal::DnaDamageResponse => "DNA Damage Response (DDR)",
            CellSignal::CellCycleMitosis => "Cell Cycle & Mitosis",
            CellSignal::EnergyHomeostasis => "Energy Homeostasis",
            CellSignal::SecondMessenger => "Second Messenger Signaling",
            CellSignal::InflammationImmunity => "Inflammation & Immunity",
            CellSignal::MultiFunctional => "Multi-functional",
        }
    }

    pub fn from_label(label: &str) -> Option<CellSignal> {
        let wanted = label.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|signal| signal.label().eq_ignore_ascii_case(wanted))
    }
}

impl fmt::Display for CellSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone)]
pub struct MotifEntry {
    pub kinase: String,
    pub pattern: Regex,
    pub specificity: f64,
    pub description: String,
    pub signal: Option<CellSignal>,
}

/// User-supplied motif, as written in the `[[motifs]]` tables of a TOML config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotifSpec {
    pub kinase: String,
    pub pattern: String,
    pub specificity: f64,
    pub description: Option<String>,
    /// Cell signal label, e.g. "Stress Response".
    pub signal: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KinaseHit {
    pub kinase: String,
    pub confidence: f64,
}

impl fmt::Display for KinaseHit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:.2}", self.kinase, self.confidence)
    }
}

/// Kinase hits for one residue of a sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteHits {
    /// 1-based position in the sequence.
    pub position: usize,
    pub residue: char,
    pub hits: Vec<KinaseHit>,
}

// `(?!P)` from the published consensus is written as `[^P]` (or `[^P]|$` at a
// pattern's tail) since the matcher has no lookaround.
const BUILTIN_MOTIFS: &[(&str, &str, f64, &str, CellSignal)] = &[
    // Basophilic & IIS signaling
    ("PKA", r"([RK][RK].([ST]))|([RK].{1,2}([ST]))", 0.60, "[R/K][R/K]-X-S/T | [R/K]-X(1-2)-S/T", CellSignal::SecondMessenger),
    ("AKT", r"R.[RK]..([ST])[LIVMFY]", 0.85, "R-X-[R/K]-X-X-S/T-!P-Φ", CellSignal::GrowthMetabolism),
    ("AMPK", r"([LIVMF].R.([ST])[^P].[LIVMF])|([LIVMF].R..([ST])(?:[^P]|$))", 0.70, "Φ-X-R-X-S/T-!P-X-X-Φ | Φ-X-R-X-X-S/T-!P", CellSignal::EnergyHomeostasis),
    ("S6K1", r"[RK]R..([ST])[LIVMF]", 0.75, "[R/K]-R-X-X-S/T-Φ", CellSignal::GrowthMetabolism),
    ("SGK1", r"R.R..([ST])[LIV]", 0.80, "R-X-R-X-X-S/T-[L/I/V]", CellSignal::GrowthMetabolism),
    ("RSK", r"[RK]R.([ST])", 0.60, "[R/K]-R-X-S/T", CellSignal::StressResponse),
    ("PKC", r"[RK].([ST])[LIV][RK]", 0.75, "[R/K]-X-S/T-Φ-[R/K]", CellSignal::SecondMessenger),
    ("PKD", r"L.R..([ST])", 0.70, "L-X-R-X-X-S/T", CellSignal::SecondMessenger),
    ("LKB1", r"[LIVM][RK].([ST]).{2}[LIVM]", 0.70, "Φ-[R/K]-X-S/T-X-X-Φ", CellSignal::EnergyHomeostasis),
    // Proline-directed (MAPK & cell cycle)
    ("CDK", r"([ST])P.[RK]", 0.80, "S/T-P-X-[K/R]", CellSignal::CellCycleMitosis),
    ("Erk", r"[PLV].([ST])P", 0.70, "[P/L/V]-X-S/T-P", CellSignal::StressResponse),
    ("JNK", r"P.([ST])P", 0.75, "P-X-S/T-P", CellSignal::StressResponse),
    ("p38&MAPK", r"[LIVMFY].([ST])P", 0.60, "Φ-X-S/T-P", CellSignal::StressResponse),
    ("mTOR", r"([ST])P[FLIV]", 0.65, "S/T-P-Φ", CellSignal::GrowthMetabolism),
    ("GSK-3beta", r"([ST]).{3}[ST]", 0.30, "S/T-X-X-X-S/T (priming required)", CellSignal::GrowthMetabolism),
    ("DYRK1A", r"R..([ST])P", 0.75, "R-X-X-S/T-P", CellSignal::MultiFunctional),
    ("HIPK2", r"([ST])P.K", 0.80, "S/T-P-X-K", CellSignal::DnaDamageResponse),
    ("BUB1", r"([ST])P.R", 0.70, "S/T-P-X-R", CellSignal::CellCycleMitosis),
    // Acidophilic & DNA damage
    ("CK2", r"([ST])[^P].?[DE]{2,3}", 0.75, "S/T-!P-X(1-2)-[D/E](2-3)", CellSignal::MultiFunctional),
    ("CK1", r"([DE]{1,2}.{1,2}([ST]))|(([ST]).{2,3}([ST]))", 0.45, "[D/E](1-2)-X(1-2)-S/T | S/T-X(2-3)-S/T", CellSignal::MultiFunctional),
    ("PLK1", r"[DE].([ST])[LIVMF]", 0.75, "[D/E]-X-S/T-Φ", CellSignal::CellCycleMitosis),
    ("ATM&ATR", r"([ST])Q", 0.55, "S/T-Q", CellSignal::DnaDamageResponse),
    ("DNA-PK", r"([ST])Q[DE]", 0.80, "S/T-Q-[D/E]", CellSignal::DnaDamageResponse),
    ("IKK", r"[DE].{1,2}([ST])G.([ST])", 0.80, "[D/E]-X(1-2)-S-G-X-S", CellSignal::InflammationImmunity),
    // Other key kinases
    ("CaMK2", r"[RK]..([ST])([LIVMF])?", 0.55, "[R/K]-X-X-S/T-Φ? (Φ optional)", CellSignal::SecondMessenger),
    ("Aurora A", r"[RK].([ST])[LIVMF]", 0.65, "[R/K]-X-S/T-Φ", CellSignal::CellCycleMitosis),
    ("Aurora B", r"[RK]R.([ST])[LIVMF]", 0.75, "[R/K]-R-X-S/T-Φ", CellSignal::CellCycleMitosis),
    ("Chk1", r"[LIVMF]R..([ST])", 0.65, "Φ-R-X-X-S/T", CellSignal::DnaDamageResponse),
    ("Chk2", r"R..([ST])[LIVMF]", 0.65, "R-X-X-S/T-Φ", CellSignal::DnaDamageResponse),
    ("NEK2", r"[LIVMF]R..([ST])", 0.65, "Φ-R-X-X-S/T", CellSignal::CellCycleMitosis),
    ("MK2", r"[LIVM].R.([ST])", 0.65, "[L/I/V/M]-X-R-X-S/T", CellSignal::StressResponse),
];

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Lookup key for kinase names: whitespace removed, lowercase.
pub fn normalize_kinase_key(name: &str) -> String {
    WHITESPACE_RE.replace_all(name, "").to_lowercase()
}

#[derive(Debug, Clone)]
pub struct MotifDb {
    entries: Vec<MotifEntry>,
    signals: HashMap<String, CellSignal>,
}

impl MotifDb {
    pub fn builtin() -> Result<Self> {
        let mut entries = Vec::with_capacity(BUILTIN_MOTIFS.len());
        for (kinase, pattern, specificity, description, signal) in BUILTIN_MOTIFS {
            entries.push(MotifEntry {
                kinase: (*kinase).to_string(),
                pattern: Regex::new(pattern)?,
                specificity: *specificity,
                description: (*description).to_string(),
                signal: Some(*signal),
            });
        }
        Ok(Self::from_entries(entries))
    }

    /// Built-in motifs followed by `specs`, in order.
    pub fn with_custom(specs: &[MotifSpec]) -> Result<Self> {
        let mut db = Self::builtin()?;
        for spec in specs {
            let entry = Self::compile_spec(spec)?;
            if let Some(signal) = entry.signal {
                db.signals
                    .entry(normalize_kinase_key(&entry.kinase))
                    .or_insert(signal);
            }
            tracing::debug!(
                "Registered custom motif {} ({}) with specificity {:.2}",
                entry.kinase,
                entry.pattern.as_str(),
                entry.specificity
            );
            db.entries.push(entry);
        }
        Ok(db)
    }

    fn compile_spec(spec: &MotifSpec) -> Result<MotifEntry> {
        crate::utils::validation::validate_non_empty_string("motifs.kinase", &spec.kinase)?;
        crate::utils::validation::validate_range("motifs.specificity", spec.specificity, 0.0, 1.0)?;

        let signal = match spec.signal.as_deref() {
            None => None,
            Some(label) => Some(CellSignal::from_label(label).ok_or_else(|| {
                PhosphomError::InvalidConfigValueError {
                    field: "motifs.signal".to_string(),
                    value: label.to_string(),
                    reason: "Unknown cell signal category".to_string(),
                }
            })?),
        };

        Ok(MotifEntry {
            kinase: spec.kinase.trim().to_string(),
            pattern: Regex::new(&spec.pattern)?,
            specificity: spec.specificity,
            description: spec.description.clone().unwrap_or_else(|| spec.pattern.clone()),
            signal,
        })
    }

    fn from_entries(entries: Vec<MotifEntry>) -> Self {
        let signals = entries
            .iter()
            .filter_map(|e| e.signal.map(|s| (normalize_kinase_key(&e.kinase), s)))
            .collect();
        Self { entries, signals }
    }

    pub fn entries(&self) -> &[MotifEntry] {
        &self.entries
    }

    /// Kinase names in first-seen order, without duplicates.
    pub fn kinase_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        for entry in &self.entries {
            if !keys.contains(&entry.kinase) {
                keys.push(entry.kinase.clone());
            }
        }
        keys
    }

    pub fn cell_signal(&self, kinase: &str) -> Option<CellSignal> {
        self.signals.get(&normalize_kinase_key(kinase)).copied()
    }

    /// Kinases whose motif occurs in the window around the 0-based `index`.
    ///
    /// A kinase matched by several entries keeps its best score. Results are
    /// ordered by confidence, highest first; ties keep database order.
    pub fn identify_kinases(&self, seq: &str, index: usize, min_confidence: f64) -> Vec<KinaseHit> {
        let residues: Vec<char> = seq.chars().collect();
        self.identify_kinases_in(&residues, index, min_confidence)
    }

    /// Same as [`identify_kinases`](Self::identify_kinases) over residues
    /// that were already split, for callers probing many sites of one sequence.
    pub fn identify_kinases_in(
        &self,
        residues: &[char],
        index: usize,
        min_confidence: f64,
    ) -> Vec<KinaseHit> {
        let end = residues.len().min(index.saturating_add(WINDOW_HALF + 1));
        let start = index.saturating_sub(WINDOW_HALF).min(end);
        let fragment: String = residues[start..end].iter().collect();

        let mut hits: Vec<KinaseHit> = Vec::new();
        for entry in &self.entries {
            if entry.specificity < min_confidence || !entry.pattern.is_match(&fragment) {
                continue;
            }
            match hits.iter_mut().find(|h| h.kinase == entry.kinase) {
                Some(existing) => {
                    if entry.specificity > existing.confidence {
                        existing.confidence = entry.specificity;
                    }
                }
                None => hits.push(KinaseHit {
                    kinase: entry.kinase.clone(),
                    confidence: entry.specificity,
                }),
            }
        }

        hits.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        hits
    }

    /// Every S/T/Y residue of `seq` with at least one kinase hit.
    pub fn scan_sequence(&self, seq: &str, min_confidence: f64) -> Vec<SiteHits> {
        let residues: Vec<char> = seq.chars().collect();
        residues
            .iter()
            .enumerate()
            .filter(|(_, residue)| matches!(residue, 'S' | 'T' | 'Y'))
            .filter_map(|(idx, &residue)| {
                let hits = self.identify_kinases_in(&residues, idx, min_confidence);
                (!hits.is_empty()).then(|| SiteHits {
                    position: idx + 1,
                    residue,
                    hits,
                })
            })
            .collect()
    }
}
