//! One-kinase-per-row normalisation and the cell-signal summary tables.

use crate::core::motif_db::{CellSignal, MotifDb, TOP_KINASES_N};
use crate::domain::model::{
    CellSignalTables, GeneSignalRow, MotifRecord, NormalizedRecord, OverallSignalRow, TopKinaseRow,
};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Splits each row's kinase list into separate rows.
///
/// Confidences are paired by position; a shorter confidence list is padded
/// with empty values. The first row for a given (motif, kinase) wins.
pub fn normalize_kinase_rows(rows: &[MotifRecord]) -> Vec<NormalizedRecord> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut normalized = Vec::new();

    for row in rows {
        let confidences: Vec<&str> = row.confidences.split(',').map(str::trim).collect();
        for (i, kinase) in row.kinases.split(',').map(str::trim).enumerate() {
            if kinase.is_empty() {
                continue;
            }
            if !seen.insert((row.motif.clone(), kinase.to_string())) {
                continue;
            }
            normalized.push(NormalizedRecord {
                gene: row.gene.clone(),
                motif: row.motif.clone(),
                kinase: kinase.to_string(),
                confidence: confidences.get(i).copied().unwrap_or_default().to_string(),
            });
        }
    }

    tracing::debug!("Normalised {} rows into {} kinase rows", rows.len(), normalized.len());
    normalized
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn joined(items: &BTreeSet<&str>) -> String {
    items.iter().copied().collect::<Vec<_>>().join(", ")
}

/// Gene, overall and top-kinase views of the predictions, by cell-signal category.
pub fn build_cell_signal_tables(rows: &[NormalizedRecord], db: &MotifDb) -> CellSignalTables {
    let mut seen: HashSet<(&str, &str, &str)> = HashSet::new();
    let mut tagged: Vec<(&NormalizedRecord, CellSignal)> = Vec::new();
    for row in rows {
        let Some(signal) = db.cell_signal(&row.kinase) else {
            continue;
        };
        if seen.insert((row.gene.as_str(), row.motif.as_str(), row.kinase.as_str())) {
            tagged.push((row, signal));
        }
    }

    // gene summary
    let mut by_gene: BTreeMap<(&str, CellSignal), (BTreeSet<&str>, BTreeSet<&str>)> =
        BTreeMap::new();
    for (row, signal) in &tagged {
        let (motifs, kinases) = by_gene.entry((row.gene.as_str(), *signal)).or_default();
        motifs.insert(&row.motif);
        kinases.insert(&row.kinase);
    }
    let genes = by_gene
        .into_iter()
        .map(|((gene, signal), (motifs, kinases))| GeneSignalRow {
            gene: gene.to_string(),
            signal: signal.label().to_string(),
            count: motifs.len(),
            motifs: joined(&motifs),
            kinases: joined(&kinases),
        })
        .collect();

    // overall
    let mut motifs_by_signal: HashMap<CellSignal, HashSet<&str>> = HashMap::new();
    for (row, signal) in &tagged {
        motifs_by_signal.entry(*signal).or_default().insert(&row.motif);
    }
    let counts: Vec<(CellSignal, usize)> = CellSignal::ALL
        .iter()
        .map(|s| (*s, motifs_by_signal.get(s).map_or(0, HashSet::len)))
        .collect();
    let total: usize = counts.iter().map(|(_, c)| c).sum();
    let overall = counts
        .into_iter()
        .map(|(signal, count)| OverallSignalRow {
            signal: signal.label().to_string(),
            count,
            percent: if total == 0 {
                0.0
            } else {
                round2(count as f64 / total as f64 * 100.0)
            },
        })
        .collect();

    // top kinases
    let mut kinase_motifs: BTreeMap<(CellSignal, &str), HashSet<&str>> = BTreeMap::new();
    for (row, signal) in &tagged {
        kinase_motifs
            .entry((*signal, row.kinase.as_str()))
            .or_default()
            .insert(&row.motif);
    }
    let mut top_kinases = Vec::new();
    for signal in CellSignal::ALL {
        let mut ranked: Vec<(&str, usize)> = kinase_motifs
            .iter()
            .filter(|((s, _), _)| *s == signal)
            .map(|((_, kinase), motifs)| (*kinase, motifs.len()))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        top_kinases.extend(ranked.into_iter().take(TOP_KINASES_N).enumerate().map(
            |(i, (kinase, unique_motifs))| TopKinaseRow {
                signal: signal.label().to_string(),
                rank: i + 1,
                kinase: kinase.to_string(),
                unique_motifs,
            },
        ));
    }

    CellSignalTables {
        genes,
        overall,
        top_kinases,
    }
}
