//! Scoring predictions against PhosphoSitePlus substrate windows.

use crate::core::reference::{normalize_name_for_matching, ReferenceData};
use crate::domain::model::{AccuracySummary, F1Metrics, NormalizedRecord, ValidatedRecord};
use std::collections::{BTreeSet, HashMap};

/// Shortest sequence allowed to match by containment.
const MIN_MATCH_LENGTH: usize = 7;

fn sequences_overlap(motif: &str, site: &str) -> bool {
    (motif.len() >= MIN_MATCH_LENGTH && site.contains(motif))
        || (site.len() >= MIN_MATCH_LENGTH && motif.contains(site))
}

/// Reference kinases with a substrate window overlapping `motif`, in reference order.
pub fn kinases_for_motif<'a>(motif: &str, reference: &'a ReferenceData) -> Vec<&'a str> {
    reference
        .kinases()
        .filter(|(_, sites)| sites.iter().any(|s| sequences_overlap(motif, s)))
        .map(|(kinase, _)| kinase)
        .collect()
}

/// Comma-separated kinase list as normalised names.
fn split_kinases(list: &str) -> BTreeSet<String> {
    list.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(normalize_name_for_matching)
        .collect()
}

/// Marks each row as found in PSP and/or correctly predicted.
pub fn validate_predictions(
    rows: &[NormalizedRecord],
    reference: &ReferenceData,
) -> (Vec<ValidatedRecord>, AccuracySummary) {
    let mut lookup: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut validated = Vec::with_capacity(rows.len());

    for row in rows {
        let motif = row.motif.trim().to_uppercase();
        let found = lookup
            .entry(row.motif.as_str())
            .or_insert_with(|| kinases_for_motif(&motif, reference));

        let predicted = split_kinases(&row.kinase);
        let correct = found
            .iter()
            .any(|k| predicted.contains(&normalize_name_for_matching(k)));

        validated.push(ValidatedRecord {
            gene: row.gene.clone(),
            motif: row.motif.clone(),
            kinase: row.kinase.clone(),
            confidence: row.confidence.clone(),
            in_psp: !found.is_empty(),
            correct,
            actual_kinases: found.join(", "),
        });
    }

    let matched_psp = validated.iter().filter(|r| r.in_psp).count();
    let correct = validated.iter().filter(|r| r.correct).count();
    let acc_percent = if matched_psp > 0 {
        correct as f64 / matched_psp as f64 * 100.0
    } else {
        0.0
    };

    let summary = AccuracySummary {
        total_motifs: validated.len(),
        matched_psp,
        correct,
        acc_percent,
    };
    tracing::info!(
        "Validation: {}/{} rows found in PSP, {} correct ({:.2}%)",
        summary.matched_psp,
        summary.total_motifs,
        summary.correct,
        summary.acc_percent
    );
    (validated, summary)
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Micro precision, recall and F1 over motifs.
///
/// Each motif contributes its PSP kinases (from its first row) as truth and
/// the union of its predicted kinases as the prediction set.
pub fn calculate_f1_metrics(rows: &[ValidatedRecord]) -> F1Metrics {
    let mut motifs: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, (BTreeSet<String>, BTreeSet<String>)> = HashMap::new();

    for row in rows {
        let (_, predicted) = groups.entry(row.motif.as_str()).or_insert_with(|| {
            motifs.push(&row.motif);
            (split_kinases(&row.actual_kinases), BTreeSet::new())
        });
        predicted.extend(split_kinases(&row.kinase));
    }

    let (mut tp, mut fp, mut fn_) = (0, 0, 0);
    for motif in motifs {
        let Some((actual, predicted)) = groups.get(motif) else {
            continue;
        };
        tp += predicted.intersection(actual).count();
        fp += predicted.difference(actual).count();
        fn_ += actual.difference(predicted).count();
    }

    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1_score = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    tracing::info!(
        "F1: precision {:.4}, recall {:.4}, f1 {:.4} (tp {}, fp {}, fn {})",
        precision,
        recall,
        f1_score,
        tp,
        fp,
        fn_
    );
    F1Metrics {
        precision,
        recall,
        f1_score,
        tp,
        fp,
        fn_,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(gene: &str, motif: &str, kinase: &str) -> NormalizedRecord {
        NormalizedRecord {
            gene: gene.to_string(),
            motif: motif.to_string(),
            kinase: kinase.to_string(),
            confidence: "0.60".to_string(),
        }
    }

    fn reference() -> ReferenceData {
        ReferenceData::new(vec![
            ("PKA".to_string(), vec!["GGAAAARRASLAAAA".to_string()]),
            ("CK2".to_string(), vec!["RRASLAAGG".to_string()]),
            ("p38&MAPK".to_string(), vec!["ASP".to_string(), "LLTSPVV".to_string()]),
        ])
    }

    #[test]
    fn test_containment_rules() {
        assert!(sequences_overlap("RRASLAA", "GGAAAARRASLAAAA"));
        assert!(sequences_overlap("AAAARRASLAAAAGG", "RRASLAA"));
        // too short either way
        assert!(!sequences_overlap("RASL", "GGAAAARRASLAAAA"));
        assert!(!sequences_overlap("GGGASPGGG", "ASP"));
    }

    #[test]
    fn test_validate_predictions() {
        let rows = vec![
            row("Syn1", "RRASLAA", "PKA"),
            row("Syn1", "RRASLAA", "RSK"),
            row("Mapt", "LLTSPVVK", "p38 MAPK"),
            row("Mapt", "WWWWWWW", "PKA"),
        ];

        let (validated, summary) = validate_predictions(&rows, &reference());

        assert!(validated[0].in_psp && validated[0].correct);
        assert_eq!(validated[0].actual_kinases, "PKA, CK2");
        assert!(validated[1].in_psp && !validated[1].correct);
        assert!(validated[2].in_psp && validated[2].correct);
        assert_eq!(validated[2].actual_kinases, "p38&MAPK");
        assert!(!validated[3].in_psp && !validated[3].correct);
        assert_eq!(validated[3].actual_kinases, "");

        assert_eq!(summary.total_motifs, 4);
        assert_eq!(summary.matched_psp, 3);
        assert_eq!(summary.correct, 2);
        assert!((summary.acc_percent - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_accuracy_without_matches_is_zero() {
        let (_, summary) = validate_predictions(&[row("X", "WWWWWWW", "PKA")], &reference());
        assert_eq!(summary.matched_psp, 0);
        assert_eq!(summary.acc_percent, 0.0);
    }

    #[test]
    fn test_f1_micro_average() {
        let rows = vec![
            row("Syn1", "RRASLAA", "PKA"),
            row("Syn1", "RRASLAA", "RSK"),
            row("Syn1", "RRASLAA", "CaMK2"),
            row("Mapt", "WWWWWWW", "PKA"),
        ];
        let (validated, _) = validate_predictions(&rows, &reference());

        let f1 = calculate_f1_metrics(&validated);

        // RRASLAA: {PKA, CK2} vs {PKA, RSK, CAMK2}; WWWWWWW: {} vs {PKA}
        assert_eq!((f1.tp, f1.fp, f1.fn_), (1, 3, 1));
        assert!((f1.precision - 0.25).abs() < 1e-9);
        assert!((f1.recall - 0.5).abs() < 1e-9);
        assert!((f1.f1_score - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_kinase_lists_split_on_commas_only() {
        let names = split_kinases("PKA, p38 MAPK,,CK2;AKT");
        let expected: BTreeSet<String> = ["PKA", "P38MAPK", "CK2;AKT"]
            .iter()
            .map(|k| k.to_string())
            .collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_f1_empty_is_zero() {
        let f1 = calculate_f1_metrics(&[]);
        assert_eq!(f1, F1Metrics::default());
    }
}
