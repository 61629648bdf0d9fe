use clap::Parser;
use phosphom::utils::{logger, validation};
use phosphom::{MotifDb, PhosphomError};
use serde::Serialize;
use std::io::Write;

#[derive(Parser, Debug)]
#[command(name = "motif-scan")]
#[command(about = "Scan protein sequences for kinase motifs and print per-site hits as CSV")]
struct Args {
    /// FASTA or plain sequence file
    input: Option<String>,

    /// Sequence given inline instead of a file
    #[arg(short, long, conflicts_with = "input")]
    sequence: Option<String>,

    /// Minimum motif specificity
    #[arg(short = 'c', long = "confidence", default_value_t = 0.0)]
    min_confidence: f64,

    /// Write CSV here instead of stdout
    #[arg(short, long)]
    output: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Serialize)]
struct ScanRow<'a> {
    #[serde(rename = "Sequence")]
    sequence_id: &'a str,
    #[serde(rename = "Position")]
    position: usize,
    #[serde(rename = "Residue")]
    residue: char,
    #[serde(rename = "Kinase Name")]
    kinase: &'a str,
    #[serde(rename = "Confidence")]
    confidence: String,
}

/// `(id, residues)` pairs. Text without a `>` header is one unnamed sequence.
fn parse_sequences(text: &str) -> Vec<(String, String)> {
    let mut sequences: Vec<(String, String)> = Vec::new();
    for line in text.lines().map(str::trim) {
        if let Some(header) = line.strip_prefix('>') {
            let id = header.split_whitespace().next().unwrap_or("").to_string();
            sequences.push((id, String::new()));
            continue;
        }
        if line.is_empty() {
            continue;
        }
        if sequences.is_empty() {
            sequences.push(("sequence".to_string(), String::new()));
        }
        if let Some((_, residues)) = sequences.last_mut() {
            residues.extend(
                line.chars()
                    .filter(char::is_ascii_alphabetic)
                    .map(|c| c.to_ascii_uppercase()),
            );
        }
    }
    sequences.retain(|(_, residues)| !residues.is_empty());
    sequences
}

fn run(args: &Args) -> phosphom::Result<usize> {
    validation::validate_range("confidence", args.min_confidence, 0.0, 1.0)?;

    let text = match (&args.sequence, &args.input) {
        (Some(sequence), _) => sequence.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)?,
        (None, None) => {
            return Err(PhosphomError::MissingConfigError {
                field: "input or --sequence".to_string(),
            })
        }
    };

    let sequences = parse_sequences(&text);
    tracing::info!("Scanning {} sequences", sequences.len());

    let db = MotifDb::builtin()?;
    let sink: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(std::fs::File::create(path)?),
        None => Box::new(std::io::stdout().lock()),
    };
    let mut writer = csv::Writer::from_writer(sink);

    let mut sites = 0;
    for (id, residues) in &sequences {
        let hits = db.scan_sequence(residues, args.min_confidence);
        tracing::debug!("{}: {} residues, {} sites with hits", id, residues.len(), hits.len());
        sites += hits.len();
        for site in &hits {
            for hit in &site.hits {
                writer.serialize(ScanRow {
                    sequence_id: id,
                    position: site.position,
                    residue: site.residue,
                    kinase: &hit.kinase,
                    confidence: format!("{:.2}", hit.confidence),
                })?;
            }
        }
    }
    writer.flush()?;
    Ok(sites)
}

fn main() {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    match run(&args) {
        Ok(sites) => tracing::info!("Scan complete: {} sites with kinase hits", sites),
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
            std::process::exit(e.exit_code());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fasta() {
        let text = ">sp|P17600|SYN1 Synapsin-1\nMNYLRRR\nLSDSN\n\n>second\nrrasl\n>empty\n";
        let sequences = parse_sequences(text);

        assert_eq!(sequences.len(), 2);
        assert_eq!(sequences[0], ("sp|P17600|SYN1".to_string(), "MNYLRRRLSDSN".to_string()));
        assert_eq!(sequences[1], ("second".to_string(), "RRASL".to_string()));
    }

    #[test]
    fn test_parse_plain_sequence() {
        let sequences = parse_sequences("aaaa rrasl\n aaaa 12");
        assert_eq!(sequences, vec![("sequence".to_string(), "AAAARRASLAAAA".to_string())]);
    }
}
