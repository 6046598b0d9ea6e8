//! Sequence and alignment readers.
use anyhow::{bail, Context};
use std::path::Path;

/// Read every record of a FASTA file. Files without `>` headers are read as one
/// sequence per non-empty line.
pub fn read_sequences(path: &Path) -> anyhow::Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(parse_records(&text))
}

/// Read one alignment and keep its first `num_seqs` rows. a3m insertions (lowercase
/// residues and `.`) are removed so every row spans the query columns.
pub fn read_msa(path: &Path, num_seqs: usize) -> anyhow::Result<Vec<String>> {
    let rows: Vec<String> = read_sequences(path)?
        .into_iter()
        .take(num_seqs)
        .map(|row| {
            row.chars()
                .filter(|c| !c.is_ascii_lowercase() && *c != '.')
                .collect()
        })
        .collect();
    if rows.is_empty() {
        bail!("No sequences in {}", path.display());
    }
    Ok(rows)
}

fn parse_records(text: &str) -> Vec<String> {
    let lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    if !text.trim_start().starts_with('>') {
        return lines.map(String::from).collect();
    }

    let mut records = Vec::new();
    let mut current: Option<String> = None;
    for line in lines {
        if line.starts_with('>') {
            records.extend(current.replace(String::new()));
        } else if let Some(seq) = current.as_mut() {
            seq.push_str(line);
        }
    }
    records.extend(current);
    records
}
