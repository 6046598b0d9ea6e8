//! BLOSUM substitution matrices.
//!
//! Parses the NCBI text format and re-indexes the scores into tokenizer order so the
//! matrix can seed a biologically biased transition schedule.
use crate::constants::BLOSUM_FALLBACK;
use crate::error::{DmsError, Result};
use candle_core::{Device, Tensor, D};
use std::collections::HashMap;
use std::path::Path;

const BLOSUM62: &str = include_str!("../data/blosum62.mat");

#[derive(Debug, Clone)]
pub struct BlosumMatrix {
    alphabet: Vec<char>,
    scores: Vec<f64>,
}

impl BlosumMatrix {
    /// Parse an NCBI-format matrix and index it by `alphabet`.
    ///
    /// Symbols the file does not list take the scores of `X`.
    pub fn parse(text: &str, alphabet: &str) -> Result<Self> {
        let mut lines = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'));

        let header = lines
            .next()
            .ok_or_else(|| DmsError::Blosum("missing header row".to_string()))?;
        let columns = header
            .split_whitespace()
            .map(single_char)
            .collect::<Result<Vec<_>>>()?;

        let mut table: HashMap<(char, char), f64> = HashMap::new();
        for line in lines {
            let mut fields = line.split_whitespace();
            let row = match fields.next() {
                Some(f) => single_char(f)?,
                None => continue,
            };
            let values = fields
                .map(|v| {
                    v.parse::<f64>()
                        .map_err(|e| DmsError::Blosum(format!("bad score '{}': {}", v, e)))
                })
                .collect::<Result<Vec<_>>>()?;
            if values.len() != columns.len() {
                return Err(DmsError::Blosum(format!(
                    "row '{}' has {} scores, header has {} columns",
                    row,
                    values.len(),
                    columns.len()
                )));
            }
            for (&col, value) in columns.iter().zip(values) {
                table.insert((row, col), value);
            }
        }

        let known = |c: char| {
            if columns.contains(&c) {
                Ok(c)
            } else if columns.contains(&BLOSUM_FALLBACK) {
                Ok(BLOSUM_FALLBACK)
            } else {
                Err(DmsError::Blosum(format!(
                    "symbol '{}' missing and no '{}' fallback",
                    c, BLOSUM_FALLBACK
                )))
            }
        };

        let alphabet: Vec<char> = alphabet.chars().collect();
        let mut scores = Vec::with_capacity(alphabet.len() * alphabet.len());
        for &a in &alphabet {
            let a = known(a)?;
            for &b in &alphabet {
                let b = known(b)?;
                let score = table
                    .get(&(a, b))
                    .ok_or_else(|| DmsError::Blosum(format!("no score for ({}, {})", a, b)))?;
                scores.push(*score);
            }
        }

        Ok(Self { alphabet, scores })
    }

    /// The embedded BLOSUM62 matrix.
    pub fn blosum62(alphabet: &str) -> Result<Self> {
        Self::parse(BLOSUM62, alphabet)
    }

    pub fn from_file<P: AsRef<Path>>(path: P, alphabet: &str) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text, alphabet)
    }

    pub fn size(&self) -> usize {
        self.alphabet.len()
    }

    pub fn score(&self, a: char, b: char) -> Option<f64> {
        let i = self.alphabet.iter().position(|&c| c == a)?;
        let j = self.alphabet.iter().position(|&c| c == b)?;
        Some(self.scores[i * self.size() + j])
    }

    pub fn to_tensor(&self, device: &Device) -> Result<Tensor> {
        let k = self.size();
        Ok(Tensor::from_slice(&self.scores, (k, k), device)?)
    }

    /// Row-wise softmax of the scores: a row-stochastic substitution kernel.
    pub fn transition_probabilities(&self, device: &Device) -> Result<Tensor> {
        let scores = self.to_tensor(device)?;
        Ok(candle_nn::ops::softmax(&scores, D::Minus1)?)
    }
}

fn single_char(field: &str) -> Result<char> {
    let mut chars = field.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(DmsError::Blosum(format!(
            "expected a single symbol, got '{}'",
            field
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::MSA_AAS;

    #[test]
    fn test_blosum62_scores() -> Result<()> {
        let m = BlosumMatrix::blosum62(MSA_AAS)?;
        assert_eq!(m.size(), 27);
        assert_eq!(m.score('A', 'A'), Some(4.0));
        assert_eq!(m.score('W', 'W'), Some(11.0));
        assert_eq!(m.score('D', 'E'), Some(2.0));
        assert_eq!(m.score('E', 'D'), Some(2.0));
        // J, O, U and gap are not in the file
        assert_eq!(m.score('J', 'A'), m.score('X', 'A'));
        assert_eq!(m.score('-', '-'), Some(-1.0));
        Ok(())
    }

    #[test]
    fn test_transition_probabilities_rows_sum_to_one() -> Result<()> {
        let m = BlosumMatrix::blosum62(MSA_AAS)?;
        let q = m.transition_probabilities(&Device::Cpu)?;
        assert_eq!(q.dims(), &[27, 27]);
        for row in q.to_vec2::<f64>()? {
            let total: f64 = row.iter().sum();
            assert!((total - 1.0).abs() < 1e-9);
            assert!(row.iter().all(|&p| p > 0.0));
        }
        Ok(())
    }

    #[test]
    fn test_parse_errors() {
        let ragged = "   A  R\nA  4 -1\nR -1\n";
        assert!(matches!(
            BlosumMatrix::parse(ragged, "AR"),
            Err(DmsError::Blosum(_))
        ));
        let no_fallback = "   A  R\nA  4 -1\nR -1  5\n";
        assert!(matches!(
            BlosumMatrix::parse(no_fallback, "ARN"),
            Err(DmsError::Blosum(_))
        ));
        let small = BlosumMatrix::parse(no_fallback, "RA").unwrap();
        assert_eq!(small.score('R', 'R'), Some(5.0));
        assert_eq!(small.score('R', 'A'), Some(-1.0));
    }
}
