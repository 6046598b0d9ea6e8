//! A protein tokenizer module for sequences and multiple sequence alignments.
//!
//! The `Vocabulary` trait is the contract every collater depends on: tokenization,
//! the special token ids and the number of diffusing categories `K` used for one-hot
//! encoding. `ProteinTokenizer` implements it over the MSA alphabet with a
//! character-level model from the `tokenizers` crate.
use crate::constants::{GAP, MASK, MSA_AAS, MSA_ALPHABET, MSA_PAD, SEQUENCE_AAS, START, STOP};
use crate::error::{DmsError, Result};
use candle_core::{Device, Tensor};
use candle_nn::encoding::one_hot;
use itertools::Itertools;
use tokenizers::models::bpe::BPE;
use tokenizers::Tokenizer;

pub trait Vocabulary: Send + Sync {
    /// Map a raw sequence to token ids.
    fn tokenize(&self, sequence: &str) -> Result<Vec<u32>>;

    /// Map token ids back to a string.
    fn untokenize(&self, tokens: &[u32]) -> Result<String>;

    fn mask_id(&self) -> u32;
    fn pad_id(&self) -> u32;
    fn gap_id(&self) -> u32;

    /// Number of one-hot categories (`K`).
    fn num_categories(&self) -> usize;

    /// Tokenize every row of an alignment. All rows must share one length.
    fn tokenize_msa<S: AsRef<str>>(&self, msa: &[S]) -> Result<Vec<Vec<u32>>>
    where
        Self: Sized,
    {
        let rows = msa
            .iter()
            .map(|s| self.tokenize(s.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        if let Some(first) = rows.first() {
            let expected = first.len();
            if let Some((row, r)) = rows.iter().find_position(|r| r.len() != expected) {
                return Err(DmsError::UnalignedMsa {
                    row,
                    expected,
                    actual: r.len(),
                });
            }
        }
        Ok(rows)
    }

    /// One-hot encode `tokens` as an `F64` tensor of shape `[tokens.len(), K]`.
    fn one_hot(&self, tokens: &[u32], device: &Device) -> Result<Tensor> {
        let categories = self.num_categories();
        if let Some(&id) = tokens.iter().find(|&&id| id as usize >= categories) {
            return Err(DmsError::TokenOutOfRange { id, categories });
        }
        let indices = Tensor::from_slice(tokens, tokens.len(), device)?;
        Ok(one_hot(indices, categories, 1f64, 0f64)?)
    }
}

pub struct ProteinTokenizer {
    tokenizer: Tokenizer,
    categories: usize,
    pad_token_id: u32,
    mask_token_id: u32,
    gap_token_id: u32,
    start_token_id: u32,
    stop_token_id: u32,
}

impl ProteinTokenizer {
    /// Build a tokenizer over `alphabet` where the first `categories` symbols diffuse.
    pub fn new(alphabet: &str, categories: usize) -> Result<Self> {
        let size = alphabet.chars().count();
        if categories == 0 || categories > size {
            return Err(DmsError::Config(format!(
                "categories ({}) must be in 1..={} for this alphabet",
                categories, size
            )));
        }
        if !alphabet.chars().all_unique() {
            return Err(DmsError::Config(format!(
                "alphabet '{}' contains duplicate symbols",
                alphabet
            )));
        }

        // One vocabulary entry per character and no merges: the BPE model
        // then splits every word into single-character tokens.
        let vocab: tokenizers::models::bpe::Vocab = alphabet
            .chars()
            .enumerate()
            .map(|(i, c)| (c.to_string(), i as u32))
            .collect();
        let bpe = BPE::builder()
            .vocab_and_merges(vocab, vec![])
            .build()
            .map_err(|e| DmsError::Tokenizer(format!("Failed to build model: {}", e)))?;
        let tokenizer = Tokenizer::new(bpe);

        let special = |c: char| {
            tokenizer
                .token_to_id(&c.to_string())
                .ok_or_else(|| DmsError::Tokenizer(format!("Missing special token '{}'", c)))
        };
        let pad_token_id = special(MSA_PAD)?;
        let mask_token_id = special(MASK)?;
        let gap_token_id = special(GAP)?;
        let start_token_id = special(START)?;
        let stop_token_id = special(STOP)?;

        Ok(Self {
            tokenizer,
            categories,
            pad_token_id,
            mask_token_id,
            gap_token_id,
            start_token_id,
            stop_token_id,
        })
    }

    /// Residues and gap diffuse (K = 27).
    pub fn msa() -> Result<Self> {
        Self::new(MSA_ALPHABET, MSA_AAS.len())
    }

    /// Residues only; gaps are not a diffusion category for single sequences (K = 26).
    pub fn sequences() -> Result<Self> {
        Self::new(MSA_ALPHABET, SEQUENCE_AAS.len())
    }

    pub fn len(&self) -> usize {
        self.tokenizer.get_vocab_size(true)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn start_id(&self) -> u32 {
        self.start_token_id
    }

    pub fn stop_id(&self) -> u32 {
        self.stop_token_id
    }

    pub fn token_to_id(&self, token: char) -> Option<u32> {
        self.tokenizer.token_to_id(&token.to_string())
    }

    /// The diffusing symbols in id order.
    pub fn categories(&self) -> String {
        (0..self.categories as u32)
            .filter_map(|id| self.tokenizer.id_to_token(id))
            .collect()
    }
}

impl Vocabulary for ProteinTokenizer {
    fn tokenize(&self, sequence: &str) -> Result<Vec<u32>> {
        if sequence.is_empty() {
            return Ok(Vec::new());
        }
        // The model drops characters it has no entry for; reject them instead.
        if let Some(c) = sequence.chars().find(|&c| self.token_to_id(c).is_none()) {
            return Err(DmsError::UnknownResidue(c));
        }
        let encoding = self
            .tokenizer
            .encode(sequence, false)
            .map_err(|e| DmsError::Tokenizer(format!("Failed to encode text: {}", e)))?;
        Ok(encoding.get_ids().to_vec())
    }

    fn untokenize(&self, tokens: &[u32]) -> Result<String> {
        tokens
            .iter()
            .map(|&id| {
                self.tokenizer
                    .id_to_token(id)
                    .ok_or(DmsError::TokenOutOfRange {
                        id,
                        categories: self.len(),
                    })
            })
            .collect()
    }

    fn mask_id(&self) -> u32 {
        self.mask_token_id
    }

    fn pad_id(&self) -> u32 {
        self.pad_token_id
    }

    fn gap_id(&self) -> u32 {
        self.gap_token_id
    }

    fn num_categories(&self) -> usize {
        self.categories
    }
}
