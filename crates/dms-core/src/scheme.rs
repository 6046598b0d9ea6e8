//! Selecting a corruption scheme and the matching collater.
//!
//! A `DiffusionScheme` is resolved once from a [`DiffusionConfig`]; the transition
//! schemes own their precomputed schedule, which every collater built from the scheme
//! then shares.
use crate::batch::{MaskedBatch, MsaMaskedBatch, TransitionBatch};
use crate::blosum::BlosumMatrix;
use crate::collaters::{D3PMCollater, D3PMMsaCollater, MsaAbsorbingCollater, OAMaskCollater};
use crate::config::{DiffusionConfig, MaskScheme};
use crate::constants::MSA_ALPHABET;
use crate::error::{DmsError, Result};
use crate::schedule::{BetaSchedule, TransitionSchedule};
use crate::tokenizer::Vocabulary;
use candle_core::{Device, Tensor};
use rand::Rng;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum DiffusionScheme {
    AutoregressiveMask,
    BlosumTransition { schedule: Arc<TransitionSchedule> },
    RandomTransition { schedule: Arc<TransitionSchedule> },
}

impl DiffusionScheme {
    /// Build the scheme for a vocabulary with `categories` diffusing tokens. The first
    /// `categories` symbols of the MSA alphabet index the BLOSUM kernel.
    pub fn from_config(config: &DiffusionConfig, categories: usize, device: &Device) -> Result<Self> {
        config.validate()?;
        match config.mask {
            MaskScheme::Autoreg => Ok(DiffusionScheme::AutoregressiveMask),
            MaskScheme::Random => {
                let betas = config.beta_schedule.unwrap_or(BetaSchedule::SohlDickstein);
                let schedule =
                    TransitionSchedule::uniform(categories, config.timesteps()?, betas, device)?;
                Ok(DiffusionScheme::RandomTransition {
                    schedule: Arc::new(schedule),
                })
            }
            MaskScheme::Blosum => {
                let alphabet = MSA_ALPHABET.get(..categories).ok_or_else(|| {
                    DmsError::Config(format!(
                        "BLOSUM kernels support at most {} categories, got {}",
                        MSA_ALPHABET.len(),
                        categories
                    ))
                })?;
                let matrix = match &config.blosum_path {
                    Some(path) => BlosumMatrix::from_file(path, alphabet)?,
                    None => BlosumMatrix::blosum62(alphabet)?,
                };
                let betas = config.beta_schedule.unwrap_or(BetaSchedule::Exp);
                let schedule =
                    TransitionSchedule::blosum(&matrix, config.timesteps()?, betas, device)?;
                Ok(DiffusionScheme::BlosumTransition {
                    schedule: Arc::new(schedule),
                })
            }
        }
    }

    pub fn mask(&self) -> MaskScheme {
        match self {
            DiffusionScheme::AutoregressiveMask => MaskScheme::Autoreg,
            DiffusionScheme::BlosumTransition { .. } => MaskScheme::Blosum,
            DiffusionScheme::RandomTransition { .. } => MaskScheme::Random,
        }
    }

    pub fn schedule(&self) -> Option<&Arc<TransitionSchedule>> {
        match self {
            DiffusionScheme::AutoregressiveMask => None,
            DiffusionScheme::BlosumTransition { schedule }
            | DiffusionScheme::RandomTransition { schedule } => Some(schedule),
        }
    }
}

/// Collater over batches of single sequences.
pub enum SequenceCollater<V> {
    Absorbing(OAMaskCollater<V>),
    Transition(D3PMCollater<V>),
}

#[derive(Debug, Clone)]
pub enum SequenceBatch {
    Masked(MaskedBatch),
    Transition(TransitionBatch),
}

impl<V: Vocabulary> SequenceCollater<V> {
    pub fn for_scheme(scheme: &DiffusionScheme, tokenizer: Arc<V>) -> Result<Self> {
        Ok(match scheme.schedule() {
            None => SequenceCollater::Absorbing(OAMaskCollater::new(tokenizer)),
            Some(schedule) => {
                SequenceCollater::Transition(D3PMCollater::new(tokenizer, schedule.clone())?)
            }
        })
    }

    pub fn collate<S, R>(&self, sequences: &[S], rng: &mut R) -> Result<SequenceBatch>
    where
        S: AsRef<str>,
        R: Rng + ?Sized,
    {
        match self {
            SequenceCollater::Absorbing(c) => c.collate(sequences, rng).map(SequenceBatch::Masked),
            SequenceCollater::Transition(c) => {
                c.collate(sequences, rng).map(SequenceBatch::Transition)
            }
        }
    }
}

impl SequenceBatch {
    pub fn batch_size(&self) -> usize {
        match self {
            SequenceBatch::Masked(b) => b.batch_size(),
            SequenceBatch::Transition(b) => b.batch_size(),
        }
    }

    pub fn named_tensors(&self) -> Vec<(&'static str, Tensor)> {
        match self {
            SequenceBatch::Masked(b) => b.named_tensors(),
            SequenceBatch::Transition(b) => b.named_tensors(),
        }
    }
}

/// Collater over batches of MSAs with a fixed row count.
pub enum MsaCollater<V> {
    Absorbing(MsaAbsorbingCollater<V>),
    Transition(D3PMMsaCollater<V>),
}

#[derive(Debug, Clone)]
pub enum MsaBatch {
    Masked(MsaMaskedBatch),
    Transition(TransitionBatch),
}

impl<V: Vocabulary> MsaCollater<V> {
    pub fn for_scheme(scheme: &DiffusionScheme, tokenizer: Arc<V>, num_seqs: usize) -> Result<Self> {
        Ok(match scheme.schedule() {
            None => MsaCollater::Absorbing(MsaAbsorbingCollater::new(tokenizer, num_seqs)),
            Some(schedule) => MsaCollater::Transition(D3PMMsaCollater::new(
                tokenizer,
                schedule.clone(),
                num_seqs,
            )?),
        })
    }

    pub fn collate<M, S, R>(&self, msas: &[M], rng: &mut R) -> Result<MsaBatch>
    where
        M: AsRef<[S]>,
        S: AsRef<str>,
        R: Rng + ?Sized,
    {
        match self {
            MsaCollater::Absorbing(c) => c.collate(msas, rng).map(MsaBatch::Masked),
            MsaCollater::Transition(c) => c.collate(msas, rng).map(MsaBatch::Transition),
        }
    }
}

impl MsaBatch {
    pub fn batch_size(&self) -> usize {
        match self {
            MsaBatch::Masked(b) => b.batch_size(),
            MsaBatch::Transition(b) => b.batch_size(),
        }
    }

    pub fn named_tensors(&self) -> Vec<(&'static str, Tensor)> {
        match self {
            MsaBatch::Masked(b) => b.named_tensors(),
            MsaBatch::Transition(b) => b.named_tensors(),
        }
    }
}
