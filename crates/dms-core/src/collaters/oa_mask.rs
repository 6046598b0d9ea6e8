use super::absorbing_positions;
use crate::batch::MaskedBatch;
use crate::error::{DmsError, Result};
use crate::padding::RaggedBatch;
use crate::tokenizer::Vocabulary;
use candle_core::{Device, Tensor};
use rand::Rng;
use std::sync::Arc;

/// Order-agnostic absorbing-state collater (Hoogeboom et al., "Autoregressive
/// Diffusion Models", <https://doi.org/10.48550/arXiv.2110.02037>).
///
/// For a sequence of length `D` a timestep `t` is drawn from `1..D` and `D - t + 1`
/// positions, chosen uniformly without replacement, are replaced by the mask token.
/// Sequences with `D <= 1` use `t = 1`.
pub struct OAMaskCollater<V> {
    tokenizer: Arc<V>,
}

impl<V: Vocabulary> OAMaskCollater<V> {
    pub fn new(tokenizer: Arc<V>) -> Self {
        Self { tokenizer }
    }

    pub fn tokenizer(&self) -> &V {
        &self.tokenizer
    }

    pub fn collate<S, R>(&self, sequences: &[S], rng: &mut R) -> Result<MaskedBatch>
    where
        S: AsRef<str>,
        R: Rng + ?Sized,
    {
        if sequences.is_empty() {
            return Err(DmsError::EmptyBatch);
        }
        let tokenized = sequences
            .iter()
            .map(|s| self.tokenizer.tokenize(s.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        let mask_id = self.tokenizer.mask_id();
        let mut src = RaggedBatch::<u32>::sequences();
        let mut tgt = RaggedBatch::<u32>::sequences();
        let mut masks = RaggedBatch::<u8>::sequences();
        let mut timesteps = Vec::with_capacity(tokenized.len());

        for x in &tokenized {
            let d = x.len();
            let t = if d <= 1 { 1 } else { rng.gen_range(1..d) };
            let num_mask = d + 1 - t;
            timesteps.push(num_mask as u32);

            let mut mask = vec![0u8; d];
            let mut x_t = x.clone();
            for i in absorbing_positions(d, num_mask, rng) {
                mask[i] = 1;
                x_t[i] = mask_id;
            }
            src.push(&x_t, d)?;
            tgt.push(x, d)?;
            masks.push(&mask, d)?;
        }

        let device = Device::Cpu;
        let pad_id = self.tokenizer.pad_id();
        let n = timesteps.len();
        tracing::debug!(batch_size = n, max_len = tgt.max_len(), "collated OA-ARDM batch");
        Ok(MaskedBatch {
            src: src.pad(pad_id, &device)?,
            timesteps: Tensor::from_vec(timesteps, n, &device)?,
            tgt: tgt.pad(pad_id, &device)?,
            mask: masks.pad(0, &device)?,
        })
    }
}
