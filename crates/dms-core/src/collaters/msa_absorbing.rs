use super::{absorbing_positions, tokenize_alignment};
use crate::batch::MsaMaskedBatch;
use crate::error::{DmsError, Result};
use crate::padding::RaggedBatch;
use crate::tokenizer::Vocabulary;
use candle_core::{Device, Tensor};
use rand::Rng;
use std::sync::Arc;

/// Order-agnostic absorbing diffusion over a whole MSA.
///
/// The alignment is treated as one flat sequence of `num_seqs * L` positions: a
/// single timestep is drawn per MSA and `num_seqs * L - t + 1` positions are masked.
pub struct MsaAbsorbingCollater<V> {
    tokenizer: Arc<V>,
    num_seqs: usize,
}

impl<V: Vocabulary> MsaAbsorbingCollater<V> {
    pub fn new(tokenizer: Arc<V>, num_seqs: usize) -> Self {
        Self {
            tokenizer,
            num_seqs,
        }
    }

    pub fn tokenizer(&self) -> &V {
        &self.tokenizer
    }

    pub fn num_seqs(&self) -> usize {
        self.num_seqs
    }

    pub fn collate<M, S, R>(&self, msas: &[M], rng: &mut R) -> Result<MsaMaskedBatch>
    where
        M: AsRef<[S]>,
        S: AsRef<str>,
        R: Rng + ?Sized,
    {
        if msas.is_empty() {
            return Err(DmsError::EmptyBatch);
        }
        let mask_id = self.tokenizer.mask_id();
        let mut src = RaggedBatch::<u32>::msa(self.num_seqs);
        let mut tgt = RaggedBatch::<u32>::msa(self.num_seqs);

        for (index, msa) in msas.iter().enumerate() {
            let (x, depth) =
                tokenize_alignment(self.tokenizer.as_ref(), index, msa.as_ref(), self.num_seqs)?;
            let d = x.len();
            let t = rng.gen_range(0..d) + 1;
            let num_mask = d + 1 - t;

            let mut x_t = x.clone();
            for i in absorbing_positions(d, num_mask, rng) {
                x_t[i] = mask_id;
            }
            src.push(&x_t, depth)?;
            tgt.push(&x, depth)?;
        }

        let device = Device::Cpu;
        let pad_id = self.tokenizer.pad_id();
        let src = src.pad(pad_id, &device)?;
        let tgt = tgt.pad(pad_id, &device)?;
        let mask = src.broadcast_eq(&Tensor::new(mask_id, &device)?)?;
        tracing::debug!(
            batch_size = msas.len(),
            num_seqs = self.num_seqs,
            "collated absorbing MSA batch"
        );
        Ok(MsaMaskedBatch { src, tgt, mask })
    }
}
