use super::check_schedule;
use crate::batch::TransitionBatch;
use crate::error::{DmsError, Result};
use crate::padding::RaggedBatch;
use crate::sampler::sample_transition;
use crate::schedule::TransitionSchedule;
use crate::tokenizer::Vocabulary;
use candle_core::Tensor;
use rand::Rng;
use std::sync::Arc;

/// Structured denoising diffusion collater (Austin et al., "Structured Denoising
/// Diffusion Models in Discrete State-Spaces", <https://doi.org/10.48550/arXiv.2107.03006>).
///
/// Every example draws its own timestep `t` in `1..T` and is corrupted by sampling
/// each position from `x_0 · Q̄_t`.
pub struct D3PMCollater<V> {
    tokenizer: Arc<V>,
    schedule: Arc<TransitionSchedule>,
}

impl<V: Vocabulary> D3PMCollater<V> {
    pub fn new(tokenizer: Arc<V>, schedule: Arc<TransitionSchedule>) -> Result<Self> {
        check_schedule(tokenizer.as_ref(), &schedule)?;
        Ok(Self {
            tokenizer,
            schedule,
        })
    }

    pub fn tokenizer(&self) -> &V {
        &self.tokenizer
    }

    pub fn schedule(&self) -> &TransitionSchedule {
        &self.schedule
    }

    pub fn collate<S, R>(&self, sequences: &[S], rng: &mut R) -> Result<TransitionBatch>
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
        let total = tokenized.len();
        let kept: Vec<Vec<u32>> = tokenized.into_iter().filter(|x| !x.is_empty()).collect();
        let num_dropped = total - kept.len();
        if num_dropped > 0 {
            tracing::warn!(num_dropped, batch_size = total, "dropped empty sequences from batch");
        }
        if kept.is_empty() {
            return Err(DmsError::EmptyBatch);
        }

        let k = self.tokenizer.num_categories();
        let device = self.schedule.device().clone();
        let mut src = RaggedBatch::<u32>::sequences();
        let mut tgt = RaggedBatch::<u32>::sequences();
        let mut src_one_hot = RaggedBatch::<f64>::one_hot(k);
        let mut tgt_one_hot = RaggedBatch::<f64>::one_hot(k);
        let mut q_x = RaggedBatch::<f64>::one_hot(k);
        let mut timesteps = Vec::with_capacity(kept.len());

        for x in &kept {
            let d = x.len();
            let t = rng.gen_range(1..self.schedule.timesteps());
            timesteps.push(t as u32);

            let x0 = self.tokenizer.one_hot(x, &device)?;
            let (x_t, probs) = sample_transition(&x0, &self.schedule.q_bar_at(t)?, rng)?;
            let x_t = x_t.to_vec1::<u32>()?;
            let xt_one_hot = self.tokenizer.one_hot(&x_t, &device)?;

            src.push(&x_t, d)?;
            tgt.push(x, d)?;
            src_one_hot.push(&xt_one_hot.flatten_all()?.to_vec1::<f64>()?, d)?;
            tgt_one_hot.push(&x0.flatten_all()?.to_vec1::<f64>()?, d)?;
            q_x.push(&probs.flatten_all()?.to_vec1::<f64>()?, d)?;
        }

        let pad_id = self.tokenizer.pad_id();
        let n = timesteps.len();
        tracing::debug!(batch_size = n, max_len = tgt.max_len(), "collated D3PM batch");
        Ok(TransitionBatch {
            src: src.pad(pad_id, &device)?,
            src_one_hot: src_one_hot.pad(0.0, &device)?,
            timesteps: Tensor::from_vec(timesteps, n, &device)?,
            tgt: tgt.pad(pad_id, &device)?,
            tgt_one_hot: tgt_one_hot.pad(0.0, &device)?,
            q: self.schedule.q().clone(),
            q_bar: self.schedule.q_bar().clone(),
            q_x: q_x.pad(0.0, &device)?,
            num_dropped,
        })
    }
}
