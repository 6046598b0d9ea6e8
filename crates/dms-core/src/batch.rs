//! Collated batches handed to the training loop.
//!
//! Field order follows the order the loss computation consumes the tensors in.
use candle_core::Tensor;

/// Order-agnostic absorbing diffusion batch for single sequences.
#[derive(Debug, Clone)]
pub struct MaskedBatch {
    /// Corrupted tokens `[B, L]` (`U32`), padded with the pad id.
    pub src: Tensor,
    /// `D - t + 1` per example `[B]` (`U32`).
    pub timesteps: Tensor,
    /// Clean tokens `[B, L]` (`U32`).
    pub tgt: Tensor,
    /// 1 where a position was absorbed `[B, L]` (`U8`), padded with 0.
    pub mask: Tensor,
}

impl MaskedBatch {
    pub fn batch_size(&self) -> usize {
        self.src.dims()[0]
    }

    pub fn named_tensors(&self) -> Vec<(&'static str, Tensor)> {
        vec![
            ("src", self.src.clone()),
            ("timesteps", self.timesteps.clone()),
            ("tgt", self.tgt.clone()),
            ("mask", self.mask.clone()),
        ]
    }
}

/// Order-agnostic absorbing diffusion batch for MSAs.
#[derive(Debug, Clone)]
pub struct MsaMaskedBatch {
    /// Corrupted MSAs `[B, num_seqs, L]` (`U32`).
    pub src: Tensor,
    /// Clean MSAs `[B, num_seqs, L]` (`U32`).
    pub tgt: Tensor,
    /// `src == mask_id` (`U8`).
    pub mask: Tensor,
}

impl MsaMaskedBatch {
    pub fn batch_size(&self) -> usize {
        self.src.dims()[0]
    }

    pub fn named_tensors(&self) -> Vec<(&'static str, Tensor)> {
        vec![
            ("src", self.src.clone()),
            ("tgt", self.tgt.clone()),
            ("mask", self.mask.clone()),
        ]
    }
}

/// Structured (D3PM) diffusion batch, for single sequences (`[B, L, ..]`) or MSAs
/// (`[B, num_seqs, L, ..]`).
#[derive(Debug, Clone)]
pub struct TransitionBatch {
    /// Sampled `x_t` tokens (`U32`).
    pub src: Tensor,
    /// One-hot `x_t` (`F64`).
    pub src_one_hot: Tensor,
    /// Timestep per example `[B]` (`U32`).
    pub timesteps: Tensor,
    /// Clean `x_0` tokens (`U32`).
    pub tgt: Tensor,
    /// One-hot `x_0` (`F64`).
    pub tgt_one_hot: Tensor,
    /// Per-step matrices `[T + 1, K, K]`, shared with the schedule.
    pub q: Tensor,
    /// Cumulative matrices `[T + 1, K, K]`, shared with the schedule.
    pub q_bar: Tensor,
    /// Forward probabilities `x_0 · Q̄_t` (`F64`), 0 on padding.
    pub q_x: Tensor,
    /// Examples removed because they tokenized to nothing.
    pub num_dropped: usize,
}

impl TransitionBatch {
    pub fn batch_size(&self) -> usize {
        self.src.dims()[0]
    }

    pub fn named_tensors(&self) -> Vec<(&'static str, Tensor)> {
        vec![
            ("src", self.src.clone()),
            ("src_one_hot", self.src_one_hot.clone()),
            ("timesteps", self.timesteps.clone()),
            ("tgt", self.tgt.clone()),
            ("tgt_one_hot", self.tgt_one_hot.clone()),
            ("q", self.q.clone()),
            ("q_bar", self.q_bar.clone()),
            ("q_x", self.q_x.clone()),
        ]
    }
}
