//! Categorical sampling from the forward transition `x_0 · Q̄_t`.
use crate::error::{DmsError, Result};
use candle_core::{Tensor, D};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

/// Sample a Markov transition `x_t ~ Cat(x_0 · Q̄_t)` for every row of `x0_one_hot`.
///
/// `x0_one_hot` is `[N, K]` and `q_bar_t` is `[K, K]`, both `F64`. Returns the sampled
/// category per row as a `U32` tensor of shape `[N]` together with the `[N, K]`
/// probability rows the samples were drawn from.
pub fn sample_transition<R: Rng + ?Sized>(
    x0_one_hot: &Tensor,
    q_bar_t: &Tensor,
    rng: &mut R,
) -> Result<(Tensor, Tensor)> {
    let (_, k) = x0_one_hot.dims2()?;
    let (rows, cols) = q_bar_t.dims2()?;
    if rows != k || cols != k {
        return Err(DmsError::ShapeMismatch {
            expected: vec![k, k],
            actual: vec![rows, cols],
        });
    }

    let probs = x0_one_hot.matmul(q_bar_t)?;
    let samples = probs
        .to_vec2::<f64>()?
        .iter()
        .map(|p| Ok(WeightedIndex::new(p)?.sample(rng) as u32))
        .collect::<Result<Vec<u32>>>()?;
    let n = samples.len();
    let samples = Tensor::from_vec(samples, n, probs.device())?;
    Ok((samples, probs))
}

/// Row sums of a probability tensor along its last axis.
pub fn row_sums(probs: &Tensor) -> Result<Vec<f64>> {
    Ok(probs.sum(D::Minus1)?.flatten_all()?.to_vec1::<f64>()?)
}
