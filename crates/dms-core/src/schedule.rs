//! Forward transition schedules for structured (D3PM) diffusion.
//!
//! A schedule holds the per-step matrices `Q_t` and their running products
//! `Q̄_t = Q_1·…·Q_t` for `t` in `0..=T`, stacked as `[T + 1, K, K]` tensors with the
//! identity at index 0. Schedules are validated once when built and are read-only
//! afterwards; collaters share them through an `Arc`.
use crate::blosum::BlosumMatrix;
use crate::constants::ROW_SUM_TOLERANCE;
use crate::error::{DmsError, Result};
use candle_core::{DType, Device, Tensor, D};
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;
use strum::{Display, EnumString};

const BETA_START: f64 = 1e-5;
const BETA_END: f64 = 0.999;
/// Upper end of the exponent range for `BetaSchedule::Exp` with BLOSUM kernels.
pub const BLOSUM_EXP_MAX: f64 = 6.0;

/// Noise schedule for the forward process.
#[derive(Debug, Clone, Copy, PartialEq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum BetaSchedule {
    Linear,
    Quad,
    SohlDickstein,
    Cosine,
    Exp,
}

impl BetaSchedule {
    /// `timesteps` noise rates, one per step.
    pub fn betas(&self, timesteps: usize) -> Vec<f64> {
        let t = timesteps as f64;
        match self {
            BetaSchedule::Linear => linspace(BETA_START, BETA_END, timesteps),
            BetaSchedule::Quad => linspace(BETA_START.sqrt(), BETA_END.sqrt(), timesteps)
                .into_iter()
                .map(|b| b * b)
                .collect(),
            BetaSchedule::SohlDickstein => (0..timesteps)
                .map(|i| 1.0 / (t - i as f64 + 1.0))
                .collect(),
            BetaSchedule::Cosine => linspace(FRAC_PI_2, 0.0, timesteps)
                .into_iter()
                .map(|x| x.cos() * (BETA_END - BETA_START) + BETA_START)
                .collect(),
            BetaSchedule::Exp => linspace(0.0, BLOSUM_EXP_MAX, timesteps)
                .into_iter()
                .map(|x| x.exp() * (BETA_END - BETA_START) + BETA_START)
                .collect(),
        }
    }
}

fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => vec![],
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransitionSchedule {
    q: Tensor,
    q_bar: Tensor,
    timesteps: usize,
    categories: usize,
}

impl TransitionSchedule {
    /// Uniform kernel: `Q_t = (1 - β_t)·I + β_t/K · 11ᵀ`.
    pub fn uniform(
        categories: usize,
        timesteps: usize,
        betas: BetaSchedule,
        device: &Device,
    ) -> Result<Self> {
        check_horizon(timesteps)?;
        let k = categories;
        let steps = betas
            .betas(timesteps)
            .into_iter()
            .map(|beta| {
                let off = beta / k as f64;
                let mut m = vec![off; k * k];
                for i in 0..k {
                    m[i * k + i] = 1.0 - beta + off;
                }
                m
            })
            .collect::<Vec<_>>();
        tracing::info!(categories, timesteps, ?betas, "built uniform transition schedule");
        Self::from_steps(steps, categories, device)
    }

    /// BLOSUM kernel: `Q_t = (1 - β_t)·I + β_t·softmax(BLOSUM)` with betas rescaled
    /// to `min(β / max β + 1/T, 1)`.
    pub fn blosum(
        matrix: &BlosumMatrix,
        timesteps: usize,
        betas: BetaSchedule,
        device: &Device,
    ) -> Result<Self> {
        check_horizon(timesteps)?;
        let k = matrix.size();
        let kernel = matrix
            .transition_probabilities(&Device::Cpu)?
            .flatten_all()?
            .to_vec1::<f64>()?;
        let raw = betas.betas(timesteps);
        let max = raw.iter().cloned().fold(f64::MIN, f64::max);
        let steps = raw
            .into_iter()
            .map(|b| (b / max + 1.0 / timesteps as f64).min(1.0))
            .map(|beta| {
                let mut m: Vec<f64> = kernel.iter().map(|p| p * beta).collect();
                for i in 0..k {
                    m[i * k + i] += 1.0 - beta;
                }
                m
            })
            .collect::<Vec<_>>();
        tracing::info!(categories = k, timesteps, ?betas, "built BLOSUM transition schedule");
        Self::from_steps(steps, k, device)
    }

    /// Stack `Q_1..Q_T` (row-major `K·K` buffers) under an identity `Q_0`, accumulate
    /// the products and validate every matrix.
    pub fn from_steps(steps: Vec<Vec<f64>>, categories: usize, device: &Device) -> Result<Self> {
        let k = categories;
        let timesteps = steps.len();
        let eye = identity(k, device)?;

        let mut q = Vec::with_capacity(timesteps + 1);
        let mut q_bar = Vec::with_capacity(timesteps + 1);
        let mut running = eye.clone();
        q.push(eye.clone());
        q_bar.push(eye);
        for step in steps {
            if step.len() != k * k {
                return Err(DmsError::ShapeMismatch {
                    expected: vec![k, k],
                    actual: vec![step.len()],
                });
            }
            let q_t = Tensor::from_vec(step, (k, k), device)?;
            running = running.matmul(&q_t)?;
            q_bar.push(running.clone());
            q.push(q_t);
        }

        let q = Tensor::stack(&q, 0)?;
        let q_bar = Tensor::stack(&q_bar, 0)?;
        validate_row_stochastic(&q)?;
        validate_row_stochastic(&q_bar)?;

        Ok(Self {
            q,
            q_bar,
            timesteps,
            categories,
        })
    }

    /// `Q` stacked as `[T + 1, K, K]`.
    pub fn q(&self) -> &Tensor {
        &self.q
    }

    /// `Q̄` stacked as `[T + 1, K, K]`.
    pub fn q_bar(&self) -> &Tensor {
        &self.q_bar
    }

    pub fn q_at(&self, timestep: usize) -> Result<Tensor> {
        self.check_timestep(timestep)?;
        Ok(self.q.get(timestep)?)
    }

    pub fn q_bar_at(&self, timestep: usize) -> Result<Tensor> {
        self.check_timestep(timestep)?;
        Ok(self.q_bar.get(timestep)?)
    }

    /// The horizon `T`.
    pub fn timesteps(&self) -> usize {
        self.timesteps
    }

    pub fn categories(&self) -> usize {
        self.categories
    }

    pub fn device(&self) -> &Device {
        self.q_bar.device()
    }

    fn check_timestep(&self, timestep: usize) -> Result<()> {
        if timestep > self.timesteps {
            return Err(DmsError::TimestepOutOfRange {
                timestep,
                timesteps: self.timesteps,
            });
        }
        Ok(())
    }
}

fn check_horizon(timesteps: usize) -> Result<()> {
    if timesteps < 2 {
        return Err(DmsError::Config(format!(
            "diffusion timesteps must be at least 2, got {}",
            timesteps
        )));
    }
    Ok(())
}

fn identity(k: usize, device: &Device) -> Result<Tensor> {
    let mut eye = vec![0f64; k * k];
    for i in 0..k {
        eye[i * k + i] = 1.0;
    }
    Ok(Tensor::from_vec(eye, (k, k), device)?)
}

/// Check a `[T, K, K]` stack: entries non-negative, every row summing to one.
pub fn validate_row_stochastic(stack: &Tensor) -> Result<()> {
    let stack = stack.to_dtype(DType::F64)?;
    let (_, k, _) = stack.dims3()?;
    let sums = stack.sum(D::Minus1)?.to_vec2::<f64>()?;
    let mins = stack.min(D::Minus1)?.to_vec2::<f64>()?;
    for (timestep, (sums, mins)) in sums.iter().zip(mins.iter()).enumerate() {
        for row in 0..k {
            if mins[row] < -ROW_SUM_TOLERANCE {
                return Err(DmsError::InvalidTransitionMatrix {
                    timestep,
                    reason: format!("row {} has negative entry {}", row, mins[row]),
                });
            }
            if (sums[row] - 1.0).abs() > ROW_SUM_TOLERANCE {
                return Err(DmsError::InvalidTransitionMatrix {
                    timestep,
                    reason: format!("row {} sums to {}", row, sums[row]),
                });
            }
        }
    }
    Ok(())
}
