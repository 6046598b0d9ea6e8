//! JSON training configuration for the diffusion collaters.
//!
//! ```json
//! { "mask": "blosum", "diffusion_timesteps": 500, "num_seqs": 64 }
//! ```
use crate::error::{DmsError, Result};
use crate::schedule::BetaSchedule;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use strum::{Display, EnumString};

/// How training examples are corrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MaskScheme {
    /// Order-agnostic absorbing masks.
    Autoreg,
    /// D3PM with a BLOSUM62-derived kernel.
    Blosum,
    /// D3PM with a uniform kernel.
    Random,
}

impl MaskScheme {
    /// Whether the scheme samples from a transition schedule.
    pub fn uses_transitions(&self) -> bool {
        !matches!(self, MaskScheme::Autoreg)
    }
}

fn default_num_seqs() -> usize {
    64
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffusionConfig {
    pub mask: MaskScheme,
    /// Horizon `T`; required for `blosum` and `random`.
    #[serde(default)]
    pub diffusion_timesteps: Option<usize>,
    /// Rows kept per MSA.
    #[serde(default = "default_num_seqs")]
    pub num_seqs: usize,
    /// Overrides the scheme's default noise schedule.
    #[serde(default)]
    pub beta_schedule: Option<BetaSchedule>,
    /// Substitution matrix file; the embedded BLOSUM62 is used when absent.
    #[serde(default)]
    pub blosum_path: Option<PathBuf>,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl DiffusionConfig {
    pub fn new(mask: MaskScheme) -> Self {
        Self {
            mask,
            diffusion_timesteps: None,
            num_seqs: default_num_seqs(),
            beta_schedule: None,
            blosum_path: None,
            seed: None,
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        text.parse()
    }

    /// Reject configurations no collater can be built from.
    pub fn validate(&self) -> Result<()> {
        if self.num_seqs == 0 {
            return Err(DmsError::Config("num_seqs must be positive".to_string()));
        }
        if self.mask.uses_transitions() {
            match self.diffusion_timesteps {
                None => {
                    return Err(DmsError::Config(format!(
                        "mask '{}' requires diffusion_timesteps",
                        self.mask
                    )))
                }
                Some(t) if t < 2 => {
                    return Err(DmsError::Config(format!(
                        "diffusion_timesteps must be at least 2, got {}",
                        t
                    )))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Diffusion horizon for transition schemes.
    pub fn timesteps(&self) -> Result<usize> {
        self.diffusion_timesteps.ok_or_else(|| {
            DmsError::Config(format!("mask '{}' requires diffusion_timesteps", self.mask))
        })
    }
}

impl FromStr for DiffusionConfig {
    type Err = DmsError;

    fn from_str(s: &str) -> Result<Self> {
        let config: DiffusionConfig = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dms_test_data::TestFile;

    #[test]
    fn test_mask_scheme_names() {
        assert_eq!(MaskScheme::from_str("autoreg").ok(), Some(MaskScheme::Autoreg));
        assert_eq!(MaskScheme::from_str("blosum").ok(), Some(MaskScheme::Blosum));
        assert_eq!(MaskScheme::Random.to_string(), "random");
        assert!(MaskScheme::from_str("bert").is_err());
    }

    #[test]
    fn test_parse_defaults() -> Result<()> {
        let config: DiffusionConfig = r#"{"mask": "autoreg"}"#.parse()?;
        assert_eq!(config, DiffusionConfig::new(MaskScheme::Autoreg));
        assert_eq!(config.num_seqs, 64);

        let config: DiffusionConfig =
            r#"{"mask": "random", "diffusion_timesteps": 100, "beta_schedule": "linear", "seed": 7}"#
                .parse()?;
        assert_eq!(config.timesteps()?, 100);
        assert_eq!(config.beta_schedule, Some(BetaSchedule::Linear));
        assert_eq!(config.seed, Some(7));
        Ok(())
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            r#"{"mask": "blosum"}"#.parse::<DiffusionConfig>(),
            Err(DmsError::Config(_))
        ));
        assert!(matches!(
            r#"{"mask": "random", "diffusion_timesteps": 1}"#.parse::<DiffusionConfig>(),
            Err(DmsError::Config(_))
        ));
        assert!(matches!(
            r#"{"mask": "autoreg", "num_seqs": 0}"#.parse::<DiffusionConfig>(),
            Err(DmsError::Config(_))
        ));
        assert!(matches!(
            r#"{"mask": "bert"}"#.parse::<DiffusionConfig>(),
            Err(DmsError::Json(_))
        ));
    }

    #[test]
    fn test_from_file() -> Result<()> {
        let (path, _tmp) = TestFile::config_blosum().create_temp()?;
        let config = DiffusionConfig::from_file(path)?;
        assert_eq!(config.mask, MaskScheme::Blosum);
        assert!(config.diffusion_timesteps.is_some());
        Ok(())
    }
}
