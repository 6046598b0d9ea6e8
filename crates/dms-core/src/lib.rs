//! dms-core
//!
//! - tokenization of protein sequences and MSAs.
//! - forward transition schedules (uniform and BLOSUM) for discrete diffusion.
//! - batch collaters producing padded training tensors for absorbing (OA-ARDM) and
//!   structured (D3PM) corruption.
//!
//! ```ignore
//! use dms_core::{DiffusionConfig, DiffusionScheme, ProteinTokenizer, SequenceCollater, Vocabulary};
//! use candle_core::Device;
//! use rand::SeedableRng;
//! use std::sync::Arc;
//!
//! let config: DiffusionConfig = r#"{"mask": "random", "diffusion_timesteps": 500}"#.parse()?;
//! let tokenizer = Arc::new(ProteinTokenizer::sequences()?);
//! let scheme = DiffusionScheme::from_config(&config, tokenizer.num_categories(), &Device::Cpu)?;
//! let collater = SequenceCollater::for_scheme(&scheme, tokenizer)?;
//! let batch = collater.collate(&["MKVLA", "MKV"], &mut rand::rngs::StdRng::seed_from_u64(0))?;
//! ```
pub mod batch;
pub mod blosum;
pub mod collaters;
pub mod config;
pub mod constants;
pub mod error;
pub mod padding;
pub mod sampler;
pub mod schedule;
pub mod scheme;
pub mod tokenizer;

pub use batch::{MaskedBatch, MsaMaskedBatch, TransitionBatch};
pub use blosum::BlosumMatrix;
pub use collaters::{D3PMCollater, D3PMMsaCollater, MsaAbsorbingCollater, OAMaskCollater};
pub use config::{DiffusionConfig, MaskScheme};
pub use error::{DmsError, Result};
pub use padding::{pad_msa, pad_sequences, unpad, RaggedBatch};
pub use sampler::sample_transition;
pub use schedule::{BetaSchedule, TransitionSchedule};
pub use scheme::{DiffusionScheme, MsaBatch, MsaCollater, SequenceBatch, SequenceCollater};
pub use tokenizer::{ProteinTokenizer, Vocabulary};
