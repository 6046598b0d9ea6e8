use super::save_tensors;
use anyhow::bail;
use candle_core::Device;
use dms_core::{
    BetaSchedule, DiffusionConfig, DiffusionScheme, MaskScheme, ProteinTokenizer, Vocabulary,
};
use std::path::PathBuf;

pub fn execute(
    kind: MaskScheme,
    timesteps: usize,
    output: PathBuf,
    msa: bool,
    blosum: Option<PathBuf>,
    betas: Option<BetaSchedule>,
) -> anyhow::Result<()> {
    if !kind.uses_transitions() {
        bail!("'{}' has no transition schedule; use random or blosum", kind);
    }
    let tokenizer = if msa {
        ProteinTokenizer::msa()?
    } else {
        ProteinTokenizer::sequences()?
    };
    let config = DiffusionConfig {
        diffusion_timesteps: Some(timesteps),
        beta_schedule: betas,
        blosum_path: blosum,
        ..DiffusionConfig::new(kind)
    };
    let scheme = DiffusionScheme::from_config(&config, tokenizer.num_categories(), &Device::Cpu)?;
    let Some(schedule) = scheme.schedule() else {
        bail!("'{}' has no transition schedule", kind);
    };
    save_tensors(
        vec![("q", schedule.q().clone()), ("q_bar", schedule.q_bar().clone())],
        &output,
    )
}
