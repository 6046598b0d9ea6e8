pub mod collate;
pub mod schedule;

use candle_core::Tensor;
use std::collections::HashMap;
use std::path::Path;

fn save_tensors(tensors: Vec<(&'static str, Tensor)>, output: &Path) -> anyhow::Result<()> {
    let tensors: HashMap<String, Tensor> = tensors
        .into_iter()
        .map(|(name, t)| (name.to_string(), t))
        .collect();
    candle_core::safetensors::save(&tensors, output)?;
    tracing::info!(path = %output.display(), tensors = tensors.len(), "wrote safetensors");
    Ok(())
}
