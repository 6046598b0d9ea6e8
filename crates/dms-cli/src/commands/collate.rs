use super::save_tensors;
use crate::io::{read_msa, read_sequences};
use anyhow::Context;
use candle_core::Device;
use dms_core::{
    DiffusionConfig, DiffusionScheme, MsaCollater, ProteinTokenizer, SequenceCollater, Vocabulary,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use std::sync::Arc;

pub fn execute(
    config: PathBuf,
    input: Vec<PathBuf>,
    output: PathBuf,
    seed: Option<u64>,
    msa: bool,
) -> anyhow::Result<()> {
    let config = DiffusionConfig::from_file(&config)
        .with_context(|| format!("Failed to load config {}", config.display()))?;

    let seed = match seed.or(config.seed) {
        Some(s) => s,
        None => {
            let mut rng = rand::thread_rng();
            rng.gen_range(0..99999)
        }
    };
    tracing::info!(mask = %config.mask, seed, msa, "collating batch");
    let mut rng = StdRng::seed_from_u64(seed);

    let tokenizer = Arc::new(if msa {
        ProteinTokenizer::msa()?
    } else {
        ProteinTokenizer::sequences()?
    });
    let scheme = DiffusionScheme::from_config(&config, tokenizer.num_categories(), &Device::Cpu)?;

    let tensors = if msa {
        let msas = input
            .iter()
            .map(|path| read_msa(path, config.num_seqs))
            .collect::<anyhow::Result<Vec<_>>>()?;
        let collater = MsaCollater::for_scheme(&scheme, tokenizer, config.num_seqs)?;
        collater.collate(&msas, &mut rng)?.named_tensors()
    } else {
        let mut sequences = Vec::new();
        for path in &input {
            sequences.extend(read_sequences(path)?);
        }
        let collater = SequenceCollater::for_scheme(&scheme, tokenizer)?;
        collater.collate(&sequences, &mut rng)?.named_tensors()
    };
    save_tensors(tensors, &output)
}
