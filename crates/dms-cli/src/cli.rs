use super::commands;
use clap::{Parser, Subcommand};
use dms_core::{BetaSchedule, MaskScheme};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collate one batch and write its tensors to a safetensors file.
    Collate {
        /// JSON diffusion config.
        #[arg(short, long)]
        config: PathBuf,
        /// FASTA or plain sequence files. With `--msa` each file is one alignment.
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,
        #[arg(short, long)]
        output: PathBuf,
        /// Overrides the config seed.
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        msa: bool,
    },
    /// Build a transition schedule and write `q` and `q_bar`.
    Schedule {
        /// `random` or `blosum`.
        #[arg(short, long)]
        kind: MaskScheme,
        #[arg(short, long)]
        timesteps: usize,
        #[arg(short, long)]
        output: PathBuf,
        /// Use the MSA vocabulary (gap diffuses).
        #[arg(long)]
        msa: bool,
        /// Substitution matrix file for `blosum`.
        #[arg(long)]
        blosum: Option<PathBuf>,
        #[arg(long)]
        betas: Option<BetaSchedule>,
    },
}

impl Cli {
    pub fn execute(self) -> anyhow::Result<()> {
        match self.command {
            Commands::Collate {
                config,
                input,
                output,
                seed,
                msa,
            } => commands::collate::execute(config, input, output, seed, msa),
            Commands::Schedule {
                kind,
                timesteps,
                output,
                msa,
                blosum,
                betas,
            } => commands::schedule::execute(kind, timesteps, output, msa, blosum, betas),
        }
    }
}
