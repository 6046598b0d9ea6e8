//! Batch collaters for discrete diffusion.
//!
//! - [`OAMaskCollater`]: order-agnostic absorbing diffusion, single sequences.
//! - [`D3PMCollater`]: structured categorical diffusion, single sequences.
//! - [`MsaAbsorbingCollater`]: absorbing diffusion over a whole MSA.
//! - [`D3PMMsaCollater`]: structured diffusion over a whole MSA.
//!
//! Collaters are configured once and hold only shared read-only state, so one instance
//! can serve many data-loading workers. Every call takes the caller's random generator.
mod d3pm;
mod d3pm_msa;
mod msa_absorbing;
mod oa_mask;

pub use d3pm::D3PMCollater;
pub use d3pm_msa::D3PMMsaCollater;
pub use msa_absorbing::MsaAbsorbingCollater;
pub use oa_mask::OAMaskCollater;

use crate::error::{DmsError, Result};
use crate::schedule::TransitionSchedule;
use crate::tokenizer::Vocabulary;
use rand::Rng;

/// Pick `num_mask` of `length` positions uniformly without replacement.
pub(crate) fn absorbing_positions<R: Rng + ?Sized>(
    length: usize,
    num_mask: usize,
    rng: &mut R,
) -> Vec<usize> {
    rand::seq::index::sample(rng, length, num_mask).into_vec()
}

/// Tokenize one MSA, checking its row count, and flatten it row-major.
/// Returns the flat tokens and the aligned length.
pub(crate) fn tokenize_alignment<V, S>(
    tokenizer: &V,
    index: usize,
    msa: &[S],
    num_seqs: usize,
) -> Result<(Vec<u32>, usize)>
where
    V: Vocabulary,
    S: AsRef<str>,
{
    if msa.len() != num_seqs {
        return Err(DmsError::MsaDepthMismatch {
            index,
            expected: num_seqs,
            actual: msa.len(),
        });
    }
    let rows = tokenizer.tokenize_msa(msa)?;
    let depth = rows.first().map(Vec::len).unwrap_or(0);
    if depth == 0 {
        return Err(DmsError::EmptySequence { index });
    }
    Ok((rows.concat(), depth))
}

pub(crate) fn check_schedule<V: Vocabulary>(
    tokenizer: &V,
    schedule: &TransitionSchedule,
) -> Result<()> {
    if schedule.categories() != tokenizer.num_categories() {
        return Err(DmsError::ShapeMismatch {
            expected: vec![tokenizer.num_categories()],
            actual: vec![schedule.categories()],
        });
    }
    if schedule.timesteps() < 2 {
        return Err(DmsError::Config(format!(
            "D3PM needs at least 2 timesteps, schedule has {}",
            schedule.timesteps()
        )));
    }
    Ok(())
}
