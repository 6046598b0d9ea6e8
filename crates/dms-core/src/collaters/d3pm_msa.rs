use super::{check_schedule, tokenize_alignment};
use crate::batch::TransitionBatch;
use crate::error::{DmsError, Result};
use crate::padding::RaggedBatch;
use crate::sampler::sample_transition;
use crate::schedule::TransitionSchedule;
use crate::tokenizer::Vocabulary;
use candle_core::Tensor;
use rand::Rng;
use std::sync::Arc;

/// D3PM corruption of whole MSAs. One timestep is drawn per alignment and every
/// position of every row is resampled from `x_0 · Q̄_t`.
pub struct D3PMMsaCollater<V> {
    tokenizer: Arc<V>,
    schedule: Arc<TransitionSchedule>,
    num_seqs: usize,
}

impl<V: Vocabulary> D3PMMsaCollater<V> {
    pub fn new(
        tokenizer: Arc<V>,
        schedule: Arc<TransitionSchedule>,
        num_seqs: usize,
    ) -> Result<Self> {
        check_schedule(tokenizer.as_ref(), &schedule)?;
        Ok(Self {
            tokenizer,
            schedule,
            num_seqs,
        })
    }

    pub fn tokenizer(&self) -> &V {
        &self.tokenizer
    }

    pub fn schedule(&self) -> &TransitionSchedule {
        &self.schedule
    }

    pub fn num_seqs(&self) -> usize {
        self.num_seqs
    }

    pub fn collate<M, S, R>(&self, msas: &[M], rng: &mut R) -> Result<TransitionBatch>
    where
        M: AsRef<[S]>,
        S: AsRef<str>,
        R: Rng + ?Sized,
    {
        if msas.is_empty() {
            return Err(DmsError::EmptyBatch);
        }
        let k = self.tokenizer.num_categories();
        let device = self.schedule.device().clone();
        let mut src = RaggedBatch::<u32>::msa(self.num_seqs);
        let mut tgt = RaggedBatch::<u32>::msa(self.num_seqs);
        let mut src_one_hot = RaggedBatch::<f64>::msa_one_hot(self.num_seqs, k);
        let mut tgt_one_hot = RaggedBatch::<f64>::msa_one_hot(self.num_seqs, k);
        let mut q_x = RaggedBatch::<f64>::msa_one_hot(self.num_seqs, k);
        let mut timesteps = Vec::with_capacity(msas.len());

        for (index, msa) in msas.iter().enumerate() {
            let (x, depth) =
                tokenize_alignment(self.tokenizer.as_ref(), index, msa.as_ref(), self.num_seqs)?;
            let t = rng.gen_range(1..self.schedule.timesteps());
            timesteps.push(t as u32);

            let x0 = self.tokenizer.one_hot(&x, &device)?;
            let (x_t, probs) = sample_transition(&x0, &self.schedule.q_bar_at(t)?, rng)?;
            let x_t = x_t.to_vec1::<u32>()?;
            let xt_one_hot = self.tokenizer.one_hot(&x_t, &device)?;

            src.push(&x_t, depth)?;
            tgt.push(&x, depth)?;
            src_one_hot.push(&xt_one_hot.flatten_all()?.to_vec1::<f64>()?, depth)?;
            tgt_one_hot.push(&x0.flatten_all()?.to_vec1::<f64>()?, depth)?;
            q_x.push(&probs.flatten_all()?.to_vec1::<f64>()?, depth)?;
        }

        let pad_id = self.tokenizer.pad_id();
        // one-hot MSA padding carries the pad id, matching the token tensors
        let one_hot_pad = pad_id as f64;
        let n = timesteps.len();
        tracing::debug!(
            batch_size = n,
            num_seqs = self.num_seqs,
            max_len = tgt.max_len(),
            "collated D3PM MSA batch"
        );
        Ok(TransitionBatch {
            src: src.pad(pad_id, &device)?,
            src_one_hot: src_one_hot.pad(one_hot_pad, &device)?,
            timesteps: Tensor::from_vec(timesteps, n, &device)?,
            tgt: tgt.pad(pad_id, &device)?,
            tgt_one_hot: tgt_one_hot.pad(one_hot_pad, &device)?,
            q: self.schedule.q().clone(),
            q_bar: self.schedule.q_bar().clone(),
            q_x: q_x.pad(0.0, &device)?,
            num_dropped: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::BetaSchedule;
    use crate::tokenizer::ProteinTokenizer;
    use candle_core::Device;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn collater(num_seqs: usize, timesteps: usize) -> Result<D3PMMsaCollater<ProteinTokenizer>> {
        let tokenizer = Arc::new(ProteinTokenizer::msa()?);
        let schedule = TransitionSchedule::uniform(
            tokenizer.num_categories(),
            timesteps,
            BetaSchedule::SohlDickstein,
            &Device::Cpu,
        )?;
        D3PMMsaCollater::new(tokenizer, Arc::new(schedule), num_seqs)
    }

    #[test]
    fn test_msa_batch_shapes_and_padding() -> Result<()> {
        let collater = collater(2, 100)?;
        let k = collater.tokenizer().num_categories();
        let pad_id = collater.tokenizer().pad_id();
        let msas = vec![vec!["MKVLA", "MK-LA"], vec!["AC", "A-"]];
        let batch = collater.collate(&msas, &mut StdRng::seed_from_u64(3))?;

        assert_eq!(batch.src.dims(), &[2, 2, 5]);
        assert_eq!(batch.tgt.dims(), &[2, 2, 5]);
        assert_eq!(batch.src_one_hot.dims(), &[2, 2, 5, k]);
        assert_eq!(batch.tgt_one_hot.dims(), &[2, 2, 5, k]);
        assert_eq!(batch.q_x.dims(), &[2, 2, 5, k]);
        assert_eq!(batch.timesteps.dims(), &[2]);
        assert_eq!(batch.num_dropped, 0);
        for t in batch.timesteps.to_vec1::<u32>()? {
            assert!((1..100).contains(&t));
        }

        // second alignment is padded from column 2 onward
        let tgt_one_hot = batch.tgt_one_hot.get(1)?.to_vec3::<f64>()?;
        let q_x = batch.q_x.get(1)?.to_vec3::<f64>()?;
        let tgt = batch.tgt.get(1)?.to_vec2::<u32>()?;
        for row in 0..2 {
            for col in 2..5 {
                assert_eq!(tgt[row][col], pad_id);
                assert!(tgt_one_hot[row][col].iter().all(|&v| v == pad_id as f64));
                assert!(q_x[row][col].iter().all(|&v| v == 0.0));
            }
            for col in 0..2 {
                let total: f64 = q_x[row][col].iter().sum();
                assert!((total - 1.0).abs() < 1e-6);
            }
        }
        Ok(())
    }

    #[test]
    fn test_one_timestep_per_alignment() -> Result<()> {
        let collater = collater(3, 40)?;
        let msas = vec![vec!["MKVLAG", "MRVLAG", "MKV-AG"]];
        let batch = collater.collate(&msas, &mut StdRng::seed_from_u64(8))?;
        let t = batch.timesteps.to_vec1::<u32>()?[0] as usize;
        let q_bar = collater.schedule().q_bar_at(t)?.to_vec2::<f64>()?;
        let tgt = batch.tgt.squeeze(0)?.to_vec2::<u32>()?;
        let q_x = batch.q_x.squeeze(0)?.to_vec3::<f64>()?;
        for (row, tokens) in tgt.iter().enumerate() {
            for (col, &token) in tokens.iter().enumerate() {
                for (p, expected) in q_x[row][col].iter().zip(&q_bar[token as usize]) {
                    assert!((p - expected).abs() < 1e-12);
                }
            }
        }
        Ok(())
    }

    #[test]
    fn test_depth_errors() -> Result<()> {
        let collater = collater(2, 10)?;
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            collater.collate(&[vec!["MKV", "MKV", "MKV"]], &mut rng),
            Err(DmsError::MsaDepthMismatch { index: 0, .. })
        ));
        assert!(matches!(
            collater.collate(&[vec!["", ""]], &mut rng),
            Err(DmsError::EmptySequence { index: 0 })
        ));
        Ok(())
    }
}
