//! Ragged-to-rectangular padding for sequence and MSA batches.
//!
//! `RaggedBatch` keeps every example of a batch in one contiguous buffer with an
//! offset/length index. An entry is `[num_seqs?, length, categories?]` in row-major
//! order; only `length` varies between entries. Padding is one bulk copy per
//! (entry, sequence) lane into a buffer pre-filled with the pad value.
use crate::error::{DmsError, Result};
use candle_core::{DType, Device, Tensor, WithDType};

#[derive(Debug, Clone)]
pub struct RaggedBatch<T> {
    values: Vec<T>,
    offsets: Vec<usize>,
    lengths: Vec<usize>,
    num_seqs: Option<usize>,
    categories: Option<usize>,
}

impl<T: WithDType> RaggedBatch<T> {
    fn with_axes(num_seqs: Option<usize>, categories: Option<usize>) -> Self {
        Self {
            values: Vec::new(),
            offsets: Vec::new(),
            lengths: Vec::new(),
            num_seqs,
            categories,
        }
    }

    /// Entries are `[length]`, padded to `[batch, max_len]`.
    pub fn sequences() -> Self {
        Self::with_axes(None, None)
    }

    /// Entries are `[length, categories]`, padded to `[batch, max_len, categories]`.
    pub fn one_hot(categories: usize) -> Self {
        Self::with_axes(None, Some(categories))
    }

    /// Entries are `[num_seqs, length]`, padded to `[batch, num_seqs, max_len]`.
    pub fn msa(num_seqs: usize) -> Self {
        Self::with_axes(Some(num_seqs), None)
    }

    /// Entries are `[num_seqs, length, categories]`.
    pub fn msa_one_hot(num_seqs: usize, categories: usize) -> Self {
        Self::with_axes(Some(num_seqs), Some(categories))
    }

    fn lanes(&self) -> usize {
        self.num_seqs.unwrap_or(1)
    }

    fn width(&self) -> usize {
        self.categories.unwrap_or(1)
    }

    /// Append one entry of ragged `length`.
    pub fn push(&mut self, values: &[T], length: usize) -> Result<()> {
        let expected = self.lanes() * length * self.width();
        if values.len() != expected {
            return Err(DmsError::ShapeMismatch {
                expected: vec![expected],
                actual: vec![values.len()],
            });
        }
        self.offsets.push(self.values.len());
        self.lengths.push(length);
        self.values.extend_from_slice(values);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }

    pub fn lengths(&self) -> &[usize] {
        &self.lengths
    }

    pub fn max_len(&self) -> usize {
        self.lengths.iter().copied().max().unwrap_or(0)
    }

    /// The raw values of entry `index`.
    pub fn entry(&self, index: usize) -> Option<&[T]> {
        let offset = *self.offsets.get(index)?;
        let size = self.lanes() * self.lengths[index] * self.width();
        Some(&self.values[offset..offset + size])
    }

    pub fn pad(&self, pad_value: T, device: &Device) -> Result<Tensor> {
        self.pad_to(self.max_len(), pad_value, device)
    }

    /// Pad every entry to `max_len` along the ragged axis.
    pub fn pad_to(&self, max_len: usize, pad_value: T, device: &Device) -> Result<Tensor> {
        if self.is_empty() {
            return Err(DmsError::EmptyBatch);
        }
        if let Some(&longest) = self.lengths.iter().find(|&&l| l > max_len) {
            return Err(DmsError::ShapeMismatch {
                expected: vec![max_len],
                actual: vec![longest],
            });
        }

        let (lanes, width) = (self.lanes(), self.width());
        let mut out = vec![pad_value; self.len() * lanes * max_len * width];
        for (i, (&offset, &length)) in self.offsets.iter().zip(&self.lengths).enumerate() {
            let row = length * width;
            for lane in 0..lanes {
                let src = offset + lane * row;
                let dst = (i * lanes + lane) * max_len * width;
                out[dst..dst + row].copy_from_slice(&self.values[src..src + row]);
            }
        }

        let mut shape = vec![self.len()];
        shape.extend(self.num_seqs);
        shape.push(max_len);
        shape.extend(self.categories);
        Ok(Tensor::from_vec(out, shape, device)?)
    }
}

/// Pad a batch of rank-1 (`[len]`) or rank-2 (`[len, categories]`) tensors to
/// `[batch, max_len(, categories)]`, filling with `pad_value`.
pub fn pad_sequences(batch: &[Tensor], pad_value: f64) -> Result<Tensor> {
    let first = batch.first().ok_or(DmsError::EmptyBatch)?;
    let mut ragged = match first.rank() {
        1 => RaggedBatch::<f64>::sequences(),
        2 => RaggedBatch::one_hot(first.dim(1)?),
        rank => return Err(DmsError::UnsupportedRank(rank)),
    };
    for t in batch {
        if t.rank() != first.rank() {
            return Err(DmsError::UnsupportedRank(t.rank()));
        }
        if t.rank() == 2 && t.dim(1)? != first.dim(1)? {
            return Err(DmsError::ShapeMismatch {
                expected: first.dims()[1..].to_vec(),
                actual: t.dims()[1..].to_vec(),
            });
        }
        ragged.push(&to_f64_values(t)?, t.dim(0)?)?;
    }
    Ok(ragged.pad(pad_value, first.device())?.to_dtype(first.dtype())?)
}

/// Pad a batch of MSAs, rank-2 (`[num_seqs, depth]`) or rank-3
/// (`[num_seqs, depth, categories]`), to `[batch, num_seqs, max_len(, categories)]`.
pub fn pad_msa(batch: &[Tensor], num_seqs: usize, max_len: usize, pad_value: f64) -> Result<Tensor> {
    let first = batch.first().ok_or(DmsError::EmptyBatch)?;
    let mut ragged = match first.rank() {
        2 => RaggedBatch::<f64>::msa(num_seqs),
        3 => RaggedBatch::msa_one_hot(num_seqs, first.dim(2)?),
        rank => return Err(DmsError::UnsupportedRank(rank)),
    };
    for (index, t) in batch.iter().enumerate() {
        if t.rank() != first.rank() {
            return Err(DmsError::UnsupportedRank(t.rank()));
        }
        if t.dim(0)? != num_seqs {
            return Err(DmsError::MsaDepthMismatch {
                index,
                expected: num_seqs,
                actual: t.dim(0)?,
            });
        }
        if t.rank() == 3 && t.dim(2)? != first.dim(2)? {
            return Err(DmsError::ShapeMismatch {
                expected: first.dims()[2..].to_vec(),
                actual: t.dims()[2..].to_vec(),
            });
        }
        ragged.push(&to_f64_values(t)?, t.dim(1)?)?;
    }
    Ok(ragged
        .pad_to(max_len, pad_value, first.device())?
        .to_dtype(first.dtype())?)
}

/// Drop every element equal to `pad_value` and return the rest, flattened, in order.
///
/// Only meaningful when `pad_value` cannot occur in real data: token tensors padded with
/// the pad id are safe, one-hot tensors padded with 0 are not.
pub fn unpad(x: &Tensor, pad_value: f64) -> Result<Tensor> {
    let kept: Vec<f64> = to_f64_values(x)?
        .into_iter()
        .filter(|&v| v != pad_value)
        .collect();
    let n = kept.len();
    Ok(Tensor::from_vec(kept, n, x.device())?.to_dtype(x.dtype())?)
}

/// `unpad` applied to each entry along the batch axis.
pub fn unpad_rows(x: &Tensor, pad_value: f64) -> Result<Vec<Tensor>> {
    (0..x.dim(0)?)
        .map(|i| unpad(&x.get(i)?, pad_value))
        .collect()
}

fn to_f64_values(t: &Tensor) -> Result<Vec<f64>> {
    Ok(t.flatten_all()?.to_dtype(DType::F64)?.to_vec1::<f64>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const PAD: u32 = 30;

    #[test]
    fn test_ragged_tokens() -> Result<()> {
        let mut ragged = RaggedBatch::<u32>::sequences();
        ragged.push(&[1, 2, 3], 3)?;
        ragged.push(&[4], 1)?;
        ragged.push(&[], 0)?;
        assert_eq!(ragged.len(), 3);
        assert_eq!(ragged.max_len(), 3);
        assert_eq!(ragged.entry(1), Some(&[4u32][..]));

        let padded = ragged.pad(PAD, &Device::Cpu)?;
        assert_eq!(padded.dims(), &[3, 3]);
        assert_eq!(
            padded.to_vec2::<u32>()?,
            vec![vec![1, 2, 3], vec![4, PAD, PAD], vec![PAD, PAD, PAD]]
        );
        Ok(())
    }

    #[test]
    fn test_ragged_push_checks_size() {
        let mut ragged = RaggedBatch::<f64>::one_hot(4);
        assert!(matches!(
            ragged.push(&[1.0, 0.0, 0.0], 1),
            Err(DmsError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_ragged_msa_one_hot_layout() -> Result<()> {
        // two sequences of length 1 and 2 categories, padded to length 2
        let mut ragged = RaggedBatch::<f64>::msa_one_hot(2, 2);
        ragged.push(&[1.0, 0.0, 0.0, 1.0], 1)?;
        let padded = ragged.pad_to(2, -1.0, &Device::Cpu)?;
        assert_eq!(padded.dims(), &[1, 2, 2, 2]);
        assert_eq!(
            padded.flatten_all()?.to_vec1::<f64>()?,
            vec![1.0, 0.0, -1.0, -1.0, 0.0, 1.0, -1.0, -1.0]
        );
        assert!(matches!(
            ragged.pad_to(0, 0.0, &Device::Cpu),
            Err(DmsError::ShapeMismatch { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_pad_unpad_roundtrip() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let batch_size = rng.gen_range(1..8);
            let batch: Vec<Tensor> = (0..batch_size)
                .map(|_| {
                    let len = rng.gen_range(0..12);
                    let ids: Vec<u32> = (0..len).map(|_| rng.gen_range(0..27)).collect();
                    Tensor::from_vec(ids, len, &Device::Cpu)
                })
                .collect::<candle_core::Result<_>>()?;

            let padded = pad_sequences(&batch, PAD as f64)?;
            let max_len = batch.iter().map(|t| t.dim(0).unwrap()).max().unwrap();
            assert_eq!(padded.dims(), &[batch_size, max_len]);
            assert_eq!(padded.dtype(), DType::U32);

            let rows = unpad_rows(&padded, PAD as f64)?;
            assert_eq!(rows.len(), batch.len());
            for (row, original) in rows.iter().zip(&batch) {
                assert_eq!(row.to_vec1::<u32>()?, original.to_vec1::<u32>()?);
            }
            let flat: Vec<u32> = batch
                .iter()
                .flat_map(|t| t.to_vec1::<u32>().unwrap())
                .collect();
            assert_eq!(unpad(&padded, PAD as f64)?.to_vec1::<u32>()?, flat);
        }
        Ok(())
    }

    #[test]
    fn test_pad_one_hot_sequences() -> Result<()> {
        let a = Tensor::ones((3, 5), DType::F64, &Device::Cpu)?;
        let b = Tensor::ones((1, 5), DType::F64, &Device::Cpu)?;
        let padded = pad_sequences(&[a, b], 0.0)?;
        assert_eq!(padded.dims(), &[2, 3, 5]);
        let values = padded.to_vec3::<f64>()?;
        assert_eq!(values[1][0], vec![1.0; 5]);
        assert_eq!(values[1][2], vec![0.0; 5]);
        Ok(())
    }

    #[test]
    fn test_pad_sequences_errors() -> Result<()> {
        assert!(matches!(pad_sequences(&[], 0.0), Err(DmsError::EmptyBatch)));

        let cube = Tensor::zeros((2, 2, 2), DType::F64, &Device::Cpu)?;
        assert!(matches!(
            pad_sequences(&[cube], 0.0),
            Err(DmsError::UnsupportedRank(3))
        ));

        let a = Tensor::zeros((2, 4), DType::F64, &Device::Cpu)?;
        let b = Tensor::zeros((2, 5), DType::F64, &Device::Cpu)?;
        assert!(matches!(
            pad_sequences(&[a, b], 0.0),
            Err(DmsError::ShapeMismatch { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_pad_msa() -> Result<()> {
        let long = Tensor::from_vec(vec![1u32, 2, 3, 4, 5, 6], (2, 3), &Device::Cpu)?;
        let short = Tensor::from_vec(vec![7u32, 8], (2, 1), &Device::Cpu)?;
        let padded = pad_msa(&[long, short], 2, 3, PAD as f64)?;
        assert_eq!(padded.dims(), &[2, 2, 3]);
        assert_eq!(
            padded.to_vec3::<u32>()?,
            vec![
                vec![vec![1, 2, 3], vec![4, 5, 6]],
                vec![vec![7, PAD, PAD], vec![8, PAD, PAD]],
            ]
        );

        let one_hot = Tensor::ones((2, 1, 4), DType::F64, &Device::Cpu)?;
        let padded = pad_msa(&[one_hot], 2, 3, PAD as f64)?;
        assert_eq!(padded.dims(), &[1, 2, 3, 4]);
        let values = padded.flatten_all()?.to_vec1::<f64>()?;
        assert_eq!(&values[0..4], &[1.0; 4]);
        assert_eq!(&values[4..12], &[PAD as f64; 8]);
        Ok(())
    }

    #[test]
    fn test_pad_msa_errors() -> Result<()> {
        let flat = Tensor::zeros(4, DType::U32, &Device::Cpu)?;
        assert!(matches!(
            pad_msa(&[flat], 1, 4, 0.0),
            Err(DmsError::UnsupportedRank(1))
        ));
        let msa = Tensor::zeros((3, 4), DType::U32, &Device::Cpu)?;
        assert!(matches!(
            pad_msa(&[msa], 2, 4, 0.0),
            Err(DmsError::MsaDepthMismatch {
                index: 0,
                expected: 2,
                actual: 3
            })
        ));
        Ok(())
    }
}
