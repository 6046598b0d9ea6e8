//! dms-test-data
//!
//! Sequence, alignment and configuration fixtures embedded in the crate for use in testing.
//!
//! The test files are represented as `TestFile` objects which package the raw bytes
//! and create temporary files for programs to operate on.
use std::fs;
use tempfile::{Builder, NamedTempFile};

#[derive(Debug)]
/// Test File
///
/// Example usage:
///
/// ```ignore
/// // returns (filepath, _tempfile_handle).
/// // _handle ensures the tempfile remains in scope
/// use dms_test_data::TestFile;
/// let (fasta, _temp) = TestFile::sequences_01().create_temp()?;
/// ```
pub struct TestFile {
    filebinary: &'static [u8],
    suffix: &'static str,
}

impl TestFile {
    /// Four protein sequences of varying length, one wrapped over two lines.
    pub fn sequences_01() -> Self {
        Self {
            filebinary: include_bytes!("../data/sequences/sequences_01.fasta"),
            suffix: "fasta",
        }
    }
    /// Five-row a3m alignment of length 20 with lowercase insertions and `.` columns.
    pub fn msa_01() -> Self {
        Self {
            filebinary: include_bytes!("../data/msas/msa_01.a3m"),
            suffix: "a3m",
        }
    }
    /// Four-row a3m alignment of length 11.
    pub fn msa_02() -> Self {
        Self {
            filebinary: include_bytes!("../data/msas/msa_02.a3m"),
            suffix: "a3m",
        }
    }
    pub fn config_autoreg() -> Self {
        Self {
            filebinary: include_bytes!("../data/configs/config_autoreg.json"),
            suffix: "json",
        }
    }
    /// Uniform D3PM, 100 timesteps, seeded.
    pub fn config_random() -> Self {
        Self {
            filebinary: include_bytes!("../data/configs/config_random.json"),
            suffix: "json",
        }
    }
    /// BLOSUM D3PM, 500 timesteps.
    pub fn config_blosum() -> Self {
        Self {
            filebinary: include_bytes!("../data/configs/config_blosum.json"),
            suffix: "json",
        }
    }

    /// Raw file contents.
    pub fn contents(&self) -> &'static [u8] {
        self.filebinary
    }

    pub fn create_temp(&self) -> std::io::Result<(String, NamedTempFile)> {
        let temp = Builder::new()
            .suffix(&format!(".{}", self.suffix))
            .tempfile()?;

        fs::write(&temp, self.filebinary)?;
        let path = temp.path().to_string_lossy().into_owned();

        Ok((path, temp))
    }
}
