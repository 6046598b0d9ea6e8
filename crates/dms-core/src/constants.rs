//! Alphabet constants shared by the tokenizer and the BLOSUM parser.

/// The 20 canonical amino acids.
pub const CAN_AAS: &str = "ACDEFGHIKLMNPQRSTVWY";
/// Ambiguity codes.
pub const AMB_AAS: &str = "BZX";
/// Non-standard residues.
pub const OTHER_AAS: &str = "JOU";

pub const GAP: char = '-';
pub const STOP: char = '*';
pub const START: char = '@';
pub const MASK: char = '#';
pub const MSA_PAD: char = '!';

/// Residues that take part in diffusion for single sequences (K = 26).
pub const SEQUENCE_AAS: &str = "ACDEFGHIKLMNPQRSTVWYBZXJOU";
/// Residues plus the gap token, used for MSAs (K = 27).
pub const MSA_AAS: &str = "ACDEFGHIKLMNPQRSTVWYBZXJOU-";
/// Full token alphabet. Special tokens sit after every diffusing category.
pub const MSA_ALPHABET: &str = "ACDEFGHIKLMNPQRSTVWYBZXJOU-*@#!";

/// Symbol whose scores stand in for residues a substitution matrix does not list.
pub const BLOSUM_FALLBACK: char = 'X';

/// Row-sum tolerance for transition matrices.
pub const ROW_SUM_TOLERANCE: f64 = 1e-6;
