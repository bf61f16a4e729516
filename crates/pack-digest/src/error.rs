/// Errors produced by digest parsing and hashing.
#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error("invalid hex character at position {position}: '{character}'")]
    InvalidHex { position: usize, character: char },

    #[error("invalid hex length: expected {expected}, got {actual}")]
    InvalidHexLength { expected: usize, actual: usize },

    #[error("invalid digest length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("SHA-1 collision detected")]
    Collision,
}
