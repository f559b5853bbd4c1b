use thiserror::Error;

pub type Result<T> = std::result::Result<T, HeError>;

/// Failure taxonomy of the engine. Noise exhaustion is deliberately not
/// represented: decrypting a ciphertext whose noise budget reached zero
/// yields an undetectably wrong plaintext, and callers are expected to
/// watch `Decryptor::invariant_noise_budget`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeError {
    /// Encryption parameters fail validation.
    #[error("invalid encryption parameters: {0}")]
    InvalidParameters(String),

    /// Operands were produced under different encryption parameters.
    #[error("parameter mismatch: {0}")]
    ParameterMismatch(String),

    /// Key generation was asked for something it cannot produce.
    #[error("key generation error: {0}")]
    KeyGenerationError(String),

    /// An operation needs key material the supplied key set does not hold.
    #[error("insufficient evaluation keys: {0}")]
    InsufficientEvaluationKeys(String),

    /// Batching requested under parameters that do not qualify for it.
    #[error("batching not supported: {0}")]
    BatchingNotSupported(String),

    /// A value cannot be represented by the encoder.
    #[error("encoding overflow: {0}")]
    EncodingOverflow(String),

    /// A plaintext decodes outside the output type's range.
    #[error("decoding overflow: {0}")]
    DecodingOverflow(String),

    /// A plaintext polynomial exceeds the ring degree.
    #[error("plaintext too large: degree {degree} exceeds limit {limit}")]
    PlaintextTooLarge { degree: usize, limit: usize },

    /// Automatic parameter selection found no candidate meeting the noise
    /// floor.
    #[error("no feasible parameters: {0}")]
    NoFeasibleParameters(String),

    /// No standard parameters exist for the requested degree and security
    /// level.
    #[error("parameters not available: {0}")]
    ParametersNotAvailable(String),
}
