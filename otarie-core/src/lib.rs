//! BFV homomorphic-encryption evaluation engine.
//!
//! The pipeline runs parameter validation ([`EncryptionParameters`] into a
//! shared [`Context`]), key generation ([`KeyGenerator`]), encoding
//! ([`IntegerEncoder`], [`FractionalEncoder`], [`BatchEncoder`]),
//! encryption ([`Encryptor`]), homomorphic arithmetic ([`Evaluator`]) and
//! decryption with noise-budget tracking ([`Decryptor`]). The chooser
//! ([`ChooserEvaluator`]) predicts workable parameters for a computation
//! before any key material exists.

pub mod chooser;
pub mod ciphertext;
pub mod context;
pub mod decryptor;
pub mod encoder;
pub mod encryptor;
pub mod error;
pub mod evaluator;
pub mod keygen;
pub mod keys;
pub mod params;
pub mod plaintext;
pub mod scratch;
pub mod serialize;
pub mod simulator;
pub mod tables;

mod sample;

pub use chooser::{ChooserEncoder, ChooserEvaluator, ChooserPoly, Computation};
pub use ciphertext::Ciphertext;
pub use context::Context;
pub use decryptor::Decryptor;
pub use encoder::{BatchEncoder, FractionalEncoder, IntegerEncoder};
pub use encryptor::Encryptor;
pub use error::{HeError, Result};
pub use evaluator::Evaluator;
pub use keygen::KeyGenerator;
pub use keys::{EvaluationKeySet, GaloisKeySet, PublicKey, SecretKey};
pub use params::{EncryptionParameters, ParameterQualifiers};
pub use plaintext::Plaintext;
pub use scratch::{global_pool, GlobalPool, Scratch, ScratchOwned};
pub use simulator::Simulation;
pub use tables::{primes_of_size, standard_parameters, SecurityLevel};
