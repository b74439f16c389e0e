//! Cipher configuration

use crate::error::CipherError;
use cmsenvelope_crypto::pbe::{DEFAULT_ITERATIONS, MIN_ITERATIONS};
use cmsenvelope_crypto::SymmetricAlgorithm;
use serde::{Deserialize, Serialize};

const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024; // 1MB
const DEFAULT_STREAM_READ_SIZE: usize = 4096;

/// Options shared by every cipher strategy
///
/// # Examples
///
/// ```
/// use cmsenvelope::{CipherOptions, SymmetricAlgorithm};
///
/// let options = CipherOptions::default()
///     .algorithm(SymmetricAlgorithm::Aes256Cbc)
///     .preferred_chunk_size(64 * 1024);
/// assert_eq!(options.preferred_chunk_size, 64 * 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CipherOptions {
    /// Content encryption algorithm used when encrypting
    pub algorithm: SymmetricAlgorithm,
    /// Chunk size requested from `ChunkCipher`, before block alignment
    pub preferred_chunk_size: usize,
    /// PBKDF2 iteration count for new password recipients
    pub pbkdf2_iterations: u32,
    /// Bytes pulled per read by `IoDataSource`
    pub stream_read_size: usize,
}

impl Default for CipherOptions {
    fn default() -> Self {
        Self {
            algorithm: SymmetricAlgorithm::default(),
            preferred_chunk_size: DEFAULT_CHUNK_SIZE,
            pbkdf2_iterations: DEFAULT_ITERATIONS,
            stream_read_size: DEFAULT_STREAM_READ_SIZE,
        }
    }
}

impl CipherOptions {
    #[must_use]
    pub fn algorithm(mut self, algorithm: SymmetricAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    #[must_use]
    pub fn preferred_chunk_size(mut self, size: usize) -> Self {
        self.preferred_chunk_size = size;
        self
    }

    #[must_use]
    pub fn pbkdf2_iterations(mut self, iterations: u32) -> Self {
        self.pbkdf2_iterations = iterations;
        self
    }

    #[must_use]
    pub fn stream_read_size(mut self, size: usize) -> Self {
        self.stream_read_size = size;
        self
    }

    /// Check the option values against their lower bounds
    pub fn validate(&self) -> Result<(), CipherError> {
        if self.preferred_chunk_size == 0 {
            return Err(CipherError::InvalidArgument(
                "preferred chunk size must be positive".to_string(),
            ));
        }
        if self.pbkdf2_iterations < MIN_ITERATIONS {
            return Err(CipherError::InvalidArgument(format!(
                "PBKDF2 iteration count {} is below the minimum of {}",
                self.pbkdf2_iterations, MIN_ITERATIONS
            )));
        }
        if self.stream_read_size == 0 {
            return Err(CipherError::InvalidArgument(
                "stream read size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, CipherError> {
        let options: Self = serde_json::from_str(json)
            .map_err(|e| CipherError::InvalidArgument(format!("cipher options: {}", e)))?;
        options.validate()?;
        Ok(options)
    }

    pub fn to_json(&self) -> Result<String, CipherError> {
        serde_json::to_string(self)
            .map_err(|e| CipherError::InvalidArgument(format!("cipher options: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = CipherOptions::default();
        assert_eq!(options.algorithm, SymmetricAlgorithm::Aes256Gcm);
        assert_eq!(options.preferred_chunk_size, 1024 * 1024);
        assert_eq!(options.pbkdf2_iterations, 2048);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_json_roundtrip() {
        let options = CipherOptions::default()
            .algorithm(SymmetricAlgorithm::Aes256Cbc)
            .stream_read_size(512);
        let json = options.to_json().unwrap();
        assert!(json.contains("aes256-cbc"));
        assert_eq!(CipherOptions::from_json(&json).unwrap(), options);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let options = CipherOptions::from_json(r#"{"pbkdf2_iterations": 4096}"#).unwrap();
        assert_eq!(options.pbkdf2_iterations, 4096);
        assert_eq!(options.stream_read_size, 4096);
    }

    #[test]
    fn test_validation() {
        assert!(CipherOptions::default()
            .pbkdf2_iterations(10)
            .validate()
            .is_err());
        assert!(CipherOptions::default()
            .preferred_chunk_size(0)
            .validate()
            .is_err());
        assert!(CipherOptions::from_json("{not json").is_err());
    }
}
