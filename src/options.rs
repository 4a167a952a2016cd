//! Marshaling options.

use crate::error::{Error, Result};
use crate::protocol::constants::{MAX_BYTE_CHUNK_SIZE, MAX_CHAR_CHUNK_SIZE};

/// Tunables for chunked transfers and structured marshaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarshalOptions {
    /// Bytes moved per chunk when copying binary large objects (default: 8000).
    pub byte_chunk_size: usize,
    /// UTF-16 units moved per chunk when copying character large objects (default: 4000).
    pub char_chunk_size: usize,
}

impl Default for MarshalOptions {
    fn default() -> Self {
        Self {
            byte_chunk_size: MAX_BYTE_CHUNK_SIZE,
            char_chunk_size: MAX_CHAR_CHUNK_SIZE,
        }
    }
}

impl MarshalOptions {
    /// Create options with the wire maxima.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the binary chunk size.
    ///
    /// # Example
    ///
    /// ```
    /// use smi_marshal::MarshalOptions;
    ///
    /// let options = MarshalOptions::new().with_byte_chunk_size(512);
    /// assert!(options.validate().is_ok());
    /// ```
    pub fn with_byte_chunk_size(mut self, size: usize) -> Self {
        self.byte_chunk_size = size;
        self
    }

    /// Set the character chunk size.
    pub fn with_char_chunk_size(mut self, size: usize) -> Self {
        self.char_chunk_size = size;
        self
    }

    /// Check chunk sizes against the wire limits.
    pub fn validate(&self) -> Result<()> {
        if self.byte_chunk_size == 0 || self.byte_chunk_size > MAX_BYTE_CHUNK_SIZE {
            return Err(Error::invalid_argument(
                "byte_chunk_size",
                format!("{} is outside 1..={}", self.byte_chunk_size, MAX_BYTE_CHUNK_SIZE),
            ));
        }
        if self.char_chunk_size == 0 || self.char_chunk_size > MAX_CHAR_CHUNK_SIZE {
            return Err(Error::invalid_argument(
                "char_chunk_size",
                format!("{} is outside 1..={}", self.char_chunk_size, MAX_CHAR_CHUNK_SIZE),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = MarshalOptions::default();
        assert_eq!(options.byte_chunk_size, 8000);
        assert_eq!(options.char_chunk_size, 4000);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let options = MarshalOptions::new().with_byte_chunk_size(0);
        match options.validate() {
            Err(Error::InvalidArgument { argument, .. }) => assert_eq!(argument, "byte_chunk_size"),
            _ => panic!("Expected InvalidArgument error"),
        }

        let options = MarshalOptions::new().with_char_chunk_size(4001);
        assert!(options.validate().is_err());
    }
}
