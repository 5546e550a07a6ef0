use crate::error::KVError;

/// KVStore is the persistence seam behind the session token.
///
/// Implementations must survive process restarts when used as the real
/// token store ([`crate::RedbStore`]); in-memory fakes are fine for tests.
pub trait KVStore: Send + Sync {
    /// Get the value for a key. Returns None if the key does not exist.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KVError>;

    /// Set a key-value pair, replacing any previous value.
    fn set(&self, key: &str, value: &[u8]) -> Result<(), KVError>;

    /// Delete a key. Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> Result<(), KVError>;

    /// Get a value and decode it as UTF-8.
    fn get_string(&self, key: &str) -> Result<Option<String>, KVError> {
        match self.get(key)? {
            Some(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|_| KVError::Encoding(key.to_string())),
            None => Ok(None),
        }
    }

    /// Store a UTF-8 string value.
    fn set_string(&self, key: &str, value: &str) -> Result<(), KVError> {
        self.set(key, value.as_bytes())
    }
}
