//! UUID utilities

use uuid::Uuid;

use crate::{Error, Result};

/// Generate a new UUIDv4
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

/// Parse an identifier supplied by a caller
///
/// Malformed ids are a validation error naming the offending field.
pub fn parse_id(field: &str, s: &str) -> Result<Uuid> {
    Uuid::parse_str(s.trim())
        .map_err(|_| Error::Validation(format!("{} is not a valid id: {:?}", field, s)))
}

/// Parse an identifier read back from storage
pub fn parse_stored(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| Error::Config(format!("corrupt id in database {:?}: {}", s, e)))
}
