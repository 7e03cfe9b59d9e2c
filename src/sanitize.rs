//! Structural validation of decoded wire data.
//!
//! Deserialization only proves the bytes parse. `Sanitize` checks that the
//! parsed values are consistent with each other, chiefly that every index
//! a message carries points inside the table it indexes. Signature
//! verification is a separate pass and is not part of sanitization.

use thiserror::Error;

#[derive(PartialEq, Debug, Error, Eq, Clone)]
pub enum SanitizeError {
    #[error("index points outside its table")]
    IndexOutOfBounds,
    #[error("value exceeds its allowed range")]
    ValueOutOfBounds,
    #[error("value is inconsistent with the rest of the message")]
    InvalidValue,
}

/// Post-decode consistency check.
///
/// Implementations descend through their members, so one call at the top of
/// a structure covers everything nested inside it. Leaf types with no
/// internal invariants keep the no-op default.
pub trait Sanitize {
    fn sanitize(&self) -> Result<(), SanitizeError> {
        Ok(())
    }
}

impl<T: Sanitize> Sanitize for Vec<T> {
    fn sanitize(&self) -> Result<(), SanitizeError> {
        self.iter().try_for_each(Sanitize::sanitize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SmallIndex(u8);

    impl Sanitize for SmallIndex {
        fn sanitize(&self) -> Result<(), SanitizeError> {
            if self.0 > 9 {
                return Err(SanitizeError::IndexOutOfBounds);
            }
            Ok(())
        }
    }

    #[test]
    fn test_vec_sanitize_checks_every_element() {
        assert_eq!(vec![SmallIndex(0), SmallIndex(9)].sanitize(), Ok(()));
        assert_eq!(
            vec![SmallIndex(0), SmallIndex(10)].sanitize(),
            Err(SanitizeError::IndexOutOfBounds)
        );
    }
}
