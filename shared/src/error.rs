//! Errors from the library.
use core::{error, fmt};

/// Errors returned by this library.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum OwnershipError {
    /// The managed object is gone: the last strong handle of its ownership group has been released, or there never
    /// was one.
    Expired,
}

impl fmt::Display for OwnershipError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{:?}", self)
    }
}

impl error::Error for OwnershipError {}
