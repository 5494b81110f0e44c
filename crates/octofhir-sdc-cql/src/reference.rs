//! Library member references

use crate::error::ResolutionError;
use std::fmt;

/// A parsed `"Library"."Member"` reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LibraryReference {
    pub library: String,
    pub member: String,
}

impl LibraryReference {
    /// Parse a reference by stripping `"` and splitting on `.`
    ///
    /// Anything other than exactly two non-empty parts is rejected with
    /// [`ResolutionError::InvalidReference`]; names containing dots cannot be
    /// expressed.
    pub fn parse(reference: &str) -> Result<Self, ResolutionError> {
        let stripped = reference.replace('"', "");
        let invalid = || ResolutionError::InvalidReference {
            reference: reference.to_string(),
        };

        let mut parts = stripped.split('.').map(str::trim);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(library), Some(member), None) if !library.is_empty() && !member.is_empty() => {
                Ok(Self {
                    library: library.to_string(),
                    member: member.to_string(),
                })
            }
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for LibraryReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\".\"{}\"", self.library, self.member)
    }
}

/// Parse a reference into its `(library, member)` pair
pub fn parse_reference(reference: &str) -> Result<(String, String), ResolutionError> {
    LibraryReference::parse(reference).map(|r| (r.library, r.member))
}
