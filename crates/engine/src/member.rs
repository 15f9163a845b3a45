use std::fmt;

use crate::{EngineError, ResultEngine};

/// A group member, identified by email.
///
/// Emails are trimmed and ASCII-lowercased on construction so the same
/// person typed twice with different casing is one member.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Member(String);

impl Member {
    pub fn new(email: &str) -> ResultEngine<Self> {
        let normalized = email.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return Err(EngineError::InvalidMember("email must not be empty".to_string()));
        }
        let mut parts = normalized.split('@');
        let valid = matches!(
            (parts.next(), parts.next(), parts.next()),
            (Some(local), Some(domain), None) if !local.is_empty() && !domain.is_empty()
        );
        if !valid || normalized.chars().any(char::is_whitespace) {
            return Err(EngineError::InvalidMember(format!(
                "invalid email: {normalized}"
            )));
        }
        Ok(Self(normalized))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for Member {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl AsRef<str> for Member {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
