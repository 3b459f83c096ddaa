// file: src/models/credential.rs
// description: opaque access token that never prints its value
// reference: https://docs.rs/serde

use serde::{Deserialize, Deserializer};
use std::fmt;

/// Access token for a GitHub organization.
///
/// `Debug` and `Display` render `***`; the raw token is only reachable
/// through [`Credential::expose`], which is called when building an
/// authenticated URL or request header.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns `None` for empty or whitespace-only tokens, which count as
    /// absent in environment bindings.
    pub fn from_optional(token: Option<String>) -> Option<Self> {
        token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .map(Self)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

impl<'de> Deserialize<'de> for Credential {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Self(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_is_redacted() {
        let cred = Credential::new("ghp_secret");
        assert_eq!(format!("{}", cred), "***");
        assert_eq!(format!("{:?}", cred), "Credential(***)");
        assert_eq!(cred.expose(), "ghp_secret");
    }

    #[test]
    fn test_blank_token_is_absent() {
        assert!(Credential::from_optional(None).is_none());
        assert!(Credential::from_optional(Some("   ".to_string())).is_none());
        assert_eq!(
            Credential::from_optional(Some(" tok ".to_string())),
            Some(Credential::new("tok"))
        );
    }
}
