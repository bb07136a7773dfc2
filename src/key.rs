use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::borrow::Borrow;
use std::fmt;

/// Opaque API credential. `Debug` is redacted, log [`ApiKey::fingerprint`] instead.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    // Short hash of the key, safe to log
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.0)
    }
}

// Hex of the first 6 bytes of sha256(key)
pub fn fingerprint(raw: &str) -> String {
    let digest = Sha256::digest(raw.as_bytes());
    digest[..6].iter().map(|b| format!("{:02x}", b)).collect()
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey({})", self.fingerprint())
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ApiKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ApiKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for ApiKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ApiKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl PartialEq<str> for ApiKey {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ApiKey {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_secret() {
        let key = ApiKey::from("sk-very-secret");
        let debug = format!("{:?}", key);
        assert!(!debug.contains("sk-very-secret"));
        assert!(debug.contains(&key.fingerprint()));
    }

    #[test]
    fn test_fingerprint_is_stable_and_short() {
        let a = ApiKey::from("alpha");
        assert_eq!(a.fingerprint(), ApiKey::new("alpha").fingerprint());
        assert_eq!(a.fingerprint().len(), 12);
        assert_ne!(a.fingerprint(), ApiKey::from("beta").fingerprint());
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let key = ApiKey::from("k1");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"k1\"");
        assert_eq!(key.to_string(), "k1");
        assert_eq!(key, "k1");
    }
}
