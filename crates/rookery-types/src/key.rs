//! Cache key scheme.
//!
//! A status is identified by `(id, origin instance)`: the same logical post
//! fetched through the home instance and directly from its origin yields two
//! distinct keys, and no cross-instance de-duplication is attempted.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The federated server a resource is considered to belong to.
///
/// Hosts are normalized to lowercase with surrounding whitespace and any
/// trailing slash removed, so `Mastodon.Social` and `mastodon.social/`
/// produce the same key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct InstanceHost(String);

impl InstanceHost {
    pub fn new(host: &str) -> Self {
        Self(host.trim().trim_end_matches('/').to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for InstanceHost {
    fn from(host: &str) -> Self {
        Self::new(host)
    }
}

impl fmt::Display for InstanceHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key of a status (or account) in the client-side cache.
///
/// `<host>/<id>` when an origin instance is given, the bare id otherwise;
/// the bare form means "current authenticated instance". Construction is
/// pure and total, and injective over `(id, instance)` pairs since ids
/// never contain `/`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct StatusKey(String);

impl StatusKey {
    pub fn new(id: &str, instance: Option<&InstanceHost>) -> Self {
        match instance {
            Some(host) => Self(format!("{}/{}", host.as_str(), id)),
            None => Self(id.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StatusKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_key_without_instance() {
        assert_eq!(StatusKey::new("12345", None).as_str(), "12345");
    }

    #[test]
    fn prefixed_key_with_instance() {
        let host = InstanceHost::new("corvid.social");
        assert_eq!(
            StatusKey::new("12345", Some(&host)).as_str(),
            "corvid.social/12345"
        );
    }

    #[test]
    fn keys_are_stable_and_distinct_per_instance() {
        let a = InstanceHost::new("a.example");
        let b = InstanceHost::new("b.example");
        let k1 = StatusKey::new("9", Some(&a));
        let k2 = StatusKey::new("9", Some(&a));
        assert_eq!(k1, k2);
        assert_ne!(k1, StatusKey::new("9", Some(&b)));
        assert_ne!(k1, StatusKey::new("9", None));
    }

    #[test]
    fn host_normalization() {
        assert_eq!(
            InstanceHost::new(" Mastodon.Social/ "),
            InstanceHost::new("mastodon.social")
        );
    }
}
