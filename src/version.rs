//! Version selectors and their resolution against a registry

use std::fmt;
use std::num::NonZeroU32;

use tracing::debug;

use crate::error::{Error, Result};
use crate::registry::RegistryClient;

/// Literal selecting the registry's currently published version
pub const LATEST: &str = "latest";

/// Which version of a subject to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSelector {
    /// Whatever the registry reports as latest at lookup time
    Latest,
    /// An exact registry version
    Exact(NonZeroU32),
}

impl VersionSelector {
    /// Parse a configured selector for `subject`.
    ///
    /// Accepts `"latest"` or a positive decimal integer.
    pub fn parse(subject: &str, selector: &str) -> Result<Self> {
        if selector == LATEST {
            return Ok(Self::Latest);
        }

        selector
            .parse::<u32>()
            .ok()
            .and_then(NonZeroU32::new)
            .map(Self::Exact)
            .ok_or_else(|| Error::VersionFormat {
                subject: subject.to_string(),
                selector: selector.to_string(),
            })
    }

    /// Fetch the raw schema text this selector points at.
    ///
    /// Registry failures are passed through unchanged; there is no retry.
    pub fn resolve(&self, client: &dyn RegistryClient, subject: &str) -> Result<String> {
        debug!(subject, version = %self, "fetching schema");

        let fetched = match self {
            Self::Latest => client.fetch_latest(subject),
            Self::Exact(version) => client.fetch_version(subject, *version),
        };

        fetched.map_err(|source| Error::RegistryFetch {
            subject: subject.to_string(),
            selector: self.to_string(),
            source,
        })
    }
}

impl fmt::Display for VersionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => f.write_str(LATEST),
            Self::Exact(v) => write!(f, "{}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MemoryRegistry;

    #[test]
    fn test_parse_latest_and_exact() {
        assert_eq!(VersionSelector::parse("s", "latest").unwrap(), VersionSelector::Latest);
        assert_eq!(
            VersionSelector::parse("s", "7").unwrap(),
            VersionSelector::Exact(NonZeroU32::new(7).unwrap())
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", "0", "-1", "1.5", "Latest", "LATEST", "v2", " 3", "abc", "99999999999"] {
            match VersionSelector::parse("orders-value", bad) {
                Err(Error::VersionFormat { subject, selector }) => {
                    assert_eq!(subject, "orders-value");
                    assert_eq!(selector, bad);
                }
                other => panic!("expected VersionFormat for {:?}, got {:?}", bad, other),
            }
        }
    }

    #[test]
    fn test_resolve_exact_and_latest() {
        let registry = MemoryRegistry::new();
        registry.publish("orders-value", "\"string\"");
        registry.publish("orders-value", "\"long\"");

        let exact = VersionSelector::parse("orders-value", "1").unwrap();
        assert_eq!(exact.resolve(&registry, "orders-value").unwrap(), "\"string\"");

        let latest = VersionSelector::Latest;
        assert_eq!(latest.resolve(&registry, "orders-value").unwrap(), "\"long\"");
        assert_eq!(registry.calls(), 2);
    }

    #[test]
    fn test_resolve_missing_is_registry_fetch() {
        let registry = MemoryRegistry::new();
        let err = VersionSelector::Latest.resolve(&registry, "missing").unwrap_err();
        assert!(matches!(err, Error::RegistryFetch { ref subject, .. } if subject == "missing"));
    }
}
