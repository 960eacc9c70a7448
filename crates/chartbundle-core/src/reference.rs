//! Container image references
//!
//! Parsing and Docker Hub normalization are delegated to `oci_distribution`,
//! so `nginx:1.25` and `docker.io/library/nginx:1.25` are the same image.
//! Only a tag written in the raw token is reported; the implicit `latest`
//! that the parser assumes for bare names is not.

use oci_distribution::Reference;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{CoreError, Result};

/// A parsed, normalized container image reference
#[derive(Debug, Clone)]
pub struct ImageReference {
    inner: Reference,
    explicit_tag: bool,
}

impl ImageReference {
    /// Parse a reference of the form `[registry/]repository[:tag][@digest]`
    pub fn parse(raw: &str) -> Result<Self> {
        let inner: Reference = raw.parse().map_err(|e| CoreError::InvalidReference {
            raw: raw.to_string(),
            reason: format!("{}", e),
        })?;
        Ok(Self {
            inner,
            explicit_tag: has_explicit_tag(raw),
        })
    }

    /// Registry host, e.g. `quay.io` or `docker.io`
    pub fn registry(&self) -> &str {
        self.inner.registry()
    }

    /// Repository path below the registry, e.g. `library/nginx`
    pub fn repository(&self) -> &str {
        self.inner.repository()
    }

    /// Full repository name without tag or digest, e.g. `docker.io/library/nginx`
    pub fn name(&self) -> String {
        format!("{}/{}", self.registry(), self.repository())
    }

    /// Final path segment of the repository, e.g. `nginx`
    pub fn basename(&self) -> &str {
        let repository = self.repository();
        repository.rsplit('/').next().unwrap_or(repository)
    }

    pub fn tag(&self) -> Option<&str> {
        self.inner.tag().filter(|_| self.explicit_tag)
    }

    pub fn digest(&self) -> Option<&str> {
        self.inner.digest()
    }
}

/// Whether the last path segment, before any digest, carries `:tag`
///
/// A colon in an earlier segment is a registry port, as in `localhost:5000/app`.
fn has_explicit_tag(raw: &str) -> bool {
    let name = raw.split_once('@').map_or(raw, |(name, _)| name);
    name.rsplit('/').next().is_some_and(|segment| segment.contains(':'))
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())?;
        if let Some(tag) = self.tag() {
            write!(f, ":{}", tag)?;
        }
        if let Some(digest) = self.digest() {
            write!(f, "@{}", digest)?;
        }
        Ok(())
    }
}

impl PartialEq for ImageReference {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Eq for ImageReference {}

impl Hash for ImageReference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_string().hash(state);
    }
}
