//! Address algebra for `scheme://bucket/key` paths
//!
//! Everything here is pure string manipulation: no store access, no I/O.
//! Keys keep their trailing `/` because that is how object stores mark an
//! otherwise empty directory.

use crate::{FsError, Result};
use std::cmp::Ordering;
use std::fmt;

/// Scheme used when none is configured
pub const DEFAULT_SCHEME: &str = "gs";

const SCHEME_SEPARATOR: &str = "://";

/// A parsed `scheme://bucket/key` address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    scheme: String,
    bucket: String,
    key: String,
}

impl Address {
    /// Bucket name, never empty
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Key inside the bucket; empty for the bucket root
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Last non-empty segment of the key, ignoring one trailing `/`
    pub fn basename(&self) -> &str {
        let key = self.key.strip_suffix('/').unwrap_or(&self.key);
        key.rsplit('/').next().unwrap_or_default()
    }

    /// Whether the address names the bucket itself
    pub fn is_bucket_root(&self) -> bool {
        self.key.is_empty()
    }

    /// Whether the key carries directory intent (trailing `/`)
    pub fn is_dir_key(&self) -> bool {
        self.key.is_empty() || self.key.ends_with('/')
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.key.is_empty() {
            write!(f, "{}{}{}", self.scheme, SCHEME_SEPARATOR, self.bucket)
        } else {
            write!(
                f,
                "{}{}{}/{}",
                self.scheme, SCHEME_SEPARATOR, self.bucket, self.key
            )
        }
    }
}

impl PartialOrd for Address {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Address {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_string().cmp(&other.to_string())
    }
}

/// The configured address scheme and the path operations bound to it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scheme {
    name: String,
}

impl Default for Scheme {
    fn default() -> Self {
        Self::new(DEFAULT_SCHEME)
    }
}

impl Scheme {
    /// Create a scheme; the token is matched case-insensitively
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_lowercase(),
        }
    }

    /// The scheme token, lowercase
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The bare store root, e.g. `gs://`
    pub fn root(&self) -> String {
        format!("{}{}", self.name, SCHEME_SEPARATOR)
    }

    /// Build an address from already-split parts
    pub fn address(&self, bucket: impl Into<String>, key: impl Into<String>) -> Address {
        Address {
            scheme: self.name.clone(),
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Parse `scheme://bucket[/key]`
    ///
    /// Leading slashes before the scheme are tolerated.
    ///
    /// # Errors
    /// Returns `FsError::InvalidAddress` when the scheme is missing or
    /// different, the `://` separator is malformed, or the bucket is empty.
    pub fn parse(&self, uri: &str) -> Result<Address> {
        let invalid = || FsError::InvalidAddress(format!("Invalid {} URI: {}", self.name, uri));

        let trimmed = uri.trim_start_matches('/');
        let (scheme, rest) = trimmed.split_once(SCHEME_SEPARATOR).ok_or_else(invalid)?;
        if !scheme.eq_ignore_ascii_case(&self.name) {
            return Err(invalid());
        }

        let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() {
            return Err(invalid());
        }

        Ok(self.address(bucket, key))
    }

    /// Whether `uri` is exactly the store root (case-insensitive)
    pub fn is_root(&self, uri: &str) -> bool {
        uri.eq_ignore_ascii_case(&self.root())
    }

    /// Whether `uri` is a full address or the store root
    pub fn is_absolute(&self, uri: &str) -> bool {
        self.is_root(uri) || self.parse(uri).is_ok()
    }

    /// POSIX-style join of addresses and relative segments
    ///
    /// A component that is a full address restarts the join at `/bucket/key`;
    /// the bare root restarts it at `/`. `..` is kept verbatim, use
    /// [`Scheme::normpath`] to collapse it.
    pub fn join<I, S>(&self, components: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut joined = String::new();
        for component in components {
            let part = self.prepare_component(component.as_ref());
            if part.starts_with('/') {
                joined = part;
            } else if joined.is_empty() || joined.ends_with('/') {
                joined.push_str(&part);
            } else {
                joined.push('/');
                joined.push_str(&part);
            }
        }

        if joined.starts_with('/') {
            format!("{}:/{}", self.name, joined)
        } else {
            joined
        }
    }

    fn prepare_component(&self, component: &str) -> String {
        match self.parse(component) {
            Ok(address) => format!("/{}/{}", address.bucket, address.key),
            Err(_) if self.is_root(component) => "/".to_string(),
            Err(_) => component.to_string(),
        }
    }

    /// Collapse `.`, `..` and repeated separators, drop any trailing `/`
    ///
    /// Works on full addresses (the `scheme://` prefix is kept) and on plain
    /// paths.
    pub fn normpath(&self, uri: &str) -> String {
        let trimmed = uri.trim_start_matches('/');
        if let Some((scheme, rest)) = trimmed.split_once(SCHEME_SEPARATOR) {
            if scheme.eq_ignore_ascii_case(&self.name) {
                let rest = normalize(rest);
                return if rest == "." || rest == "/" {
                    self.root()
                } else {
                    format!("{}{}", self.root(), rest.trim_start_matches('/'))
                };
            }
        }
        normalize(uri)
    }

    /// Resolve `uri` against the directory `cd`
    ///
    /// Full addresses are returned unchanged; relative paths are joined onto
    /// `cd` and normalized.
    pub fn abspath(&self, cd: &str, uri: &str) -> String {
        if self.is_absolute(uri) {
            return uri.to_string();
        }
        self.normpath(&self.join([cd, uri]))
    }

    /// The directory containing `uri`
    ///
    /// The parent of a bucket is the store root; the root is its own parent.
    pub fn parent(&self, uri: &str) -> String {
        let normalized = self.normpath(uri);
        if self.is_root(&normalized) {
            return normalized;
        }
        match self.parse(&normalized) {
            Ok(address) if address.key.is_empty() => self.root(),
            Ok(address) => match address.key.rsplit_once('/') {
                Some((parent, _)) => self.address(address.bucket, parent).to_string(),
                None => self.address(address.bucket, "").to_string(),
            },
            Err(_) => match normalized.rsplit_once('/') {
                Some(("", _)) => "/".to_string(),
                Some((parent, _)) => parent.to_string(),
                None => String::new(),
            },
        }
    }
}

/// POSIX `normpath` for a plain path
///
/// An empty result is `.`; a leading `//` collapses to `/`.
pub fn normalize(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }

    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if absolute => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    let body = parts.join("/");
    match (absolute, body.is_empty()) {
        (true, _) => format!("/{}", body),
        (false, true) => ".".to_string(),
        (false, false) => body,
    }
}

/// Normalize an object key, mapping the empty path to the empty key
pub(crate) fn normalize_key(key: &str) -> String {
    let normalized = normalize(key);
    if normalized == "." {
        String::new()
    } else {
        normalized.trim_start_matches('/').to_string()
    }
}

/// Ensure a non-empty key ends with `/`
pub(crate) fn with_separator(key: &str) -> String {
    if key.is_empty() || key.ends_with('/') {
        key.to_string()
    } else {
        format!("{}/", key)
    }
}
