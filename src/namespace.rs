//! Paths and endpoints of the served namespace
//!
//! Callers address files either with a fully qualified URI
//! (`hdfs://namenode:8020/data/a.txt`) or with an absolute path (`/data/a.txt`).
//! [`FsPath`] parses and normalizes both forms; [`FsEndpoint`] is the configured
//! filesystem endpoint and qualifies paths against itself.

use crate::error::{FsError, FsResult};
use std::fmt;

/// URI scheme of the served namespace
pub const SCHEME: &str = "hdfs";

/// Filesystem endpoint configuration: the (host, port) of the backing namenode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEndpoint {
    host: String,
    port: u16,
}

impl FsEndpoint {
    /// Create an endpoint
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Endpoint host name
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Endpoint port
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// `host:port`
    #[must_use]
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// `hdfs://host:port`
    #[must_use]
    pub fn uri(&self) -> String {
        format!("{SCHEME}://{}", self.authority())
    }

    /// Qualify `path` with this endpoint
    ///
    /// Unqualified paths gain this endpoint's scheme and authority; qualified
    /// paths must already name this endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::WrongFilesystem`] if `path` names another filesystem.
    pub fn qualify(&self, path: &FsPath) -> FsResult<FsPath> {
        match (&path.scheme, &path.authority) {
            (None, None) => {}
            (Some(scheme), Some(authority))
                if scheme.eq_ignore_ascii_case(SCHEME) && self.matches_authority(authority) => {}
            _ => {
                return Err(FsError::WrongFilesystem {
                    path: path.to_string(),
                    expected: self.uri(),
                })
            }
        }
        Ok(FsPath {
            scheme: Some(SCHEME.to_string()),
            authority: Some(self.authority()),
            components: path.components.clone(),
        })
    }

    fn matches_authority(&self, authority: &str) -> bool {
        match authority.rsplit_once(':') {
            Some((host, port)) => {
                host.eq_ignore_ascii_case(&self.host) && port.parse::<u16>() == Ok(self.port)
            }
            // No explicit port means the default namenode port
            None => authority.eq_ignore_ascii_case(&self.host),
        }
    }
}

impl fmt::Display for FsEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A normalized namespace path, optionally qualified with scheme and authority
///
/// Normalization drops empty and `.` components and resolves `..` without ever
/// climbing above the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FsPath {
    scheme: Option<String>,
    authority: Option<String>,
    components: Vec<String>,
}

impl FsPath {
    /// The namespace root `/`
    #[must_use]
    pub const fn root() -> Self {
        Self {
            scheme: None,
            authority: None,
            components: Vec::new(),
        }
    }

    /// Parse a caller-supplied path string
    ///
    /// # Errors
    ///
    /// Returns [`FsError::InvalidPath`] for empty strings, URIs without an
    /// authority, or paths containing NUL bytes.
    pub fn parse(raw: &str) -> FsResult<Self> {
        let invalid = |reason: &str| FsError::InvalidPath {
            path: raw.to_string(),
            reason: reason.to_string(),
        };

        if raw.is_empty() {
            return Err(invalid("can not create a path from an empty string"));
        }
        if raw.contains('\0') {
            return Err(invalid("path contains a NUL byte"));
        }

        let (scheme, authority, path) = match raw.split_once("://") {
            Some((scheme, rest)) => {
                if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphanumeric()) {
                    return Err(invalid("malformed scheme"));
                }
                let (authority, path) = rest.find('/').map_or((rest, "/"), |i| rest.split_at(i));
                if authority.is_empty() {
                    return Err(invalid("missing authority"));
                }
                (Some(scheme.to_string()), Some(authority.to_string()), path)
            }
            None => (None, None, raw),
        };

        let mut components: Vec<String> = Vec::new();
        for part in path.split('/') {
            match part {
                "" | "." => {}
                ".." => {
                    components.pop();
                }
                name => components.push(name.to_string()),
            }
        }

        Ok(Self {
            scheme,
            authority,
            components,
        })
    }

    /// Normalized path components below the root
    #[must_use]
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Last component, or `None` for the root
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.components.last().map(String::as_str)
    }

    /// Whether this is the root
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    /// Whether scheme and authority are present
    #[must_use]
    pub const fn is_qualified(&self) -> bool {
        self.scheme.is_some() && self.authority.is_some()
    }

    /// Child path `self/name`
    #[must_use]
    pub fn join(&self, name: &str) -> Self {
        let mut child = self.clone();
        child.components.push(name.to_string());
        child
    }

    /// The absolute path without scheme and authority, e.g. `/data/a.txt`
    #[must_use]
    pub fn path(&self) -> String {
        if self.components.is_empty() {
            "/".to_string()
        } else {
            self.components
                .iter()
                .fold(String::new(), |acc, c| acc + "/" + c)
        }
    }
}

impl fmt::Display for FsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (Some(scheme), Some(authority)) = (&self.scheme, &self.authority) {
            write!(f, "{scheme}://{authority}")?;
        }
        f.write_str(&self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/", "/")]
    #[case("/a/b", "/a/b")]
    #[case("a/b", "/a/b")]
    #[case("/a//b/./c/", "/a/b/c")]
    #[case("/a/../b", "/b")]
    #[case("/../../etc/passwd", "/etc/passwd")]
    #[case("hdfs://localhost:8020/x/y", "/x/y")]
    #[case("hdfs://localhost:8020", "/")]
    fn test_parse_normalizes(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(FsPath::parse(raw).unwrap().path(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("hdfs:///no/authority")]
    #[case("://host/x")]
    #[case("/bad\0path")]
    fn test_parse_rejects(#[case] raw: &str) {
        assert!(matches!(
            FsPath::parse(raw),
            Err(FsError::InvalidPath { .. })
        ));
    }

    #[test]
    fn test_display_keeps_qualification() {
        let path = FsPath::parse("hdfs://nn:8020/a/b.txt").unwrap();
        assert!(path.is_qualified());
        assert_eq!(path.to_string(), "hdfs://nn:8020/a/b.txt");
        assert_eq!(path.name(), Some("b.txt"));
    }

    #[test]
    fn test_qualify_unqualified_path() {
        let endpoint = FsEndpoint::new("localhost", 8020);
        let path = endpoint.qualify(&FsPath::parse("/a").unwrap()).unwrap();
        assert_eq!(path.to_string(), "hdfs://localhost:8020/a");
    }

    #[test]
    fn test_qualify_accepts_matching_authority() {
        let endpoint = FsEndpoint::new("localhost", 8020);
        let path = FsPath::parse("HDFS://LOCALHOST:8020/a").unwrap();
        assert_eq!(
            endpoint.qualify(&path).unwrap().to_string(),
            "hdfs://localhost:8020/a"
        );
    }

    #[rstest]
    #[case("hdfs://otherhost:8020/a")]
    #[case("hdfs://localhost:9000/a")]
    #[case("file://localhost:8020/a")]
    fn test_qualify_rejects_other_filesystems(#[case] raw: &str) {
        let endpoint = FsEndpoint::new("localhost", 8020);
        let path = FsPath::parse(raw).unwrap();
        assert!(matches!(
            endpoint.qualify(&path),
            Err(FsError::WrongFilesystem { .. })
        ));
    }

    #[test]
    fn test_join_and_root() {
        let root = FsPath::root();
        assert!(root.is_root());
        assert_eq!(root.name(), None);
        assert_eq!(root.join("x").join("y").path(), "/x/y");
    }
}
