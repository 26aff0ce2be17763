//! Cache keys for proxied CDN assets.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::CacheKeyError;

/// Relative asset path, e.g. `npm/alpinejs@3.13.3/dist/cdn.min.js`.
///
/// The same value is appended to the origin URL and mirrored under the cache
/// root, one directory per `/`-separated segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Parse the path remainder after the `/cdn/` prefix.
    ///
    /// Segments that would escape the cache root (`..`, `.`, empty) and
    /// backslashes are refused.
    pub fn parse(raw: &str) -> Result<Self, CacheKeyError> {
        if raw.is_empty() {
            return Err(CacheKeyError::Empty);
        }

        for segment in raw.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\')
            {
                return Err(CacheKeyError::InvalidSegment(segment.to_string()));
            }
        }

        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.0.split('/')
    }

    /// Location of this key beneath `root`, using the host separator.
    pub fn to_path(&self, root: &Path) -> PathBuf {
        let mut path = root.to_path_buf();
        path.extend(self.segments());
        path
    }

    /// Extension of the final segment including the dot (`.css`), if any.
    ///
    /// A leading dot alone (`.npmrc`) does not count as an extension.
    pub fn extension(&self) -> Option<&str> {
        let name = self.segments().next_back()?;
        match name.rfind('.') {
            Some(0) | None => None,
            Some(idx) => Some(&name[idx..]),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_package_paths() {
        let key = CacheKey::parse("npm/daisyui@4.12.24/dist/full.min.css").unwrap();
        assert_eq!(key.as_str(), "npm/daisyui@4.12.24/dist/full.min.css");
        assert_eq!(key.extension(), Some(".css"));
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert_eq!(CacheKey::parse(""), Err(CacheKeyError::Empty));
    }

    #[test]
    fn test_parse_rejects_traversal() {
        assert!(CacheKey::parse("npm/../../etc/passwd").is_err());
        assert!(CacheKey::parse("./npm/x.js").is_err());
        assert!(CacheKey::parse("npm//x.js").is_err());
        assert!(CacheKey::parse("npm/x.js/").is_err());
        assert!(CacheKey::parse("npm\\..\\x.js").is_err());
    }

    #[test]
    fn test_to_path_mirrors_segments() {
        let key = CacheKey::parse("npm/alpinejs@3.13.3/dist/cdn.min.js").unwrap();
        let path = key.to_path(Path::new("cache"));
        let expected: PathBuf = ["cache", "npm", "alpinejs@3.13.3", "dist", "cdn.min.js"]
            .iter()
            .collect();
        assert_eq!(path, expected);
    }

    #[test]
    fn test_extension_edge_cases() {
        assert_eq!(CacheKey::parse("tailwindcss/tailwind").unwrap().extension(), None);
        assert_eq!(CacheKey::parse("gh/user/.npmrc").unwrap().extension(), None);
        assert_eq!(
            CacheKey::parse("npm/pkg/font.woff2").unwrap().extension(),
            Some(".woff2")
        );
        // Only the final segment counts.
        assert_eq!(CacheKey::parse("npm/jquery.min/dist").unwrap().extension(), None);
    }
}
