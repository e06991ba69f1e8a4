use std::fmt;
use std::io::Read;
use std::path::Path;

use log::debug;

use crate::errors::{Error, Result};
use crate::mapper::{FileMapper, Mapper};

/// The `Resolver` fetches external component payloads named by `components_url`.
///
/// Fetching is delegated to `Mapper` implementations, picked by URL scheme. A new resolver knows
/// about the local filesystem only. Register other mappers, such as an HTTP mapper, with
/// `with_mapper`.
///
pub struct Resolver {
    mappers: Vec<Box<dyn Mapper>>,
}

impl Resolver {
    /// Create a new `Resolver` that reads `file:` URLs and bare paths.
    ///
    pub fn new() -> Self {
        Self {
            mappers: vec![Box::new(FileMapper)],
        }
    }

    /// Add a mapper. Mappers added later take precedence for the schemes they handle.
    ///
    /// # Arguments
    ///
    /// * `mapper` - A boxed implementation of `Mapper`.
    ///
    pub fn with_mapper(mut self, mapper: Box<dyn Mapper>) -> Self {
        self.mappers.insert(0, mapper);
        self
    }

    /// Make a `components_url` absolute.
    ///
    /// URLs with a scheme other than `file` are returned unchanged. Relative file URLs and paths
    /// are joined to `base`, the directory of the document that refers to them.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL as written in the document.
    /// * `base` - The directory of the document, if it was read from a file.
    ///
    pub fn resolve(&self, url: &str, base: Option<&Path>) -> String {
        match scheme(url) {
            Some(scheme) if scheme != "file" => url.to_string(),
            _ => {
                let path = FileMapper::path(url);
                match base {
                    Some(base) if path.is_relative() => {
                        format!("file://{}", base.join(path).display())
                    }
                    _ => format!("file://{}", path.display()),
                }
            }
        }
    }

    /// Read the whole object at `url`.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL as written in the document.
    /// * `base` - The directory of the document, if it was read from a file.
    ///
    pub fn load(&self, url: &str, base: Option<&Path>) -> Result<Vec<u8>> {
        let resolved = self.resolve(url, base);
        let scheme = scheme(&resolved).unwrap_or("file");
        let failed = |source| Error::ExternalResource {
            url: resolved.clone(),
            source,
        };
        let mapper = self
            .mappers
            .iter()
            .find(|mapper| mapper.handles(scheme))
            .ok_or_else(|| {
                failed(std::io::Error::new(
                    std::io::ErrorKind::Unsupported,
                    format!("no mapper registered for scheme `{scheme}`"),
                ))
            })?;

        debug!("Fetching external components from {resolved}");
        let mut contents = vec![];
        match mapper.size_of(&resolved) {
            Ok(Some(size)) => contents.reserve(size as usize),
            Ok(None) => {}
            Err(err) => debug!("No size for {resolved}: {err}"),
        }
        mapper
            .load(&resolved)
            .and_then(|mut stream| stream.read_to_end(&mut contents))
            .map_err(failed)?;

        Ok(contents)
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("mappers", &self.mappers.len())
            .finish()
    }
}

/// The scheme of a URL, if it has one. Single letters are taken to be drive letters.
///
fn scheme(url: &str) -> Option<&str> {
    let (scheme, _) = url.split_once(':')?;
    let valid = scheme.len() > 1
        && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.');

    valid.then_some(scheme)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use crate::testing::MemoryMapper;

    #[test]
    fn test_scheme() {
        assert_eq!(scheme("https://example.com/a.dat"), Some("https"));
        assert_eq!(scheme("file:./a.dat"), Some("file"));
        assert_eq!(scheme("a.dat"), None);
        assert_eq!(scheme("C:\\data\\a.dat"), None);
    }

    #[test]
    fn test_resolve() {
        let resolver = Resolver::new();
        let base = Path::new("/data/set.csdm");
        assert_eq!(
            resolver.resolve("file:./a.dat", Some(base)),
            "file:///data/set.csdm/./a.dat"
        );
        assert_eq!(
            resolver.resolve("b.dat", Some(base)),
            "file:///data/set.csdm/b.dat"
        );
        assert_eq!(
            resolver.resolve("file:///abs/c.dat", Some(base)),
            "file:///abs/c.dat"
        );
        assert_eq!(resolver.resolve("/abs/d.dat", None), "file:///abs/d.dat");
        assert_eq!(
            resolver.resolve("https://example.com/e.dat", Some(base)),
            "https://example.com/e.dat"
        );
    }

    #[test]
    fn test_load_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("payload.dat"), [1u8, 2, 3])?;

        let resolver = Resolver::new();
        assert_eq!(resolver.load("file:./payload.dat", Some(dir.path()))?, vec![1, 2, 3]);
        assert_eq!(resolver.load("payload.dat", Some(dir.path()))?, vec![1, 2, 3]);
        assert!(matches!(
            resolver.load("missing.dat", Some(dir.path())),
            Err(Error::ExternalResource { .. })
        ));

        Ok(())
    }

    #[test]
    fn test_load_with_mapper() -> Result<()> {
        let mapper = MemoryMapper::new();
        mapper.insert("mem://a", vec![9, 8, 7]);
        let resolver = Resolver::new().with_mapper(Box::new(mapper));
        assert_eq!(resolver.load("mem://a", None)?, vec![9, 8, 7]);

        match resolver.load("ftp://example.com/a", None) {
            Err(Error::ExternalResource { source, .. }) => {
                assert_eq!(source.kind(), std::io::ErrorKind::Unsupported)
            }
            other => panic!("expected an external resource error, got {other:?}"),
        }

        Ok(())
    }

    struct NoSizeMapper;

    impl Mapper for NoSizeMapper {
        fn handles(&self, scheme: &str) -> bool {
            scheme == "mem"
        }

        fn load(&self, _url: &str) -> std::io::Result<Box<dyn Read + '_>> {
            Ok(Box::new(std::io::Cursor::new(vec![4u8, 5, 6])))
        }

        fn size_of(&self, _url: &str) -> std::io::Result<Option<u64>> {
            Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "size not available",
            ))
        }
    }

    #[test]
    fn test_load_without_size() -> Result<()> {
        let resolver = Resolver::new().with_mapper(Box::new(NoSizeMapper));
        assert_eq!(resolver.load("mem://a", None)?, vec![4, 5, 6]);

        Ok(())
    }
}
