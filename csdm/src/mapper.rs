use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// A trait for reading external component payloads from an arbitrary store.
///
/// Each mapper serves one or more URL schemes. The `Resolver` picks the mapper for a
/// `components_url` by its scheme.
///
pub trait Mapper: Send + Sync {
    /// Whether this mapper serves URLs with the given scheme, e.g. `"https"`.
    ///
    fn handles(&self, scheme: &str) -> bool;

    /// Obtain an input stream for reading the object at `url`.
    ///
    /// Should return an error of kind `NotFound` if there is nothing at `url`.
    ///
    fn load(&self, url: &str) -> io::Result<Box<dyn Read + '_>>;

    /// Get the size, in bytes, of the object at `url`, if the store can tell without reading it.
    ///
    fn size_of(&self, _url: &str) -> io::Result<Option<u64>> {
        Ok(None)
    }
}

/// A `Mapper` for the local filesystem.
///
/// Accepts `file:` URLs (`file:///abs/name.dat`, `file:name.dat`) and bare paths. Relative paths
/// are relative to the working directory; the `Resolver` makes them absolute before they get here.
///
#[derive(Debug, Default, Clone, Copy)]
pub struct FileMapper;

impl FileMapper {
    /// The filesystem path named by a `file:` URL or bare path.
    ///
    pub fn path(url: &str) -> &Path {
        // Only an empty host is supported in file://host/path
        let path = match url.strip_prefix("file:") {
            Some(rest) => rest.strip_prefix("//").unwrap_or(rest),
            None => url,
        };

        Path::new(path)
    }
}

impl Mapper for FileMapper {
    fn handles(&self, scheme: &str) -> bool {
        scheme == "file"
    }

    fn load(&self, url: &str) -> io::Result<Box<dyn Read + '_>> {
        let file = File::open(Self::path(url))?;

        Ok(Box::new(BufReader::new(file)))
    }

    fn size_of(&self, url: &str) -> io::Result<Option<u64>> {
        match Self::path(url).metadata() {
            Ok(metadata) => Ok(Some(metadata.len())),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }
}
