//! A concrete implementation of the `csdm::Mapper` interface for HTTP.
//!
//! This allows external dependent variables to name their component payloads with `http:` and
//! `https:` URLs.
//!
use std::io::{self, Cursor, Read};

use log::debug;
use reqwest::header::CONTENT_LENGTH;
use reqwest::{Client, StatusCode};
use tokio::runtime::Runtime;

pub struct HttpMapper {
    client: Client,
    runtime: Runtime,
}

impl HttpMapper {
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            client: Client::new(),
            runtime: Runtime::new()?,
        })
    }
}

impl csdm::Mapper for HttpMapper {
    fn handles(&self, scheme: &str) -> bool {
        scheme == "http" || scheme == "https"
    }

    /// Obtain an input stream for reading the object at `url`.
    ///
    /// The whole body is fetched before this returns. A `404` response is reported as an error
    /// of kind `NotFound`.
    ///
    fn load(&self, url: &str) -> io::Result<Box<dyn Read + '_>> {
        debug!("GET {url}");
        let bytes = self
            .runtime
            .block_on(async {
                self.client
                    .get(url)
                    .send()
                    .await?
                    .error_for_status()?
                    .bytes()
                    .await
            })
            .map_err(to_io_error)?;

        Ok(Box::new(Cursor::new(bytes)))
    }

    /// Get the size of the object at `url` from the `Content-Length` of a `HEAD` request.
    ///
    fn size_of(&self, url: &str) -> io::Result<Option<u64>> {
        let response = self
            .runtime
            .block_on(async { self.client.head(url).send().await?.error_for_status() })
            .map_err(to_io_error)?;

        Ok(response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok()))
    }
}

fn to_io_error(error: reqwest::Error) -> io::Error {
    let kind = match error.status() {
        Some(StatusCode::NOT_FOUND) => io::ErrorKind::NotFound,
        _ => io::ErrorKind::Other,
    };

    io::Error::new(kind, error)
}
