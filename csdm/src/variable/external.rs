use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use log::info;
use parking_lot::{Condvar, Mutex};

use crate::components::Components;
use crate::errors::{Error, Result};
use crate::resolver::Resolver;

/// Where an external payload is in its life cycle.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    Loading,
    Loaded,

    /// The last attempt failed with the given message. The next access tries again.
    Failed(String),
}

/// Components stored outside of the document, fetched on first access.
///
/// Fetching happens at most once at a time. Threads that ask for the components while another
/// thread is fetching them wait for that fetch to finish. Once loaded, the components are owned
/// here until the variable is dropped.
///
#[derive(Debug)]
pub(crate) struct External {
    url: String,
    base: Option<PathBuf>,
    resolver: Arc<Resolver>,
    state: Mutex<LoadState>,
    ready: Condvar,
    loaded: OnceLock<Components>,
}

impl External {
    /// # Arguments
    ///
    /// * `url` - The `components_url` as written in the document.
    /// * `base` - Directory of the document, for resolving relative URLs.
    /// * `resolver` - Fetches the payload.
    ///
    pub(crate) fn new(url: &str, base: Option<&Path>, resolver: Arc<Resolver>) -> Self {
        Self {
            url: url.to_string(),
            base: base.map(Path::to_path_buf),
            resolver,
            state: Mutex::new(LoadState::Unloaded),
            ready: Condvar::new(),
            loaded: OnceLock::new(),
        }
    }

    pub(crate) fn url(&self) -> &str {
        &self.url
    }

    pub(crate) fn state(&self) -> LoadState {
        self.state.lock().clone()
    }

    /// The components if they have already been loaded. Never fetches.
    ///
    pub(crate) fn get(&self) -> Option<&Components> {
        self.loaded.get()
    }

    /// Take ownership of loaded components.
    ///
    pub(crate) fn take(&mut self) -> Option<Components> {
        let components = self.loaded.take();
        *self.state.get_mut() = LoadState::Unloaded;

        components
    }

    /// Get the components, fetching and decoding them if they haven't been loaded yet.
    ///
    /// # Arguments
    ///
    /// * `decode` - Turns the fetched bytes into components.
    ///
    pub(crate) fn load_with<F>(&self, decode: F) -> Result<&Components>
    where
        F: FnOnce(Vec<u8>) -> Result<Components>,
    {
        if let Some(components) = self.loaded.get() {
            return Ok(components);
        }

        {
            let mut state = self.state.lock();
            loop {
                match &*state {
                    LoadState::Loaded => return self.loaded_components(),
                    LoadState::Loading => self.ready.wait(&mut state),
                    LoadState::Unloaded | LoadState::Failed(_) => {
                        *state = LoadState::Loading;
                        break;
                    }
                }
            }
        }

        let result = self
            .resolver
            .load(&self.url, self.base.as_deref())
            .and_then(decode);

        let mut state = self.state.lock();
        let result = match result {
            Ok(components) => {
                info!(
                    "Loaded {} components of {} values from {}",
                    components.count(),
                    components.len(),
                    self.url
                );
                // Only the thread in the Loading state gets here, so the cell is empty
                let _ = self.loaded.set(components);
                *state = LoadState::Loaded;
                self.loaded_components()
            }
            Err(err) => {
                *state = LoadState::Failed(err.to_string());
                Err(err)
            }
        };
        self.ready.notify_all();

        result
    }

    fn loaded_components(&self) -> Result<&Components> {
        self.loaded.get().ok_or_else(|| Error::ExternalResource {
            url: self.url.clone(),
            source: std::io::Error::new(
                std::io::ErrorKind::Other,
                "payload marked loaded but missing",
            ),
        })
    }
}

impl Clone for External {
    fn clone(&self) -> Self {
        let loaded = OnceLock::new();
        let state = match self.loaded.get() {
            Some(components) => {
                let _ = loaded.set(components.clone());
                LoadState::Loaded
            }
            None => LoadState::Unloaded,
        };

        Self {
            url: self.url.clone(),
            base: self.base.clone(),
            resolver: Arc::clone(&self.resolver),
            state: Mutex::new(state),
            ready: Condvar::new(),
            loaded,
        }
    }
}
