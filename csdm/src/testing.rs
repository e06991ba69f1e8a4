use std::collections::HashMap;
use std::io::{self, Cursor, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rand::{distributions::Standard, prelude::Distribution, Rng};
use serde_json::{json, Value};

use crate::mapper::Mapper;

/// An in-memory `Mapper` for the `mem` scheme that counts how often objects are fetched.
///
/// Clones share the same store, so a test can keep a handle after boxing one for a `Resolver`.
///
#[derive(Clone, Default)]
pub(crate) struct MemoryMapper {
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    loads: Arc<AtomicUsize>,
}

impl MemoryMapper {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&self, url: &str, object: Vec<u8>) {
        self.objects.lock().insert(url.to_string(), object);
    }

    /// Number of successful loads so far
    pub(crate) fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl Mapper for MemoryMapper {
    fn handles(&self, scheme: &str) -> bool {
        scheme == "mem"
    }

    fn load(&self, url: &str) -> io::Result<Box<dyn Read + '_>> {
        let objects = self.objects.lock();
        let object = objects
            .get(url)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, url.to_string()))?;
        self.loads.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(Cursor::new(object.clone())))
    }
}

/// Random values for filling components.
///
pub(crate) fn random_values<T>(n: usize) -> Vec<T>
where
    Standard: Distribution<T>,
{
    let mut rng = rand::thread_rng();
    (0..n).map(|_| rng.gen()).collect()
}

/// A two dimensional dataset: a 4 point linear time dimension and a 3 point labeled dimension,
/// with one float32 scalar variable holding 0..12 and one int16 vector_2 variable.
///
pub(crate) fn two_dimensional() -> Value {
    json!({
        "csdm": {
            "version": "1.0",
            "description": "A small two dimensional dataset",
            "dimensions": [
                {
                    "type": "linear",
                    "count": 4,
                    "increment": "0.5 s",
                    "coordinates_offset": "1.0 s",
                    "quantity_name": "time",
                },
                {
                    "type": "labeled",
                    "labels": ["a", "b", "c"],
                },
            ],
            "dependent_variables": [
                {
                    "type": "internal",
                    "name": "intensity",
                    "unit": "V",
                    "quantity_name": "electrical potential",
                    "numeric_type": "float32",
                    "quantity_type": "scalar",
                    "components": [[
                        0.0, 1.0, 2.0, 3.0,
                        4.0, 5.0, 6.0, 7.0,
                        8.0, 9.0, 10.0, 11.0,
                    ]],
                },
                {
                    "type": "internal",
                    "name": "field",
                    "encoding": "base64",
                    "numeric_type": "int16",
                    "quantity_type": "vector_2",
                    "component_labels": ["x", "y"],
                    "components": [
                        "AQACAAMABAAFAAYABwAIAAkACgALAAwA",
                        "9f/0//P/8v/x//D/7//u/+3/7P/r/+r/",
                    ],
                },
            ],
        }
    })
}
