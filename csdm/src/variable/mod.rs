//! Dependent variables: the measured or computed values sampled over the grid of dimensions.
//!
mod external;
mod sparse;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{info, warn};
use serde_json::Value;

pub use external::LoadState;
pub use sparse::SparseSampling;

use crate::components::{Components, Encoding};
use crate::dimension::explicit_name;
use crate::errors::{Error, Result};
use crate::helpers::{
    as_object, get_application, get_array, get_str, get_string, get_string_list, grid_size,
    insert_application, insert_text, require_str, Object,
};
use crate::numeric::NumericType;
use crate::quantity_type::QuantityType;
use crate::resolver::Resolver;
use crate::units::Unit;
use external::External;

#[derive(Debug, Clone)]
enum Source {
    Internal(Components),
    External(External),
}

/// Where raw encoded components are written when a dataset is saved.
///
#[derive(Debug, Clone)]
pub(crate) struct RawTarget {
    pub dir: PathBuf,
    pub stem: String,

    /// Companion files created so far
    written: Vec<PathBuf>,
}

impl RawTarget {
    pub(crate) fn new(dir: PathBuf, stem: String) -> Self {
        Self {
            dir,
            stem,
            written: vec![],
        }
    }

    fn file_name(&self, index: usize) -> String {
        format!("{}_{index}.dat", self.stem)
    }

    /// Remove the companion files written so far, after a save has failed.
    ///
    pub(crate) fn discard(&mut self) {
        for path in self.written.drain(..) {
            match fs::remove_file(&path) {
                Ok(()) => info!("Removed {}", path.display()),
                Err(err) => warn!("Unable to remove {}: {err}", path.display()),
            }
        }
    }
}

/// A dependent variable.
///
/// Components are held in memory with shape `(p, N_{d-1}, ..., N_0)` once the variable belongs
/// to a dataset with dimensions, where `p` is fixed by the quantity type and `N_i` is the count
/// of dimension `i`. Sparse components are expanded onto the full grid, with unsampled points
/// set to zero, and gathered back when serialized.
///
#[derive(Debug, Clone)]
pub struct DependentVariable {
    pub name: String,
    unit: Unit,

    /// Explicit name of the physical quantity. Derived from the unit when `None`.
    pub quantity_name: Option<String>,

    pub encoding: Encoding,
    numeric_type: NumericType,
    quantity_type: QuantityType,
    component_labels: Vec<String>,
    pub description: String,
    pub application: Object,
    sparse_sampling: Option<SparseSampling>,
    source: Source,

    /// Dimension counts the components are shaped for, dimension 0 first
    grid: Option<Vec<usize>>,
}

impl DependentVariable {
    /// Create an internal dependent variable.
    ///
    /// # Arguments
    ///
    /// * `quantity_type` - Structure of the values. Fixes the number of components.
    /// * `components` - The data, one row per component.
    ///
    pub fn new(quantity_type: QuantityType, components: Components) -> Result<Self> {
        check_count(quantity_type, components.count())?;

        Ok(Self {
            name: String::new(),
            unit: Unit::dimensionless(),
            quantity_name: None,
            encoding: Encoding::None,
            numeric_type: components.numeric_type(),
            quantity_type,
            component_labels: vec![String::new(); quantity_type.components()],
            description: String::new(),
            application: Object::new(),
            sparse_sampling: None,
            source: Source::Internal(components),
            grid: None,
        })
    }

    /// Create a scalar dependent variable with a single component.
    ///
    pub fn scalar(components: impl Into<Components>) -> Result<Self> {
        Self::new(QuantityType::Scalar, components.into())
    }

    /// Build a dependent variable from its serialized form.
    ///
    /// # Arguments
    ///
    /// * `value` - The JSON object describing the dependent variable.
    /// * `context` - Where `value` came from, for error messages.
    /// * `base` - Directory of the document, for resolving a relative `components_url`.
    /// * `resolver` - Fetches external components when they are first accessed.
    ///
    pub fn from_value(
        value: &Value,
        context: &str,
        base: Option<&Path>,
        resolver: &Arc<Resolver>,
    ) -> Result<Self> {
        let object = as_object(value, context)?;
        let numeric_type: NumericType = get_str(object, "numeric_type", context)?
            .unwrap_or("float32")
            .parse()
            .map_err(|err| in_context(err, context))?;
        let quantity_type: QuantityType = get_str(object, "quantity_type", context)?
            .unwrap_or("scalar")
            .parse()
            .map_err(|err| in_context(err, context))?;

        let (source, encoding) = match require_str(object, "type", context)? {
            "internal" => {
                let encoding: Encoding = get_str(object, "encoding", context)?
                    .unwrap_or("none")
                    .parse()
                    .map_err(|err| in_context(err, context))?;
                let components = get_array(object, "components", context)?
                    .ok_or_else(|| Error::missing("components", context))?;
                let components = match encoding {
                    Encoding::None => Components::decode_json(numeric_type, components)?,
                    Encoding::Base64 => Components::decode_base64(numeric_type, components)?,
                    Encoding::Raw => {
                        return Err(Error::schema(format!(
                            "raw encoding is only valid for external data, in {context}"
                        )))
                    }
                };
                check_count(quantity_type, components.count())?;

                (Source::Internal(components), encoding)
            }
            "external" => {
                let url = require_str(object, "components_url", context)?;
                let external = External::new(url, base, Arc::clone(resolver));

                (Source::External(external), Encoding::Raw)
            }
            other => {
                return Err(Error::schema(format!(
                    "unknown dependent variable type `{other}` in {context}"
                )))
            }
        };

        let unit = Unit::parse(get_str(object, "unit", context)?.unwrap_or(""))
            .map_err(|err| in_context(err, context))?;
        let quantity_name = explicit_name(get_string(object, "quantity_name", context)?, &unit);
        let sparse_sampling = match object.get("sparse_sampling") {
            None | Some(Value::Null) => None,
            Some(sparse) => Some(SparseSampling::from_value(sparse, context)?),
        };

        let mut variable = Self {
            name: get_string(object, "name", context)?,
            unit,
            quantity_name,
            encoding,
            numeric_type,
            quantity_type,
            component_labels: vec![],
            description: get_string(object, "description", context)?,
            application: get_application(object, context)?,
            sparse_sampling,
            source,
            grid: None,
        };
        variable.set_component_labels(
            get_string_list(object, "component_labels", context)?.unwrap_or_default(),
        );

        Ok(variable)
    }

    /// `internal` or `external`, depending on where the components currently live
    pub fn type_name(&self) -> &'static str {
        match self.source {
            Source::Internal(_) => "internal",
            Source::External(_) => "external",
        }
    }

    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    pub fn set_unit(&mut self, unit: Unit) {
        self.unit = unit;
    }

    /// Name of the physical quantity, explicit or derived from the unit.
    ///
    pub fn quantity_name(&self) -> String {
        match &self.quantity_name {
            Some(name) => name.clone(),
            None => self.unit.quantity_name().to_string(),
        }
    }

    pub fn numeric_type(&self) -> NumericType {
        match &self.source {
            Source::Internal(components) => components.numeric_type(),
            Source::External(external) => external
                .get()
                .map(Components::numeric_type)
                .unwrap_or(self.numeric_type),
        }
    }

    pub fn quantity_type(&self) -> QuantityType {
        self.quantity_type
    }

    /// Number of components, `p`
    pub fn count(&self) -> usize {
        self.quantity_type.components()
    }

    pub fn component_labels(&self) -> &[String] {
        &self.component_labels
    }

    /// Set the component labels. A list of the wrong length is truncated or padded with empty
    /// labels to the number of components.
    ///
    pub fn set_component_labels(&mut self, labels: Vec<String>) {
        let n = self.count();
        let mut labels = labels;
        if labels.is_empty() {
            labels = vec![String::new(); n];
        } else if labels.len() != n {
            warn!(
                "Got {} component labels for {n} components, truncating or padding to fit",
                labels.len()
            );
            labels.resize(n, String::new());
        }

        self.component_labels = labels;
    }

    pub fn sparse_sampling(&self) -> Option<&SparseSampling> {
        self.sparse_sampling.as_ref()
    }

    /// Where an external payload is in its life cycle, `None` for internal components.
    ///
    pub fn load_state(&self) -> Option<LoadState> {
        match &self.source {
            Source::Internal(_) => None,
            Source::External(external) => Some(external.state()),
        }
    }

    /// The `components_url` of external components
    pub fn components_url(&self) -> Option<&str> {
        match &self.source {
            Source::Internal(_) => None,
            Source::External(external) => Some(external.url()),
        }
    }

    /// The components, fetching them first if they are external and not yet loaded.
    ///
    /// A failed fetch leaves the variable unloaded, so calling again retries.
    ///
    pub fn components(&self) -> Result<&Components> {
        match &self.source {
            Source::Internal(components) => Ok(components),
            Source::External(external) => external.load_with(|bytes| self.decode_payload(bytes)),
        }
    }

    /// Mutable access to the components. External components are loaded and become internal.
    ///
    pub fn components_mut(&mut self) -> Result<&mut Components> {
        self.materialize()?;
        match &mut self.source {
            Source::Internal(components) => Ok(components),
            Source::External(_) => Err(Error::Value(
                "external components could not be loaded".to_string(),
            )),
        }
    }

    /// Replace the components. The number of components must match the quantity type and, in a
    /// dataset, the shape must match the grid.
    ///
    pub fn set_components(&mut self, components: Components) -> Result<()> {
        let components = self.fit(components)?;
        self.replace_components(components);

        Ok(())
    }

    /// Check that `components` can replace the current ones and shape them for the grid.
    ///
    pub(crate) fn fit(&self, components: Components) -> Result<Components> {
        check_count(self.quantity_type, components.count())?;
        match &self.grid {
            Some(grid) => shape_for(&components, grid),
            None => Ok(components),
        }
    }

    /// Replace the components with ones already passed through `fit`.
    ///
    pub(crate) fn replace_components(&mut self, components: Components) {
        self.numeric_type = components.numeric_type();
        self.source = Source::Internal(components);
    }

    /// Apply `f` to the components and keep the result. The grid shape must be preserved.
    ///
    pub(crate) fn map_components<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&Components) -> Result<Components>,
    {
        let components = f(self.components()?)?;
        self.set_components(components)
    }

    fn materialize(&mut self) -> Result<()> {
        if let Source::External(_) = self.source {
            self.components()?;
            if let Source::External(external) = &mut self.source {
                if let Some(components) = external.take() {
                    self.source = Source::Internal(components);
                }
            }
        }

        Ok(())
    }

    /// Turn a fetched payload into components shaped for the grid.
    ///
    fn decode_payload(&self, bytes: Vec<u8>) -> Result<Components> {
        let p = self.count();
        let size = self.numeric_type.size();
        if let Some(grid) = self.grid.as_ref().filter(|grid| !grid.is_empty()) {
            let per_component = match &self.sparse_sampling {
                Some(sparse) => sparse.sparse_len(grid)?,
                None => grid_size(grid)?,
            };
            let expected = grid_size(&[p, per_component, size])?;
            if bytes.len() != expected {
                return Err(Error::Encoding(format!(
                    "external payload has {} bytes, expected {expected} for {p} components of \
                     {per_component} {} values",
                    bytes.len(),
                    self.numeric_type
                )));
            }
        }

        let components = Components::decode_bytes(self.numeric_type, &bytes, p)?;
        match (&self.grid, &self.sparse_sampling) {
            (Some(grid), _) if grid.is_empty() => Ok(components),
            (Some(grid), Some(sparse)) => sparse.expand(&components, grid),
            (Some(grid), None) => shape_for(&components, grid),
            (None, _) => Ok(components),
        }
    }

    /// Shape the components for a grid with the given dimension counts.
    ///
    /// The first time a sparse variable is placed on a grid its components are expanded onto it.
    /// Otherwise the number of values per component must equal the number of grid points.
    /// External components that have not been loaded are shaped when they are.
    ///
    pub(crate) fn attach(&mut self, counts: &[usize]) -> Result<()> {
        let first = self.grid.as_ref().map_or(true, Vec::is_empty);
        if let Source::External(external) = &self.source {
            if external.get().is_none() {
                self.grid = Some(counts.to_vec());
                return Ok(());
            }
        }
        self.materialize()?;

        if let Source::Internal(components) = &self.source {
            let shaped = if counts.is_empty() {
                components.clone()
            } else {
                match (&self.sparse_sampling, first) {
                    (Some(sparse), true) => sparse.expand(components, counts)?,
                    _ => shape_for(components, counts)?,
                }
            };
            self.source = Source::Internal(shaped);
        }
        self.grid = Some(counts.to_vec());

        Ok(())
    }

    /// Check that the components, if loaded, fit `counts`.
    ///
    pub(crate) fn check_grid(&self, counts: &[usize]) -> Result<()> {
        if counts.is_empty() {
            return Ok(());
        }
        let components = match &self.source {
            Source::Internal(components) => components,
            Source::External(external) => match external.get() {
                Some(components) => components,
                None => return Ok(()),
            },
        };

        let expected = grid_size(counts)?;
        if components.len() != expected {
            return Err(Error::ShapeMismatch(format!(
                "dependent variable `{}` has {} values per component, but the dimensions make \
                 a grid of {expected} points",
                self.name,
                components.len()
            )));
        }

        Ok(())
    }

    /// A dense internal variable with the metadata of this one and new components.
    ///
    /// # Arguments
    ///
    /// * `components` - The new data. Must have `p` components.
    /// * `counts` - Dimension counts of the grid the components cover.
    ///
    pub(crate) fn derive(&self, components: Components, counts: &[usize]) -> Result<Self> {
        check_count(self.quantity_type, components.count())?;
        let components = shape_for(&components, counts)?;

        Ok(Self {
            name: self.name.clone(),
            unit: self.unit.clone(),
            quantity_name: self.quantity_name.clone(),
            encoding: self.encoding,
            numeric_type: components.numeric_type(),
            quantity_type: self.quantity_type,
            component_labels: self.component_labels.clone(),
            description: self.description.clone(),
            application: self.application.clone(),
            sparse_sampling: None,
            source: Source::Internal(components),
            grid: Some(counts.to_vec()),
        })
    }

    pub(crate) fn clear_application(&mut self) {
        self.application.clear();
        if let Some(sparse) = &mut self.sparse_sampling {
            sparse.application.clear();
        }
    }

    /// Keys shared by the serialized and preview forms, in document order, up to but not
    /// including the components.
    ///
    fn metadata(&self, type_name: &str, encoding: Option<Encoding>) -> Object {
        let mut object = Object::new();
        object.insert("type".to_string(), Value::String(type_name.to_string()));
        insert_text(&mut object, "description", self.description.trim());
        insert_text(&mut object, "name", self.name.trim());
        insert_text(&mut object, "unit", self.unit.symbol());
        let quantity_name = self.quantity_name();
        if quantity_name != "dimensionless" && quantity_name != "unknown" {
            object.insert("quantity_name".to_string(), Value::String(quantity_name));
        }
        if let Some(encoding) = encoding {
            object.insert(
                "encoding".to_string(),
                Value::String(encoding.as_str().to_string()),
            );
        }
        object.insert(
            "numeric_type".to_string(),
            Value::String(self.numeric_type().as_str().to_string()),
        );
        object.insert(
            "quantity_type".to_string(),
            Value::String(self.quantity_type.to_string()),
        );
        if self.component_labels.iter().any(|label| !label.trim().is_empty()) {
            object.insert(
                "component_labels".to_string(),
                Value::from(self.component_labels.clone()),
            );
        }
        insert_application(&mut object, &self.application);

        object
    }

    /// Components as they are serialized: sparse components gathered, one flat row each.
    ///
    fn serialized_components(&self) -> Result<Components> {
        let components = self.components()?;
        match (&self.sparse_sampling, &self.grid) {
            (Some(sparse), Some(grid)) if !grid.is_empty() => sparse.gather(components, grid),
            _ => components.reshape(&[components.count(), components.len()]),
        }
    }

    /// Serialize the dependent variable.
    ///
    /// # Arguments
    ///
    /// * `index` - Position of the variable in its dataset. Names the file raw data go to.
    /// * `target` - Where raw encoded components are written. Required for `raw` encoding.
    ///
    pub(crate) fn to_value(&self, index: usize, target: Option<&mut RawTarget>) -> Result<Value> {
        let components = self.serialized_components()?;
        let mut object = match self.encoding {
            Encoding::None => {
                let mut object = self.metadata("internal", Some(Encoding::None));
                object.insert("components".to_string(), components.encode_json()?);
                object
            }
            Encoding::Base64 => {
                let mut object = self.metadata("internal", Some(Encoding::Base64));
                object.insert("components".to_string(), components.encode_base64());
                object
            }
            Encoding::Raw => {
                let target = target.ok_or_else(|| {
                    Error::Value(format!(
                        "dependent variable `{}` uses raw encoding and can only be saved to a file",
                        self.name
                    ))
                })?;
                let file_name = target.file_name(index);
                let path = target.dir.join(&file_name);
                let file = File::create(&path)?;
                target.written.push(path.clone());
                let mut file = BufWriter::new(file);
                components.write_raw(&mut file)?;
                file.flush()?;
                info!("Wrote components of `{}` to {}", self.name, path.display());

                let mut object = self.metadata("external", None);
                object.insert(
                    "components_url".to_string(),
                    Value::String(format!("file:./{file_name}")),
                );
                object
            }
        };

        if let Some(sparse) = &self.sparse_sampling {
            object.insert("sparse_sampling".to_string(), sparse.to_value()?);
        }

        Ok(Value::Object(object))
    }

    /// A reduced rendering for display. Never fetches external components.
    ///
    pub(crate) fn preview(&self) -> Result<Value> {
        let loaded = match &self.source {
            Source::Internal(components) => Some(components),
            Source::External(external) => external.get(),
        };
        let mut object = match (loaded, &self.source) {
            (Some(_), _) => {
                let mut object = self.metadata("internal", None);
                object.insert(
                    "components".to_string(),
                    self.serialized_components()?.preview(),
                );
                object
            }
            (None, Source::External(external)) => {
                let mut object = self.metadata("external", None);
                object.insert(
                    "components_url".to_string(),
                    Value::String(external.url().to_string()),
                );
                object
            }
            (None, Source::Internal(_)) => self.metadata("internal", None),
        };

        if let Some(sparse) = &self.sparse_sampling {
            object.insert("sparse_sampling".to_string(), sparse.to_value()?);
        }

        Ok(Value::Object(object))
    }
}

impl PartialEq for DependentVariable {
    /// Metadata and component values are equal. External components are loaded to compare them.
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.unit == other.unit
            && self.quantity_name() == other.quantity_name()
            && self.encoding == other.encoding
            && self.quantity_type == other.quantity_type
            && self.component_labels == other.component_labels
            && self.description == other.description
            && self.application == other.application
            && self.sparse_sampling == other.sparse_sampling
            && self.components().ok() == other.components().ok()
    }
}

fn check_count(quantity_type: QuantityType, count: usize) -> Result<()> {
    if quantity_type.components() == count {
        Ok(())
    } else {
        Err(Error::ShapeMismatch(format!(
            "quantity type {quantity_type} needs {} components, got {count}",
            quantity_type.components()
        )))
    }
}

/// Reshape components to `(p, N_{d-1}, ..., N_0)`.
///
fn shape_for(components: &Components, counts: &[usize]) -> Result<Components> {
    if counts.is_empty() {
        return Ok(components.clone());
    }

    let expected = grid_size(counts)?;
    if components.len() != expected {
        return Err(Error::ShapeMismatch(format!(
            "components have {} values each, but the dimensions make a grid of {expected} points",
            components.len()
        )));
    }
    let mut shape = vec![components.count()];
    shape.extend(counts.iter().rev());

    components.reshape(&shape)
}

fn in_context(err: Error, context: &str) -> Error {
    match err {
        Error::Schema(msg) | Error::UnitParse(msg) => Error::schema(format!("{msg} in {context}")),
        err => err,
    }
}
