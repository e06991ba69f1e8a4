use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;
use serde_json::Value;

use crate::components::{Components, Reduction};
use crate::config::SaveOptions;
use crate::dimension::{Dimension, LabeledDimension, LinearDimension, MonotonicDimension};
use crate::errors::{Error, Result};
use crate::format;
use crate::helpers::Object;
use crate::resolver::Resolver;
use crate::units::Quantity;
use crate::variable::DependentVariable;

/// Where on Earth a dataset was acquired.
///
#[derive(Debug, Clone, PartialEq)]
pub struct GeographicCoordinate {
    pub latitude: Quantity,
    pub longitude: Quantity,
    pub altitude: Option<Quantity>,
}

/// A core scientific dataset: an ordered list of dimensions and the dependent variables
/// sampled over the grid they span.
///
/// Every dependent variable holds components shaped `(p, N_{d-1}, ..., N_0)` where `N_i` is
/// the count of dimension `i`, so the first dimension varies fastest when a component is
/// flattened.
///
#[derive(Debug, Clone)]
pub struct Csdm {
    /// Version of the file format, e.g. "1.0"
    pub version: String,

    pub description: String,

    /// Whether the document was marked read only
    pub read_only: bool,

    /// When the document was last written, in `YYYY-MM-DDTHH:MM:SSZ` form. Empty if never saved.
    pub timestamp: String,

    pub geographic_coordinate: Option<GeographicCoordinate>,
    pub tags: Vec<String>,
    pub application: Object,

    /// The document this dataset was loaded from, if any
    pub filename: Option<PathBuf>,

    pub(crate) dimensions: Vec<Dimension>,
    pub(crate) dependent_variables: Vec<DependentVariable>,

    resolver: Arc<Resolver>,
}

/// One entry of a slicing request, per dimension.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimIndex {
    /// A single coordinate. The dimension is removed from the result. Negative indexes count
    /// from the end.
    Index(isize),

    /// Coordinates `start, start + step, ...` up to but not including `stop`. Negative bounds
    /// count from the end and missing bounds run to the edge in the direction of `step`.
    Range {
        start: Option<isize>,
        stop: Option<isize>,
        step: isize,
    },

    /// Every coordinate
    Full,
}

impl DimIndex {
    /// Every `step`th coordinate from `start` to `stop`
    pub fn range(start: isize, stop: isize, step: isize) -> Self {
        DimIndex::Range {
            start: Some(start),
            stop: Some(stop),
            step,
        }
    }

    /// Resolve against a dimension of `n` coordinates to `(start, step, count)`, with `count`
    /// `None` for a single index.
    ///
    fn resolve(self, n: usize) -> Result<(usize, isize, Option<usize>)> {
        let len = n as isize;
        match self {
            DimIndex::Full => Ok((0, 1, Some(n))),
            DimIndex::Index(index) => {
                let resolved = if index < 0 { index + len } else { index };
                if resolved < 0 || resolved >= len {
                    return Err(Error::Index(format!(
                        "index {index} out of range for dimension of count {n}"
                    )));
                }
                Ok((resolved as usize, 1, None))
            }
            DimIndex::Range { start, stop, step } => {
                if step == 0 {
                    return Err(Error::Index("slice step cannot be zero".to_string()));
                }
                let clamp = |index: isize, low: isize, high: isize| {
                    let index = if index < 0 { index + len } else { index };
                    index.clamp(low, high)
                };
                let (start, count) = if step > 0 {
                    let start = start.map_or(0, |i| clamp(i, 0, len));
                    let stop = stop.map_or(len, |i| clamp(i, 0, len));
                    (start, (stop - start + step - 1).div_euclid(step))
                } else {
                    let start = start.map_or(len - 1, |i| clamp(i, -1, len - 1));
                    let stop = stop.map_or(-1, |i| clamp(i, -1, len - 1));
                    (start, (start - stop - step - 1).div_euclid(-step))
                };

                Ok((start.max(0) as usize, step, Some(count.max(0) as usize)))
            }
        }
    }
}

/// Anything that can be added to a dataset as a dimension: a `Dimension` or its JSON form.
///
pub trait IntoDimension {
    fn into_dimension(self) -> Result<Dimension>;
}

impl IntoDimension for Dimension {
    fn into_dimension(self) -> Result<Dimension> {
        Ok(self)
    }
}

impl IntoDimension for LabeledDimension {
    fn into_dimension(self) -> Result<Dimension> {
        Ok(self.into())
    }
}

impl IntoDimension for LinearDimension {
    fn into_dimension(self) -> Result<Dimension> {
        Ok(self.into())
    }
}

impl IntoDimension for MonotonicDimension {
    fn into_dimension(self) -> Result<Dimension> {
        Ok(self.into())
    }
}

impl IntoDimension for &Value {
    fn into_dimension(self) -> Result<Dimension> {
        Dimension::from_value(self, "dimension")
    }
}

impl IntoDimension for Value {
    fn into_dimension(self) -> Result<Dimension> {
        Dimension::from_value(&self, "dimension")
    }
}

/// Anything that can be added to a dataset as a dependent variable: a `DependentVariable` or
/// its JSON form.
///
pub trait IntoDependentVariable {
    /// # Arguments
    ///
    /// * `base` - Directory relative `components_url` values are resolved against.
    /// * `resolver` - Fetches external components.
    ///
    fn into_dependent_variable(
        self,
        base: Option<&Path>,
        resolver: &Arc<Resolver>,
    ) -> Result<DependentVariable>;
}

impl IntoDependentVariable for DependentVariable {
    fn into_dependent_variable(
        self,
        _base: Option<&Path>,
        _resolver: &Arc<Resolver>,
    ) -> Result<DependentVariable> {
        Ok(self)
    }
}

impl IntoDependentVariable for &Value {
    fn into_dependent_variable(
        self,
        base: Option<&Path>,
        resolver: &Arc<Resolver>,
    ) -> Result<DependentVariable> {
        DependentVariable::from_value(self, "dependent variable", base, resolver)
    }
}

impl IntoDependentVariable for Value {
    fn into_dependent_variable(
        self,
        base: Option<&Path>,
        resolver: &Arc<Resolver>,
    ) -> Result<DependentVariable> {
        DependentVariable::from_value(&self, "dependent variable", base, resolver)
    }
}

impl Csdm {
    /// An empty dataset.
    ///
    pub fn new<S: Into<String>>(description: S) -> Self {
        Self::with_resolver(description, Arc::new(Resolver::new()))
    }

    /// An empty dataset that fetches external components with `resolver`.
    ///
    pub fn with_resolver<S: Into<String>>(description: S, resolver: Arc<Resolver>) -> Self {
        Self {
            version: format::CURRENT_VERSION.to_string(),
            description: description.into(),
            read_only: false,
            timestamp: String::new(),
            geographic_coordinate: None,
            tags: vec![],
            application: Object::new(),
            filename: None,
            dimensions: vec![],
            dependent_variables: vec![],
            resolver,
        }
    }

    pub fn resolver(&self) -> &Arc<Resolver> {
        &self.resolver
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Mutable access to a dimension. Its count cannot be changed through the reference
    /// except for labeled dimensions, which `validate` will then catch.
    ///
    pub fn dimension_mut(&mut self, index: usize) -> Option<&mut Dimension> {
        self.dimensions.get_mut(index)
    }

    pub fn dependent_variables(&self) -> &[DependentVariable] {
        &self.dependent_variables
    }

    pub fn dependent_variable_mut(&mut self, index: usize) -> Option<&mut DependentVariable> {
        self.dependent_variables.get_mut(index)
    }

    /// Number of dimensions
    pub fn ndim(&self) -> usize {
        self.dimensions.len()
    }

    /// Counts of the dimensions, in dimension order.
    ///
    pub fn shape(&self) -> Vec<usize> {
        self.dimensions.iter().map(Dimension::count).collect()
    }

    /// Append a dimension.
    ///
    /// Dependent variables already present are reshaped for the new grid when they fit it.
    /// Those that don't are left alone; dimensions are usually added before dependent
    /// variables, and `validate` reports whatever is still inconsistent.
    ///
    pub fn add_dimension(&mut self, dimension: impl IntoDimension) -> Result<()> {
        self.dimensions.push(dimension.into_dimension()?);
        self.regrid()
    }

    /// Remove a dimension. Allowed when there are no dependent variables or when the dimension
    /// has a single coordinate.
    ///
    pub fn remove_dimension(&mut self, index: usize) -> Result<Dimension> {
        let count = self
            .dimensions
            .get(index)
            .ok_or_else(|| Error::Index(format!("no dimension at index {index}")))?
            .count();
        if count != 1 && !self.dependent_variables.is_empty() {
            return Err(Error::Value(format!(
                "cannot remove dimension {index} with {count} coordinates from a dataset with \
                 dependent variables"
            )));
        }

        let dimension = self.dimensions.remove(index);
        self.regrid()?;

        Ok(dimension)
    }

    fn regrid(&mut self) -> Result<()> {
        let counts = self.shape();
        for variable in &mut self.dependent_variables {
            match variable.attach(&counts) {
                Ok(()) => {}
                Err(Error::ShapeMismatch(msg)) => {
                    debug!("Leaving `{}` as it is: {msg}", variable.name);
                }
                Err(err) => return Err(err),
            }
        }

        Ok(())
    }

    /// Append a dependent variable. Its components must cover the grid of the dimensions.
    ///
    pub fn add_dependent_variable(&mut self, variable: impl IntoDependentVariable) -> Result<()> {
        let base = self
            .filename
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf);
        let mut variable = variable.into_dependent_variable(base.as_deref(), &self.resolver)?;
        variable.attach(&self.shape())?;
        self.dependent_variables.push(variable);

        Ok(())
    }

    pub fn remove_dependent_variable(&mut self, index: usize) -> Result<DependentVariable> {
        if index >= self.dependent_variables.len() {
            return Err(Error::Index(format!(
                "no dependent variable at index {index}"
            )));
        }

        Ok(self.dependent_variables.remove(index))
    }

    /// A deep copy. Nothing is shared with `self` but the resolver.
    ///
    pub fn copy(&self) -> Csdm {
        self.clone()
    }

    /// Check that dimensions are consistent and every dependent variable covers the grid.
    /// External components that are not loaded yet are checked when they are.
    ///
    pub fn validate(&self) -> Result<()> {
        for dimension in &self.dimensions {
            dimension.validate()?;
        }
        let counts = self.shape();
        for variable in &self.dependent_variables {
            variable.check_grid(&counts)?;
        }

        Ok(())
    }

    /// The JSON document for this dataset, without a timestamp unless one was loaded.
    ///
    /// Fails for dependent variables with `raw` encoding, which can only be written to a file.
    ///
    pub fn to_value(&self) -> Result<Value> {
        format::to_value(self, None, None)
    }

    /// A JSON rendering for display, with every component shortened to its first and last two
    /// values. External components are never fetched for it.
    ///
    pub fn data_structure(&self) -> Result<String> {
        let value = format::preview(self)?;

        Ok(serde_json::to_string_pretty(&value)?)
    }

    /// Save to `path` with default options.
    ///
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.save_with(path, &SaveOptions::default())
    }

    pub fn save_with<P: AsRef<Path>>(&self, path: P, options: &SaveOptions) -> Result<()> {
        format::save(self, path.as_ref(), options)
    }

    /// Select part of the dataset.
    ///
    /// # Arguments
    ///
    /// * `indexes` - One entry per dimension, in dimension order. Missing trailing entries are
    ///   `DimIndex::Full`.
    ///
    pub fn slice(&self, indexes: &[DimIndex]) -> Result<Csdm> {
        let ndim = self.ndim();
        if indexes.len() > ndim {
            return Err(Error::Index(format!(
                "{} indexes given for a dataset with {ndim} dimensions",
                indexes.len()
            )));
        }

        let mut selections = vec![];
        let mut dimensions = vec![];
        for (i, dimension) in self.dimensions.iter().enumerate() {
            let index = indexes.get(i).copied().unwrap_or(DimIndex::Full);
            let (start, step, count) = index.resolve(dimension.count())?;
            match count {
                Some(count) => {
                    let selected = dimension.select(start, step, count)?;
                    let positions = (0..count)
                        .map(|k| (start as isize + k as isize * step) as usize)
                        .collect();
                    dimensions.push(selected);
                    selections.push(Selection::Positions(positions));
                }
                None => selections.push(Selection::Single(start)),
            }
        }

        let counts: Vec<usize> = dimensions.iter().map(Dimension::count).collect();
        let mut variables = vec![];
        for variable in &self.dependent_variables {
            let mut components = variable.components()?.clone();
            for (i, selection) in selections.iter().enumerate() {
                let axis = ndim - i;
                components = match selection {
                    Selection::Positions(positions) => components.select(axis, positions),
                    Selection::Single(position) => components.index_axis(axis, *position),
                };
            }
            variables.push(variable.derive(components, &counts)?);
        }

        Ok(self.derive(dimensions, variables))
    }

    /// Sum over a dimension, removing it.
    ///
    pub fn sum(&self, dimension: usize) -> Result<Csdm> {
        self.reduce(&[dimension], Reduction::Sum)
    }

    /// Multiply over a dimension, removing it.
    ///
    pub fn prod(&self, dimension: usize) -> Result<Csdm> {
        self.reduce(&[dimension], Reduction::Prod)
    }

    /// Reduce over several dimensions at once, removing them. Integer components are
    /// accumulated in 64 bits.
    ///
    pub fn reduce(&self, dimensions: &[usize], reduction: Reduction) -> Result<Csdm> {
        let ndim = self.ndim();
        let mut removed = dimensions.to_vec();
        removed.sort_unstable();
        removed.dedup();
        if let Some(bad) = removed.iter().find(|&&i| i >= ndim) {
            return Err(Error::Index(format!(
                "no dimension at index {bad} in a dataset with {ndim} dimensions"
            )));
        }

        let kept: Vec<Dimension> = self
            .dimensions
            .iter()
            .enumerate()
            .filter(|(i, _)| !removed.contains(i))
            .map(|(_, dimension)| dimension.clone())
            .collect();
        let counts: Vec<usize> = kept.iter().map(Dimension::count).collect();

        let mut variables = vec![];
        for variable in &self.dependent_variables {
            let mut components = variable.components()?.clone();

            // Later dimensions have lower axes, so they stay put while earlier ones are removed
            for &i in &removed {
                components = components.reduce(ndim - i, reduction);
            }
            variables.push(variable.derive(components, &counts)?);
        }

        Ok(self.derive(kept, variables))
    }

    /// One dataset per dependent variable, each with a copy of the dimensions.
    ///
    pub fn split(&self) -> Vec<Csdm> {
        self.dependent_variables
            .iter()
            .map(|variable| self.derive(self.dimensions.clone(), vec![variable.clone()]))
            .collect()
    }

    /// A dataset with the metadata of this one and new contents.
    ///
    pub(crate) fn derive(
        &self,
        dimensions: Vec<Dimension>,
        dependent_variables: Vec<DependentVariable>,
    ) -> Csdm {
        Csdm {
            version: self.version.clone(),
            description: self.description.clone(),
            read_only: false,
            timestamp: String::new(),
            geographic_coordinate: self.geographic_coordinate.clone(),
            tags: self.tags.clone(),
            application: self.application.clone(),
            filename: None,
            dimensions,
            dependent_variables,
            resolver: Arc::clone(&self.resolver),
        }
    }

    /// Map the components of every dependent variable. Either every variable is updated or, on
    /// error, none is.
    ///
    pub(crate) fn map_components<F>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(&DependentVariable, &Components) -> Result<Components>,
    {
        let mut staged = Vec::with_capacity(self.dependent_variables.len());
        for variable in &self.dependent_variables {
            staged.push(variable.fit(f(variable, variable.components()?)?)?);
        }
        for (variable, components) in self.dependent_variables.iter_mut().zip(staged) {
            variable.replace_components(components);
        }

        Ok(())
    }

    /// Drop application metadata everywhere in the dataset.
    ///
    pub(crate) fn clear_application(&mut self) {
        self.application.clear();
        for dimension in &mut self.dimensions {
            dimension.clear_application();
        }
        for variable in &mut self.dependent_variables {
            variable.clear_application();
        }
    }
}

impl PartialEq for Csdm {
    /// Same contents. `filename`, `timestamp` and the resolver are not compared.
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
            && self.description == other.description
            && self.read_only == other.read_only
            && self.geographic_coordinate == other.geographic_coordinate
            && self.tags == other.tags
            && self.application == other.application
            && self.dimensions == other.dimensions
            && self.dependent_variables == other.dependent_variables
    }
}

enum Selection {
    Positions(Vec<usize>),
    Single(usize),
}
