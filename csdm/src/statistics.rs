//! Integral and coordinate moments of datasets sampled on linear grids.
//!
//! These treat each scalar dependent variable as a distribution over the grid. Every dimension
//! must be linear, and the components must be real.
//!
use ndarray::{Array1, ArrayD, Axis};

use crate::csdm::Csdm;
use crate::dimension::{Dimension, LinearDimension};
use crate::errors::{Error, Result};
use crate::units::Quantity;
use crate::variable::DependentVariable;

impl Csdm {
    /// Integral of each dependent variable over the whole grid.
    ///
    /// This is the sum of all samples times the product of the increments. The unit is the
    /// unit of the variable times the units of the dimensions.
    ///
    pub fn integral(&self) -> Result<Vec<Quantity>> {
        let dimensions = self.linear_dimensions()?;

        self.dependent_variables()
            .iter()
            .enumerate()
            .map(|(index, variable)| {
                let samples = samples(index, variable)?;
                let mut unit = variable.unit().clone();
                let mut cell = 1.0;
                for dimension in &dimensions {
                    unit = unit.multiply(dimension.unit());
                    cell *= dimension.increment().value;
                }

                Ok(Quantity::new(samples.sum() * cell, unit))
            })
            .collect()
    }

    /// Sample-weighted mean coordinate, `Σ y·x / Σ y`, of each dependent variable along each
    /// dimension, in the unit of the dimension.
    ///
    pub fn mean(&self) -> Result<Vec<Vec<Quantity>>> {
        self.per_dimension(|dimension, moments, i| {
            Quantity::new(moments.mean[i], dimension.unit().clone())
        })
    }

    /// Sample-weighted variance of the coordinates, `Σ y·(x - mean)² / Σ y`, of each dependent
    /// variable along each dimension, in the unit of the dimension squared.
    ///
    pub fn var(&self) -> Result<Vec<Vec<Quantity>>> {
        self.per_dimension(|dimension, moments, i| {
            Quantity::new(moments.var[i], dimension.unit().powi(2))
        })
    }

    /// Square root of `var`, in the unit of the dimension.
    ///
    pub fn std(&self) -> Result<Vec<Vec<Quantity>>> {
        self.per_dimension(|dimension, moments, i| {
            Quantity::new(moments.var[i].sqrt(), dimension.unit().clone())
        })
    }

    fn per_dimension<F>(&self, f: F) -> Result<Vec<Vec<Quantity>>>
    where
        F: Fn(&LinearDimension, &Moments, usize) -> Quantity,
    {
        let dimensions = self.linear_dimensions()?;

        self.dependent_variables()
            .iter()
            .enumerate()
            .map(|(index, variable)| {
                let moments = Moments::new(&dimensions, &samples(index, variable)?);
                Ok(dimensions
                    .iter()
                    .enumerate()
                    .map(|(i, dimension)| f(dimension, &moments, i))
                    .collect())
            })
            .collect()
    }

    fn linear_dimensions(&self) -> Result<Vec<&LinearDimension>> {
        self.dimensions()
            .iter()
            .enumerate()
            .map(|(i, dimension)| match dimension {
                Dimension::Linear(linear) => Ok(linear),
                other => Err(Error::Value(format!(
                    "statistics need linear dimensions, dimension {i} is {}",
                    other.type_name()
                ))),
            })
            .collect()
    }
}

/// The single component of a real scalar variable, shaped `(N_{d-1}, ..., N_0)`.
///
fn samples(index: usize, variable: &DependentVariable) -> Result<ArrayD<f64>> {
    if variable.count() != 1 {
        return Err(Error::Value(format!(
            "statistics need scalar dependent variables, variable {index} has {} components",
            variable.count()
        )));
    }
    if variable.numeric_type().is_complex() {
        return Err(Error::Value(format!(
            "statistics need real components, variable {index} is {}",
            variable.numeric_type()
        )));
    }

    Ok(variable
        .components()?
        .to_array::<f64>()
        .index_axis_move(Axis(0), 0))
}

/// First and second moments of the samples along each dimension.
///
struct Moments {
    mean: Vec<f64>,
    var: Vec<f64>,
}

impl Moments {
    fn new(dimensions: &[&LinearDimension], samples: &ArrayD<f64>) -> Self {
        let ndim = dimensions.len();
        let coordinates: Vec<Array1<f64>> = dimensions
            .iter()
            .map(|dimension| dimension.coordinates().values())
            .collect();
        let total = samples.sum();

        let weighted = |center: &[f64], power: i32| {
            let mut sums = vec![0.0; ndim];
            for (index, &y) in samples.indexed_iter() {
                for (i, x) in coordinates.iter().enumerate() {
                    sums[i] += y * (x[index[ndim - 1 - i]] - center[i]).powi(power);
                }
            }
            sums.into_iter().map(|sum| sum / total).collect::<Vec<f64>>()
        };
        let mean = weighted(&vec![0.0; ndim], 1);
        let var = weighted(&mean, 2);

        Self { mean, var }
    }
}
