use serde_json::Value;

use super::quantitative::Quantitative;
use crate::errors::{Error, Result};
use crate::helpers::{as_object, get_bool, get_quantity, insert_text, require_usize, Object};
use crate::range::FloatRange;
use crate::units::{Quantity, Unit};

/// A dimension sampled at evenly spaced coordinates.
///
/// The coordinate at index `k` is `k * increment + coordinates_offset`. When `complex_fft` is
/// set the index is shifted to `k - floor(count / 2)`, placing zero at the center of the
/// dimension as for the output of a complex FFT.
///
#[derive(Debug, Clone, PartialEq)]
pub struct LinearDimension {
    count: usize,
    increment: Quantity,
    pub complex_fft: bool,
    pub quantitative: Quantitative,

    /// Metadata for the dimension in the reciprocal (FFT conjugate) space
    pub reciprocal: Quantitative,
}

impl LinearDimension {
    /// Create a linear dimension with zero offsets.
    ///
    /// # Arguments
    ///
    /// * `count` - Number of coordinates. Must be at least one.
    /// * `increment` - Spacing between coordinates. Must be finite and non-zero. Its unit is the
    ///   unit of the dimension.
    ///
    pub fn new(count: usize, increment: Quantity) -> Result<Self> {
        if count == 0 {
            return Err(Error::Value(
                "a linear dimension needs a count of at least one".to_string(),
            ));
        }
        if !increment.value.is_finite() || increment.is_zero() {
            return Err(Error::Value(format!(
                "increment of a linear dimension must be finite and non-zero, got {increment}"
            )));
        }
        let unit = increment.unit.clone();

        Ok(Self {
            count,
            increment,
            complex_fft: false,
            quantitative: Quantitative::new(&unit),
            reciprocal: Quantitative::new(&unit.inverse()),
        })
    }

    pub(crate) fn from_object(object: &Object, context: &str) -> Result<Self> {
        let count = require_usize(object, "count", context)?;
        let increment = get_quantity(object, "increment", context)?
            .ok_or_else(|| Error::missing("increment", context))?;
        let mut dimension = Self::new(count, increment)?;
        let unit = dimension.unit().clone();

        dimension.complex_fft = get_bool(object, "complex_fft", context)?;
        dimension.quantitative = Quantitative::from_object(object, &unit, context)?;
        if let Some(reciprocal) = object.get("reciprocal") {
            let context = format!("reciprocal of {context}");
            let reciprocal = as_object(reciprocal, &context)?;
            dimension.reciprocal = Quantitative::from_object(reciprocal, &unit.inverse(), &context)?;
        }

        Ok(dimension)
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn increment(&self) -> &Quantity {
        &self.increment
    }

    pub fn unit(&self) -> &Unit {
        &self.increment.unit
    }

    /// Set the coordinates offset. Must be convertible to the unit of the dimension.
    ///
    pub fn set_coordinates_offset(&mut self, offset: Quantity) -> Result<()> {
        offset.unit.factor_to(self.unit())?;
        self.quantitative.coordinates_offset = offset;

        Ok(())
    }

    /// Set the origin offset. Must be convertible to the unit of the dimension.
    ///
    pub fn set_origin_offset(&mut self, offset: Quantity) -> Result<()> {
        offset.unit.factor_to(self.unit())?;
        self.quantitative.origin_offset = offset;

        Ok(())
    }

    /// Coordinates as magnitudes in the unit of the dimension.
    ///
    pub fn coordinates(&self) -> FloatRange {
        let unit = self.unit();
        let offset = self
            .quantitative
            .coordinates_offset
            .value_in(unit)
            .unwrap_or(0.0);
        let first_index = if self.complex_fft {
            -((self.count / 2) as i64)
        } else {
            0
        };

        FloatRange::new(offset, self.increment.value, self.count, first_index)
    }

    /// Increment of the reciprocal dimension, `1 / (count * increment)`.
    ///
    pub fn reciprocal_increment(&self) -> Quantity {
        (self.increment.clone() * self.count as f64).inverse()
    }

    /// The dimension in reciprocal space. Its own reciprocal is this dimension again.
    ///
    pub fn reciprocal_dimension(&self) -> LinearDimension {
        LinearDimension {
            count: self.count,
            increment: self.reciprocal_increment(),
            complex_fft: !self.complex_fft,
            quantitative: self.reciprocal.clone(),
            reciprocal: self.quantitative.clone(),
        }
    }

    /// Keep `count` coordinates starting at index `start` and advancing by `step`. The result
    /// is linear, with the coordinates it had in this dimension.
    ///
    pub(crate) fn select(&self, start: usize, step: isize, count: usize) -> Result<Self> {
        let first = self
            .coordinates()
            .get(start)
            .ok_or_else(|| Error::Index(format!("index {start} out of range")))?;
        let mut dimension = Self::new(count, self.increment.clone() * step as f64)?;
        dimension.quantitative = Quantitative {
            coordinates_offset: Quantity::new(first, self.unit().clone()),
            ..self.quantitative.clone()
        };
        dimension.reciprocal = self.reciprocal.clone();

        Ok(dimension)
    }

    pub(crate) fn scaled(&self, factor: &Quantity) -> Result<Self> {
        let mut dimension = Self::new(self.count, &self.increment * factor)?;
        dimension.complex_fft = self.complex_fft;
        dimension.quantitative = self.quantitative.scaled(factor);
        dimension.reciprocal = self.reciprocal.scaled(&factor.inverse());

        Ok(dimension)
    }

    pub(crate) fn to_unit(&self, unit: &Unit) -> Result<Self> {
        Ok(Self {
            count: self.count,
            increment: self.increment.to(unit)?,
            complex_fft: self.complex_fft,
            quantitative: self.quantitative.to_unit(unit)?,
            reciprocal: self.reciprocal.to_unit(&unit.inverse())?,
        })
    }

    /// Turn a dimension whose data are in FFT output order into one in ascending order.
    ///
    /// Returns the shift to roll the matching component axis by, or `None` if `complex_fft` is
    /// not set.
    ///
    pub(crate) fn sort_fft_order(&mut self) -> Result<Option<usize>> {
        if !self.complex_fft {
            return Ok(None);
        }

        let half = self.count / 2;
        let shift = self.increment.clone() * half as f64;
        self.quantitative.coordinates_offset =
            self.quantitative.coordinates_offset.checked_sub(&shift)?;
        self.complex_fft = false;

        Ok(Some(self.count - half))
    }

    pub(crate) fn to_value(&self) -> Value {
        let unit = self.unit();
        let mut object = Object::new();
        object.insert("type".to_string(), Value::String("linear".to_string()));
        insert_text(&mut object, "description", self.quantitative.description.trim());
        object.insert("count".to_string(), Value::from(self.count));
        object.insert(
            "increment".to_string(),
            Value::String(self.increment.to_string()),
        );
        self.quantitative.write(&mut object, unit);
        if self.complex_fft {
            object.insert("complex_fft".to_string(), Value::Bool(true));
        }
        if let Some(reciprocal) = self.reciprocal.to_reciprocal_value(&unit.inverse()) {
            object.insert("reciprocal".to_string(), reciprocal);
        }

        Value::Object(object)
    }
}
