//! The coordinate axes of a dataset.
//!
//! A `Dimension` is one of three kinds: `Labeled` (text coordinates), `Linear` (evenly spaced
//! physical coordinates) or `Monotonic` (an explicit list of physical coordinates).
//!
mod labeled;
mod linear;
mod monotonic;
mod quantitative;

use std::slice;

use ndarray::Array1;
use serde_json::Value;

pub use labeled::LabeledDimension;
pub use linear::LinearDimension;
pub use monotonic::MonotonicDimension;
pub use quantitative::Quantitative;
pub(crate) use quantitative::explicit_name;

use crate::errors::{Error, Result};
use crate::helpers::{as_object, require_str, Object};
use crate::range::FloatRange;
use crate::units::{Quantity, Unit};

#[derive(Debug, Clone, PartialEq)]
pub enum Dimension {
    Labeled(LabeledDimension),
    Linear(LinearDimension),
    Monotonic(MonotonicDimension),
}

/// One coordinate of a dimension.
///
#[derive(Debug, Clone, PartialEq)]
pub enum Coordinate<'a> {
    Label(&'a str),
    Quantity(Quantity),
}

#[derive(Debug, Clone)]
enum Source<'a> {
    Labels(slice::Iter<'a, String>),
    Linear(FloatRange),
    Monotonic(slice::Iter<'a, f64>, f64),
}

/// Iterator over the coordinates of a dimension. Coordinates are computed as they are
/// iterated. Clone the iterator, or call `Dimension::coordinates` again, to start over.
///
#[derive(Debug, Clone)]
pub struct Coordinates<'a> {
    source: Source<'a>,
    unit: Option<&'a Unit>,
}

impl<'a> Iterator for Coordinates<'a> {
    type Item = Coordinate<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let unit = self.unit;
        let quantity = |value: f64| {
            let unit = unit.cloned().unwrap_or_else(Unit::dimensionless);
            Coordinate::Quantity(Quantity::new(value, unit))
        };
        match &mut self.source {
            Source::Labels(labels) => labels.next().map(|label| Coordinate::Label(label)),
            Source::Linear(range) => range.next().map(quantity),
            Source::Monotonic(values, offset) => {
                let offset = *offset;
                values.next().map(|value| quantity(value + offset))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.source {
            Source::Labels(labels) => labels.size_hint(),
            Source::Linear(range) => range.size_hint(),
            Source::Monotonic(values, _) => values.size_hint(),
        }
    }
}

impl ExactSizeIterator for Coordinates<'_> {}

impl Dimension {
    /// Build a dimension from its serialized form, dispatching on the `type` key.
    ///
    /// # Arguments
    ///
    /// * `value` - The JSON object describing the dimension.
    /// * `context` - Where `value` came from, for error messages.
    ///
    pub fn from_value(value: &Value, context: &str) -> Result<Self> {
        let object = as_object(value, context)?;
        match require_str(object, "type", context)? {
            "labeled" => Ok(Dimension::Labeled(LabeledDimension::from_object(
                object, context,
            )?)),
            "linear" => Ok(Dimension::Linear(LinearDimension::from_object(
                object, context,
            )?)),
            "monotonic" => Ok(Dimension::Monotonic(MonotonicDimension::from_object(
                object, context,
            )?)),
            other => Err(Error::schema(format!(
                "unknown dimension type `{other}` in {context}"
            ))),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Dimension::Labeled(dimension) => dimension.to_value(),
            Dimension::Linear(dimension) => dimension.to_value(),
            Dimension::Monotonic(dimension) => dimension.to_value(),
        }
    }

    /// The `type` discriminator of this dimension
    pub fn type_name(&self) -> &'static str {
        match self {
            Dimension::Labeled(_) => "labeled",
            Dimension::Linear(_) => "linear",
            Dimension::Monotonic(_) => "monotonic",
        }
    }

    pub fn count(&self) -> usize {
        match self {
            Dimension::Labeled(dimension) => dimension.count(),
            Dimension::Linear(dimension) => dimension.count(),
            Dimension::Monotonic(dimension) => dimension.count(),
        }
    }

    pub fn is_quantitative(&self) -> bool {
        !matches!(self, Dimension::Labeled(_))
    }

    /// Quantitative metadata, `None` for a labeled dimension
    pub fn quantitative(&self) -> Option<&Quantitative> {
        match self {
            Dimension::Labeled(_) => None,
            Dimension::Linear(dimension) => Some(&dimension.quantitative),
            Dimension::Monotonic(dimension) => Some(&dimension.quantitative),
        }
    }

    pub fn quantitative_mut(&mut self) -> Option<&mut Quantitative> {
        match self {
            Dimension::Labeled(_) => None,
            Dimension::Linear(dimension) => Some(&mut dimension.quantitative),
            Dimension::Monotonic(dimension) => Some(&mut dimension.quantitative),
        }
    }

    /// Metadata of the reciprocal descriptor, `None` for a labeled dimension
    pub fn reciprocal_metadata(&self) -> Option<&Quantitative> {
        match self {
            Dimension::Labeled(_) => None,
            Dimension::Linear(dimension) => Some(&dimension.reciprocal),
            Dimension::Monotonic(dimension) => Some(&dimension.reciprocal),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Dimension::Labeled(dimension) => &dimension.label,
            Dimension::Linear(dimension) => &dimension.quantitative.label,
            Dimension::Monotonic(dimension) => &dimension.quantitative.label,
        }
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        let label = label.into();
        match self {
            Dimension::Labeled(dimension) => dimension.label = label,
            Dimension::Linear(dimension) => dimension.quantitative.label = label,
            Dimension::Monotonic(dimension) => dimension.quantitative.label = label,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Dimension::Labeled(dimension) => &dimension.description,
            Dimension::Linear(dimension) => &dimension.quantitative.description,
            Dimension::Monotonic(dimension) => &dimension.quantitative.description,
        }
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        let description = description.into();
        match self {
            Dimension::Labeled(dimension) => dimension.description = description,
            Dimension::Linear(dimension) => dimension.quantitative.description = description,
            Dimension::Monotonic(dimension) => dimension.quantitative.description = description,
        }
    }

    pub fn application(&self) -> &Object {
        match self {
            Dimension::Labeled(dimension) => &dimension.application,
            Dimension::Linear(dimension) => &dimension.quantitative.application,
            Dimension::Monotonic(dimension) => &dimension.quantitative.application,
        }
    }

    pub fn application_mut(&mut self) -> &mut Object {
        match self {
            Dimension::Labeled(dimension) => &mut dimension.application,
            Dimension::Linear(dimension) => &mut dimension.quantitative.application,
            Dimension::Monotonic(dimension) => &mut dimension.quantitative.application,
        }
    }

    /// Drop application metadata of the dimension and of its reciprocal descriptor.
    ///
    pub(crate) fn clear_application(&mut self) {
        match self {
            Dimension::Labeled(dimension) => dimension.application.clear(),
            Dimension::Linear(dimension) => {
                dimension.quantitative.application.clear();
                dimension.reciprocal.application.clear();
            }
            Dimension::Monotonic(dimension) => {
                dimension.quantitative.application.clear();
                dimension.reciprocal.application.clear();
            }
        }
    }

    /// Unit of the coordinates, `None` for a labeled dimension
    pub fn unit(&self) -> Option<&Unit> {
        match self {
            Dimension::Labeled(_) => None,
            Dimension::Linear(dimension) => Some(dimension.unit()),
            Dimension::Monotonic(dimension) => Some(dimension.unit()),
        }
    }

    /// Iterate over the coordinates of this dimension.
    ///
    pub fn coordinates(&self) -> Coordinates<'_> {
        let source = match self {
            Dimension::Labeled(dimension) => Source::Labels(dimension.labels().iter()),
            Dimension::Linear(dimension) => Source::Linear(dimension.coordinates()),
            Dimension::Monotonic(dimension) => {
                let offset = dimension
                    .quantitative
                    .coordinates_offset
                    .value_in(dimension.unit())
                    .unwrap_or(0.0);
                Source::Monotonic(dimension.values().iter(), offset)
            }
        };

        Coordinates {
            source,
            unit: self.unit(),
        }
    }

    /// Coordinate magnitudes in the unit of the dimension, `None` for a labeled dimension.
    ///
    pub fn coordinate_values(&self) -> Option<Array1<f64>> {
        match self {
            Dimension::Labeled(_) => None,
            Dimension::Linear(dimension) => Some(dimension.coordinates().values()),
            Dimension::Monotonic(dimension) => Some(dimension.coordinates().collect()),
        }
    }

    /// Coordinates plus the origin offset, in the unit of the dimension. `None` for a labeled
    /// dimension.
    ///
    pub fn absolute_coordinates(&self) -> Result<Option<Array1<f64>>> {
        match (self.coordinate_values(), self.quantitative(), self.unit()) {
            (Some(coordinates), Some(quantitative), Some(unit)) => {
                let origin = quantitative.origin_offset.value_in(unit)?;
                Ok(Some(coordinates + origin))
            }
            _ => Ok(None),
        }
    }

    /// The dimension in reciprocal space.
    ///
    /// For a linear dimension the reciprocal has the same count and an increment of
    /// `1 / (count * increment)`. A monotonic dimension uses its mean spacing. A labeled
    /// dimension has no reciprocal.
    ///
    pub fn reciprocal(&self) -> Result<Dimension> {
        match self {
            Dimension::Labeled(_) => Err(Error::Value(
                "a labeled dimension has no reciprocal".to_string(),
            )),
            Dimension::Linear(dimension) => Ok(Dimension::Linear(dimension.reciprocal_dimension())),
            Dimension::Monotonic(dimension) => {
                Ok(Dimension::Linear(dimension.reciprocal_dimension()?))
            }
        }
    }

    /// Whether two dimensions describe the same grid axis: same type, same count and
    /// convertible units. Labeled dimensions also need the same labels.
    ///
    pub fn is_compatible(&self, other: &Dimension) -> bool {
        self.check_compatible(other).is_ok()
    }

    pub fn check_compatible(&self, other: &Dimension) -> Result<()> {
        if self.type_name() != other.type_name() {
            return Err(Error::ShapeMismatch(format!(
                "cannot combine a {} dimension with a {} dimension",
                self.type_name(),
                other.type_name()
            )));
        }
        if self.count() != other.count() {
            return Err(Error::ShapeMismatch(format!(
                "dimension counts differ, {} and {}",
                self.count(),
                other.count()
            )));
        }

        match (self, other) {
            (Dimension::Labeled(a), Dimension::Labeled(b)) if a.labels() != b.labels() => Err(
                Error::ShapeMismatch("labeled dimensions have different labels".to_string()),
            ),
            _ => match (self.unit(), other.unit()) {
                (Some(a), Some(b)) if !a.is_convertible(b) => Err(Error::UnitIncompatibility {
                    left: a.to_string(),
                    right: b.to_string(),
                }),
                _ => Ok(()),
            },
        }
    }

    /// Multiply the coordinates by a physical quantity. The unit of the dimension becomes the
    /// product of its unit and the unit of `factor`.
    ///
    pub fn scaled(&self, factor: &Quantity) -> Result<Dimension> {
        match self {
            Dimension::Labeled(_) => Err(Error::Value(
                "a labeled dimension cannot be scaled".to_string(),
            )),
            Dimension::Linear(dimension) => Ok(Dimension::Linear(dimension.scaled(factor)?)),
            Dimension::Monotonic(dimension) => Ok(Dimension::Monotonic(dimension.scaled(factor)?)),
        }
    }

    /// Express the coordinates in another unit, which must be convertible to the current one.
    ///
    pub fn to_unit(&self, unit: &Unit) -> Result<Dimension> {
        match self {
            Dimension::Labeled(_) => Err(Error::Value(
                "a labeled dimension has no unit".to_string(),
            )),
            Dimension::Linear(dimension) => Ok(Dimension::Linear(dimension.to_unit(unit)?)),
            Dimension::Monotonic(dimension) => Ok(Dimension::Monotonic(dimension.to_unit(unit)?)),
        }
    }

    /// Keep `count` coordinates starting at `start` and advancing by `step`. All selected
    /// indexes must be in bounds.
    ///
    pub(crate) fn select(&self, start: usize, step: isize, count: usize) -> Result<Dimension> {
        if count == 0 {
            return Err(Error::Index("selection along a dimension is empty".to_string()));
        }
        let indices: Vec<usize> = (0..count)
            .map(|i| (start as isize + i as isize * step) as usize)
            .collect();
        if let Some(bad) = indices.iter().find(|&&i| i >= self.count()) {
            return Err(Error::Index(format!(
                "index {bad} out of range for dimension of count {}",
                self.count()
            )));
        }

        match self {
            Dimension::Labeled(dimension) => Ok(Dimension::Labeled(dimension.select(&indices))),
            Dimension::Linear(dimension) => {
                Ok(Dimension::Linear(dimension.select(start, step, count)?))
            }
            Dimension::Monotonic(dimension) => {
                Ok(Dimension::Monotonic(dimension.select(&indices)?))
            }
        }
    }

    /// Check that offsets and period can be expressed in the unit of the dimension.
    ///
    pub fn validate(&self) -> Result<()> {
        if let (Some(quantitative), Some(unit)) = (self.quantitative(), self.unit()) {
            quantitative.coordinates_offset.unit.factor_to(unit)?;
            quantitative.origin_offset.unit.factor_to(unit)?;
            if let Some(period) = &quantitative.period {
                period.unit.factor_to(unit)?;
            }
        }

        Ok(())
    }
}

impl From<LabeledDimension> for Dimension {
    fn from(dimension: LabeledDimension) -> Self {
        Dimension::Labeled(dimension)
    }
}

impl From<LinearDimension> for Dimension {
    fn from(dimension: LinearDimension) -> Self {
        Dimension::Linear(dimension)
    }
}

impl From<MonotonicDimension> for Dimension {
    fn from(dimension: MonotonicDimension) -> Self {
        Dimension::Monotonic(dimension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    fn dimension(value: Value) -> Result<Dimension> {
        Dimension::from_value(&value, "test")
    }

    #[test]
    fn test_dispatch() -> Result<()> {
        let linear = dimension(json!({"type": "linear", "count": 2, "increment": "1 s"}))?;
        assert_eq!(linear.type_name(), "linear");
        assert_eq!(linear.count(), 2);

        let labeled = dimension(json!({"type": "labeled", "labels": ["a"]}))?;
        assert_eq!(labeled.type_name(), "labeled");
        assert!(!labeled.is_quantitative());
        assert!(labeled.unit().is_none());

        assert!(matches!(
            dimension(json!({"type": "circular"})),
            Err(Error::Schema(_))
        ));
        assert!(matches!(
            dimension(json!({"count": 2})),
            Err(Error::MissingKey { .. })
        ));

        Ok(())
    }

    #[test]
    fn test_coordinates_are_restartable() -> Result<()> {
        let linear = dimension(json!({
            "type": "linear",
            "count": 3,
            "increment": "2.64 m",
            "coordinates_offset": "1 km",
        }))?;
        let coordinates = linear.coordinates();
        assert_eq!(coordinates.len(), 3);

        let first: Vec<Coordinate> = coordinates.clone().collect();
        let second: Vec<Coordinate> = linear.coordinates().collect();
        assert_eq!(first, second);
        match &first[2] {
            Coordinate::Quantity(quantity) => {
                assert!((quantity.value - 1005.28).abs() < 1e-9);
                assert_eq!(quantity.unit.symbol(), "m");
            }
            other => panic!("expected a quantity, got {other:?}"),
        }

        let labeled = dimension(json!({"type": "labeled", "labels": ["x", "y"]}))?;
        let labels: Vec<Coordinate> = labeled.coordinates().collect();
        assert_eq!(labels, vec![Coordinate::Label("x"), Coordinate::Label("y")]);

        Ok(())
    }

    #[test]
    fn test_absolute_coordinates() -> Result<()> {
        let linear = dimension(json!({
            "type": "linear",
            "count": 3,
            "increment": "1 Hz",
            "origin_offset": "1 kHz",
        }))?;
        let absolute = linear.absolute_coordinates()?.unwrap();
        assert_eq!(absolute.to_vec(), vec![1000.0, 1001.0, 1002.0]);

        let monotonic = dimension(json!({
            "type": "monotonic",
            "coordinates": ["1 m", "3 m"],
            "origin_offset": "1 m",
        }))?;
        let absolute = monotonic.absolute_coordinates()?.unwrap();
        assert_eq!(absolute.to_vec(), vec![2.0, 4.0]);

        Ok(())
    }

    #[test]
    fn test_reciprocal_of_labeled() -> Result<()> {
        let labeled = dimension(json!({"type": "labeled", "labels": ["a", "b"]}))?;
        assert!(matches!(labeled.reciprocal(), Err(Error::Value(_))));

        let linear = dimension(json!({"type": "linear", "count": 4, "increment": "0.5 s"}))?;
        let reciprocal = linear.reciprocal()?;
        let increment = match &reciprocal {
            Dimension::Linear(dimension) => dimension.increment().value_in(&Unit::parse("Hz")?)?,
            other => panic!("expected a linear dimension, got {other:?}"),
        };
        assert_eq!(increment, 0.5);
        assert_eq!(reciprocal.reciprocal()?.unit(), linear.unit());

        Ok(())
    }

    #[test]
    fn test_compatibility() -> Result<()> {
        let a = dimension(json!({"type": "linear", "count": 4, "increment": "1 ms"}))?;
        let b = dimension(json!({"type": "linear", "count": 4, "increment": "3 s"}))?;
        let c = dimension(json!({"type": "linear", "count": 4, "increment": "1 m"}))?;
        let d = dimension(json!({"type": "linear", "count": 5, "increment": "1 ms"}))?;
        let e = dimension(json!({"type": "labeled", "labels": ["a", "b", "c", "d"]}))?;
        let f = dimension(json!({"type": "labeled", "labels": ["a", "b", "c", "e"]}))?;

        assert!(a.is_compatible(&b));
        assert!(matches!(
            a.check_compatible(&c),
            Err(Error::UnitIncompatibility { .. })
        ));
        assert!(matches!(
            a.check_compatible(&d),
            Err(Error::ShapeMismatch(_))
        ));
        assert!(!a.is_compatible(&e));
        assert!(!e.is_compatible(&f));
        assert!(e.is_compatible(&e.clone()));

        Ok(())
    }

    #[test]
    fn test_scaled() -> Result<()> {
        let linear = dimension(json!({"type": "linear", "count": 3, "increment": "2 s"}))?;
        let scaled = linear.scaled(&Quantity::parse("3 m")?)?;
        assert_eq!(scaled.coordinate_values().unwrap().to_vec(), vec![0.0, 6.0, 12.0]);
        assert_eq!(
            scaled.unit().unwrap().quantity_name(),
            Unit::parse("m * s")?.quantity_name()
        );

        let labeled = dimension(json!({"type": "labeled", "labels": ["a"]}))?;
        assert!(matches!(
            labeled.scaled(&Quantity::parse("3 m")?),
            Err(Error::Value(_))
        ));

        Ok(())
    }

    #[test]
    fn test_select() -> Result<()> {
        let monotonic = dimension(json!({
            "type": "monotonic",
            "coordinates": ["1 m", "2 m", "4 m", "8 m"],
        }))?;
        let selected = monotonic.select(3, -2, 2)?;
        assert_eq!(selected.coordinate_values().unwrap().to_vec(), vec![8.0, 2.0]);
        assert!(matches!(monotonic.select(2, 2, 2), Err(Error::Index(_))));

        Ok(())
    }

    #[test]
    fn test_clear_application() -> Result<()> {
        let mut linear = dimension(json!({
            "type": "linear",
            "count": 2,
            "increment": "1 s",
            "application": {"com.example": {"a": 1}},
            "reciprocal": {"application": {"com.example": {"b": 2}}},
        }))?;
        assert!(!linear.application().is_empty());
        linear.clear_application();
        assert!(linear.application().is_empty());
        assert!(linear.reciprocal_metadata().unwrap().application.is_empty());

        Ok(())
    }
}
