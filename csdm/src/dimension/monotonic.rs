use serde_json::Value;

use super::linear::LinearDimension;
use super::quantitative::Quantitative;
use crate::errors::{Error, Result};
use crate::helpers::{as_object, get_array, insert_text, parse_quantity, Object};
use crate::units::{Quantity, Unit};

/// A dimension sampled at an explicit, strictly monotonic list of coordinates.
///
/// The coordinate at index `k` is `values[k] + coordinates_offset`.
///
#[derive(Debug, Clone, PartialEq)]
pub struct MonotonicDimension {
    values: Vec<f64>,
    unit: Unit,
    pub quantitative: Quantitative,

    /// Metadata for the dimension in the reciprocal space
    pub reciprocal: Quantitative,
}

fn check_monotonic(values: &[f64]) -> Result<()> {
    if values.is_empty() {
        return Err(Error::Value(
            "a monotonic dimension needs at least one coordinate".to_string(),
        ));
    }
    if values.iter().any(|value| !value.is_finite()) {
        return Err(Error::Value(
            "coordinates of a monotonic dimension must be finite".to_string(),
        ));
    }

    let increasing = values.windows(2).all(|pair| pair[0] < pair[1]);
    let decreasing = values.windows(2).all(|pair| pair[0] > pair[1]);
    if increasing || decreasing {
        Ok(())
    } else {
        Err(Error::Value(
            "coordinates of a monotonic dimension must be strictly increasing or decreasing"
                .to_string(),
        ))
    }
}

impl MonotonicDimension {
    /// Create a monotonic dimension from magnitudes in a single unit.
    ///
    pub fn new(values: Vec<f64>, unit: Unit) -> Result<Self> {
        check_monotonic(&values)?;

        Ok(Self {
            values,
            quantitative: Quantitative::new(&unit),
            reciprocal: Quantitative::new(&unit.inverse()),
            unit,
        })
    }

    /// Create a monotonic dimension from quantities. The unit of the dimension is the unit of
    /// the first coordinate and every other coordinate is converted to it.
    ///
    pub fn from_quantities(coordinates: &[Quantity]) -> Result<Self> {
        let unit = match coordinates.first() {
            Some(first) => first.unit.clone(),
            None => Unit::dimensionless(),
        };
        let values = coordinates
            .iter()
            .map(|coordinate| coordinate.value_in(&unit))
            .collect::<Result<Vec<_>>>()?;

        Self::new(values, unit)
    }

    pub(crate) fn from_object(object: &Object, context: &str) -> Result<Self> {
        let coordinates = get_array(object, "coordinates", context)?
            .ok_or_else(|| Error::missing("coordinates", context))?
            .iter()
            .map(|value| {
                parse_quantity(value).map_err(|err| match err {
                    Error::UnitParse(msg) => Error::schema(format!("coordinates in {context}: {msg}")),
                    err => err,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let mut dimension = Self::from_quantities(&coordinates)?;
        let unit = dimension.unit.clone();

        dimension.quantitative = Quantitative::from_object(object, &unit, context)?;
        if let Some(reciprocal) = object.get("reciprocal") {
            let context = format!("reciprocal of {context}");
            let reciprocal = as_object(reciprocal, &context)?;
            dimension.reciprocal = Quantitative::from_object(reciprocal, &unit.inverse(), &context)?;
        }

        Ok(dimension)
    }

    pub fn count(&self) -> usize {
        self.values.len()
    }

    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    /// The stored coordinate magnitudes, without the coordinates offset
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Coordinates as magnitudes in the unit of the dimension.
    ///
    pub fn coordinates(&self) -> impl Iterator<Item = f64> + Clone + '_ {
        let offset = self
            .quantitative
            .coordinates_offset
            .value_in(&self.unit)
            .unwrap_or(0.0);

        self.values.iter().map(move |value| value + offset)
    }

    /// The linear dimension in reciprocal space, with the same count and an increment of
    /// `1 / (count * mean_spacing)`.
    ///
    pub fn reciprocal_dimension(&self) -> Result<LinearDimension> {
        let n = self.values.len();
        let span = if n > 1 {
            (self.values[n - 1] - self.values[0]) / (n - 1) as f64
        } else {
            1.0
        };
        let spacing = Quantity::new(span * n as f64, self.unit.clone());
        let mut dimension = LinearDimension::new(n, spacing.inverse())?;
        dimension.quantitative = self.reciprocal.clone();
        dimension.reciprocal = self.quantitative.clone();

        Ok(dimension)
    }

    /// Keep the coordinates at `indices`, which must be in bounds.
    pub(crate) fn select(&self, indices: &[usize]) -> Result<Self> {
        let values: Vec<f64> = indices.iter().map(|&i| self.values[i]).collect();
        check_monotonic(&values)?;

        Ok(Self {
            values,
            ..self.clone()
        })
    }

    pub(crate) fn scaled(&self, factor: &Quantity) -> Result<Self> {
        let unit = self.unit.multiply(&factor.unit);
        let values = self.values.iter().map(|value| value * factor.value).collect();
        let mut dimension = Self::new(values, unit)?;
        dimension.quantitative = self.quantitative.scaled(factor);
        dimension.reciprocal = self.reciprocal.scaled(&factor.inverse());

        Ok(dimension)
    }

    pub(crate) fn to_unit(&self, unit: &Unit) -> Result<Self> {
        let factor = self.unit.factor_to(unit)?;

        Ok(Self {
            values: self.values.iter().map(|value| value * factor).collect(),
            unit: unit.clone(),
            quantitative: self.quantitative.to_unit(unit)?,
            reciprocal: self.reciprocal.to_unit(&unit.inverse())?,
        })
    }

    pub(crate) fn to_value(&self) -> Value {
        let mut object = Object::new();
        object.insert("type".to_string(), Value::String("monotonic".to_string()));
        insert_text(&mut object, "description", self.quantitative.description.trim());
        object.insert(
            "coordinates".to_string(),
            Value::Array(
                self.values
                    .iter()
                    .map(|&value| Value::String(Quantity::new(value, self.unit.clone()).to_string()))
                    .collect(),
            ),
        );
        self.quantitative.write(&mut object, &self.unit);
        if let Some(reciprocal) = self.reciprocal.to_reciprocal_value(&self.unit.inverse()) {
            object.insert("reciprocal".to_string(), reciprocal);
        }

        Value::Object(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    fn monotonic(value: Value) -> Result<MonotonicDimension> {
        MonotonicDimension::from_object(value.as_object().unwrap(), "test")
    }

    #[test]
    fn test_mixed_units() -> Result<()> {
        let dimension = monotonic(json!({
            "type": "monotonic",
            "coordinates": ["1 µs", "2 µs", "0.01 ms", "1 ms"],
        }))?;
        assert_eq!(dimension.count(), 4);
        assert_eq!(dimension.unit().symbol(), "µs");
        let coordinates: Vec<f64> = dimension.coordinates().collect();
        assert_eq!(coordinates[0], 1.0);
        assert!((coordinates[3] - 1000.0).abs() < 1e-9);

        Ok(())
    }

    #[test]
    fn test_numbers_are_dimensionless() -> Result<()> {
        let dimension = monotonic(json!({
            "type": "monotonic",
            "coordinates": [5, 3, 1],
        }))?;
        assert!(dimension.unit().is_dimensionless());
        assert_eq!(dimension.values(), &[5.0, 3.0, 1.0]);

        Ok(())
    }

    #[test]
    fn test_not_monotonic() {
        assert!(matches!(
            MonotonicDimension::new(vec![1.0, 3.0, 2.0], Unit::dimensionless()),
            Err(Error::Value(_))
        ));
        assert!(matches!(
            MonotonicDimension::new(vec![1.0, 1.0], Unit::dimensionless()),
            Err(Error::Value(_))
        ));
        assert!(matches!(
            MonotonicDimension::new(vec![], Unit::dimensionless()),
            Err(Error::Value(_))
        ));
        assert!(matches!(
            monotonic(json!({"type": "monotonic", "coordinates": ["1 m", "2 s"]})),
            Err(Error::UnitIncompatibility { .. })
        ));
    }

    #[test]
    fn test_reciprocal() -> Result<()> {
        let dimension = MonotonicDimension::new(vec![0.0, 1.0, 3.0, 6.0, 8.0], Unit::parse("s")?)?;
        let reciprocal = dimension.reciprocal_dimension()?;
        assert_eq!(reciprocal.count(), 5);
        assert!(!reciprocal.complex_fft);
        assert!((reciprocal.increment().value_in(&Unit::parse("Hz")?)? - 0.1).abs() < 1e-12);

        Ok(())
    }

    #[test]
    fn test_select_reversed() -> Result<()> {
        let dimension = MonotonicDimension::new(vec![1.0, 2.0, 4.0, 8.0], Unit::parse("m")?)?;
        let selected = dimension.select(&[3, 1])?;
        assert_eq!(selected.values(), &[8.0, 2.0]);

        Ok(())
    }

    #[test]
    fn test_to_value() -> Result<()> {
        let value = json!({
            "type": "monotonic",
            "description": "pressure steps",
            "coordinates": ["1.0 bar", "2.5 bar", "10.0 bar"],
            "quantity_name": "pressure",
            "label": "applied",
        });
        assert_eq!(monotonic(value.clone())?.to_value(), value);

        Ok(())
    }
}
