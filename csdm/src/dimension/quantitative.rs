use serde_json::Value;

use crate::errors::{Error, Result};
use crate::helpers::{
    get_application, get_quantity, get_string, insert_application, insert_text, Object,
};
use crate::units::{Quantity, Unit};

/// Metadata shared by physical dimensions and by their reciprocal descriptors.
///
/// Offsets and period are kept in whatever unit they were given in. They only need to be
/// convertible to the unit of the dimension they belong to.
///
#[derive(Debug, Clone, PartialEq)]
pub struct Quantitative {
    pub coordinates_offset: Quantity,
    pub origin_offset: Quantity,

    /// Absent, zero, or infinite means the dimension is not periodic
    pub period: Option<Quantity>,

    /// Explicit name of the physical quantity. Derived from the unit when `None`.
    pub quantity_name: Option<String>,

    pub label: String,
    pub description: String,
    pub application: Object,
}

impl Quantitative {
    /// Metadata with zero offsets in `unit` and nothing else set.
    ///
    pub fn new(unit: &Unit) -> Self {
        Self {
            coordinates_offset: Quantity::zero(unit),
            origin_offset: Quantity::zero(unit),
            period: None,
            quantity_name: None,
            label: String::new(),
            description: String::new(),
            application: Object::new(),
        }
    }

    /// Read quantitative metadata from a dimension or reciprocal object.
    ///
    /// # Arguments
    ///
    /// * `object` - The JSON object to read from.
    /// * `unit` - Unit of the dimension. Offsets and period must be convertible to it.
    /// * `context` - Where `object` came from, for error messages.
    ///
    pub(crate) fn from_object(object: &Object, unit: &Unit, context: &str) -> Result<Self> {
        let offset = |key: &str| -> Result<Quantity> {
            match get_quantity(object, key, context)? {
                Some(quantity) => check_unit(quantity, unit),
                None => Ok(Quantity::zero(unit)),
            }
        };
        let period = match get_quantity(object, "period", context)? {
            Some(period) => Some(check_unit(period, unit)?),
            None => None,
        };
        let quantity_name = get_string(object, "quantity_name", context)?;

        Ok(Self {
            coordinates_offset: offset("coordinates_offset")?,
            origin_offset: offset("origin_offset")?,
            period,
            quantity_name: explicit_name(quantity_name, unit),
            label: get_string(object, "label", context)?,
            description: get_string(object, "description", context)?,
            application: get_application(object, context)?,
        })
    }

    /// Name of the physical quantity, explicit or derived from `unit`.
    ///
    pub fn quantity_name(&self, unit: &Unit) -> String {
        match &self.quantity_name {
            Some(name) => name.clone(),
            None => unit.quantity_name().to_string(),
        }
    }

    pub fn is_periodic(&self) -> bool {
        self.period
            .as_ref()
            .map(|period| period.value.is_finite() && period.value != 0.0)
            .unwrap_or(false)
    }

    /// Write the quantitative keys, skipping those that hold default values.
    ///
    pub(crate) fn write(&self, object: &mut Object, unit: &Unit) {
        if !self.coordinates_offset.is_zero() {
            object.insert(
                "coordinates_offset".to_string(),
                Value::String(self.coordinates_offset.to_string()),
            );
        }
        if !self.origin_offset.is_zero() {
            object.insert(
                "origin_offset".to_string(),
                Value::String(self.origin_offset.to_string()),
            );
        }

        let quantity_name = self.quantity_name(unit);
        if quantity_name != "dimensionless" && quantity_name != "unknown" {
            object.insert("quantity_name".to_string(), Value::String(quantity_name));
        }

        if let Some(period) = self.period.as_ref().filter(|_| self.is_periodic()) {
            object.insert("period".to_string(), Value::String(period.to_string()));
        }

        insert_text(object, "label", self.label.trim());
        insert_application(object, &self.application);
    }

    /// The `reciprocal` object of a dimension, or `None` when there is nothing to write.
    ///
    pub(crate) fn to_reciprocal_value(&self, unit: &Unit) -> Option<Value> {
        let mut object = Object::new();
        insert_text(&mut object, "description", self.description.trim());
        self.write(&mut object, unit);

        (!object.is_empty()).then_some(Value::Object(object))
    }

    /// Multiply offsets and period by `factor`.
    ///
    pub(crate) fn scaled(&self, factor: &Quantity) -> Self {
        Self {
            coordinates_offset: &self.coordinates_offset * factor,
            origin_offset: &self.origin_offset * factor,
            period: self.period.as_ref().map(|period| period * factor),
            quantity_name: None,
            ..self.clone()
        }
    }

    /// Express offsets and period in `unit`.
    ///
    pub(crate) fn to_unit(&self, unit: &Unit) -> Result<Self> {
        Ok(Self {
            coordinates_offset: self.coordinates_offset.to(unit)?,
            origin_offset: self.origin_offset.to(unit)?,
            period: match &self.period {
                Some(period) => Some(period.to(unit)?),
                None => None,
            },
            ..self.clone()
        })
    }
}

/// Check that `quantity` can be expressed in `unit`. A dimensionless zero is taken to be zero in
/// any unit.
///
fn check_unit(quantity: Quantity, unit: &Unit) -> Result<Quantity> {
    if quantity.unit.is_convertible(unit) {
        Ok(quantity)
    } else if quantity.unit.is_dimensionless() && quantity.is_zero() {
        Ok(Quantity::zero(unit))
    } else {
        Err(Error::UnitIncompatibility {
            left: quantity.unit.to_string(),
            right: unit.to_string(),
        })
    }
}

/// A `quantity_name` read from a document, `None` if blank or the name derived from `unit`.
///
pub(crate) fn explicit_name(name: String, unit: &Unit) -> Option<String> {
    (!name.is_empty() && name != unit.quantity_name()).then_some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    fn object(value: Value) -> Object {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_from_object() -> Result<()> {
        let unit = Unit::parse("m")?;
        let obj = object(json!({
            "coordinates_offset": "1 km",
            "period": "5 m",
            "label": "distance",
            "description": "along the track",
        }));
        let quantitative = Quantitative::from_object(&obj, &unit, "test")?;
        assert_eq!(quantitative.coordinates_offset.value_in(&unit)?, 1000.0);
        assert!(quantitative.origin_offset.is_zero());
        assert!(quantitative.is_periodic());
        assert_eq!(quantitative.quantity_name(&unit), "length");
        assert_eq!(quantitative.label, "distance");
        assert_eq!(quantitative.quantity_name, None);

        let obj = object(json!({"quantity_name": "wavelength"}));
        let quantitative = Quantitative::from_object(&obj, &unit, "test")?;
        assert_eq!(quantitative.quantity_name.as_deref(), Some("wavelength"));

        let obj = object(json!({"quantity_name": "length"}));
        let quantitative = Quantitative::from_object(&obj, &unit, "test")?;
        assert_eq!(quantitative.quantity_name, None);

        Ok(())
    }

    #[test]
    fn test_incompatible_offset() -> Result<()> {
        let unit = Unit::parse("Hz")?;
        let obj = object(json!({"origin_offset": "3 m"}));
        assert!(matches!(
            Quantitative::from_object(&obj, &unit, "test"),
            Err(Error::UnitIncompatibility { .. })
        ));

        let obj = object(json!({"origin_offset": 0}));
        let quantitative = Quantitative::from_object(&obj, &unit, "test")?;
        assert!(quantitative.origin_offset.is_zero());

        Ok(())
    }

    #[test]
    fn test_write_skips_defaults() -> Result<()> {
        let unit = Unit::dimensionless();
        let mut obj = Object::new();
        Quantitative::new(&unit).write(&mut obj, &unit);
        assert!(obj.is_empty());
        assert_eq!(Quantitative::new(&unit).to_reciprocal_value(&unit), None);

        let unit = Unit::parse("Hz")?;
        let mut quantitative = Quantitative::new(&unit);
        quantitative.origin_offset = Quantity::parse("100 MHz")?;
        quantitative.period = Some(Quantity::parse("inf Hz")?);
        let mut obj = Object::new();
        quantitative.write(&mut obj, &unit);
        assert_eq!(
            Value::Object(obj),
            json!({"origin_offset": "100.0 MHz", "quantity_name": "frequency"})
        );

        Ok(())
    }
}
