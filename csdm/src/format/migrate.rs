//! Renames keys of older document versions to their current names.
//!
//! Each rule records the version in which its legacy key was retired. Documents older than that
//! are renamed unconditionally. Newer documents are only renamed where the current key is
//! absent, with a warning, since the legacy key should not be there at all.
//!
use std::cmp::Ordering;
use std::fmt;

use log::warn;
use serde_json::Value;

use crate::errors::{Error, Result};
use crate::helpers::Object;

/// A document format version such as `1.0` or `0.0.9`.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version(Vec<u32>);

impl Version {
    pub fn parse(text: &str) -> Result<Self> {
        let parts = text
            .trim()
            .split('.')
            .map(str::parse)
            .collect::<std::result::Result<Vec<u32>, _>>()
            .map_err(|_| Error::schema(format!("invalid version `{text}`")))?;

        Ok(Version(parts))
    }

    pub fn major(&self) -> u32 {
        self.0.first().copied().unwrap_or(0)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    /// Missing trailing parts count as zero, so `1.0 == 1.0.0`.
    fn cmp(&self, other: &Self) -> Ordering {
        let n = self.0.len().max(other.0.len());
        let part = |v: &Version, i: usize| v.0.get(i).copied().unwrap_or(0);

        (0..n)
            .map(|i| part(self, i).cmp(&part(other, i)))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(u32::to_string).collect();
        write!(f, "{}", parts.join("."))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Dimension,
    DependentVariable,
    SparseSampling,
}

struct Rename {
    scope: Scope,
    legacy: &'static str,
    current: &'static str,
    retired: &'static str,
}

const fn rename(
    scope: Scope,
    legacy: &'static str,
    current: &'static str,
    retired: &'static str,
) -> Rename {
    Rename {
        scope,
        legacy,
        current,
        retired,
    }
}

const RENAMES: &[Rename] = &[
    rename(Scope::Dimension, "number_of_points", "count", "1.0"),
    rename(Scope::Dimension, "sampling_interval", "increment", "1.0"),
    rename(Scope::Dimension, "index_zero_value", "coordinates_offset", "1.0"),
    rename(Scope::Dimension, "index_zero_coordinate", "coordinates_offset", "1.0"),
    rename(Scope::Dimension, "reference_offset", "coordinates_offset", "1.0"),
    rename(Scope::Dimension, "fft_output_order", "complex_fft", "1.0"),
    rename(Scope::Dimension, "quantity", "quantity_name", "1.0"),
    rename(Scope::DependentVariable, "quantity", "quantity_name", "1.0"),
    rename(Scope::DependentVariable, "components_URI", "components_url", "1.0"),
    rename(Scope::SparseSampling, "dimensions", "dimension_indexes", "1.0"),
    rename(Scope::SparseSampling, "numeric_type", "unsigned_integer_type", "1.0"),
];

/// Legacy values of a dimension's `type` and their current names
const DIMENSION_TYPES: &[(&str, &str, &str)] = &[
    ("linear_spacing", "linear", "1.0"),
    ("arbitrarily_sampled", "monotonic", "1.0"),
    ("non_quantitative", "labeled", "1.0"),
];

/// Highest major version this crate reads
const SUPPORTED_MAJOR: u32 = 1;

/// Check that a document version can be read.
///
pub fn check_version(version: &Version) -> Result<()> {
    if version.major() > SUPPORTED_MAJOR {
        Err(Error::schema(format!(
            "document version {version} is newer than this library supports"
        )))
    } else {
        Ok(())
    }
}

/// Rename legacy keys throughout the body of a document (the object under `"csdm"`).
///
pub fn migrate(csdm: &mut Object, version: &Version) -> Result<()> {
    if let Some(Value::Array(dimensions)) = csdm.get_mut("dimensions") {
        for (i, dimension) in dimensions.iter_mut().enumerate() {
            if let Value::Object(dimension) = dimension {
                let context = format!("dimension {i}");
                migrate_dimension(dimension, version, &context)?;
            }
        }
    }

    if let Some(Value::Array(variables)) = csdm.get_mut("dependent_variables") {
        for (i, variable) in variables.iter_mut().enumerate() {
            if let Value::Object(variable) = variable {
                let context = format!("dependent variable {i}");
                apply(variable, Scope::DependentVariable, version, &context)?;
                if let Some(Value::Object(sparse)) = variable.get_mut("sparse_sampling") {
                    apply(sparse, Scope::SparseSampling, version, &context)?;
                }
            }
        }
    }

    Ok(())
}

fn migrate_dimension(dimension: &mut Object, version: &Version, context: &str) -> Result<()> {
    if let Some(Value::String(kind)) = dimension.get_mut("type") {
        for (legacy, current, retired) in DIMENSION_TYPES {
            if kind.as_str() == *legacy {
                if *version >= Version::parse(retired)? {
                    warn!("Dimension type `{legacy}` in {context} is now called `{current}`");
                }
                *kind = current.to_string();
            }
        }
    }

    apply(dimension, Scope::Dimension, version, context)?;
    if let Some(Value::Object(reciprocal)) = dimension.get_mut("reciprocal") {
        apply(reciprocal, Scope::Dimension, version, context)?;
    }

    Ok(())
}

fn apply(object: &mut Object, scope: Scope, version: &Version, context: &str) -> Result<()> {
    for rule in RENAMES.iter().filter(|rule| rule.scope == scope) {
        let Some(value) = object.remove(rule.legacy) else {
            continue;
        };

        if *version < Version::parse(rule.retired)? {
            object.insert(rule.current.to_string(), value);
        } else if object.contains_key(rule.current) {
            warn!(
                "Ignoring legacy key `{}` in {context}, `{}` is also present",
                rule.legacy, rule.current
            );
        } else {
            warn!(
                "Legacy key `{}` in {context} is now called `{}`",
                rule.legacy, rule.current
            );
            object.insert(rule.current.to_string(), value);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    fn body(value: Value) -> Object {
        match value {
            Value::Object(object) => object,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_version_order() -> Result<()> {
        assert!(Version::parse("0.0.9")? < Version::parse("1.0")?);
        assert_eq!(Version::parse("1.0")?, Version::parse("1.0")?);
        assert_eq!(
            Version::parse("1.0")?.cmp(&Version::parse("1.0.0")?),
            Ordering::Equal
        );
        assert!(Version::parse("1.1")? > Version::parse("1.0.5")?);
        assert_eq!(Version::parse("0.0.11")?.to_string(), "0.0.11");
        assert!(matches!(Version::parse("one"), Err(Error::Schema(_))));

        Ok(())
    }

    #[test]
    fn test_check_version() -> Result<()> {
        check_version(&Version::parse("1.0")?)?;
        check_version(&Version::parse("1.7")?)?;
        check_version(&Version::parse("0.0.9")?)?;
        assert!(matches!(
            check_version(&Version::parse("2.0")?),
            Err(Error::Schema(_))
        ));

        Ok(())
    }

    #[test]
    fn test_migrate_old_document() -> Result<()> {
        let mut csdm = body(json!({
            "dimensions": [{
                "type": "linear_spacing",
                "number_of_points": 4,
                "sampling_interval": "2 s",
                "index_zero_value": "1 s",
                "fft_output_order": true,
                "quantity": "time",
                "reciprocal": {"reference_offset": "3 Hz"},
            }, {
                "type": "non_quantitative",
                "labels": ["a"],
            }],
            "dependent_variables": [{
                "type": "external",
                "components_URI": "file:./data.dat",
                "sparse_sampling": {"dimensions": [0], "numeric_type": "uint8"},
            }],
        }));
        migrate(&mut csdm, &Version::parse("0.0.9")?)?;

        assert_eq!(
            Value::Object(csdm),
            json!({
                "dimensions": [{
                    "type": "linear",
                    "count": 4,
                    "increment": "2 s",
                    "coordinates_offset": "1 s",
                    "complex_fft": true,
                    "quantity_name": "time",
                    "reciprocal": {"coordinates_offset": "3 Hz"},
                }, {
                    "type": "labeled",
                    "labels": ["a"],
                }],
                "dependent_variables": [{
                    "type": "external",
                    "components_url": "file:./data.dat",
                    "sparse_sampling": {"dimension_indexes": [0], "unsigned_integer_type": "uint8"},
                }],
            })
        );

        Ok(())
    }

    #[test]
    fn test_current_key_wins_in_new_documents() -> Result<()> {
        let mut csdm = body(json!({
            "dimensions": [{
                "type": "linear",
                "count": 4,
                "increment": "1 s",
                "sampling_interval": "2 s",
            }, {
                "type": "linear",
                "count": 4,
                "sampling_interval": "2 s",
            }],
        }));
        migrate(&mut csdm, &Version::parse("1.0")?)?;

        assert_eq!(csdm["dimensions"][0]["increment"], json!("1 s"));
        assert!(csdm["dimensions"][0].get("sampling_interval").is_none());
        assert_eq!(csdm["dimensions"][1]["increment"], json!("2 s"));

        Ok(())
    }
}
