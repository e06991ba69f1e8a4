//! Reading and writing CSDM documents.
//!
//! A document is a JSON object with a single key, `"csdm"`, holding the dataset. Files with
//! only inline data use the `.csdf` extension. Files whose dependent variables point at
//! separate binary files use `.csdfe`.
//!
mod migrate;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{debug, info, warn};
use serde_json::Value;

pub use migrate::Version;

use crate::components::Encoding;
use crate::config::{LoadOptions, SaveOptions};
use crate::csdm::{Csdm, GeographicCoordinate};
use crate::dimension::Dimension;
use crate::errors::{Error, Result};
use crate::helpers::{
    as_object, get_application, get_array, get_bool, get_quantity, get_string, get_string_list,
    insert_application, insert_text, require_str, Object,
};
use crate::variable::{DependentVariable, RawTarget};

/// Format version of documents written by this crate
pub const CURRENT_VERSION: &str = "1.0";

/// Extension of documents with inline data only
pub const DENSE_EXTENSION: &str = "csdf";

/// Extension of documents that reference external binary files
pub const EXTERNAL_EXTENSION: &str = "csdfe";

/// Read a document from a file.
///
/// `path` may also be a `.csdm` directory holding exactly one document.
///
pub fn load<P: AsRef<Path>>(path: P) -> Result<Csdm> {
    load_with(path, &LoadOptions::default())
}

pub fn load_with<P: AsRef<Path>>(path: P, options: &LoadOptions) -> Result<Csdm> {
    let path = document_path(path.as_ref())?;
    debug!("Loading {}", path.display());
    let text = fs::read_to_string(&path)?;
    let document: Value = serde_json::from_str(&text)?;
    let base = path.parent().map(Path::to_path_buf);

    let mut csdm = read_document(&document, options, base.as_deref())?;
    csdm.filename = Some(path);

    Ok(csdm)
}

/// Build a dataset from a parsed document. Relative external URLs are resolved against the
/// current directory.
///
pub fn parse(document: &Value, options: &LoadOptions) -> Result<Csdm> {
    read_document(document, options, None)
}

/// Build a dataset from the text of a document.
///
pub fn parse_str(text: &str, options: &LoadOptions) -> Result<Csdm> {
    let document: Value = serde_json::from_str(text)?;
    parse(&document, options)
}

/// The document file to read for `path`, looking inside `.csdm` directories.
///
fn document_path(path: &Path) -> Result<PathBuf> {
    if !path.is_dir() {
        return Ok(path.to_path_buf());
    }

    let mut documents = vec![];
    for entry in fs::read_dir(path)? {
        let entry = entry?.path();
        let extension = entry.extension().and_then(|e| e.to_str());
        if matches!(extension, Some(DENSE_EXTENSION) | Some(EXTERNAL_EXTENSION)) {
            documents.push(entry);
        }
    }

    match documents.len() {
        1 => Ok(documents.swap_remove(0)),
        n => Err(Error::Value(format!(
            "expected one .{DENSE_EXTENSION} or .{EXTERNAL_EXTENSION} file in {}, found {n}",
            path.display()
        ))),
    }
}

fn read_document(document: &Value, options: &LoadOptions, base: Option<&Path>) -> Result<Csdm> {
    let root = as_object(document, "document")?;
    let mut body = as_object(
        root.get("csdm")
            .ok_or_else(|| Error::missing("csdm", "document"))?,
        "csdm",
    )?
    .clone();
    let context = "csdm";

    let version_text = require_str(&body, "version", context)?.to_string();
    let version = Version::parse(&version_text)?;
    migrate::check_version(&version)?;
    migrate::migrate(&mut body, &version)?;

    let mut csdm = Csdm::with_resolver(
        get_string(&body, "description", context)?,
        options.resolver.clone(),
    );
    csdm.version = version_text;
    csdm.read_only = get_bool(&body, "read_only", context)?;
    csdm.timestamp = get_string(&body, "timestamp", context)?;
    csdm.tags = get_string_list(&body, "tags", context)?.unwrap_or_default();
    csdm.application = get_application(&body, context)?;
    csdm.geographic_coordinate = match body.get("geographic_coordinate") {
        None | Some(Value::Null) => None,
        Some(value) => Some(read_geographic_coordinate(value)?),
    };

    for (i, dimension) in get_array(&body, "dimensions", context)?
        .into_iter()
        .flatten()
        .enumerate()
    {
        let dimension = Dimension::from_value(dimension, &format!("dimension {i}"))?;
        csdm.dimensions.push(dimension);
    }

    let counts = csdm.shape();
    for (i, variable) in get_array(&body, "dependent_variables", context)?
        .into_iter()
        .flatten()
        .enumerate()
    {
        let context = format!("dependent variable {i}");
        let mut variable =
            DependentVariable::from_value(variable, &context, base, &options.resolver)?;
        variable.attach(&counts)?;
        csdm.dependent_variables.push(variable);
    }

    if !options.application {
        csdm.clear_application();
    }
    if options.sort_fft_order {
        sort_fft_order(&mut csdm)?;
    }

    Ok(csdm)
}

fn read_geographic_coordinate(value: &Value) -> Result<GeographicCoordinate> {
    let context = "geographic_coordinate";
    let object = as_object(value, context)?;

    Ok(GeographicCoordinate {
        latitude: get_quantity(object, "latitude", context)?
            .ok_or_else(|| Error::missing("latitude", context))?,
        longitude: get_quantity(object, "longitude", context)?
            .ok_or_else(|| Error::missing("longitude", context))?,
        altitude: get_quantity(object, "altitude", context)?,
    })
}

/// Put linear dimensions stored in FFT output order into ascending order, rolling the matching
/// axis of every dependent variable.
///
fn sort_fft_order(csdm: &mut Csdm) -> Result<()> {
    let ndim = csdm.ndim();
    for i in 0..ndim {
        let shift = match &mut csdm.dimensions[i] {
            Dimension::Linear(dimension) => dimension.sort_fft_order()?,
            _ => None,
        };
        if let Some(shift) = shift {
            debug!("Rolling axis of dimension {i} by {shift} to undo FFT output order");
            csdm.map_components(|_, components| Ok(components.roll(ndim - i, shift)))?;
        }
    }

    Ok(())
}

/// Keys of the document body ahead of the dimensions, in document order.
///
fn header(csdm: &Csdm, version: &str, read_only: bool, timestamp: &str) -> Object {
    let mut object = Object::new();
    object.insert("version".to_string(), Value::String(version.to_string()));
    if read_only {
        object.insert("read_only".to_string(), Value::Bool(true));
    }
    insert_text(&mut object, "timestamp", timestamp);
    if let Some(coordinate) = &csdm.geographic_coordinate {
        let mut geographic = Object::new();
        geographic.insert(
            "latitude".to_string(),
            Value::String(coordinate.latitude.to_string()),
        );
        geographic.insert(
            "longitude".to_string(),
            Value::String(coordinate.longitude.to_string()),
        );
        if let Some(altitude) = &coordinate.altitude {
            geographic.insert("altitude".to_string(), Value::String(altitude.to_string()));
        }
        object.insert("geographic_coordinate".to_string(), Value::Object(geographic));
    }
    if !csdm.tags.is_empty() {
        object.insert("tags".to_string(), Value::from(csdm.tags.clone()));
    }
    insert_text(&mut object, "description", csdm.description.trim());
    insert_application(&mut object, &csdm.application);

    object
}

fn document(mut body: Object, csdm: &Csdm, variables: Vec<Value>) -> Value {
    let dimensions = csdm.dimensions.iter().map(Dimension::to_value).collect();
    body.insert("dimensions".to_string(), Value::Array(dimensions));
    body.insert("dependent_variables".to_string(), Value::Array(variables));

    let mut root = Object::new();
    root.insert("csdm".to_string(), Value::Object(body));

    Value::Object(root)
}

/// Serialize a dataset.
///
/// # Arguments
///
/// * `csdm` - The dataset.
/// * `target` - Where components with `raw` encoding are written. Without one, raw encoding is
///   an error.
/// * `options` - Version, read only flag and timestamp to write. Without options, those of the
///   dataset are written.
///
pub(crate) fn to_value(
    csdm: &Csdm,
    mut target: Option<&mut RawTarget>,
    options: Option<&SaveOptions>,
) -> Result<Value> {
    let header = match options {
        Some(options) => {
            let timestamp = if options.timestamp {
                Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
            } else {
                String::new()
            };
            header(
                csdm,
                &options.version,
                options.read_only || csdm.read_only,
                &timestamp,
            )
        }
        None => header(csdm, &csdm.version, csdm.read_only, &csdm.timestamp),
    };

    let mut variables = Vec::with_capacity(csdm.dependent_variables.len());
    for (i, variable) in csdm.dependent_variables.iter().enumerate() {
        variables.push(variable.to_value(i, target.as_deref_mut())?);
    }

    Ok(document(header, csdm, variables))
}

/// The reduced rendering behind `Csdm::data_structure`.
///
pub(crate) fn preview(csdm: &Csdm) -> Result<Value> {
    let header = header(csdm, &csdm.version, csdm.read_only, &csdm.timestamp);
    let variables = csdm
        .dependent_variables
        .iter()
        .map(DependentVariable::preview)
        .collect::<Result<Vec<_>>>()?;

    Ok(document(header, csdm, variables))
}

/// Write a dataset to `path`, with raw encoded components in files beside it.
///
pub(crate) fn save(csdm: &Csdm, path: &Path, options: &SaveOptions) -> Result<()> {
    csdm.validate()?;

    let external = csdm
        .dependent_variables
        .iter()
        .any(|variable| variable.encoding == Encoding::Raw);
    let expected = if external {
        EXTERNAL_EXTENSION
    } else {
        DENSE_EXTENSION
    };
    if path.extension().and_then(|e| e.to_str()) != Some(expected) {
        warn!(
            "Saving {} with {}, the usual extension for this dataset is .{expected}",
            path.display(),
            if external {
                "external components"
            } else {
                "inline components only"
            }
        );
    }

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| Error::Value(format!("cannot save to {}", path.display())))?
        .to_string();
    let mut target = RawTarget::new(dir, stem);

    // Companion files are only kept alongside a complete document
    let result = write_document(csdm, path, &mut target, options);
    if result.is_err() {
        target.discard();
    }

    result
}

fn write_document(
    csdm: &Csdm,
    path: &Path,
    target: &mut RawTarget,
    options: &SaveOptions,
) -> Result<()> {
    let value = to_value(csdm, Some(target), Some(options))?;
    let text = if options.indent {
        serde_json::to_string_pretty(&value)?
    } else {
        serde_json::to_string(&value)?
    };
    fs::write(path, text)?;
    info!("Saved {}", path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use serde_json::json;

    use crate::components::Components;
    use crate::dimension::LinearDimension;
    use crate::numeric::NumericType;
    use crate::quantity_type::QuantityType;
    use crate::resolver::Resolver;
    use crate::testing::{random_values, two_dimensional, MemoryMapper};
    use crate::units::{Quantity, Unit};
    use crate::variable::LoadState;

    fn keep_application() -> LoadOptions {
        LoadOptions {
            application: true,
            ..LoadOptions::default()
        }
    }

    #[test]
    fn test_missing_root() {
        let result = parse(&json!({"dataset": {}}), &LoadOptions::default());
        assert!(matches!(result, Err(Error::MissingKey { .. })));

        let result = parse(&json!({"csdm": {}}), &LoadOptions::default());
        assert!(matches!(result, Err(Error::MissingKey { .. })));

        let result = parse_str("{\"csdm\": ", &LoadOptions::default());
        assert!(matches!(result, Err(Error::Json(_))));
    }

    #[test]
    fn test_newer_version_rejected() {
        let document = json!({"csdm": {"version": "2.0", "dimensions": []}});
        assert!(matches!(
            parse(&document, &LoadOptions::default()),
            Err(Error::Schema(_))
        ));
    }

    #[test]
    fn test_unknown_dimension_type() {
        let document = json!({
            "csdm": {"version": "1.0", "dimensions": [{"type": "spiral", "count": 3}]}
        });
        assert!(matches!(
            parse(&document, &LoadOptions::default()),
            Err(Error::Schema(_))
        ));
    }

    #[test]
    fn test_grid_too_large() {
        let document = json!({
            "csdm": {
                "version": "1.0",
                "dimensions": [
                    {"type": "linear", "count": 4294967296u64, "increment": "1 s"},
                    {"type": "linear", "count": 4294967296u64, "increment": "1 s"},
                ],
                "dependent_variables": [{
                    "type": "internal",
                    "numeric_type": "float64",
                    "quantity_type": "scalar",
                    "components": [[1.0]],
                }],
            }
        });
        assert!(matches!(
            parse(&document, &LoadOptions::default()),
            Err(Error::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_legacy_increment() -> Result<()> {
        let document = json!({
            "csdm": {
                "version": "0.0.9",
                "dimensions": [{
                    "type": "linear_spacing",
                    "number_of_points": 10,
                    "sampling_interval": "5 µs",
                    "index_zero_value": "1 µs",
                }],
                "dependent_variables": [],
            }
        });
        let csdm = parse(&document, &LoadOptions::default())?;
        match &csdm.dimensions()[0] {
            Dimension::Linear(dimension) => {
                assert_eq!(dimension.count(), 10);
                assert_eq!(dimension.increment(), &Quantity::parse("5 µs")?);
                assert_eq!(
                    dimension.quantitative.coordinates_offset,
                    Quantity::parse("1 µs")?
                );
            }
            other => panic!("expected a linear dimension, got {other:?}"),
        }

        // Same key in a current document
        let document = json!({
            "csdm": {
                "version": "1.0",
                "dimensions": [{"type": "linear", "count": 2, "sampling_interval": "1 m"}],
            }
        });
        let csdm = parse(&document, &LoadOptions::default())?;
        assert_eq!(csdm.dimensions()[0].unit(), Some(&Unit::parse("m")?));

        Ok(())
    }

    #[test]
    fn test_round_trip_inline() -> Result<()> {
        let mut document = two_dimensional();
        document["csdm"]["tags"] = json!(["demo"]);
        document["csdm"]["read_only"] = json!(true);
        document["csdm"]["timestamp"] = json!("2019-05-21T13:43:28Z");
        document["csdm"]["geographic_coordinate"] = json!({
            "latitude": "10.0 °",
            "longitude": "93.2 °",
            "altitude": "12.0 m",
        });
        document["csdm"]["application"] = json!({"com.example": {"operator": "someone"}});

        let csdm = parse(&document, &keep_application())?;
        assert!(csdm.read_only);
        assert_eq!(csdm.tags, vec!["demo".to_string()]);
        let altitude = csdm.geographic_coordinate.as_ref().unwrap().altitude.clone();
        assert_eq!(altitude, Some(Quantity::parse("12 m")?));

        let mut expected = document;
        expected["csdm"]["dimensions"][0]["reciprocal"] = json!({"quantity_name": "frequency"});
        expected["csdm"]["dependent_variables"][0]["encoding"] = json!("none");
        let written = csdm.to_value()?;
        assert_eq!(written, expected);

        // Key order follows the document layout
        let keys: Vec<&String> = written["csdm"].as_object().unwrap().keys().collect();
        assert_eq!(
            keys,
            vec![
                "version",
                "read_only",
                "timestamp",
                "geographic_coordinate",
                "tags",
                "description",
                "application",
                "dimensions",
                "dependent_variables"
            ]
        );

        assert_eq!(parse(&written, &keep_application())?, csdm);

        Ok(())
    }

    #[test]
    fn test_application_dropped_by_default() -> Result<()> {
        let mut document = two_dimensional();
        document["csdm"]["application"] = json!({"a": 1});
        document["csdm"]["dimensions"][0]["application"] = json!({"b": 2});
        document["csdm"]["dependent_variables"][0]["application"] = json!({"c": 3});

        let csdm = parse(&document, &LoadOptions::default())?;
        assert!(csdm.application.is_empty());
        assert!(csdm.dimensions()[0].application().is_empty());
        assert!(csdm.dependent_variables()[0].application.is_empty());

        let csdm = parse(&document, &keep_application())?;
        assert_eq!(csdm.dimensions()[0].application()["b"], json!(2));

        Ok(())
    }

    #[test]
    fn test_save_and_load() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut csdm = Csdm::new("Round trip");
        csdm.add_dimension(LinearDimension::new(8, Quantity::parse("0.25 Hz")?)?)?;
        csdm.add_dimension(json!({"type": "monotonic", "coordinates": ["1 m", "2 m", "4 m"]}))?;

        let real: Vec<f64> = random_values(24);
        let complex: Vec<f32> = random_values(48);
        let mut inline = DependentVariable::scalar(real.clone())?;
        inline.name = "inline".to_string();
        let mut encoded = DependentVariable::new(
            QuantityType::Scalar,
            Components::from_vec(
                complex
                    .chunks(2)
                    .map(|pair| num_complex::Complex32::new(pair[0], pair[1]))
                    .collect(),
                &[1, 24],
            )?,
        )?;
        encoded.encoding = Encoding::Base64;
        encoded.set_unit(Unit::parse("V")?);
        let mut raw = DependentVariable::new(
            QuantityType::Vector(2),
            Components::from_vec((0..48).map(|i| i as i16 - 20).collect(), &[2, 24])?,
        )?;
        raw.encoding = Encoding::Raw;
        raw.set_component_labels(vec!["x".to_string(), "y".to_string()]);
        for variable in [inline, encoded, raw] {
            csdm.add_dependent_variable(variable)?;
        }

        let path = dir.path().join("round.csdfe");
        csdm.save(&path)?;
        assert!(dir.path().join("round_2.dat").exists());

        let text = fs::read_to_string(&path)?;
        let document: Value = serde_json::from_str(&text)?;
        assert!(document["csdm"]["timestamp"].is_string());
        assert_eq!(
            document["csdm"]["dependent_variables"][2]["components_url"],
            json!("file:./round_2.dat")
        );

        let loaded = load(&path)?;
        assert_eq!(loaded.filename.as_deref(), Some(path.as_path()));
        let raw = &loaded.dependent_variables()[2];
        assert_eq!(raw.load_state(), Some(LoadState::Unloaded));
        assert_eq!(raw.numeric_type(), NumericType::Int16);
        assert_eq!(loaded, csdm);
        assert_eq!(raw.load_state(), Some(LoadState::Loaded));
        assert_eq!(raw.components()?.shape(), &[2, 3, 8]);

        // Loading the directory finds the one document in it
        let loaded = load(dir.path())?;
        assert_eq!(loaded, csdm);

        Ok(())
    }

    #[test]
    fn test_raw_requires_file() -> Result<()> {
        let mut csdm = Csdm::new("");
        let mut variable = DependentVariable::scalar(vec![1u8, 2, 3])?;
        variable.encoding = Encoding::Raw;
        csdm.add_dependent_variable(variable)?;
        assert!(matches!(csdm.to_value(), Err(Error::Value(_))));

        Ok(())
    }

    #[test]
    fn test_failed_save_removes_companions() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut csdm = Csdm::new("");
        csdm.add_dimension(LinearDimension::new(2, Quantity::parse("1 s")?)?)?;
        let mut raw = DependentVariable::scalar(vec![1.0f64, 2.0])?;
        raw.encoding = Encoding::Raw;
        csdm.add_dependent_variable(raw)?;
        csdm.add_dependent_variable(DependentVariable::scalar(vec![f64::NAN, 1.0])?)?;

        let path = dir.path().join("broken.csdfe");
        assert!(matches!(csdm.save(&path), Err(Error::Encoding(_))));
        assert!(!path.exists());
        assert!(!dir.path().join("broken_0.dat").exists());

        Ok(())
    }

    #[test]
    fn test_external_relative_to_document() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let bytes: Vec<u8> = [1.5f64, -2.0, 4.25]
            .iter()
            .flat_map(|value| value.to_le_bytes())
            .collect();
        fs::write(dir.path().join("payload.dat"), bytes)?;
        let document = json!({
            "csdm": {
                "version": "1.0",
                "dimensions": [{"type": "linear", "count": 3, "increment": "1 s"}],
                "dependent_variables": [{
                    "type": "external",
                    "numeric_type": "float64",
                    "quantity_type": "scalar",
                    "components_url": "payload.dat",
                }],
            }
        });
        let path = dir.path().join("doc.csdfe");
        fs::write(&path, serde_json::to_string(&document)?)?;

        let csdm = load(&path)?;
        let values = csdm.dependent_variables()[0].components()?;
        assert_eq!(values.as_array::<f64>().unwrap().as_slice(), Some(&[1.5, -2.0, 4.25][..]));

        Ok(())
    }

    #[test]
    fn test_preview_does_not_fetch() -> Result<()> {
        let mapper = MemoryMapper::new();
        let resolver = Arc::new(Resolver::new().with_mapper(Box::new(mapper.clone())));
        let document = json!({
            "csdm": {
                "version": "1.0",
                "dimensions": [{"type": "linear", "count": 2, "increment": "1 s"}],
                "dependent_variables": [{
                    "type": "external",
                    "numeric_type": "uint8",
                    "components_url": "mem://data",
                }],
            }
        });
        let csdm = parse(&document, &LoadOptions::with_resolver(resolver))?;
        let preview: Value = serde_json::from_str(&csdm.data_structure()?)?;
        assert_eq!(
            preview["csdm"]["dependent_variables"][0]["components_url"],
            json!("mem://data")
        );
        assert_eq!(mapper.loads(), 0);

        mapper.insert("mem://data", vec![3, 4]);
        assert_eq!(csdm.dependent_variables()[0].components()?.len(), 2);
        assert_eq!(mapper.loads(), 1);

        Ok(())
    }

    #[test]
    fn test_sort_fft_order() -> Result<()> {
        let document = json!({
            "csdm": {
                "version": "1.0",
                "dimensions": [{
                    "type": "linear",
                    "count": 4,
                    "increment": "1 Hz",
                    "complex_fft": true,
                }, {
                    "type": "labeled",
                    "labels": ["a", "b"],
                }],
                "dependent_variables": [{
                    "type": "internal",
                    "numeric_type": "float64",
                    "components": [[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]],
                }],
            }
        });
        let options = LoadOptions {
            sort_fft_order: true,
            ..LoadOptions::default()
        };
        let csdm = parse(&document, &options)?;
        match &csdm.dimensions()[0] {
            Dimension::Linear(dimension) => {
                assert!(!dimension.complex_fft);
                assert_eq!(
                    dimension.coordinates().collect::<Vec<_>>(),
                    vec![-2.0, -1.0, 0.0, 1.0]
                );
            }
            other => panic!("expected a linear dimension, got {other:?}"),
        }
        let values: Vec<f64> = csdm.dependent_variables()[0]
            .components()?
            .to_array::<f64>()
            .iter()
            .copied()
            .collect();
        assert_eq!(values, vec![2.0, 3.0, 0.0, 1.0, 6.0, 7.0, 4.0, 5.0]);

        Ok(())
    }
}
