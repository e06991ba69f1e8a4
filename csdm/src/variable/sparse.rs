use ndarray::{ArrayD, Axis, IxDyn};
use serde_json::Value;

use crate::components::{dispatch, Components, Encoding};
use crate::errors::{Error, Result};
use crate::helpers::{
    get_application, get_array, get_str, get_string, grid_size, insert_application, insert_text,
    Object,
};
use crate::numeric::{Element, NumericType};

/// Description of a dependent variable sampled on a subset of the grid.
///
/// The sampled grid vertexes span the dimensions listed in `dimension_indexes`. Every other
/// dimension is sampled in full at each vertex. Serialized components hold, for each vertex in
/// turn, the values over the fully sampled dimensions, so the vertex varies slowest.
///
#[derive(Debug, Clone, PartialEq)]
pub struct SparseSampling {
    pub dimension_indexes: Vec<usize>,

    /// Vertex index tuples, flattened: `[v0_d0, v0_d1, ..., v1_d0, v1_d1, ...]`
    pub sparse_grid_vertexes: Vec<u64>,

    /// Encoding of the vertex list, `none` or `base64`
    pub encoding: Encoding,

    /// Type of the vertex indexes when encoded as base64
    pub unsigned_integer_type: NumericType,

    pub description: String,
    pub application: Object,
}

impl SparseSampling {
    /// Create a sparse sampling description.
    ///
    /// # Arguments
    ///
    /// * `dimension_indexes` - The sparsely sampled dimensions.
    /// * `sparse_grid_vertexes` - Flattened index tuples of the sampled vertexes, one index per
    ///   sparse dimension per vertex.
    ///
    pub fn new(dimension_indexes: Vec<usize>, sparse_grid_vertexes: Vec<u64>) -> Result<Self> {
        let sampling = Self {
            dimension_indexes,
            sparse_grid_vertexes,
            encoding: Encoding::None,
            unsigned_integer_type: NumericType::Uint64,
            description: String::new(),
            application: Object::new(),
        };
        sampling.check()?;

        Ok(sampling)
    }

    pub(crate) fn from_value(value: &Value, context: &str) -> Result<Self> {
        let context = format!("sparse_sampling of {context}");
        let object = value
            .as_object()
            .ok_or_else(|| Error::schema(format!("{context} must be a JSON object")))?;

        let dimension_indexes = get_array(object, "dimension_indexes", &context)?
            .ok_or_else(|| Error::missing("dimension_indexes", &context))?
            .iter()
            .map(|index| {
                index.as_u64().map(|i| i as usize).ok_or_else(|| {
                    Error::schema(format!("dimension_indexes in {context} must be integers"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let encoding: Encoding = get_str(object, "encoding", &context)?
            .unwrap_or("none")
            .parse()?;
        if encoding == Encoding::Raw {
            return Err(Error::schema(format!(
                "sparse_grid_vertexes in {context} cannot use raw encoding"
            )));
        }
        let unsigned_integer_type: NumericType = get_str(object, "unsigned_integer_type", &context)?
            .unwrap_or("uint64")
            .parse()?;
        if !unsigned_integer_type.is_unsigned() {
            return Err(Error::schema(format!(
                "unsigned_integer_type in {context} must be an unsigned integer type"
            )));
        }

        let vertexes = object
            .get("sparse_grid_vertexes")
            .ok_or_else(|| Error::missing("sparse_grid_vertexes", &context))?;
        let vertexes = match encoding {
            Encoding::Base64 => Components::decode_base64(
                unsigned_integer_type,
                std::slice::from_ref(vertexes),
            )?,
            _ => Components::decode_json(unsigned_integer_type, std::slice::from_ref(vertexes))?,
        };

        let sampling = Self {
            dimension_indexes,
            sparse_grid_vertexes: vertexes.to_array::<u64>().iter().copied().collect(),
            encoding,
            unsigned_integer_type,
            description: get_string(object, "description", &context)?,
            application: get_application(object, &context)?,
        };
        sampling.check()?;

        Ok(sampling)
    }

    pub(crate) fn to_value(&self) -> Result<Value> {
        let vertexes = Components::from(self.sparse_grid_vertexes.clone())
            .cast(self.unsigned_integer_type);
        let encoded = match self.encoding {
            Encoding::Base64 => vertexes.encode_base64(),
            _ => vertexes.encode_json()?,
        };
        let encoded = match encoded {
            Value::Array(mut components) if !components.is_empty() => components.swap_remove(0),
            other => other,
        };

        let mut object = Object::new();
        object.insert(
            "dimension_indexes".to_string(),
            Value::from(self.dimension_indexes.clone()),
        );
        object.insert("sparse_grid_vertexes".to_string(), encoded);
        object.insert(
            "encoding".to_string(),
            Value::String(self.encoding.as_str().to_string()),
        );
        if self.encoding == Encoding::Base64 {
            object.insert(
                "unsigned_integer_type".to_string(),
                Value::String(self.unsigned_integer_type.as_str().to_string()),
            );
        }
        insert_text(&mut object, "description", self.description.trim());
        insert_application(&mut object, &self.application);

        Ok(Value::Object(object))
    }

    fn check(&self) -> Result<()> {
        let k = self.dimension_indexes.len();
        if k == 0 {
            return Err(Error::schema("sparse sampling needs at least one dimension index"));
        }
        if self.sparse_grid_vertexes.len() % k != 0 {
            return Err(Error::ShapeMismatch(format!(
                "{} vertex indexes do not make whole vertexes of {k} dimensions",
                self.sparse_grid_vertexes.len()
            )));
        }
        let mut sorted = self.dimension_indexes.clone();
        sorted.sort_unstable();
        sorted.dedup();
        if sorted.len() != k {
            return Err(Error::schema("sparse dimension indexes must be distinct"));
        }

        Ok(())
    }

    /// Number of sampled vertexes
    pub fn vertex_count(&self) -> usize {
        self.sparse_grid_vertexes.len() / self.dimension_indexes.len().max(1)
    }

    /// Number of values in each sparse component for a grid with the given dimension counts.
    ///
    pub fn sparse_len(&self, counts: &[usize]) -> Result<usize> {
        let dense: Vec<usize> = counts
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.dimension_indexes.contains(i))
            .map(|(_, &n)| n)
            .collect();

        grid_size(&dense)?
            .checked_mul(self.vertex_count())
            .ok_or_else(|| Error::ShapeMismatch(format!("{counts:?} sparse grid is too large")))
    }

    /// For each sparse value, its flat position in the dense grid.
    ///
    /// The dense grid is flattened with dimension 0 varying fastest.
    ///
    fn positions(&self, counts: &[usize]) -> Result<Vec<usize>> {
        if let Some(&bad) = self.dimension_indexes.iter().find(|&&i| i >= counts.len()) {
            return Err(Error::Index(format!(
                "sparse dimension index {bad} out of range for {} dimensions",
                counts.len()
            )));
        }

        grid_size(counts)?;
        let mut strides = Vec::with_capacity(counts.len());
        let mut stride = 1;
        for &n in counts {
            strides.push(stride);
            stride *= n;
        }

        let k = self.dimension_indexes.len();
        let mut vertex_offsets = Vec::with_capacity(self.vertex_count());
        for vertex in self.sparse_grid_vertexes.chunks(k) {
            let mut offset = 0;
            for (&index, &dimension) in vertex.iter().zip(&self.dimension_indexes) {
                let index = index as usize;
                if index >= counts[dimension] {
                    return Err(Error::Index(format!(
                        "sparse grid vertex index {index} out of range for dimension {dimension}"
                    )));
                }
                offset += index * strides[dimension];
            }
            vertex_offsets.push(offset);
        }

        // Offsets of the fully sampled part of the grid, first dense dimension fastest
        let mut dense_offsets = vec![0];
        for (i, &n) in counts.iter().enumerate() {
            if self.dimension_indexes.contains(&i) {
                continue;
            }
            let stride = strides[i];
            dense_offsets = (0..n)
                .flat_map(|j| dense_offsets.iter().map(move |offset| offset + j * stride))
                .collect();
        }

        Ok(vertex_offsets
            .iter()
            .flat_map(|vertex| dense_offsets.iter().map(move |offset| vertex + offset))
            .collect())
    }

    /// Fill a dense, zero initialized grid from sparse components.
    ///
    /// # Arguments
    ///
    /// * `components` - Sparse components, shape `(p, sparse_len)`.
    /// * `counts` - Dimension counts, dimension 0 first.
    ///
    pub(crate) fn expand(&self, components: &Components, counts: &[usize]) -> Result<Components> {
        let positions = self.positions(counts)?;
        if components.len() != positions.len() {
            return Err(Error::ShapeMismatch(format!(
                "sparse components have {} values, expected {} for {} vertexes",
                components.len(),
                positions.len(),
                self.vertex_count()
            )));
        }
        let mut shape = vec![components.count()];
        shape.extend(counts.iter().rev());

        dispatch!(components, array => Ok(Element::wrap(expand_array(array, &positions, &shape)?)))
    }

    /// Collect the sampled values from dense components, the inverse of `expand`.
    ///
    pub(crate) fn gather(&self, components: &Components, counts: &[usize]) -> Result<Components> {
        let positions = self.positions(counts)?;

        dispatch!(components, array => Ok(Element::wrap(gather_array(array, &positions)?)))
    }
}

fn expand_array<T: Element>(
    array: &ArrayD<T>,
    positions: &[usize],
    shape: &[usize],
) -> Result<ArrayD<T>> {
    // Array axes are the dimensions in reverse, so a grid position flattened with dimension 0
    // fastest is also the row major offset within a component.
    let dense_len = grid_size(&shape[1..])?;
    let mut dense = vec![T::zero(); grid_size(shape)?];
    for (c, component) in array.outer_iter().enumerate() {
        let base = c * dense_len;
        for (&position, &value) in positions.iter().zip(component.iter()) {
            dense[base + position] = value;
        }
    }

    ArrayD::from_shape_vec(IxDyn(shape), dense)
        .map_err(|err| Error::ShapeMismatch(format!("{err} for shape {shape:?}")))
}

fn gather_array<T: Element>(array: &ArrayD<T>, positions: &[usize]) -> Result<ArrayD<T>> {
    let count = array.len_of(Axis(0));
    let mut values = Vec::with_capacity(count * positions.len());
    for component in array.outer_iter() {
        let flat: Vec<T> = component.iter().copied().collect();
        for &position in positions {
            let value = flat.get(position).copied().ok_or_else(|| {
                Error::ShapeMismatch(format!("grid position {position} out of range"))
            })?;
            values.push(value);
        }
    }

    ArrayD::from_shape_vec(IxDyn(&[count, positions.len()]), values)
        .map_err(|err| Error::ShapeMismatch(err.to_string()))
}
