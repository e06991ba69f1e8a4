//! Typed storage for the components of a dependent variable.
//!
//! Components are held as a single N-dimensional array with shape `(p, N_{d-1}, ..., N_1, N_0)`
//! where `p` is the number of components and `N_i` is the count of dimension `i`. Iterating a
//! component in row major order therefore varies dimension 0 fastest, which is the order used
//! by the serialized form.
//!
use std::cmp::Ordering;
use std::io::{self, Write};
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use ndarray::{Array, ArrayD, Axis, Dimension, IxDyn, Zip};
use num_complex::{Complex32, Complex64};
use serde_json::Value;

use crate::errors::{Error, Result};
use crate::extio::{decode_elements, encode_elements, ExtendedWrite};
use crate::numeric::{Element, NumericType, Scalar};

/// Component data, one variant per `NumericType`.
///
#[derive(Debug, Clone, PartialEq)]
pub enum Components {
    Int8(ArrayD<i8>),
    Int16(ArrayD<i16>),
    Int32(ArrayD<i32>),
    Int64(ArrayD<i64>),
    Uint8(ArrayD<u8>),
    Uint16(ArrayD<u16>),
    Uint32(ArrayD<u32>),
    Uint64(ArrayD<u64>),
    Float32(ArrayD<f32>),
    Float64(ArrayD<f64>),
    Complex64(ArrayD<Complex32>),
    Complex128(ArrayD<Complex64>),
}

/// Evaluate `$body` with `$array` bound to the typed array inside a `Components`.
macro_rules! dispatch {
    ($components:expr, $array:ident => $body:expr) => {
        match $components {
            Components::Int8($array) => $body,
            Components::Int16($array) => $body,
            Components::Int32($array) => $body,
            Components::Int64($array) => $body,
            Components::Uint8($array) => $body,
            Components::Uint16($array) => $body,
            Components::Uint32($array) => $body,
            Components::Uint64($array) => $body,
            Components::Float32($array) => $body,
            Components::Float64($array) => $body,
            Components::Complex64($array) => $body,
            Components::Complex128($array) => $body,
        }
    };
}

/// Evaluate `$body` with the type alias `$t` bound to the element type of a `NumericType`.
macro_rules! with_type {
    ($numeric_type:expr, $t:ident => $body:expr) => {
        match $numeric_type {
            NumericType::Int8 => {
                type $t = i8;
                $body
            }
            NumericType::Int16 => {
                type $t = i16;
                $body
            }
            NumericType::Int32 => {
                type $t = i32;
                $body
            }
            NumericType::Int64 => {
                type $t = i64;
                $body
            }
            NumericType::Uint8 => {
                type $t = u8;
                $body
            }
            NumericType::Uint16 => {
                type $t = u16;
                $body
            }
            NumericType::Uint32 => {
                type $t = u32;
                $body
            }
            NumericType::Uint64 => {
                type $t = u64;
                $body
            }
            NumericType::Float32 => {
                type $t = f32;
                $body
            }
            NumericType::Float64 => {
                type $t = f64;
                $body
            }
            NumericType::Complex64 => {
                type $t = Complex32;
                $body
            }
            NumericType::Complex128 => {
                type $t = Complex64;
                $body
            }
        }
    };
}

pub(crate) use dispatch;

/// Supported encodings for serialized component data.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Encoding {
    /// Nested JSON arrays of numbers
    #[default]
    None,

    /// One base64 string of little endian bytes per component
    Base64,

    /// Little endian bytes of all components written to a companion file
    Raw,
}

impl Encoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::None => "none",
            Encoding::Base64 => "base64",
            Encoding::Raw => "raw",
        }
    }
}

impl FromStr for Encoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Encoding::None),
            "base64" => Ok(Encoding::Base64),
            "raw" => Ok(Encoding::Raw),
            _ => Err(Error::schema(format!("unknown encoding `{s}`"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    fn apply<T: Element>(self, x: T, y: T) -> T {
        match self {
            BinaryOp::Add => Element::add(x, y),
            BinaryOp::Sub => Element::sub(x, y),
            BinaryOp::Mul => Element::mul(x, y),
            BinaryOp::Div => Element::div(x, y),
        }
    }

    /// Numeric type of the result for operands promoted to `numeric_type`
    fn result_type(self, numeric_type: NumericType) -> NumericType {
        match self {
            BinaryOp::Div => numeric_type.true_divide(),
            _ => numeric_type,
        }
    }
}

/// Element-wise comparisons. Complex numbers are ordered by real part, then imaginary part.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl Comparison {
    fn test(self, ordering: Option<Ordering>) -> bool {
        match (self, ordering) {
            (Comparison::NotEqual, None) => true,
            (_, None) => false,
            (Comparison::Equal, Some(o)) => o == Ordering::Equal,
            (Comparison::NotEqual, Some(o)) => o != Ordering::Equal,
            (Comparison::Less, Some(o)) => o == Ordering::Less,
            (Comparison::LessEqual, Some(o)) => o != Ordering::Greater,
            (Comparison::Greater, Some(o)) => o == Ordering::Greater,
            (Comparison::GreaterEqual, Some(o)) => o != Ordering::Less,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    Sum,
    Prod,
}

fn convert<T: Element, U: Element>(array: &ArrayD<T>) -> ArrayD<U> {
    array.mapv(|value| U::from_scalar(value.to_scalar()))
}

fn element_type<T: Element>(_array: &ArrayD<T>) -> NumericType {
    T::NUMERIC_TYPE
}

fn reshape_array<T: Element>(array: &ArrayD<T>, shape: &[usize]) -> Result<Components> {
    Components::from_vec(array.iter().copied().collect(), shape)
}

/// Shape two arrays broadcast to, by the usual trailing-axes rule.
///
fn broadcast_shape(a: &[usize], b: &[usize]) -> Result<Vec<usize>> {
    let ndim = a.len().max(b.len());
    let mut shape = vec![0; ndim];
    for i in 0..ndim {
        let n = if i < a.len() { a[a.len() - 1 - i] } else { 1 };
        let m = if i < b.len() { b[b.len() - 1 - i] } else { 1 };
        shape[ndim - 1 - i] = match (n, m) {
            (n, m) if n == m => n,
            (1, m) => m,
            (n, 1) => n,
            _ => {
                return Err(Error::ShapeMismatch(format!(
                    "operands with shapes {a:?} and {b:?} cannot be broadcast together"
                )))
            }
        };
    }

    Ok(shape)
}

fn zip_with<T, U, F>(a: &ArrayD<T>, b: &ArrayD<T>, f: F) -> Result<ArrayD<U>>
where
    T: Element,
    U: Element,
    F: Fn(T, T) -> U,
{
    let shape = IxDyn(&broadcast_shape(a.shape(), b.shape())?);
    let mismatch = || Error::ShapeMismatch(format!("cannot broadcast to {shape:?}"));
    let a = a.broadcast(shape.clone()).ok_or_else(mismatch)?;
    let b = b.broadcast(shape.clone()).ok_or_else(mismatch)?;

    Ok(Zip::from(&a).and(&b).map_collect(|&x, &y| f(x, y)))
}

impl Components {
    /// Wrap a flat vector of values in an array with the given shape.
    ///
    /// # Arguments
    ///
    /// * `values` - The values, in row major order.
    /// * `shape` - The shape, `(p, N_{d-1}, ..., N_0)`. Must have at least one axis.
    ///
    pub fn from_vec<T: Element>(values: Vec<T>, shape: &[usize]) -> Result<Self> {
        if shape.is_empty() {
            return Err(Error::ShapeMismatch(
                "components need at least one axis".to_string(),
            ));
        }
        let array = ArrayD::from_shape_vec(IxDyn(shape), values)
            .map_err(|err| Error::ShapeMismatch(format!("{err} for shape {shape:?}")))?;

        Ok(T::wrap(array))
    }

    /// Wrap an array of any dimensionality. A zero dimensional array becomes a one element
    /// array.
    ///
    pub fn from_array<T: Element, D: Dimension>(array: Array<T, D>) -> Self {
        let array = array.into_dyn();
        if array.ndim() == 0 {
            let value = array.iter().copied().next().unwrap_or_default();
            T::wrap(ArrayD::from_elem(IxDyn(&[1]), value))
        } else {
            T::wrap(array)
        }
    }

    /// An array of zeros
    pub fn zeros(numeric_type: NumericType, shape: &[usize]) -> Self {
        with_type!(numeric_type, T => {
            T::wrap(ArrayD::from_elem(IxDyn(shape), <T as Element>::zero()))
        })
    }

    pub fn numeric_type(&self) -> NumericType {
        dispatch!(self, array => element_type(array))
    }

    pub fn shape(&self) -> &[usize] {
        dispatch!(self, array => array.shape())
    }

    /// Number of components, `p`
    pub fn count(&self) -> usize {
        self.shape().first().copied().unwrap_or(0)
    }

    /// Number of values in each component
    pub fn len(&self) -> usize {
        self.shape().iter().skip(1).product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow the typed array if the element type is `T`.
    ///
    pub fn as_array<T: Element>(&self) -> Option<&ArrayD<T>> {
        T::unwrap(self)
    }

    pub fn as_array_mut<T: Element>(&mut self) -> Option<&mut ArrayD<T>> {
        T::unwrap_mut(self)
    }

    /// Copy the values to an array of element type `T`, converting with cast semantics.
    ///
    pub fn to_array<T: Element>(&self) -> ArrayD<T> {
        dispatch!(self, array => convert(array))
    }

    /// Value at a flat (row major) position within a component.
    ///
    pub fn value(&self, component: usize, index: usize) -> Option<Scalar> {
        if component >= self.count() {
            return None;
        }
        dispatch!(self, array => array
            .index_axis(Axis(0), component)
            .iter()
            .nth(index)
            .map(|value| value.to_scalar()))
    }

    /// Convert to another numeric type with cast semantics.
    ///
    pub fn cast(&self, numeric_type: NumericType) -> Components {
        if self.numeric_type() == numeric_type {
            return self.clone();
        }

        with_type!(numeric_type, T => T::wrap(self.to_array::<T>()))
    }

    pub fn reshape(&self, shape: &[usize]) -> Result<Components> {
        dispatch!(self, array => reshape_array(array, shape))
    }

    /// Element-wise binary operation. Operands are broadcast together and promoted to a common
    /// numeric type. Division is true division.
    ///
    pub fn binary(&self, other: &Components, op: BinaryOp) -> Result<Components> {
        let common = self.numeric_type().promote(other.numeric_type());
        let numeric_type = op.result_type(common);

        with_type!(numeric_type, T => {
            let a = self.to_array::<T>();
            let b = other.to_array::<T>();

            Ok(T::wrap(zip_with(&a, &b, |x, y| op.apply(x, y))?))
        })
    }

    /// Element-wise binary operation with a scalar operand.
    ///
    /// # Arguments
    ///
    /// * `scalar` - The scalar operand.
    /// * `op` - The operation.
    /// * `reversed` - If true, compute `scalar op element` instead of `element op scalar`.
    ///
    pub fn binary_scalar(&self, scalar: Scalar, op: BinaryOp, reversed: bool) -> Components {
        let numeric_type = op.result_type(self.numeric_type().promote_scalar(&scalar));

        with_type!(numeric_type, T => {
            let mut array = self.to_array::<T>();
            let scalar = T::from_scalar(scalar);
            if reversed {
                array.mapv_inplace(|x| op.apply(scalar, x));
            } else {
                array.mapv_inplace(|x| op.apply(x, scalar));
            }

            T::wrap(array)
        })
    }

    /// Element-wise comparison, giving 1 where the comparison holds and 0 elsewhere.
    ///
    pub fn compare(&self, other: &Components, comparison: Comparison) -> Result<Components> {
        let numeric_type = self.numeric_type().promote(other.numeric_type());

        with_type!(numeric_type, T => {
            let a = self.to_array::<T>();
            let b = other.to_array::<T>();
            let mask = zip_with(&a, &b, |x, y| comparison.test(x.compare(y)) as u8)?;

            Ok(Components::Uint8(mask))
        })
    }

    pub fn compare_scalar(&self, scalar: Scalar, comparison: Comparison) -> Components {
        let numeric_type = self.numeric_type().promote_scalar(&scalar);

        with_type!(numeric_type, T => {
            let scalar = T::from_scalar(scalar);
            let mask = self
                .to_array::<T>()
                .mapv(|x| comparison.test(x.compare(scalar)) as u8);

            Components::Uint8(mask)
        })
    }

    /// Reduce along an axis. Integers are accumulated in 64 bits.
    ///
    /// # Arguments
    ///
    /// * `axis` - The array axis to remove. Must be in bounds.
    /// * `reduction` - Sum or product.
    ///
    pub fn reduce(&self, axis: usize, reduction: Reduction) -> Components {
        let numeric_type = self.numeric_type().accumulator();

        with_type!(numeric_type, T => {
            let array = self.to_array::<T>();
            let reduced = match reduction {
                Reduction::Sum => array.fold_axis(
                    Axis(axis),
                    <T as Element>::zero(),
                    |acc, &x| Element::add(*acc, x),
                ),
                Reduction::Prod => array.fold_axis(
                    Axis(axis),
                    <T as Element>::one(),
                    |acc, &x| Element::mul(*acc, x),
                ),
            };

            T::wrap(reduced)
        })
    }

    /// Take the given positions along an axis, in order. Positions must be in bounds.
    ///
    pub fn select(&self, axis: usize, indices: &[usize]) -> Components {
        dispatch!(self, array => Element::wrap(array.select(Axis(axis), indices)))
    }

    /// Take a single position along an axis, removing that axis. Position must be in bounds.
    ///
    pub fn index_axis(&self, axis: usize, index: usize) -> Components {
        dispatch!(self, array => {
            Element::wrap(array.index_axis(Axis(axis), index).to_owned())
        })
    }

    /// Rotate the values along an axis so that position `shift` moves to position 0.
    ///
    pub fn roll(&self, axis: usize, shift: usize) -> Components {
        let n = self.shape()[axis];
        if n == 0 {
            return self.clone();
        }
        let indices: Vec<usize> = (0..n).map(|i| (i + shift) % n).collect();

        self.select(axis, &indices)
    }

    /// Decode components serialized as JSON arrays, one array per component.
    ///
    pub(crate) fn decode_json(numeric_type: NumericType, components: &[Value]) -> Result<Self> {
        with_type!(numeric_type, T => {
            let mut data: Vec<T> = vec![];
            let mut length = None;
            for component in components {
                let values = component.as_array().ok_or_else(|| {
                    Error::Encoding("each component must be a JSON array".to_string())
                })?;
                let values = T::read_json(values)?;
                check_length(&mut length, values.len())?;
                data.extend(values);
            }

            Self::from_vec(data, &[components.len(), length.unwrap_or(0)])
        })
    }

    /// Decode components serialized as base64 strings, one string per component.
    ///
    pub(crate) fn decode_base64(numeric_type: NumericType, components: &[Value]) -> Result<Self> {
        with_type!(numeric_type, T => {
            let mut data: Vec<T> = vec![];
            let mut length = None;
            for component in components {
                let text = component.as_str().ok_or_else(|| {
                    Error::Encoding("base64 components must be strings".to_string())
                })?;
                let bytes = BASE64
                    .decode(text)
                    .map_err(|err| Error::Encoding(format!("invalid base64 data: {err}")))?;
                if bytes.len() % numeric_type.size() != 0 {
                    return Err(Error::Encoding(format!(
                        "{} bytes is not a whole number of {numeric_type} values",
                        bytes.len()
                    )));
                }
                let values = decode_elements::<T>(&bytes);
                check_length(&mut length, values.len())?;
                data.extend(values);
            }

            Self::from_vec(data, &[components.len(), length.unwrap_or(0)])
        })
    }

    /// Decode components from the concatenated little endian bytes of `count` components.
    ///
    pub(crate) fn decode_bytes(numeric_type: NumericType, bytes: &[u8], count: usize) -> Result<Self> {
        let stride = numeric_type.size() * count.max(1);
        if bytes.len() % stride != 0 {
            return Err(Error::Encoding(format!(
                "{} bytes cannot be split into {count} components of {numeric_type} values",
                bytes.len()
            )));
        }

        with_type!(numeric_type, T => {
            let data = decode_elements::<T>(bytes);
            let length = data.len() / count.max(1);

            Self::from_vec(data, &[count, length])
        })
    }

    pub(crate) fn encode_json(&self) -> Result<Value> {
        dispatch!(self, array => {
            let mut components = vec![];
            for component in array.outer_iter() {
                let mut values = Vec::with_capacity(component.len());
                for value in component.iter() {
                    value.write_json(&mut values)?;
                }
                components.push(Value::Array(values));
            }

            Ok(Value::Array(components))
        })
    }

    pub(crate) fn encode_base64(&self) -> Value {
        dispatch!(self, array => Value::Array(
            array
                .outer_iter()
                .map(|component| Value::String(BASE64.encode(encode_elements(component.iter()))))
                .collect()
        ))
    }

    /// Write the little endian bytes of all components, one after the other.
    ///
    pub(crate) fn write_raw<W: Write>(&self, stream: &mut W) -> io::Result<()> {
        dispatch!(self, array => stream.write_elements(array.iter()))
    }

    /// A short rendering of each component showing its first two and last two values.
    ///
    pub(crate) fn preview(&self) -> Value {
        dispatch!(self, array => Value::Array(
            array
                .outer_iter()
                .map(|component| {
                    let values: Vec<String> =
                        component.iter().map(|value| value.format_value()).collect();
                    let text = if values.len() > 4 {
                        format!(
                            "{}, {}, ..., {}, {}",
                            values[0],
                            values[1],
                            values[values.len() - 2],
                            values[values.len() - 1]
                        )
                    } else {
                        values.join(", ")
                    };

                    Value::Array(vec![Value::String(text)])
                })
                .collect()
        ))
    }
}

fn check_length(length: &mut Option<usize>, n: usize) -> Result<()> {
    match *length {
        None => {
            *length = Some(n);
            Ok(())
        }
        Some(expected) if expected == n => Ok(()),
        Some(expected) => Err(Error::ShapeMismatch(format!(
            "components have different lengths, {expected} and {n}"
        ))),
    }
}

impl<T: Element> From<ArrayD<T>> for Components {
    fn from(array: ArrayD<T>) -> Self {
        Components::from_array(array)
    }
}

impl<T: Element> From<Vec<T>> for Components {
    /// A single component with the given values
    fn from(values: Vec<T>) -> Self {
        T::wrap(Array::from_vec(values).insert_axis(Axis(0)).into_dyn())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ndarray::array;
    use paste::paste;

    fn flat<T: Element>(components: &Components) -> Vec<T> {
        components.to_array::<T>().iter().copied().collect()
    }

    fn float32() -> Components {
        Components::from_vec(vec![1.0_f32, 2.0, 3.0, 4.0, 5.0, 6.0], &[1, 2, 3]).unwrap()
    }

    #[test]
    fn test_shape() {
        let components = float32();
        assert_eq!(components.numeric_type(), NumericType::Float32);
        assert_eq!(components.shape(), &[1, 2, 3]);
        assert_eq!(components.count(), 1);
        assert_eq!(components.len(), 6);
        assert_eq!(components.value(0, 4), Some(Scalar::Float(5.0)));
        assert_eq!(components.value(1, 0), None);
        assert!(matches!(
            Components::from_vec(vec![1_i8, 2, 3], &[2, 2]),
            Err(Error::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_from_array() {
        let components = Components::from_array(array![[1_u16, 2], [3, 4]]);
        assert_eq!(components.numeric_type(), NumericType::Uint16);
        assert_eq!(components.shape(), &[2, 2]);

        let components: Components = vec![Complex64::new(1.0, 1.0)].into();
        assert_eq!(components.shape(), &[1, 1]);
        assert_eq!(components.numeric_type(), NumericType::Complex128);
    }

    #[test]
    fn test_cast() {
        let components = float32().cast(NumericType::Int16);
        assert_eq!(components.numeric_type(), NumericType::Int16);
        assert_eq!(
            components.as_array::<i16>().unwrap().iter().copied().collect::<Vec<_>>(),
            vec![1, 2, 3, 4, 5, 6]
        );

        let complex = Components::from_vec(vec![Complex64::new(1.5, -2.0)], &[1, 1]).unwrap();
        assert_eq!(
            complex.cast(NumericType::Float64).value(0, 0),
            Some(Scalar::Float(1.5))
        );
    }

    #[test]
    fn test_binary_promotes() -> Result<()> {
        let a = Components::from_vec(vec![1_i32, 2, 3], &[1, 3])?;
        let b = Components::from_vec(vec![0.5_f32, 0.5, 0.5], &[1, 3])?;
        let sum = a.binary(&b, BinaryOp::Add)?;
        assert_eq!(sum.numeric_type(), NumericType::Float64);
        assert_eq!(flat::<f64>(&sum), vec![1.5, 2.5, 3.5]);

        let quotient = a.binary(&a, BinaryOp::Div)?;
        assert_eq!(quotient.numeric_type(), NumericType::Float64);

        let c = Components::from_vec(vec![1_i32, 2], &[1, 2])?;
        assert!(matches!(
            a.binary(&c, BinaryOp::Add),
            Err(Error::ShapeMismatch(_))
        ));

        Ok(())
    }

    #[test]
    fn test_binary_broadcasts() -> Result<()> {
        let a = Components::from_vec(vec![1.0_f64, 2.0, 3.0, 4.0], &[2, 2])?;
        let b = Components::from_vec(vec![10.0_f64, 20.0], &[1, 2])?;
        let sum = a.binary(&b, BinaryOp::Mul)?;
        assert_eq!(sum.shape(), &[2, 2]);
        assert_eq!(flat::<f64>(&sum), vec![10.0, 40.0, 30.0, 80.0]);

        Ok(())
    }

    #[test]
    fn test_binary_scalar() {
        let components = float32();
        let scaled = components.binary_scalar(Scalar::Float(2.0), BinaryOp::Mul, false);
        assert_eq!(scaled.numeric_type(), NumericType::Float32);
        assert_eq!(scaled.value(0, 5), Some(Scalar::Float(12.0)));

        let complex =
            components.binary_scalar(Scalar::Complex(Complex64::new(0.0, 1.0)), BinaryOp::Mul, false);
        assert_eq!(complex.numeric_type(), NumericType::Complex64);
        assert_eq!(
            complex.value(0, 0),
            Some(Scalar::Complex(Complex64::new(0.0, 1.0)))
        );

        let reversed = components.binary_scalar(Scalar::Int(12), BinaryOp::Div, true);
        assert_eq!(reversed.value(0, 2), Some(Scalar::Float(4.0)));

        let ints = Components::from_vec(vec![200_u8, 100], &[1, 2]).unwrap();
        let wrapped = ints.binary_scalar(Scalar::Int(100), BinaryOp::Add, false);
        assert_eq!(wrapped.numeric_type(), NumericType::Uint8);
        assert_eq!(wrapped.value(0, 0), Some(Scalar::UInt(44)));
    }

    #[test]
    fn test_compare() -> Result<()> {
        let a = float32();
        let b = Components::from_vec(vec![1.0_f64, 0.0, 3.0, 5.0, 5.0, 0.0], &[1, 2, 3])?;
        let mask = a.compare(&b, Comparison::Equal)?;
        assert_eq!(mask.numeric_type(), NumericType::Uint8);
        assert_eq!(flat::<u8>(&mask), vec![1, 0, 1, 0, 1, 0]);

        let mask = a.compare_scalar(Scalar::Int(3), Comparison::Greater);
        assert_eq!(flat::<u8>(&mask), vec![0, 0, 0, 1, 1, 1]);

        let nan = Components::from_vec(vec![f64::NAN], &[1, 1])?;
        assert_eq!(
            nan.compare(&nan, Comparison::NotEqual)?.value(0, 0),
            Some(Scalar::UInt(1))
        );

        Ok(())
    }

    #[test]
    fn test_reduce() {
        let components = float32();
        let sum = components.reduce(2, Reduction::Sum);
        assert_eq!(sum.shape(), &[1, 2]);
        assert_eq!(flat::<f32>(&sum), vec![6.0, 15.0]);

        let prod = components.reduce(1, Reduction::Prod);
        assert_eq!(prod.shape(), &[1, 3]);
        assert_eq!(flat::<f32>(&prod), vec![4.0, 10.0, 18.0]);

        let ints = Components::from_vec(vec![100_i8, 100, 100], &[1, 3]).unwrap();
        let sum = ints.reduce(1, Reduction::Sum);
        assert_eq!(sum.numeric_type(), NumericType::Int64);
        assert_eq!(sum.value(0, 0), Some(Scalar::Int(300)));
    }

    #[test]
    fn test_select_and_roll() {
        let components = float32();
        let selected = components.select(2, &[2, 0]);
        assert_eq!(flat::<f32>(&selected), vec![3.0, 1.0, 6.0, 4.0]);

        let row = components.index_axis(1, 1);
        assert_eq!(row.shape(), &[1, 3]);
        assert_eq!(flat::<f32>(&row), vec![4.0, 5.0, 6.0]);

        let rolled = components.roll(2, 1);
        assert_eq!(
            flat::<f32>(&rolled),
            vec![2.0, 3.0, 1.0, 5.0, 6.0, 4.0]
        );
    }

    #[test]
    fn test_base64_layout() -> Result<()> {
        let components = Components::from_vec(vec![1.0_f32, 2.0, 3.0, 4.0], &[2, 2])?;
        let encoded = components.encode_base64();
        let strings = encoded.as_array().unwrap();
        assert_eq!(strings.len(), 2);

        let mut expected = vec![];
        expected.extend_from_slice(&1.0_f32.to_le_bytes());
        expected.extend_from_slice(&2.0_f32.to_le_bytes());
        assert_eq!(strings[0], Value::String(BASE64.encode(expected)));

        Ok(())
    }

    #[test]
    fn test_decode_errors() {
        let bad = vec![Value::String("not base64!".to_string())];
        assert!(matches!(
            Components::decode_base64(NumericType::Float32, &bad),
            Err(Error::Encoding(_))
        ));

        let short = vec![Value::String(BASE64.encode([0_u8; 6]))];
        assert!(matches!(
            Components::decode_base64(NumericType::Float32, &short),
            Err(Error::Encoding(_))
        ));

        assert!(matches!(
            Components::decode_bytes(NumericType::Float64, &[0; 24], 2),
            Err(Error::Encoding(_))
        ));

        let ragged: Vec<Value> = serde_json::from_str("[[1, 2], [3]]").unwrap();
        assert!(matches!(
            Components::decode_json(NumericType::Int32, &ragged),
            Err(Error::ShapeMismatch(_))
        ));

        let nan = Components::from_vec(vec![f32::NAN], &[1, 1]).unwrap();
        assert!(matches!(nan.encode_json(), Err(Error::Encoding(_))));
    }

    #[test]
    fn test_preview() -> Result<()> {
        let components = Components::from_vec((0..10).map(|i| i as f32).collect(), &[1, 10])?;
        assert_eq!(
            components.preview(),
            serde_json::json!([["0.0, 1.0, ..., 8.0, 9.0"]])
        );

        let complex = Components::from_vec(vec![Complex32::new(1.0, -2.5)], &[1, 1])?;
        assert_eq!(complex.preview(), serde_json::json!([["(1.0-2.5j)"]]));

        let ints = Components::from_vec(vec![1_i64, 2, 3], &[1, 3])?;
        assert_eq!(ints.preview(), serde_json::json!([["1, 2, 3"]]));

        Ok(())
    }

    macro_rules! encoding_tests {
        ($name:ident, $t:ty, $numeric_type:ident, $values:expr) => {
            paste! {
                #[test]
                fn [<test_ $name _json_round_trip>]() -> Result<()> {
                    let values: Vec<$t> = $values;
                    let n = values.len() / 2;
                    let components = Components::from_vec(values, &[2, n])?;
                    let encoded = components.encode_json()?;
                    let decoded = Components::decode_json(
                        NumericType::$numeric_type,
                        encoded.as_array().unwrap(),
                    )?;
                    assert_eq!(decoded, components);

                    Ok(())
                }

                #[test]
                fn [<test_ $name _bytes_round_trip>]() -> Result<()> {
                    let values: Vec<$t> = $values;
                    let n = values.len() / 2;
                    let components = Components::from_vec(values, &[2, n])?;
                    let mut bytes = vec![];
                    components.write_raw(&mut bytes)?;
                    assert_eq!(bytes.len(), 2 * n * NumericType::$numeric_type.size());

                    let decoded = Components::decode_bytes(NumericType::$numeric_type, &bytes, 2)?;
                    assert_eq!(decoded, components);

                    let encoded = components.encode_base64();
                    let decoded = Components::decode_base64(
                        NumericType::$numeric_type,
                        encoded.as_array().unwrap(),
                    )?;
                    assert_eq!(decoded, components);

                    Ok(())
                }
            }
        };
    }

    encoding_tests!(int8, i8, Int8, vec![i8::MIN, -1, 0, i8::MAX]);
    encoding_tests!(uint64, u64, Uint64, vec![0, 1, u64::MAX - 1, u64::MAX]);
    encoding_tests!(float32, f32, Float32, vec![0.1, -1e-30, 3.5e30, f32::MIN_POSITIVE]);
    encoding_tests!(float64, f64, Float64, vec![0.1, -1e-300, 2.0_f64.sqrt(), 1e300]);
    encoding_tests!(
        complex64,
        Complex32,
        Complex64,
        vec![Complex32::new(0.1, -0.2), Complex32::new(3.0, 4.5)]
    );
}
