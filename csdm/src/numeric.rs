//! Numeric types of dependent variable components and the promotion rules between them.
//!
use std::cmp::Ordering;
use std::fmt::{self, Debug};
use std::str::FromStr;

use ndarray::ArrayD;
use num_complex::{Complex32, Complex64};
use num_traits::{One, Zero};
use serde_json::{Number, Value};

use crate::components::Components;
use crate::errors::{Error, Result};

/// Element type of a dependent variable's components.
///
/// All types are stored little endian when serialized to bytes.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericType {
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
    Complex64,
    Complex128,
}

/// Coarse classification used by the promotion rules. Bits are per real component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Unsigned(u8),
    Signed(u8),
    Float(u8),
    Complex(u8),
}

impl NumericType {
    pub const ALL: [NumericType; 12] = [
        NumericType::Int8,
        NumericType::Int16,
        NumericType::Int32,
        NumericType::Int64,
        NumericType::Uint8,
        NumericType::Uint16,
        NumericType::Uint32,
        NumericType::Uint64,
        NumericType::Float32,
        NumericType::Float64,
        NumericType::Complex64,
        NumericType::Complex128,
    ];

    /// The literal used for this type in CSDM documents
    pub fn as_str(&self) -> &'static str {
        match self {
            NumericType::Int8 => "int8",
            NumericType::Int16 => "int16",
            NumericType::Int32 => "int32",
            NumericType::Int64 => "int64",
            NumericType::Uint8 => "uint8",
            NumericType::Uint16 => "uint16",
            NumericType::Uint32 => "uint32",
            NumericType::Uint64 => "uint64",
            NumericType::Float32 => "float32",
            NumericType::Float64 => "float64",
            NumericType::Complex64 => "complex64",
            NumericType::Complex128 => "complex128",
        }
    }

    /// Size of a single element, in bytes
    pub fn size(&self) -> usize {
        match self.kind() {
            Kind::Unsigned(bits) | Kind::Signed(bits) | Kind::Float(bits) => bits as usize / 8,
            Kind::Complex(bits) => bits as usize / 4,
        }
    }

    pub fn is_complex(&self) -> bool {
        matches!(self.kind(), Kind::Complex(_))
    }

    pub fn is_float(&self) -> bool {
        matches!(self.kind(), Kind::Float(_))
    }

    pub fn is_integer(&self) -> bool {
        matches!(self.kind(), Kind::Signed(_) | Kind::Unsigned(_))
    }

    pub fn is_unsigned(&self) -> bool {
        matches!(self.kind(), Kind::Unsigned(_))
    }

    fn kind(&self) -> Kind {
        match self {
            NumericType::Int8 => Kind::Signed(8),
            NumericType::Int16 => Kind::Signed(16),
            NumericType::Int32 => Kind::Signed(32),
            NumericType::Int64 => Kind::Signed(64),
            NumericType::Uint8 => Kind::Unsigned(8),
            NumericType::Uint16 => Kind::Unsigned(16),
            NumericType::Uint32 => Kind::Unsigned(32),
            NumericType::Uint64 => Kind::Unsigned(64),
            NumericType::Float32 => Kind::Float(32),
            NumericType::Float64 => Kind::Float(64),
            NumericType::Complex64 => Kind::Complex(32),
            NumericType::Complex128 => Kind::Complex(64),
        }
    }

    fn from_kind(kind: Kind) -> Self {
        match kind {
            Kind::Signed(8) => NumericType::Int8,
            Kind::Signed(16) => NumericType::Int16,
            Kind::Signed(32) => NumericType::Int32,
            Kind::Signed(_) => NumericType::Int64,
            Kind::Unsigned(8) => NumericType::Uint8,
            Kind::Unsigned(16) => NumericType::Uint16,
            Kind::Unsigned(32) => NumericType::Uint32,
            Kind::Unsigned(_) => NumericType::Uint64,
            Kind::Float(32) => NumericType::Float32,
            Kind::Float(_) => NumericType::Float64,
            Kind::Complex(32) => NumericType::Complex64,
            Kind::Complex(_) => NumericType::Complex128,
        }
    }

    /// Result type of a binary operation between arrays of type `self` and `other`.
    ///
    /// Integers narrower than 32 bits fit in `float32`; wider integers need `float64`. Mixing
    /// `uint64` with any signed integer has no integer result type and gives `float64`.
    ///
    pub fn promote(self, other: NumericType) -> NumericType {
        fn float_bits(bits: u8) -> u8 {
            if bits <= 16 {
                32
            } else {
                64
            }
        }

        let kind = match (self.kind(), other.kind()) {
            (Kind::Unsigned(a), Kind::Unsigned(b)) => Kind::Unsigned(a.max(b)),
            (Kind::Signed(a), Kind::Signed(b)) => Kind::Signed(a.max(b)),
            (Kind::Unsigned(u), Kind::Signed(s)) | (Kind::Signed(s), Kind::Unsigned(u)) => {
                if s > u {
                    Kind::Signed(s)
                } else if u < 64 {
                    Kind::Signed(u * 2)
                } else {
                    Kind::Float(64)
                }
            }
            (Kind::Unsigned(i) | Kind::Signed(i), Kind::Float(f))
            | (Kind::Float(f), Kind::Unsigned(i) | Kind::Signed(i)) => {
                Kind::Float(f.max(float_bits(i)))
            }
            (Kind::Unsigned(i) | Kind::Signed(i), Kind::Complex(c))
            | (Kind::Complex(c), Kind::Unsigned(i) | Kind::Signed(i)) => {
                Kind::Complex(c.max(float_bits(i)))
            }
            (Kind::Float(a), Kind::Float(b)) => Kind::Float(a.max(b)),
            (Kind::Float(a), Kind::Complex(b))
            | (Kind::Complex(b), Kind::Float(a))
            | (Kind::Complex(a), Kind::Complex(b)) => Kind::Complex(a.max(b)),
        };

        Self::from_kind(kind)
    }

    /// Result type of a binary operation between an array of this type and a bare scalar.
    ///
    /// Scalars do not widen an array of their own kind: `float32 * 2.0` stays `float32`. A float
    /// scalar turns an integer array into `float64`, and a complex scalar makes a real array
    /// complex.
    ///
    pub fn promote_scalar(self, scalar: &Scalar) -> NumericType {
        match (scalar, self.kind()) {
            (Scalar::Int(_) | Scalar::UInt(_), _) => self,
            (Scalar::Float(_), Kind::Signed(_) | Kind::Unsigned(_)) => NumericType::Float64,
            (Scalar::Float(_), _) => self,
            (Scalar::Complex(_), Kind::Float(32)) => NumericType::Complex64,
            (Scalar::Complex(_), Kind::Complex(_)) => self,
            (Scalar::Complex(_), _) => NumericType::Complex128,
        }
    }

    /// Result type of true division. Integers divide as `float64`.
    ///
    pub fn true_divide(self) -> NumericType {
        if self.is_integer() {
            NumericType::Float64
        } else {
            self
        }
    }

    /// Accumulator type for `sum` and `prod`. Integers widen to 64 bits.
    ///
    pub fn accumulator(self) -> NumericType {
        match self.kind() {
            Kind::Signed(_) => NumericType::Int64,
            Kind::Unsigned(_) => NumericType::Uint64,
            _ => self,
        }
    }
}

impl fmt::Display for NumericType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NumericType {
    type Err = Error;

    /// Parse a numeric type literal, also accepting array dtype strings such as `"<f4"`.
    ///
    fn from_str(s: &str) -> Result<Self> {
        if let Some(numeric_type) = Self::ALL.iter().find(|t| t.as_str() == s) {
            return Ok(*numeric_type);
        }

        let dtype = s.trim_start_matches(|c: char| c == '<' || c == '>' || c == '|' || c == '=');
        let numeric_type = match dtype {
            "i1" => NumericType::Int8,
            "i2" => NumericType::Int16,
            "i4" => NumericType::Int32,
            "i8" => NumericType::Int64,
            "u1" => NumericType::Uint8,
            "u2" => NumericType::Uint16,
            "u4" => NumericType::Uint32,
            "u8" => NumericType::Uint64,
            "f4" => NumericType::Float32,
            "f8" => NumericType::Float64,
            "c8" => NumericType::Complex64,
            "c16" => NumericType::Complex128,
            _ => return Err(Error::schema(format!("unknown numeric_type `{s}`"))),
        };

        Ok(numeric_type)
    }
}

/// A bare number used as the right hand operand of arithmetic on a dataset.
///
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Int(i64),
    UInt(u64),
    Float(f64),
    Complex(Complex64),
}

impl Scalar {
    pub fn numeric_type(&self) -> NumericType {
        match self {
            Scalar::Int(_) => NumericType::Int64,
            Scalar::UInt(_) => NumericType::Uint64,
            Scalar::Float(_) => NumericType::Float64,
            Scalar::Complex(_) => NumericType::Complex128,
        }
    }

    pub fn to_complex(&self) -> Complex64 {
        match *self {
            Scalar::Int(i) => Complex64::new(i as f64, 0.0),
            Scalar::UInt(u) => Complex64::new(u as f64, 0.0),
            Scalar::Float(f) => Complex64::new(f, 0.0),
            Scalar::Complex(c) => c,
        }
    }

    pub fn to_f64(&self) -> f64 {
        self.to_complex().re
    }

    pub fn is_zero(&self) -> bool {
        match *self {
            Scalar::Int(i) => i == 0,
            Scalar::UInt(u) => u == 0,
            Scalar::Float(f) => f == 0.0,
            Scalar::Complex(c) => c.re == 0.0 && c.im == 0.0,
        }
    }
}

macro_rules! scalar_from {
    ($variant:ident, $wide:ty, $($t:ty),*) => {
        $(
            impl From<$t> for Scalar {
                fn from(value: $t) -> Self {
                    Scalar::$variant(value as $wide)
                }
            }
        )*
    };
}

scalar_from!(Int, i64, i8, i16, i32, i64);
scalar_from!(UInt, u64, u8, u16, u32, u64);
scalar_from!(Float, f64, f32, f64);

impl From<Complex64> for Scalar {
    fn from(value: Complex64) -> Self {
        Scalar::Complex(value)
    }
}

impl From<Complex32> for Scalar {
    fn from(value: Complex32) -> Self {
        Scalar::Complex(Complex64::new(value.re as f64, value.im as f64))
    }
}

/// An element type of component arrays.
///
/// Implemented for the Rust counterpart of every `NumericType`. Integer arithmetic wraps on
/// overflow.
///
pub trait Element: Copy + Debug + Default + PartialEq + Send + Sync + 'static {
    const NUMERIC_TYPE: NumericType;

    fn to_scalar(self) -> Scalar;

    /// Convert from a scalar with `as` cast semantics. Complex values lose their imaginary part
    /// when converted to a real type.
    fn from_scalar(value: Scalar) -> Self;

    fn zero() -> Self;

    fn one() -> Self;

    fn add(self, rhs: Self) -> Self;

    fn sub(self, rhs: Self) -> Self;

    fn mul(self, rhs: Self) -> Self;

    fn div(self, rhs: Self) -> Self;

    /// Total order for reals, lexicographic on (re, im) for complex numbers. `None` if either
    /// operand is NaN.
    fn compare(self, rhs: Self) -> Option<Ordering>;

    /// Append the little endian representation of this value to `out`.
    fn write_le(self, out: &mut Vec<u8>);

    /// Read a value from its little endian representation. `bytes` must be exactly
    /// `NUMERIC_TYPE.size()` long.
    fn read_le(bytes: &[u8]) -> Self;

    /// Append this value to a JSON array. Complex values are written as two numbers, real then
    /// imaginary.
    fn write_json(self, out: &mut Vec<Value>) -> Result<()>;

    /// Read one component from a JSON array.
    fn read_json(values: &[Value]) -> Result<Vec<Self>>;

    /// Human readable rendering, e.g. `3`, `0.5` or `(1.0-2.0j)`.
    fn format_value(self) -> String;

    /// Wrap an array of this type as `Components`.
    fn wrap(array: ArrayD<Self>) -> Components;

    /// Borrow the array held by `components` if it has this element type.
    fn unwrap(components: &Components) -> Option<&ArrayD<Self>>;

    fn unwrap_mut(components: &mut Components) -> Option<&mut ArrayD<Self>>;
}

macro_rules! wrap_element {
    ($variant:ident) => {
        fn wrap(array: ArrayD<Self>) -> Components {
            Components::$variant(array)
        }

        fn unwrap(components: &Components) -> Option<&ArrayD<Self>> {
            match components {
                Components::$variant(array) => Some(array),
                _ => None,
            }
        }

        fn unwrap_mut(components: &mut Components) -> Option<&mut ArrayD<Self>> {
            match components {
                Components::$variant(array) => Some(array),
                _ => None,
            }
        }
    };
}

macro_rules! integer_element {
    ($t:ty, $variant:ident, $scalar:ident, $wide:ty) => {
        impl Element for $t {
            const NUMERIC_TYPE: NumericType = NumericType::$variant;

            wrap_element!($variant);

            fn to_scalar(self) -> Scalar {
                Scalar::$scalar(self as $wide)
            }

            fn from_scalar(value: Scalar) -> Self {
                match value {
                    Scalar::Int(i) => i as $t,
                    Scalar::UInt(u) => u as $t,
                    Scalar::Float(f) => f as $t,
                    Scalar::Complex(c) => c.re as $t,
                }
            }

            fn zero() -> Self {
                Zero::zero()
            }

            fn one() -> Self {
                One::one()
            }

            fn add(self, rhs: Self) -> Self {
                self.wrapping_add(rhs)
            }

            fn sub(self, rhs: Self) -> Self {
                self.wrapping_sub(rhs)
            }

            fn mul(self, rhs: Self) -> Self {
                self.wrapping_mul(rhs)
            }

            fn div(self, rhs: Self) -> Self {
                if rhs == 0 {
                    0
                } else {
                    self.wrapping_div(rhs)
                }
            }

            fn compare(self, rhs: Self) -> Option<Ordering> {
                Some(self.cmp(&rhs))
            }

            fn write_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            fn read_le(bytes: &[u8]) -> Self {
                let mut buffer = [0; std::mem::size_of::<$t>()];
                buffer.copy_from_slice(bytes);

                <$t>::from_le_bytes(buffer)
            }

            fn write_json(self, out: &mut Vec<Value>) -> Result<()> {
                out.push(Value::from(self));

                Ok(())
            }

            fn read_json(values: &[Value]) -> Result<Vec<Self>> {
                values
                    .iter()
                    .map(|value| json_scalar(value).map(Self::from_scalar))
                    .collect()
            }

            fn format_value(self) -> String {
                self.to_string()
            }
        }
    };
}

macro_rules! float_element {
    ($t:ty, $variant:ident) => {
        impl Element for $t {
            const NUMERIC_TYPE: NumericType = NumericType::$variant;

            wrap_element!($variant);

            fn to_scalar(self) -> Scalar {
                Scalar::Float(self as f64)
            }

            fn from_scalar(value: Scalar) -> Self {
                match value {
                    Scalar::Int(i) => i as $t,
                    Scalar::UInt(u) => u as $t,
                    Scalar::Float(f) => f as $t,
                    Scalar::Complex(c) => c.re as $t,
                }
            }

            fn zero() -> Self {
                Zero::zero()
            }

            fn one() -> Self {
                One::one()
            }

            fn add(self, rhs: Self) -> Self {
                self + rhs
            }

            fn sub(self, rhs: Self) -> Self {
                self - rhs
            }

            fn mul(self, rhs: Self) -> Self {
                self * rhs
            }

            fn div(self, rhs: Self) -> Self {
                self / rhs
            }

            fn compare(self, rhs: Self) -> Option<Ordering> {
                self.partial_cmp(&rhs)
            }

            fn write_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            fn read_le(bytes: &[u8]) -> Self {
                let mut buffer = [0; std::mem::size_of::<$t>()];
                buffer.copy_from_slice(bytes);

                <$t>::from_le_bytes(buffer)
            }

            fn write_json(self, out: &mut Vec<Value>) -> Result<()> {
                out.push(json_float(self as f64)?);

                Ok(())
            }

            fn read_json(values: &[Value]) -> Result<Vec<Self>> {
                values
                    .iter()
                    .map(|value| json_scalar(value).map(Self::from_scalar))
                    .collect()
            }

            fn format_value(self) -> String {
                format!("{self:?}")
            }
        }
    };
}

macro_rules! complex_element {
    ($t:ty, $real:ty, $variant:ident) => {
        impl Element for $t {
            const NUMERIC_TYPE: NumericType = NumericType::$variant;

            wrap_element!($variant);

            fn to_scalar(self) -> Scalar {
                Scalar::Complex(Complex64::new(self.re as f64, self.im as f64))
            }

            fn from_scalar(value: Scalar) -> Self {
                let value = value.to_complex();
                <$t>::new(value.re as $real, value.im as $real)
            }

            fn zero() -> Self {
                Zero::zero()
            }

            fn one() -> Self {
                One::one()
            }

            fn add(self, rhs: Self) -> Self {
                self + rhs
            }

            fn sub(self, rhs: Self) -> Self {
                self - rhs
            }

            fn mul(self, rhs: Self) -> Self {
                self * rhs
            }

            fn div(self, rhs: Self) -> Self {
                self / rhs
            }

            fn compare(self, rhs: Self) -> Option<Ordering> {
                match self.re.partial_cmp(&rhs.re)? {
                    Ordering::Equal => self.im.partial_cmp(&rhs.im),
                    ordering => Some(ordering),
                }
            }

            fn write_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.re.to_le_bytes());
                out.extend_from_slice(&self.im.to_le_bytes());
            }

            fn read_le(bytes: &[u8]) -> Self {
                let half = bytes.len() / 2;
                <$t>::new(
                    <$real as Element>::read_le(&bytes[..half]),
                    <$real as Element>::read_le(&bytes[half..]),
                )
            }

            fn write_json(self, out: &mut Vec<Value>) -> Result<()> {
                out.push(json_float(self.re as f64)?);
                out.push(json_float(self.im as f64)?);

                Ok(())
            }

            fn read_json(values: &[Value]) -> Result<Vec<Self>> {
                if values.iter().all(Value::is_string) {
                    return values
                        .iter()
                        .map(|value| json_scalar(value).map(Self::from_scalar))
                        .collect();
                }

                if values.len() % 2 != 0 {
                    return Err(Error::Encoding(format!(
                        "complex components need an even number of values, got {}",
                        values.len()
                    )));
                }

                values
                    .chunks_exact(2)
                    .map(|pair| {
                        let re = json_scalar(&pair[0])?.to_f64();
                        let im = json_scalar(&pair[1])?.to_f64();

                        Ok(<$t>::new(re as $real, im as $real))
                    })
                    .collect()
            }

            fn format_value(self) -> String {
                if self.im.is_sign_negative() {
                    format!("({:?}-{:?}j)", self.re, -self.im)
                } else {
                    format!("({:?}+{:?}j)", self.re, self.im)
                }
            }
        }
    };
}

integer_element!(i8, Int8, Int, i64);
integer_element!(i16, Int16, Int, i64);
integer_element!(i32, Int32, Int, i64);
integer_element!(i64, Int64, Int, i64);
integer_element!(u8, Uint8, UInt, u64);
integer_element!(u16, Uint16, UInt, u64);
integer_element!(u32, Uint32, UInt, u64);
integer_element!(u64, Uint64, UInt, u64);
float_element!(f32, Float32);
float_element!(f64, Float64);
complex_element!(Complex32, f32, Complex64);
complex_element!(Complex64, f64, Complex128);

fn json_float(value: f64) -> Result<Value> {
    Number::from_f64(value).map(Value::Number).ok_or_else(|| {
        Error::Encoding(format!(
            "{value} cannot be written as a JSON number, use base64 or raw encoding"
        ))
    })
}

/// Interpret a JSON value as a number. Strings are read as complex literals such as `"1-2j"`.
///
pub(crate) fn json_scalar(value: &Value) -> Result<Scalar> {
    match value {
        Value::Number(number) => {
            if let Some(i) = number.as_i64() {
                Ok(Scalar::Int(i))
            } else if let Some(u) = number.as_u64() {
                Ok(Scalar::UInt(u))
            } else {
                number
                    .as_f64()
                    .map(Scalar::Float)
                    .ok_or_else(|| Error::Encoding(format!("bad number {number}")))
            }
        }
        Value::String(text) => parse_complex(text).map(Scalar::Complex),
        _ => Err(Error::Encoding(format!("expected a number, got {value}"))),
    }
}

/// Parse a complex literal such as `"1+2j"`, `"(1.5-0.5j)"`, `"3j"` or `"-4"`.
///
pub(crate) fn parse_complex(text: &str) -> Result<Complex64> {
    let error = || Error::Encoding(format!("bad complex literal `{text}`"));
    let trimmed = text
        .trim()
        .trim_start_matches('(')
        .trim_end_matches(')')
        .replace(' ', "");

    let body = match trimmed.strip_suffix(|c: char| c == 'j' || c == 'i') {
        Some(body) => body,
        None => {
            let re = trimmed.parse::<f64>().map_err(|_| error())?;
            return Ok(Complex64::new(re, 0.0));
        }
    };

    // Split at the last sign that is not a leading sign or part of an exponent
    let bytes = body.as_bytes();
    let split = (1..bytes.len())
        .rev()
        .find(|&i| {
            (bytes[i] == b'+' || bytes[i] == b'-') && !matches!(bytes[i - 1], b'e' | b'E')
        });

    let (re, im) = match split {
        Some(i) => (&body[..i], &body[i..]),
        None => ("0", body),
    };
    let im = match im {
        "" | "+" => "1",
        "-" => "-1",
        im => im,
    };

    Ok(Complex64::new(
        re.parse().map_err(|_| error())?,
        im.parse().map_err(|_| error())?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    use NumericType::*;

    #[test]
    fn test_from_str() -> Result<()> {
        for numeric_type in NumericType::ALL {
            assert_eq!(numeric_type.as_str().parse::<NumericType>()?, numeric_type);
        }
        assert_eq!("<f4".parse::<NumericType>()?, Float32);
        assert_eq!(">c16".parse::<NumericType>()?, Complex128);
        assert_eq!("|u1".parse::<NumericType>()?, Uint8);
        assert!(matches!(
            "float16".parse::<NumericType>(),
            Err(Error::Schema(_))
        ));

        Ok(())
    }

    #[test]
    fn test_size() {
        assert_eq!(Int8.size(), 1);
        assert_eq!(Uint16.size(), 2);
        assert_eq!(Float32.size(), 4);
        assert_eq!(Int64.size(), 8);
        assert_eq!(Complex64.size(), 8);
        assert_eq!(Complex128.size(), 16);
    }

    #[test]
    fn test_promote_table() {
        assert_eq!(Int32.promote(Float32), Float64);
        assert_eq!(Int16.promote(Float32), Float32);
        assert_eq!(Uint8.promote(Int8), Int16);
        assert_eq!(Uint32.promote(Int64), Int64);
        assert_eq!(Uint64.promote(Int8), Float64);
        assert_eq!(Uint8.promote(Uint32), Uint32);
        assert_eq!(Float32.promote(Float64), Float64);
        assert_eq!(Float32.promote(Complex64), Complex64);
        assert_eq!(Float64.promote(Complex64), Complex128);
        assert_eq!(Int32.promote(Complex64), Complex128);
        assert_eq!(Int8.promote(Complex64), Complex64);
        assert_eq!(Complex128.promote(Uint8), Complex128);
    }

    #[test]
    fn test_promote_scalar() {
        assert_eq!(Float32.promote_scalar(&Scalar::Float(2.0)), Float32);
        assert_eq!(Int16.promote_scalar(&Scalar::Int(2)), Int16);
        assert_eq!(Int16.promote_scalar(&Scalar::Float(2.0)), Float64);
        assert_eq!(
            Float32.promote_scalar(&Scalar::Complex(Complex64::new(0.0, 1.0))),
            Complex64
        );
        assert_eq!(
            Float64.promote_scalar(&Scalar::Complex(Complex64::new(0.0, 1.0))),
            Complex128
        );
        assert_eq!(
            Uint8.promote_scalar(&Scalar::Complex(Complex64::new(0.0, 1.0))),
            Complex128
        );
    }

    #[test]
    fn test_accumulator_and_divide() {
        assert_eq!(Int8.accumulator(), Int64);
        assert_eq!(Uint16.accumulator(), Uint64);
        assert_eq!(Float32.accumulator(), Float32);
        assert_eq!(Int32.true_divide(), Float64);
        assert_eq!(Complex64.true_divide(), Complex64);
    }

    #[test]
    fn test_wrapping() {
        assert_eq!(Element::add(250u8, 10u8), 4);
        assert_eq!(Element::mul(i8::MAX, 2i8), -2);
        assert_eq!(Element::div(5i32, 0i32), 0);
    }

    #[test]
    fn test_bytes() {
        let mut out = vec![];
        Element::write_le(Complex32::new(1.0, -2.0), &mut out);
        Element::write_le(258u16, &mut out);
        assert_eq!(out.len(), 10);
        assert_eq!(&out[8..], &[2, 1]);
        assert_eq!(
            <Complex32 as Element>::read_le(&out[..8]),
            Complex32::new(1.0, -2.0)
        );
    }

    #[test]
    fn test_json() -> Result<()> {
        let mut out = vec![];
        Complex64::new(1.5, -2.0).write_json(&mut out)?;
        assert_eq!(out, vec![Value::from(1.5), Value::from(-2.0)]);
        assert!(f64::NAN.write_json(&mut out).is_err());

        let values: Vec<Value> = serde_json::from_str("[1, 2.5, -3]")?;
        assert_eq!(<i16 as Element>::read_json(&values)?, vec![1, 2, -3]);
        assert_eq!(<f64 as Element>::read_json(&values)?, vec![1.0, 2.5, -3.0]);

        let values: Vec<Value> = serde_json::from_str("[1, 2, 3, 4]")?;
        assert_eq!(
            <Complex64 as Element>::read_json(&values)?,
            vec![Complex64::new(1.0, 2.0), Complex64::new(3.0, 4.0)]
        );

        let values: Vec<Value> = serde_json::from_str(r#"["1+2j", "-3.5e-1-4j"]"#)?;
        assert_eq!(
            <Complex64 as Element>::read_json(&values)?,
            vec![Complex64::new(1.0, 2.0), Complex64::new(-0.35, -4.0)]
        );

        let values: Vec<Value> = serde_json::from_str("[1, 2, 3]")?;
        assert!(<Complex64 as Element>::read_json(&values).is_err());

        Ok(())
    }

    #[test]
    fn test_parse_complex() -> Result<()> {
        assert_eq!(parse_complex("(1-2j)")?, Complex64::new(1.0, -2.0));
        assert_eq!(parse_complex("3j")?, Complex64::new(0.0, 3.0));
        assert_eq!(parse_complex("-j")?, Complex64::new(0.0, -1.0));
        assert_eq!(parse_complex("1e-3+1e+2j")?, Complex64::new(1e-3, 1e2));
        assert_eq!(parse_complex("-4")?, Complex64::new(-4.0, 0.0));
        assert!(parse_complex("abc").is_err());

        Ok(())
    }

    fn numeric_type() -> impl Strategy<Value = NumericType> {
        (0..NumericType::ALL.len()).prop_map(|i| NumericType::ALL[i])
    }

    proptest! {
        #[test]
        fn test_promote_is_commutative(a in numeric_type(), b in numeric_type()) {
            prop_assert_eq!(a.promote(b), b.promote(a));
        }

        #[test]
        fn test_promote_is_idempotent(a in numeric_type()) {
            prop_assert_eq!(a.promote(a), a);
        }

        #[test]
        fn test_promote_never_narrows(a in numeric_type(), b in numeric_type()) {
            let c = a.promote(b);
            prop_assert!(c.size() >= a.size().max(b.size()));
            prop_assert_eq!(c.promote(a), c);
            prop_assert_eq!(c.promote(b), c);
            prop_assert_eq!(c.is_complex(), a.is_complex() || b.is_complex());
        }

        #[test]
        fn test_promote_float64_is_absorbing(a in numeric_type()) {
            let expected = if a.is_complex() { Complex128 } else { Float64 };
            prop_assert_eq!(a.promote(Float64), expected);
        }
    }
}
