use std::fmt;
use std::str::FromStr;

use crate::errors::{Error, Result};

/// Structure of a dependent variable's value at each grid point.
///
/// The quantity type fixes `p`, the number of components.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuantityType {
    Scalar,
    Vector(usize),
    Matrix(usize, usize),
    SymmetricMatrix(usize),
    Pixel(usize),
    Audio(usize),
}

impl QuantityType {
    /// Number of components, `p`
    pub fn components(&self) -> usize {
        match *self {
            QuantityType::Scalar => 1,
            QuantityType::Vector(n) | QuantityType::Pixel(n) | QuantityType::Audio(n) => n,
            QuantityType::Matrix(n, m) => n * m,
            QuantityType::SymmetricMatrix(n) => n * (n + 1) / 2,
        }
    }
}

impl Default for QuantityType {
    fn default() -> Self {
        QuantityType::Scalar
    }
}

impl fmt::Display for QuantityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuantityType::Scalar => write!(f, "scalar"),
            QuantityType::Vector(n) => write!(f, "vector_{n}"),
            QuantityType::Matrix(n, m) => write!(f, "matrix_{n}_{m}"),
            QuantityType::SymmetricMatrix(n) => write!(f, "symmetric_matrix_{n}"),
            QuantityType::Pixel(n) => write!(f, "pixel_{n}"),
            QuantityType::Audio(n) => write!(f, "audio_{n}"),
        }
    }
}

impl FromStr for QuantityType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let error = || Error::schema(format!("invalid quantity_type `{s}`"));
        let size = |n: &str| match n.parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(error()),
        };

        if s == "scalar" {
            return Ok(QuantityType::Scalar);
        }
        if let Some(n) = s.strip_prefix("symmetric_matrix_") {
            return Ok(QuantityType::SymmetricMatrix(size(n)?));
        }
        if let Some(rest) = s.strip_prefix("matrix_") {
            let (n, m) = rest.split_once('_').ok_or_else(error)?;
            return Ok(QuantityType::Matrix(size(n)?, size(m)?));
        }
        if let Some(n) = s.strip_prefix("vector_") {
            return Ok(QuantityType::Vector(size(n)?));
        }
        if let Some(n) = s.strip_prefix("pixel_") {
            return Ok(QuantityType::Pixel(size(n)?));
        }
        if let Some(n) = s.strip_prefix("audio_") {
            return Ok(QuantityType::Audio(size(n)?));
        }

        Err(error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_components() -> Result<()> {
        let cases = [
            ("scalar", 1),
            ("vector_3", 3),
            ("matrix_2_3", 6),
            ("symmetric_matrix_3", 6),
            ("pixel_4", 4),
            ("audio_2", 2),
        ];
        for (literal, p) in cases {
            let quantity_type: QuantityType = literal.parse()?;
            assert_eq!(quantity_type.components(), p);
            assert_eq!(quantity_type.to_string(), literal);
        }

        Ok(())
    }

    #[test]
    fn test_invalid() {
        for literal in ["", "vector", "vector_0", "matrix_2", "matrix_a_b", "tensor_3"] {
            assert!(matches!(
                literal.parse::<QuantityType>(),
                Err(Error::Schema(_))
            ));
        }
    }
}
