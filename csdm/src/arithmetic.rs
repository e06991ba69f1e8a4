//! Element-wise arithmetic and comparison on datasets.
//!
//! The right hand side of an operation is an `Operand`: another dataset over compatible
//! dimensions, a bare number, or a physical quantity. Operations apply to every component of
//! every dependent variable and never change the dimensions. Operators on `&Csdm` return a new
//! dataset; the `*_assign` methods replace the components of the left operand.
//!
use std::ops::{Add, Div, Mul, Sub};

use num_complex::Complex64;

use crate::components::{BinaryOp, Comparison};
use crate::csdm::Csdm;
use crate::errors::{Error, Result};
use crate::numeric::Scalar;
use crate::units::{Quantity, Unit};

/// Right hand side of an arithmetic operation or comparison.
///
#[derive(Debug, Clone)]
pub enum Operand<'a> {
    Dataset(&'a Csdm),
    Scalar(Scalar),
    Quantity(Quantity),
}

impl<'a> From<&'a Csdm> for Operand<'a> {
    fn from(csdm: &'a Csdm) -> Self {
        Operand::Dataset(csdm)
    }
}

impl From<Scalar> for Operand<'_> {
    fn from(scalar: Scalar) -> Self {
        Operand::Scalar(scalar)
    }
}

impl From<Quantity> for Operand<'_> {
    fn from(quantity: Quantity) -> Self {
        Operand::Quantity(quantity)
    }
}

macro_rules! operand_from_number {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Operand<'_> {
                fn from(value: $t) -> Self {
                    Operand::Scalar(Scalar::from(value))
                }
            }
        )*
    };
}

operand_from_number!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, Complex64);

impl Csdm {
    pub fn add_assign<'a>(&mut self, rhs: impl Into<Operand<'a>>) -> Result<()> {
        self.binary_in_place(rhs.into(), BinaryOp::Add)
    }

    pub fn sub_assign<'a>(&mut self, rhs: impl Into<Operand<'a>>) -> Result<()> {
        self.binary_in_place(rhs.into(), BinaryOp::Sub)
    }

    pub fn mul_assign<'a>(&mut self, rhs: impl Into<Operand<'a>>) -> Result<()> {
        self.binary_in_place(rhs.into(), BinaryOp::Mul)
    }

    pub fn div_assign<'a>(&mut self, rhs: impl Into<Operand<'a>>) -> Result<()> {
        self.binary_in_place(rhs.into(), BinaryOp::Div)
    }

    fn binary(&self, rhs: Operand, op: BinaryOp) -> Result<Csdm> {
        let mut result = self.clone();
        result.binary_in_place(rhs, op)?;

        Ok(result)
    }

    /// Apply `op` to the components of every dependent variable, promoting the numeric type
    /// where needed.
    ///
    /// With another dataset, dimensions must be pairwise compatible and dependent variables are
    /// combined in order. Adding or subtracting needs convertible units; the right hand side is
    /// converted to the unit of the left. Multiplying or dividing by a dataset or a quantity
    /// combines the units.
    ///
    fn binary_in_place(&mut self, rhs: Operand, op: BinaryOp) -> Result<()> {
        let additive = matches!(op, BinaryOp::Add | BinaryOp::Sub);
        if let Operand::Dataset(other) = &rhs {
            check_same_grid(self, other)?;
        }

        // Nothing is changed until every variable has been computed
        let mut staged = Vec::with_capacity(self.dependent_variables.len());
        for (i, variable) in self.dependent_variables.iter().enumerate() {
            let left = variable.components()?;
            let (components, unit) = match &rhs {
                Operand::Dataset(other) => {
                    let other = &other.dependent_variables[i];
                    let right = other.components()?;
                    if additive {
                        let factor = other.unit().factor_to(variable.unit())?;
                        let components = if factor == 1.0 {
                            left.binary(right, op)?
                        } else {
                            let right =
                                right.binary_scalar(Scalar::Float(factor), BinaryOp::Mul, false);
                            left.binary(&right, op)?
                        };
                        (components, None)
                    } else {
                        let unit = combine_units(variable.unit(), other.unit(), op);
                        (left.binary(right, op)?, Some(unit))
                    }
                }
                Operand::Scalar(scalar) => (left.binary_scalar(*scalar, op, false), None),
                Operand::Quantity(quantity) => {
                    if additive {
                        let value = quantity.value_in(variable.unit())?;
                        (left.binary_scalar(Scalar::Float(value), op, false), None)
                    } else {
                        let unit = combine_units(variable.unit(), &quantity.unit, op);
                        let components =
                            left.binary_scalar(Scalar::Float(quantity.value), op, false);
                        (components, Some(unit))
                    }
                }
            };
            staged.push((variable.fit(components)?, unit));
        }

        for (variable, (components, unit)) in self.dependent_variables.iter_mut().zip(staged) {
            variable.replace_components(components);
            if let Some(unit) = unit {
                variable.set_unit(unit);
                variable.quantity_name = None;
            }
        }

        Ok(())
    }

    /// Compare element-wise. Each dependent variable of the result holds a dimensionless
    /// `uint8` mask, 1 where the comparison holds and 0 elsewhere.
    ///
    /// # Arguments
    ///
    /// * `rhs` - A dataset with compatible dimensions, a number, or a quantity convertible to
    ///   the unit of every dependent variable.
    /// * `comparison` - The comparison to make.
    ///
    pub fn compare<'a>(
        &self,
        rhs: impl Into<Operand<'a>>,
        comparison: Comparison,
    ) -> Result<Csdm> {
        let rhs = rhs.into();
        if let Operand::Dataset(other) = &rhs {
            check_same_grid(self, other)?;
        }

        let counts = self.shape();
        let mut variables = vec![];
        for (i, variable) in self.dependent_variables.iter().enumerate() {
            let left = variable.components()?;
            let mask = match &rhs {
                Operand::Dataset(other) => {
                    let other = &other.dependent_variables[i];
                    let factor = other.unit().factor_to(variable.unit())?;
                    let right = other.components()?;
                    if factor == 1.0 {
                        left.compare(right, comparison)?
                    } else {
                        let right =
                            right.binary_scalar(Scalar::Float(factor), BinaryOp::Mul, false);
                        left.compare(&right, comparison)?
                    }
                }
                Operand::Scalar(scalar) => left.compare_scalar(*scalar, comparison),
                Operand::Quantity(quantity) => left.compare_scalar(
                    Scalar::Float(quantity.value_in(variable.unit())?),
                    comparison,
                ),
            };

            let mut mask = variable.derive(mask, &counts)?;
            mask.set_unit(Unit::dimensionless());
            mask.quantity_name = None;
            variables.push(mask);
        }

        Ok(self.derive(self.dimensions.clone(), variables))
    }
}

fn combine_units(left: &Unit, right: &Unit, op: BinaryOp) -> Unit {
    match op {
        BinaryOp::Mul => left.multiply(right),
        _ => left.divide(right),
    }
}

/// Datasets can be combined when their dimensions are pairwise compatible and they hold the
/// same number of dependent variables.
///
fn check_same_grid(lhs: &Csdm, rhs: &Csdm) -> Result<()> {
    if lhs.ndim() != rhs.ndim() {
        return Err(Error::ShapeMismatch(format!(
            "datasets have {} and {} dimensions",
            lhs.ndim(),
            rhs.ndim()
        )));
    }
    for (a, b) in lhs.dimensions().iter().zip(rhs.dimensions()) {
        a.check_compatible(b)?;
    }
    if lhs.dependent_variables().len() != rhs.dependent_variables().len() {
        return Err(Error::ShapeMismatch(format!(
            "datasets have {} and {} dependent variables",
            lhs.dependent_variables().len(),
            rhs.dependent_variables().len()
        )));
    }

    Ok(())
}

macro_rules! operator {
    ($trait:ident, $method:ident, $op:expr, $($rhs:ty),*) => {
        $(
            impl $trait<$rhs> for &Csdm {
                type Output = Result<Csdm>;

                fn $method(self, rhs: $rhs) -> Result<Csdm> {
                    self.binary(Operand::from(rhs), $op)
                }
            }

            impl $trait<$rhs> for Csdm {
                type Output = Result<Csdm>;

                fn $method(mut self, rhs: $rhs) -> Result<Csdm> {
                    self.binary_in_place(Operand::from(rhs), $op)?;
                    Ok(self)
                }
            }
        )*
    };
}

macro_rules! operators {
    ($($rhs:ty),*) => {
        operator!(Add, add, BinaryOp::Add, $($rhs),*);
        operator!(Sub, sub, BinaryOp::Sub, $($rhs),*);
        operator!(Mul, mul, BinaryOp::Mul, $($rhs),*);
        operator!(Div, div, BinaryOp::Div, $($rhs),*);
    };
}

operators!(&Csdm, Scalar, Quantity, i32, i64, f64, Complex64);
