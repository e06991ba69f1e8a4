//! Fourier transforms and apodization along dimensions.
//!
use std::f64::consts::PI;

use ndarray::Axis;
use num_complex::Complex64;
use rustfft::FftPlanner;

use crate::components::{BinaryOp, Components};
use crate::csdm::Csdm;
use crate::dimension::Dimension;
use crate::errors::{Error, Result};
use crate::units::{Quantity, Unit};

/// Window function applied by `Csdm::apodize`.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Apodization {
    Sin,
    Cos,
}

impl Apodization {
    fn apply(self, value: f64) -> f64 {
        match self {
            Apodization::Sin => value.sin(),
            Apodization::Cos => value.cos(),
        }
    }
}

impl Csdm {
    /// Fourier transform along a linear dimension, replacing it with its reciprocal.
    ///
    /// The direction follows `complex_fft`. A dimension without it is transformed forward and
    /// the output is ordered from the most negative frequency, index `k` holding frequency
    /// `k - floor(N / 2)`. A dimension with it is transformed back, normalized by `1 / N`. The
    /// coordinates offset of the time side becomes a phase `exp(∓2πi·f·t0)` on the frequency
    /// side, so transforming twice recovers the original components.
    ///
    /// Components of the result are `complex128`.
    ///
    /// # Arguments
    ///
    /// * `dimension` - Index of the dimension to transform. Must be linear.
    ///
    pub fn fft(&self, dimension: usize) -> Result<Csdm> {
        let ndim = self.ndim();
        let linear = match self.dimensions().get(dimension) {
            Some(Dimension::Linear(linear)) => linear,
            Some(other) => {
                return Err(Error::Value(format!(
                    "only linear dimensions can be Fourier transformed, dimension {dimension} is {}",
                    other.type_name()
                )))
            }
            None => {
                return Err(Error::Index(format!(
                    "no dimension at index {dimension} in a dataset with {ndim} dimensions"
                )))
            }
        };
        let count = linear.count();
        let half = count / 2;
        let inverse = linear.complex_fft;

        // Phase cycles per frequency index
        let cycles = if inverse {
            let offset = linear
                .reciprocal
                .coordinates_offset
                .value_in(&linear.unit().inverse())?;
            linear.increment().value * offset
        } else {
            let offset = linear
                .quantitative
                .coordinates_offset
                .value_in(linear.unit())?;
            offset / (count as f64 * linear.increment().value)
        };
        let sign = if inverse { 1.0 } else { -1.0 };
        let phase: Vec<Complex64> = (0..count)
            .map(|k| {
                let m = k as f64 - half as f64;
                Complex64::from_polar(1.0, sign * 2.0 * PI * m * cycles)
            })
            .collect();

        let mut planner = FftPlanner::<f64>::new();
        let fft = if inverse {
            planner.plan_fft_inverse(count)
        } else {
            planner.plan_fft_forward(count)
        };

        let mut dimensions = self.dimensions().to_vec();
        dimensions[dimension] = Dimension::Linear(linear.reciprocal_dimension());
        let counts = self.shape();

        let axis = Axis(ndim - dimension);
        let mut buffer = vec![Complex64::default(); count];
        let mut variables = vec![];
        for variable in self.dependent_variables() {
            let mut array = variable.components()?.to_array::<Complex64>();
            for mut lane in array.lanes_mut(axis) {
                if inverse {
                    for (k, value) in lane.iter().enumerate() {
                        buffer[(k + count - half) % count] = *value * phase[k];
                    }
                    fft.process(&mut buffer);
                    for (value, transformed) in lane.iter_mut().zip(&buffer) {
                        *value = *transformed / count as f64;
                    }
                } else {
                    for (slot, value) in buffer.iter_mut().zip(lane.iter()) {
                        *slot = *value;
                    }
                    fft.process(&mut buffer);
                    for (k, value) in lane.iter_mut().enumerate() {
                        *value = buffer[(k + count - half) % count] * phase[k];
                    }
                }
            }
            variables.push(variable.derive(Components::from(array), &counts)?);
        }

        Ok(self.derive(dimensions, variables))
    }

    /// Multiply every component by a window over the coordinates of some dimensions.
    ///
    /// Along each listed dimension the window is `function(argument · x)` for coordinates `x`.
    ///
    /// # Arguments
    ///
    /// * `function` - The window function.
    /// * `argument` - Scale of the coordinates. Its unit times the unit of each dimension must
    ///   be dimensionless.
    /// * `dimensions` - Indexes of the dimensions to apodize along. Labeled dimensions have no
    ///   coordinates and are refused.
    ///
    pub fn apodize(
        &self,
        function: Apodization,
        argument: &Quantity,
        dimensions: &[usize],
    ) -> Result<Csdm> {
        let ndim = self.ndim();

        let mut windows = vec![];
        for &i in dimensions {
            let dimension = self.dimensions().get(i).ok_or_else(|| {
                Error::Index(format!(
                    "no dimension at index {i} in a dataset with {ndim} dimensions"
                ))
            })?;
            let (coordinates, unit) = match (dimension.coordinate_values(), dimension.unit()) {
                (Some(coordinates), Some(unit)) => (coordinates, unit),
                _ => {
                    return Err(Error::Value(format!(
                        "cannot apodize along dimension {i}, a {} dimension",
                        dimension.type_name()
                    )))
                }
            };
            let scale = argument.value
                * argument
                    .unit
                    .multiply(unit)
                    .factor_to(&Unit::dimensionless())?;

            let window: Vec<f64> = coordinates
                .iter()
                .map(|x| function.apply(scale * x))
                .collect();
            let mut shape = vec![1; ndim + 1];
            shape[ndim - i] = window.len();
            windows.push(Components::from_vec(window, &shape)?);
        }

        let counts = self.shape();
        let mut variables = vec![];
        for variable in self.dependent_variables() {
            let mut components = variable.components()?.clone();
            for window in &windows {
                components = components.binary(window, BinaryOp::Mul)?;
            }
            variables.push(variable.derive(components, &counts)?);
        }

        Ok(self.derive(self.dimensions().to_vec(), variables))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::dimension::LinearDimension;
    use crate::numeric::{NumericType, Scalar};
    use crate::variable::DependentVariable;

    fn close(a: Complex64, b: Complex64) -> bool {
        (a - b).norm() < 1e-9
    }

    fn signal(values: Vec<f64>, increment: &str, offset: &str) -> Result<Csdm> {
        let mut dimension = LinearDimension::new(values.len(), Quantity::parse(increment)?)?;
        dimension.set_coordinates_offset(Quantity::parse(offset)?)?;

        let mut csdm = Csdm::new("");
        csdm.add_dimension(dimension)?;
        csdm.add_dependent_variable(DependentVariable::scalar(values)?)?;

        Ok(csdm)
    }

    fn complex_values(csdm: &Csdm) -> Result<Vec<Complex64>> {
        Ok(csdm.dependent_variables()[0]
            .components()?
            .to_array::<Complex64>()
            .iter()
            .copied()
            .collect())
    }

    #[test]
    fn test_fft_of_constant() -> Result<()> {
        let spectrum = signal(vec![1.0; 4], "0.5 s", "0 s")?.fft(0)?;

        assert_eq!(
            spectrum.dependent_variables()[0].numeric_type(),
            NumericType::Complex128
        );
        let values = complex_values(&spectrum)?;
        let expected = [0.0, 0.0, 4.0, 0.0];
        for (value, expected) in values.iter().zip(expected) {
            assert!(close(*value, Complex64::new(expected, 0.0)));
        }

        match &spectrum.dimensions()[0] {
            Dimension::Linear(frequency) => {
                assert!(frequency.complex_fft);
                assert!(frequency.unit().is_convertible(&Unit::parse("Hz")?));
                assert_eq!(frequency.coordinates().values().to_vec(), vec![-1.0, -0.5, 0.0, 0.5]);
            }
            other => panic!("expected a linear dimension, got {other:?}"),
        }

        Ok(())
    }

    #[test]
    fn test_fft_offset_phase() -> Result<()> {
        // A delta at t = 1 s has spectrum exp(-2πi·f·1 s) at f = -1, -0.5, 0, 0.5 Hz
        let spectrum = signal(vec![1.0, 0.0, 0.0, 0.0], "0.5 s", "1 s")?.fft(0)?;

        let values = complex_values(&spectrum)?;
        let expected = [1.0, -1.0, 1.0, -1.0];
        for (value, expected) in values.iter().zip(expected) {
            assert!(close(*value, Complex64::new(expected, 0.0)));
        }

        Ok(())
    }

    #[test]
    fn test_fft_round_trip() -> Result<()> {
        let original = vec![0.5, -1.0, 2.0, 3.5, 0.0];
        let csdm = signal(original.clone(), "2 ms", "-3 ms")?;

        let back = csdm.fft(0)?.fft(0)?;

        match (&back.dimensions()[0], &csdm.dimensions()[0]) {
            (Dimension::Linear(back), Dimension::Linear(linear)) => {
                assert!(!back.complex_fft);
                assert_eq!(back.quantitative, linear.quantitative);
            }
            other => panic!("expected linear dimensions, got {other:?}"),
        }
        for (value, expected) in complex_values(&back)?.iter().zip(original) {
            assert!(close(*value, Complex64::new(expected, 0.0)));
        }

        Ok(())
    }

    #[test]
    fn test_fft_along_second_dimension() -> Result<()> {
        let mut csdm = Csdm::new("");
        csdm.add_dimension(LinearDimension::new(2, Quantity::parse("1 m")?)?)?;
        csdm.add_dimension(LinearDimension::new(2, Quantity::parse("1 s")?)?)?;
        csdm.add_dependent_variable(DependentVariable::scalar(vec![1.0f64, 2.0, 3.0, 4.0])?)?;

        let spectrum = csdm.fft(1)?;

        // Along dimension 1: (1, 3) -> (-2, 4) and (2, 4) -> (-2, 6), lowest frequency first
        let expected = [-2.0, -2.0, 4.0, 6.0];
        for (value, expected) in complex_values(&spectrum)?.iter().zip(expected) {
            assert!(close(*value, Complex64::new(expected, 0.0)));
        }
        assert!(matches!(&spectrum.dimensions()[0], Dimension::Linear(d) if !d.complex_fft));

        Ok(())
    }

    #[test]
    fn test_fft_needs_linear_dimension() -> Result<()> {
        let csdm = signal(vec![1.0; 3], "1 s", "0 s")?;
        assert!(matches!(csdm.fft(1), Err(Error::Index(_))));

        let mut labeled = Csdm::new("");
        labeled.add_dimension(serde_json::json!({"type": "labeled", "labels": ["a", "b"]}))?;
        assert!(matches!(labeled.fft(0), Err(Error::Value(_))));

        Ok(())
    }

    #[test]
    fn test_apodize() -> Result<()> {
        let csdm = signal(vec![2.0; 4], "1 s", "0 s")?;
        let argument = Quantity::new(PI / 2.0, Unit::parse("1/s")?);

        let apodized = csdm.apodize(Apodization::Cos, &argument, &[0])?;
        let values: Vec<f64> = apodized.dependent_variables()[0]
            .components()?
            .to_array::<f64>()
            .iter()
            .copied()
            .collect();
        let expected = [2.0, 0.0, -2.0, 0.0];
        for (value, expected) in values.iter().zip(expected) {
            assert!((value - expected).abs() < 1e-9);
        }
        assert_eq!(apodized.dimensions(), csdm.dimensions());

        // kHz times ms is dimensionless, with a factor of one
        let sine = signal(vec![1.0; 2], "1 ms", "0 ms")?.apodize(
            Apodization::Sin,
            &Quantity::parse("0.5 kHz")?,
            &[0],
        )?;
        let last = sine.dependent_variables()[0].components()?.value(0, 1);
        assert!(matches!(last, Some(Scalar::Float(x)) if (x - 0.5f64.sin()).abs() < 1e-9));

        Ok(())
    }

    #[test]
    fn test_apodize_unit_mismatch() -> Result<()> {
        let csdm = signal(vec![1.0; 4], "1 s", "0 s")?;
        let argument = Quantity::new(1.0, Unit::parse("1/m")?);

        assert!(matches!(
            csdm.apodize(Apodization::Sin, &argument, &[0]),
            Err(Error::UnitIncompatibility { .. })
        ));
        assert!(matches!(
            csdm.apodize(Apodization::Sin, &argument, &[2]),
            Err(Error::Index(_))
        ));

        Ok(())
    }
}
