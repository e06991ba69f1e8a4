//! The Core Scientific Dataset model.
//!
//! A dataset (`Csdm`) is an ordered list of coordinate dimensions and the dependent variables
//! sampled over the grid they span. Datasets are read from and written to `.csdf` / `.csdfe`
//! JSON documents, with components inline or in separate binary files fetched on first use.
//!
mod arithmetic;
mod components;
mod config;
mod csdm;
mod dimension;
mod errors;
mod extio;
mod format;
mod helpers;
mod mapper;
mod numeric;
mod quantity_type;
mod range;
mod resolver;
mod statistics;
mod transform;
mod units;
mod variable;

#[cfg(test)]
mod testing;

pub use arithmetic::Operand;
pub use components::BinaryOp;
pub use components::Comparison;
pub use components::Components;
pub use components::Encoding;
pub use components::Reduction;
pub use config::LoadOptions;
pub use config::SaveOptions;
pub use csdm::Csdm;
pub use csdm::DimIndex;
pub use csdm::GeographicCoordinate;
pub use csdm::IntoDependentVariable;
pub use csdm::IntoDimension;
pub use dimension::Coordinate;
pub use dimension::Coordinates;
pub use dimension::Dimension;
pub use dimension::LabeledDimension;
pub use dimension::LinearDimension;
pub use dimension::MonotonicDimension;
pub use dimension::Quantitative;
pub use errors::Error;
pub use errors::Result;
pub use format::load;
pub use format::load_with;
pub use format::parse;
pub use format::parse_str;
pub use format::Version;
pub use format::CURRENT_VERSION;
pub use mapper::FileMapper;
pub use mapper::Mapper;
pub use numeric::Element;
pub use numeric::NumericType;
pub use numeric::Scalar;
pub use quantity_type::QuantityType;
pub use range::FloatRange;
pub use resolver::Resolver;
pub use transform::Apodization;
pub use units::Quantity;
pub use units::Unit;
pub use units::UnitDimensions;
pub use variable::DependentVariable;
pub use variable::LoadState;
pub use variable::SparseSampling;
