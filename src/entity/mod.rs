//! Brewing log record types.

pub mod brew;
pub use brew::{Brew, BrewResource};
