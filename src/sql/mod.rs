//! Safe SQL builder: identifiers from record types only, values as parameters.

mod builder;
pub mod named;
pub mod params;
pub use builder::*;
pub use named::*;
pub use params::*;
