//! Request extractors: negotiated body format and record bodies.

pub mod format;
pub use format::{Accepts, BodyFormat, RecordBody};
