//! Contains constraint enumerations and other custom types.

mod constraint;

pub use constraint::{ConstraintCategory, ThingConstraints};
