//! Database models for the things table.

mod thing;

pub use thing::{ThingRecord, UpdateThing};
