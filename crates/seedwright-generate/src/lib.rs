//! Generation engine for Seedwright.
//!
//! This crate resolves a [`seedwright_plan::Plan`] against a `dataModel.json` snapshot into
//! rows that honor foreign keys, unique constraints and identity sequences, then renders
//! them as dependency-ordered SQL.

pub mod connect;
pub mod constraints;
pub mod context;
pub mod errors;
pub mod model;
mod resolver;
pub mod seeder;
pub mod sequence;
pub mod shapes;
pub mod store;
pub mod values;

pub use constraints::ConstraintTracker;
pub use context::{CancelHandle, RunContext};
pub use errors::{GenerationError, Result};
pub use model::{GenerateOptions, GenerationReport, ModelReport};
pub use seeder::Seeder;
pub use sequence::{SequenceAllocator, SequenceCounter};
pub use shapes::Shape;
pub use store::{DeferredUpdate, Store};
