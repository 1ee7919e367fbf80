//! Core contracts and helpers for Seedwright.
//!
//! This crate defines the data model snapshot, column classification, generated
//! values, and the FK dependency planner shared by the generator, adapters, and the CLI.

pub mod error;
pub mod graph;
pub mod model;
pub mod relations;
pub mod types;
pub mod validation;
pub mod value;

pub use error::{Error, Result};
pub use graph::{
    DependencyEdge, DependencyReport, DependencySummary, InsertionPlan, build_dependency_report,
    dependency_edges, plan_insertion,
};
pub use model::{
    DataModel, Dialect, Enum, EnumValue, Field, FieldGroups, FieldSequence, Model, ObjectField,
    ScalarField, SequenceInfo, UniqueConstraint, UniqueKey,
};
pub use relations::Relation;
pub use types::ColumnKind;
pub use validation::validate_data_model;
pub use value::{Cell, GeneratedValue, Row};

/// Current contract version for `dataModel.json` artifacts.
pub const DATA_MODEL_VERSION: &str = "0.1";
