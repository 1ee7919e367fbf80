//! Generation plans for Seedwright: the record tree, per-field overrides, and plan validation.

pub mod context;
pub mod document;
pub mod errors;
pub mod fingerprint;
pub mod record;
pub mod schema;
pub mod user_models;
pub mod validate;

pub use context::{FieldContext, StoreView};
pub use document::{DEFAULT_MARKER, PlanDocument, PlanDocumentEntry};
pub use errors::{
    CallbackError, IssueSeverity, PlanError, Result, ValidationIssue, ValidationReport,
};
pub use fingerprint::{CountConfig, FieldOptions, Fingerprint, FingerprintField};
pub use record::{
    CallbackFn, CallbackFuture, ChildSpec, ConnectMatcher, ConnectSpec, CountFn, CountSpec,
    Criteria, CriteriaFn, FieldSpec, ModelRecord, NestedSpec, Plan, PlanEntry, PredicateFn,
    RecordTemplate, ScalarFn, ScalarSpec, TemplateFn,
};
pub use schema::plan_json_schema;
pub use user_models::{UserModel, UserModels};
pub use validate::{ValidatedPlan, load_plan, validate_config, validate_plan, validate_plan_json};
