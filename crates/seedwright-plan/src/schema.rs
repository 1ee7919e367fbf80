use schemars::schema::RootSchema;
use schemars::schema_for;

use crate::document::PlanDocument;

/// Emit the JSON Schema for plan documents.
pub fn plan_json_schema() -> RootSchema {
    schema_for!(PlanDocument)
}
