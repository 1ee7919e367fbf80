//! Run facade: owns the run state and exposes `generate()` and SQL rendering.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};
use tracing::{info, warn};

use seedwright_core::{Cell, DataModel, Dialect, GeneratedValue, Row, validate_data_model};
use seedwright_plan::{Fingerprint, Plan, UserModels, validate_config, validate_plan};

use crate::context::{CancelHandle, RunContext};
use crate::errors::{GenerationError, Result};
use crate::model::{GenerateOptions, GenerationReport};
use crate::resolver::Resolver;
use crate::store::{Store, sql};
use crate::values::{ModelProfile, build_profiles};

/// One generation run over a data model.
///
/// Successive [`Seeder::generate`] calls share uniqueness tracking, sequence counters and
/// the pool of rows that `connect` can pick from. A failed or cancelled call leaves the run
/// exactly as it was before the call.
#[derive(Debug)]
pub struct Seeder {
    data_model: DataModel,
    options: GenerateOptions,
    fingerprint: Fingerprint,
    user_models: UserModels,
    profiles: BTreeMap<String, ModelProfile>,
    ctx: RunContext,
    store: Store,
    report: GenerationReport,
}

impl Seeder {
    pub fn new(data_model: DataModel, options: GenerateOptions) -> Result<Self> {
        validate_data_model(&data_model)?;
        let digest = data_model_digest(&data_model)?;
        let fingerprint = Fingerprint::default();
        let profiles = build_profiles(&data_model, &fingerprint);

        let mut ctx = RunContext::new(options.seed.clone());
        for (id, model) in &data_model.models {
            ctx.constraints.register(id, model.unique_keys());
        }

        info!(
            run_seed = %options.seed,
            models = data_model.models.len(),
            dialect = data_model.dialect.as_str(),
            "seeder created"
        );

        Ok(Self {
            report: GenerationReport::new(options.seed.clone(), digest),
            data_model,
            options,
            fingerprint,
            user_models: UserModels::default(),
            profiles,
            ctx,
            store: Store::new(),
        })
    }

    pub fn with_fingerprint(mut self, fingerprint: Fingerprint) -> Result<Self> {
        self.check_config(&fingerprint, &self.user_models)?;
        self.profiles = build_profiles(&self.data_model, &fingerprint);
        self.fingerprint = fingerprint;
        Ok(self)
    }

    pub fn with_user_models(mut self, user_models: UserModels) -> Result<Self> {
        self.check_config(&self.fingerprint, &user_models)?;
        self.user_models = user_models;
        Ok(self)
    }

    fn check_config(&self, fingerprint: &Fingerprint, user_models: &UserModels) -> Result<()> {
        let report = validate_config(fingerprint, user_models, &self.data_model);
        for issue in &report.warnings {
            warn!(code = %issue.code, path = %issue.path, "{}", issue.message);
        }
        if report.is_ok() {
            Ok(())
        } else {
            Err(GenerationError::InvalidPlan(report.render_errors()))
        }
    }

    pub fn data_model(&self) -> &DataModel {
        &self.data_model
    }

    pub fn options(&self) -> &GenerateOptions {
        &self.options
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.ctx.cancel.clone()
    }

    /// Every row produced by this run so far.
    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn report(&self) -> &GenerationReport {
        &self.report
    }

    /// Register rows already present in the database.
    ///
    /// They become connect candidates, their unique values are reserved, and sequences skip
    /// their ids. They are never serialized.
    pub fn add_existing(&mut self, model_id: &str, rows: Vec<Row>) -> Result<()> {
        let model = self.data_model.model(model_id).ok_or_else(|| {
            GenerationError::InvalidPlan(format!("model '{model_id}' not found"))
        })?;

        for key in model.unique_keys() {
            let tuples: Vec<Vec<GeneratedValue>> = rows
                .iter()
                .filter_map(|row| {
                    key.columns
                        .iter()
                        .map(|column| row.get(column).and_then(Cell::value).cloned())
                        .collect::<Option<Vec<_>>>()
                })
                .collect();
            self.ctx.constraints.seed(model_id, &key.columns, tuples);
        }

        for field in model.scalar_fields() {
            let Some(sequence) = field.sequence() else {
                continue;
            };
            for row in &rows {
                if let Some(value) = row
                    .get(&field.column_name)
                    .and_then(Cell::value)
                    .and_then(GeneratedValue::as_i64)
                {
                    self.ctx.sequences.observe(sequence, value);
                }
            }
        }

        info!(model = %model_id, rows = rows.len(), "existing rows registered");
        self.store.add_existing(model_id, rows);
        Ok(())
    }

    /// Resolve `plan` and return the rows it produced.
    ///
    /// The rows also join the run store, so later calls can connect to them. Callbacks in
    /// the plan are awaited one at a time, in the order the walk reaches them.
    pub async fn generate(&mut self, plan: &Plan) -> Result<Store> {
        let validation = validate_plan(plan, &self.data_model);
        for issue in &validation.warnings {
            warn!(code = %issue.code, path = %issue.path, "{}", issue.message);
        }
        if !validation.is_ok() {
            return Err(GenerationError::InvalidPlan(validation.render_errors()));
        }

        let checkpoint = self.store.lengths();
        let mut ctx = self.ctx.clone();
        let mut store = self.store.clone();
        let mut report = self.report.clone();
        report.generate_calls += 1;

        info!(
            run_seed = %self.options.seed,
            plans = plan.entries.len(),
            call = report.generate_calls,
            "generation started"
        );

        let outcome = {
            let mut resolver = Resolver::new(
                &self.data_model,
                &self.profiles,
                &self.fingerprint,
                &self.user_models,
                &self.options,
                &mut ctx,
                &mut store,
                &mut report,
            );
            let mut outcome = Ok(());
            for entry in &plan.entries {
                outcome = resolver.resolve_entry(entry).await;
                if outcome.is_err() {
                    break;
                }
            }
            outcome
        };

        match outcome {
            Ok(()) => {
                let produced = store.split_since(&checkpoint);
                info!(
                    rows = produced.len(),
                    rows_total = report.rows_total,
                    unique_retries = report.unique_retries_total,
                    "generation completed"
                );
                self.ctx = ctx;
                self.store = store;
                self.report = report;
                Ok(produced)
            }
            Err(err) => {
                warn!(error = %err, "generation failed");
                Err(err)
            }
        }
    }

    /// SQL for `store` in this run's dialect.
    pub fn to_sql(&self, store: &Store) -> Result<Vec<String>> {
        store.to_sql(&self.data_model)
    }

    /// `setval` statements moving Postgres sequences past the ids this run handed out.
    /// Other dialects need none.
    pub fn sequence_sync_statements(&self) -> Vec<String> {
        if self.data_model.dialect != Dialect::Postgres {
            return Vec::new();
        }
        self.ctx
            .sequences
            .last_values()
            .map(|(identifier, last)| sql::setval_statement(identifier, last))
            .collect()
    }
}

fn data_model_digest(data_model: &DataModel) -> Result<String> {
    let bytes = serde_json::to_vec(data_model)
        .map_err(|err| GenerationError::InvalidDataModel(err.to_string()))?;
    Ok(hex::encode(Sha256::digest(bytes)))
}
