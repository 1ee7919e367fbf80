//! Plan resolution: turns a [`ModelRecord`] tree into stored rows.
//!
//! Records are resolved depth first. For each record the resolver fills parent fields
//! (nested, connected, or generated), then scalar columns, then reserves the record's
//! unique keys, stores the row, and finally fans out into child fields with the new row's
//! key injected into every child.
//!
//! Every generated value is keyed by a path:
//!
//! - top-level record: `{seed}/{model}/{index}`
//! - field: `{record}/{field}`
//! - child record: `{record}/{field}/{i}`
//! - nested or fallback parent: `{record}/{field}`
//! - unique retry: `{field path}/{attempt}`
//!
//! User callbacks return futures; the walk awaits each one before moving on, so siblings
//! resolve one after another in index order and the output does not depend on how long a
//! callback takes.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use seedwright_core::{
    Cell, DataModel, GeneratedValue, Model, ObjectField, Relation, Row, SequenceInfo,
};
use seedwright_plan::{
    CallbackError, ChildSpec, ConnectMatcher, ConnectSpec, CountSpec, FieldContext, FieldSpec,
    Fingerprint, ModelRecord, PlanEntry, RecordTemplate, ScalarSpec, UserModels,
};

use crate::connect::{self, Selector};
use crate::context::RunContext;
use crate::errors::{GenerationError, Result};
use crate::model::{GenerateOptions, GenerationReport};
use crate::store::Store;
use crate::values::{self, ColumnProfile, ModelProfile, int_in_range, pick_index};

const MAX_DEPTH: usize = 64;

/// How a column can be produced again after a unique collision.
enum Source<'p> {
    Sequence(&'p SequenceInfo),
    Generated {
        profile: &'p ColumnProfile,
        path: String,
    },
    /// Connected FK: the free candidate keys, re-picked with the attempt appended to `path`.
    Connect {
        columns: &'p [String],
        choices: Arc<Vec<Vec<GeneratedValue>>>,
        path: String,
    },
}

pub(crate) struct Resolver<'a> {
    data_model: &'a DataModel,
    profiles: &'a BTreeMap<String, ModelProfile>,
    fingerprint: &'a Fingerprint,
    user_models: &'a UserModels,
    options: &'a GenerateOptions,
    ctx: &'a mut RunContext,
    store: &'a mut Store,
    report: &'a mut GenerationReport,
    /// Models being generated as fallback parents, outermost first.
    fallback_chain: Vec<String>,
}

impl<'a> Resolver<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        data_model: &'a DataModel,
        profiles: &'a BTreeMap<String, ModelProfile>,
        fingerprint: &'a Fingerprint,
        user_models: &'a UserModels,
        options: &'a GenerateOptions,
        ctx: &'a mut RunContext,
        store: &'a mut Store,
        report: &'a mut GenerationReport,
    ) -> Self {
        Self {
            data_model,
            profiles,
            fingerprint,
            user_models,
            options,
            ctx,
            store,
            report,
            fallback_chain: Vec::new(),
        }
    }

    /// Resolve every record a top-level entry asks for.
    pub async fn resolve_entry(&mut self, entry: &PlanEntry) -> Result<()> {
        let model = self.model(&entry.model)?;
        let entry_path = format!("{}/{}", self.ctx.seed, model.id);
        let empty = Row::new();
        let count = match &entry.records {
            ChildSpec::Records(records) => records.len(),
            ChildSpec::Repeat { count: None, .. } => 1,
            ChildSpec::Repeat {
                count: Some(count),
                ..
            } => self.count(count, &entry_path, 0, &empty).await?,
        };

        let indices = self.ctx.claim_indices(&model.id, count);
        for (position, index) in indices.enumerate() {
            let path = self.ctx.record_path(&model.id, index);
            let record = self
                .record_at(&entry.records, position, index, &path, &empty)
                .await?;
            Box::pin(self.resolve_record(&model.id, &record, &path, index, Row::new())).await?;
        }

        info!(model = %model.id, rows = count, "model resolved");
        Ok(())
    }

    fn model(&self, id: &str) -> Result<&'a Model> {
        self.data_model
            .model(id)
            .ok_or_else(|| GenerationError::InvalidPlan(format!("model '{id}' not found")))
    }

    fn profile(&self, id: &str) -> Result<&'a ModelProfile> {
        self.profiles
            .get(id)
            .ok_or_else(|| GenerationError::InvalidPlan(format!("model '{id}' not found")))
    }

    /// Record at `position` of a set, building it from the template when repeated.
    async fn record_at(
        &self,
        spec: &ChildSpec,
        position: usize,
        index: usize,
        path: &str,
        data: &Row,
    ) -> Result<ModelRecord> {
        match spec {
            ChildSpec::Records(records) => Ok(records.get(position).cloned().unwrap_or_default()),
            ChildSpec::Repeat { template, .. } => match template {
                RecordTemplate::Static(record) => Ok(record.clone()),
                RecordTemplate::Callback(build) => {
                    let context = FieldContext {
                        index,
                        seed: path,
                        store: &*self.store,
                        data,
                    };
                    let pending = build(&context);
                    pending.await.map_err(|err| callback_error(path, err))
                }
            },
        }
    }

    async fn count(&self, spec: &CountSpec, path: &str, index: usize, data: &Row) -> Result<usize> {
        match spec {
            CountSpec::Fixed(count) => Ok(*count),
            CountSpec::Range { min, max } => {
                Ok(int_in_range(path, *min as i64, *max as i64).max(0) as usize)
            }
            CountSpec::Callback(count) => {
                let context = FieldContext {
                    index,
                    seed: path,
                    store: &*self.store,
                    data,
                };
                let pending = count(&context);
                pending.await.map_err(|err| callback_error(path, err))
            }
        }
    }

    /// Resolve one record of `model_id` and every record below it. Returns the stored row.
    async fn resolve_record(
        &mut self,
        model_id: &str,
        record: &ModelRecord,
        path: &str,
        index: usize,
        injected: Row,
    ) -> Result<Row> {
        if self.ctx.cancel.is_cancelled() {
            return Err(GenerationError::Cancelled);
        }
        if path.split('/').count() > MAX_DEPTH {
            return Err(GenerationError::InvalidPlan(format!(
                "record nesting exceeds {MAX_DEPTH} levels at {path}"
            )));
        }

        let model = self.model(model_id)?;
        let profile = self.profile(model_id)?;
        let groups = model.groups();
        let mut row = injected;
        let mut sources: BTreeMap<String, Source<'a>> = BTreeMap::new();

        for field in &groups.parents {
            self.resolve_parent(model, field, record, path, index, &mut row, &mut sources)
                .await?;
        }

        for column in &profile.columns {
            self.resolve_scalar(model, profile, column, record, path, index, &mut row, &mut sources)
                .await?;
        }

        self.reserve_unique(model, &mut row, &sources)?;

        self.store.add(model_id, row.clone());
        self.report.record_row(model_id);

        // The row is stored, so fallback parents generated below it cannot form a cycle with
        // the ones still pending above it.
        let pending = std::mem::take(&mut self.fallback_chain);
        let mut outcome = Ok(());
        for field in &groups.children {
            outcome = self
                .resolve_children(model, field, record, path, index, &row)
                .await;
            if outcome.is_err() {
                break;
            }
        }
        self.fallback_chain = pending;
        outcome?;

        Ok(row)
    }

    #[allow(clippy::too_many_arguments)]
    async fn resolve_scalar(
        &mut self,
        model: &Model,
        profile: &'a ModelProfile,
        column: &'a ColumnProfile,
        record: &ModelRecord,
        path: &str,
        index: usize,
        row: &mut Row,
        sources: &mut BTreeMap<String, Source<'a>>,
    ) -> Result<()> {
        let field = &column.field;
        if row.contains_key(&field.column_name) {
            return Ok(());
        }
        let field_path = format!("{path}/{}", field.name);

        let cell = match record.get(&field.name) {
            Some(FieldSpec::Scalar(ScalarSpec::Value(value))) => Cell::Value(value.clone()),
            Some(FieldSpec::Scalar(ScalarSpec::Default)) => {
                self.report.record_default(&model.id);
                Cell::Default
            }
            Some(FieldSpec::Scalar(ScalarSpec::Callback(produce))) => {
                let context = FieldContext {
                    index,
                    seed: &field_path,
                    store: &*self.store,
                    data: row,
                };
                let pending = produce(&context);
                Cell::Value(pending.await.map_err(|err| callback_error(&field_path, err))?)
            }
            Some(other) => {
                return Err(GenerationError::InvalidPlan(format!(
                    "{}.{} is a column but the plan gives a {} instruction",
                    model.id,
                    field.name,
                    other.kind()
                )));
            }
            None => self.default_scalar(model, profile, column, &field_path, sources)?,
        };

        row.insert(field.column_name.clone(), cell);
        Ok(())
    }

    /// Value for a column the plan leaves out.
    fn default_scalar(
        &mut self,
        model: &Model,
        profile: &ModelProfile,
        column: &'a ColumnProfile,
        field_path: &str,
        sources: &mut BTreeMap<String, Source<'a>>,
    ) -> Result<Cell> {
        let field = &column.field;
        if let Some(value) = self.user_models.default_value(&model.id, &field.name) {
            let value = GeneratedValue::from_json(value, &column.kind).map_err(|message| {
                GenerationError::InvalidPlan(format!(
                    "user model default for {}.{}: {message}",
                    model.id, field.name
                ))
            })?;
            return Ok(Cell::Value(value));
        }

        if let Some(sequence) = field.sequence() {
            let value = self.ctx.sequences.next(sequence);
            sources.insert(field.column_name.clone(), Source::Sequence(sequence));
            return Ok(Cell::Value(GeneratedValue::Int(value)));
        }

        let leave_to_database = field.is_generated
            || (!column.has_override()
                && field.has_default_value
                && !field.is_required
                && !profile.referenced.contains(&field.column_name));
        if leave_to_database {
            self.report.record_default(&model.id);
            return Ok(Cell::Default);
        }

        let value = values::generate(field_path, &model.id, column)?;
        sources.insert(
            field.column_name.clone(),
            Source::Generated {
                profile: column,
                path: field_path.to_string(),
            },
        );
        Ok(Cell::Value(value))
    }

    /// Reserve the row's unique keys, regenerating colliding columns until they fit.
    fn reserve_unique(
        &mut self,
        model: &Model,
        row: &mut Row,
        sources: &BTreeMap<String, Source<'a>>,
    ) -> Result<()> {
        let columns: Vec<String> = row.keys().cloned().collect();
        let mut attempt = 0_u32;
        loop {
            if self.ctx.constraints.reserve(&model.id, &columns, row) {
                return Ok(());
            }
            attempt += 1;
            self.report.record_retry(&model.id);

            let key = self
                .ctx
                .constraints
                .colliding_key(&model.id, row)
                .cloned()
                .ok_or_else(|| GenerationError::UniqueConstraintExhausted {
                    model: model.id.clone(),
                    fields: columns.clone(),
                    attempts: attempt,
                })?;
            debug!(
                model = %model.id,
                constraint = %key.name,
                fields = ?key.columns,
                attempt,
                "unique collision"
            );

            let exhausted = || GenerationError::UniqueConstraintExhausted {
                model: model.id.clone(),
                fields: key.columns.clone(),
                attempts: attempt,
            };
            if attempt >= self.options.max_unique_attempts {
                return Err(exhausted());
            }
            let regenerable: Vec<&String> = key
                .columns
                .iter()
                .filter(|column| sources.contains_key(*column))
                .collect();
            if regenerable.is_empty() {
                return Err(exhausted());
            }

            for column in regenerable {
                let value = match &sources[column] {
                    Source::Sequence(sequence) => {
                        GeneratedValue::Int(self.ctx.sequences.next(sequence))
                    }
                    Source::Generated { profile, path } => {
                        let retry_path = format!("{path}/{attempt}");
                        let value = values::generate(&retry_path, &model.id, profile)?;
                        values::disambiguate(profile, value, attempt)
                    }
                    Source::Connect {
                        columns: fk_columns,
                        choices,
                        path,
                    } => {
                        let retry_path = format!("{path}/{attempt}");
                        let choice = &choices[pick_index(&retry_path, choices.len())];
                        assign_key(fk_columns, choice, row);
                        continue;
                    }
                };
                row.insert(column.clone(), Cell::Value(value));
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn resolve_parent(
        &mut self,
        model: &Model,
        field: &ObjectField,
        record: &ModelRecord,
        path: &str,
        index: usize,
        row: &mut Row,
        sources: &mut BTreeMap<String, Source<'a>>,
    ) -> Result<()> {
        let data_model = self.data_model;
        let relation = data_model
            .parent_relation(&model.id, &field.name)
            .ok_or_else(|| missing_relation(model, field))?;
        if relation
            .from_columns
            .iter()
            .all(|column| row.contains_key(column))
        {
            return Ok(());
        }
        let target = self.model(relation.target)?;
        let field_path = format!("{path}/{}", field.name);

        match record.get(&field.name) {
            Some(FieldSpec::Nested(parent)) => {
                let parent_row =
                    Box::pin(self.resolve_record(&target.id, parent, &field_path, 0, Row::new()))
                        .await?;
                copy_key(&relation, &parent_row, row)
            }
            Some(FieldSpec::Connect(spec)) => {
                self.resolve_connect(model, field, &relation, spec, &field_path, index, row, sources)
                    .await
            }
            Some(other) => Err(GenerationError::InvalidPlan(format!(
                "{}.{} is a parent relation but the plan gives a {} instruction",
                model.id,
                field.name,
                other.kind()
            ))),
            None if self.fk_set_by_user(model, &relation, record) => Ok(()),
            None => {
                if self.user_models.connects(relation.target) {
                    let spec = ConnectSpec::any();
                    return self
                        .resolve_connect(model, field, &relation, &spec, &field_path, index, row, sources)
                        .await;
                }
                if relation.nullable {
                    null_key(&relation, row);
                    return Ok(());
                }
                self.generate_parent(model, field, &relation, &field_path, row)
                    .await
            }
        }
    }

    /// True when the record (or the model's configured defaults) sets every FK column itself.
    fn fk_set_by_user(&self, model: &Model, relation: &Relation<'_>, record: &ModelRecord) -> bool {
        relation.from_columns.iter().all(|column| {
            model.scalar_by_column(column).is_some_and(|scalar| {
                record.get(&scalar.name).is_some()
                    || self
                        .user_models
                        .default_value(&model.id, &scalar.name)
                        .is_some()
            })
        })
    }

    /// Point the FK at an existing row, skipping rows whose key would break a unique key
    /// made of the FK columns alone. The other candidates stay available to `reserve_unique`.
    #[allow(clippy::too_many_arguments)]
    async fn resolve_connect(
        &mut self,
        model: &Model,
        field: &ObjectField,
        relation: &Relation<'a>,
        spec: &ConnectSpec,
        field_path: &str,
        index: usize,
        row: &mut Row,
        sources: &mut BTreeMap<String, Source<'a>>,
    ) -> Result<()> {
        let target = self.model(relation.target)?;
        let computed;
        let selector = match &spec.matcher {
            ConnectMatcher::Any => Selector::Any,
            ConnectMatcher::Criteria(criteria) => Selector::Criteria(criteria),
            ConnectMatcher::Predicate(predicate) => Selector::Predicate(predicate),
            ConnectMatcher::Callback(criteria) => {
                let context = FieldContext {
                    index,
                    seed: field_path,
                    store: &*self.store,
                    data: row,
                };
                let pending = criteria(&context);
                computed = pending
                    .await
                    .map_err(|err| callback_error(field_path, err))?;
                Selector::Criteria(&computed)
            }
        };

        let choices: Vec<Vec<GeneratedValue>> =
            connect::key_choices(&*self.store, target, selector, relation.to_columns)
                .into_iter()
                .filter(|choice| {
                    !self
                        .ctx
                        .constraints
                        .taken_within(&model.id, relation.from_columns, choice)
                })
                .collect();

        if !choices.is_empty() {
            let first = &choices[pick_index(field_path, choices.len())];
            assign_key(relation.from_columns, first, row);
            self.report.record_connect(&model.id);
            if choices.len() > 1 {
                let choices = Arc::new(choices);
                for column in relation.from_columns {
                    sources.insert(
                        column.clone(),
                        Source::Connect {
                            columns: relation.from_columns,
                            choices: Arc::clone(&choices),
                            path: field_path.to_string(),
                        },
                    );
                }
            }
            return Ok(());
        }

        if relation.nullable {
            null_key(relation, row);
            Ok(())
        } else if spec.fallback {
            self.generate_parent(model, field, relation, field_path, row)
                .await
        } else {
            Err(GenerationError::RequiredConnectUnmatched {
                model: model.id.clone(),
                field: field.name.clone(),
            })
        }
    }

    async fn generate_parent(
        &mut self,
        model: &Model,
        field: &ObjectField,
        relation: &Relation<'_>,
        field_path: &str,
        row: &mut Row,
    ) -> Result<()> {
        let target = relation.target.to_string();
        if let Some(start) = self.fallback_chain.iter().position(|item| *item == target) {
            return Err(GenerationError::UnbreakableCycle {
                models: self.fallback_chain[start..].to_vec(),
            });
        }

        warn!(
            model = %model.id,
            field = %field.name,
            target = %target,
            path = %field_path,
            "generating fallback parent"
        );
        self.report.record_fallback_parent(&model.id);

        self.fallback_chain.push(target.clone());
        let parent_row = Box::pin(self.resolve_record(
            &target,
            &ModelRecord::default(),
            field_path,
            0,
            Row::new(),
        ))
        .await;
        self.fallback_chain.pop();
        copy_key(relation, &parent_row?, row)
    }

    async fn resolve_children(
        &mut self,
        model: &Model,
        field: &ObjectField,
        record: &ModelRecord,
        path: &str,
        index: usize,
        row: &Row,
    ) -> Result<()> {
        let data_model = self.data_model;
        let relation = data_model
            .child_relation(&model.id, &field.name)
            .ok_or_else(|| missing_relation(model, field))?;
        let field_path = format!("{path}/{}", field.name);

        let spec = match record.get(&field.name) {
            Some(FieldSpec::Child(spec)) => spec.clone(),
            Some(other) => {
                return Err(GenerationError::InvalidPlan(format!(
                    "{}.{} is a child relation but the plan gives a {} instruction",
                    model.id,
                    field.name,
                    other.kind()
                )));
            }
            None => match self.fingerprint_count(&model.id, &field.name) {
                Some(count) => ChildSpec::Repeat {
                    count: Some(count),
                    template: RecordTemplate::default(),
                },
                None => return Ok(()),
            },
        };

        let count = match &spec {
            ChildSpec::Records(records) => records.len(),
            ChildSpec::Repeat {
                count: Some(count),
                ..
            } => self.count(count, &field_path, index, row).await?,
            ChildSpec::Repeat { count: None, .. } => {
                let count = self
                    .fingerprint_count(&model.id, &field.name)
                    .unwrap_or_else(|| self.options.default_child_count.into());
                self.count(&count, &field_path, index, row).await?
            }
        };

        let mut injected = Row::new();
        for (from, to) in relation.from_columns.iter().zip(relation.to_columns) {
            let value = key_value(row, to).ok_or_else(|| unreferenceable(&model.id, to))?;
            injected.insert(from.clone(), Cell::Value(value));
        }

        for position in 0..count {
            let child_path = format!("{field_path}/{position}");
            let child = self
                .record_at(&spec, position, position, &child_path, row)
                .await?;
            Box::pin(self.resolve_record(
                relation.owner,
                &child,
                &child_path,
                position,
                injected.clone(),
            ))
            .await?;
        }
        debug!(model = %model.id, field = %field.name, children = count, "children resolved");
        Ok(())
    }

    fn fingerprint_count(&self, model: &str, field: &str) -> Option<CountSpec> {
        self.fingerprint
            .field(model, field)
            .and_then(|entry| entry.count)
            .map(CountSpec::from)
    }
}

fn key_value(row: &Row, column: &str) -> Option<GeneratedValue> {
    match row.get(column) {
        Some(Cell::Value(value)) => Some(value.clone()),
        Some(Cell::Default) | None => None,
    }
}

fn copy_key(relation: &Relation<'_>, parent: &Row, row: &mut Row) -> Result<()> {
    for (from, to) in relation.from_columns.iter().zip(relation.to_columns) {
        let value = key_value(parent, to).ok_or_else(|| unreferenceable(relation.target, to))?;
        row.insert(from.clone(), Cell::Value(value));
    }
    Ok(())
}

fn assign_key(columns: &[String], values: &[GeneratedValue], row: &mut Row) {
    for (column, value) in columns.iter().zip(values) {
        row.insert(column.clone(), Cell::Value(value.clone()));
    }
}

fn null_key(relation: &Relation<'_>, row: &mut Row) {
    for column in relation.from_columns {
        row.entry(column.clone())
            .or_insert(Cell::Value(GeneratedValue::Null));
    }
}

fn unreferenceable(model: &str, column: &str) -> GenerationError {
    GenerationError::InvalidPlan(format!(
        "{model}.{column} is referenced by a foreign key but left to the database default"
    ))
}

fn missing_relation(model: &Model, field: &ObjectField) -> GenerationError {
    GenerationError::InvalidDataModel(format!(
        "relation '{}' of {}.{} has no parent side",
        field.relation_name, model.id, field.name
    ))
}

fn callback_error(path: &str, err: CallbackError) -> GenerationError {
    GenerationError::Callback {
        path: path.to_string(),
        message: err.0,
    }
}
