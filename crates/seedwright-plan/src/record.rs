//! Generation tree built from user input.
//!
//! A [`ModelRecord`] maps field names to a [`FieldSpec`]. The variant is fixed when the
//! record is built, so the resolver never has to guess at the shape of user input.

use std::collections::BTreeMap;
use std::fmt;
use std::future::{Future, ready};
use std::pin::Pin;
use std::sync::Arc;

use seedwright_core::{GeneratedValue, Row};

use crate::context::FieldContext;
use crate::errors::CallbackError;
use crate::fingerprint::CountConfig;

/// Pending callback result. It owns whatever it needs, so the resolver can await it after
/// the [`FieldContext`] it was built from is gone.
pub type CallbackFuture<T> = Pin<Box<dyn Future<Output = Result<T, CallbackError>> + Send>>;

pub type CallbackFn<T> = Arc<dyn Fn(&FieldContext<'_>) -> CallbackFuture<T> + Send + Sync>;
pub type ScalarFn = CallbackFn<GeneratedValue>;
pub type CountFn = CallbackFn<usize>;
pub type CriteriaFn = CallbackFn<Criteria>;
pub type TemplateFn = CallbackFn<ModelRecord>;
pub type PredicateFn = Arc<dyn Fn(&Row) -> bool + Send + Sync>;

/// Wrap a synchronous callback so it resolves immediately.
fn immediate<T, F>(f: F) -> CallbackFn<T>
where
    T: Send + 'static,
    F: Fn(&FieldContext<'_>) -> Result<T, CallbackError> + Send + Sync + 'static,
{
    Arc::new(move |context: &FieldContext<'_>| -> CallbackFuture<T> {
        Box::pin(ready(f(context)))
    })
}

/// Wrap an asynchronous callback. `f` reads the context and returns an owned future.
fn deferred<T, F, Fut>(f: F) -> CallbackFn<T>
where
    T: Send + 'static,
    F: Fn(&FieldContext<'_>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, CallbackError>> + Send + 'static,
{
    Arc::new(move |context: &FieldContext<'_>| -> CallbackFuture<T> { Box::pin(f(context)) })
}

/// Column name to expected value.
pub type Criteria = BTreeMap<String, GeneratedValue>;

/// Instruction for a single field.
#[derive(Clone, Debug)]
pub enum FieldSpec {
    Scalar(ScalarSpec),
    Connect(ConnectSpec),
    Nested(NestedSpec),
    Child(ChildSpec),
}

impl FieldSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            FieldSpec::Scalar(_) => "scalar",
            FieldSpec::Connect(_) => "connect",
            FieldSpec::Nested(_) => "nested",
            FieldSpec::Child(_) => "child",
        }
    }
}

#[derive(Clone)]
pub enum ScalarSpec {
    Value(GeneratedValue),
    /// Leave the column to the database default.
    Default,
    Callback(ScalarFn),
}

impl fmt::Debug for ScalarSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarSpec::Value(value) => f.debug_tuple("Value").field(value).finish(),
            ScalarSpec::Default => f.write_str("Default"),
            ScalarSpec::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

/// How candidate parent rows are selected.
#[derive(Clone)]
pub enum ConnectMatcher {
    /// Any row of the target model.
    Any,
    Criteria(Criteria),
    /// Criteria computed from the record resolved so far.
    Callback(CriteriaFn),
    Predicate(PredicateFn),
}

impl fmt::Debug for ConnectMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectMatcher::Any => f.write_str("Any"),
            ConnectMatcher::Criteria(criteria) => f.debug_tuple("Criteria").field(criteria).finish(),
            ConnectMatcher::Callback(_) => f.write_str("Callback(..)"),
            ConnectMatcher::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Bind a parent field to an already generated or pre-existing row.
#[derive(Clone, Debug)]
pub struct ConnectSpec {
    pub matcher: ConnectMatcher,
    /// Generate a parent when nothing matches. When false, a required field with no match fails.
    pub fallback: bool,
}

impl ConnectSpec {
    pub fn any() -> Self {
        Self {
            matcher: ConnectMatcher::Any,
            fallback: true,
        }
    }

    pub fn criteria<I, K, V>(criteria: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<GeneratedValue>,
    {
        Self {
            matcher: ConnectMatcher::Criteria(
                criteria
                    .into_iter()
                    .map(|(key, value)| (key.into(), value.into()))
                    .collect(),
            ),
            fallback: true,
        }
    }

    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(&FieldContext<'_>) -> Result<Criteria, CallbackError> + Send + Sync + 'static,
    {
        Self {
            matcher: ConnectMatcher::Callback(immediate(f)),
            fallback: true,
        }
    }

    /// Criteria from an awaited source, such as a lookup against another service.
    pub fn callback_async<F, Fut>(f: F) -> Self
    where
        F: Fn(&FieldContext<'_>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Criteria, CallbackError>> + Send + 'static,
    {
        Self {
            matcher: ConnectMatcher::Callback(deferred(f)),
            fallback: true,
        }
    }

    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&Row) -> bool + Send + Sync + 'static,
    {
        Self {
            matcher: ConnectMatcher::Predicate(Arc::new(f)),
            fallback: true,
        }
    }

    pub fn without_fallback(mut self) -> Self {
        self.fallback = false;
        self
    }
}

/// Parent record resolved before the record that references it.
pub type NestedSpec = Box<ModelRecord>;

/// Number of records to produce.
#[derive(Clone)]
pub enum CountSpec {
    Fixed(usize),
    /// Inclusive range; the value generator picks the count.
    Range { min: usize, max: usize },
    Callback(CountFn),
}

impl fmt::Debug for CountSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CountSpec::Fixed(value) => f.debug_tuple("Fixed").field(value).finish(),
            CountSpec::Range { min, max } => f
                .debug_struct("Range")
                .field("min", min)
                .field("max", max)
                .finish(),
            CountSpec::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

impl From<CountConfig> for CountSpec {
    fn from(value: CountConfig) -> Self {
        match value {
            CountConfig::Fixed(count) => CountSpec::Fixed(count),
            CountConfig::Range { min, max } => CountSpec::Range { min, max },
        }
    }
}

impl From<usize> for CountSpec {
    fn from(value: usize) -> Self {
        CountSpec::Fixed(value)
    }
}

/// Shape of each record in a repeated set.
#[derive(Clone)]
pub enum RecordTemplate {
    Static(ModelRecord),
    Callback(TemplateFn),
}

impl Default for RecordTemplate {
    fn default() -> Self {
        RecordTemplate::Static(ModelRecord::default())
    }
}

impl fmt::Debug for RecordTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordTemplate::Static(record) => f.debug_tuple("Static").field(record).finish(),
            RecordTemplate::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

/// A set of records: either listed explicitly or repeated from a template.
#[derive(Clone, Debug)]
pub enum ChildSpec {
    Records(Vec<ModelRecord>),
    Repeat {
        /// `None` defers to the fingerprint count, then to the run default.
        count: Option<CountSpec>,
        template: RecordTemplate,
    },
}

impl Default for ChildSpec {
    fn default() -> Self {
        ChildSpec::Repeat {
            count: None,
            template: RecordTemplate::default(),
        }
    }
}

impl ChildSpec {
    pub fn count(count: usize) -> Self {
        ChildSpec::Repeat {
            count: Some(CountSpec::Fixed(count)),
            template: RecordTemplate::default(),
        }
    }

    pub fn range(min: usize, max: usize) -> Self {
        ChildSpec::Repeat {
            count: Some(CountSpec::Range { min, max }),
            template: RecordTemplate::default(),
        }
    }

    pub fn count_with<F>(f: F) -> Self
    where
        F: Fn(&FieldContext<'_>) -> Result<usize, CallbackError> + Send + Sync + 'static,
    {
        ChildSpec::Repeat {
            count: Some(CountSpec::Callback(immediate(f))),
            template: RecordTemplate::default(),
        }
    }

    pub fn count_async<F, Fut>(f: F) -> Self
    where
        F: Fn(&FieldContext<'_>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<usize, CallbackError>> + Send + 'static,
    {
        ChildSpec::Repeat {
            count: Some(CountSpec::Callback(deferred(f))),
            template: RecordTemplate::default(),
        }
    }

    pub fn records(records: Vec<ModelRecord>) -> Self {
        ChildSpec::Records(records)
    }

    /// Replace the template of a repeated set. Explicit record lists are left unchanged.
    pub fn each(self, record: ModelRecord) -> Self {
        self.with_template(RecordTemplate::Static(record))
    }

    pub fn each_with<F>(self, f: F) -> Self
    where
        F: Fn(&FieldContext<'_>) -> Result<ModelRecord, CallbackError> + Send + Sync + 'static,
    {
        self.with_template(RecordTemplate::Callback(immediate(f)))
    }

    pub fn each_async<F, Fut>(self, f: F) -> Self
    where
        F: Fn(&FieldContext<'_>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ModelRecord, CallbackError>> + Send + 'static,
    {
        self.with_template(RecordTemplate::Callback(deferred(f)))
    }

    fn with_template(self, template: RecordTemplate) -> Self {
        match self {
            ChildSpec::Repeat { count, .. } => ChildSpec::Repeat { count, template },
            records => records,
        }
    }
}

/// User-authored record: field name to instruction. Fields left out use engine defaults.
#[derive(Clone, Debug, Default)]
pub struct ModelRecord {
    pub fields: BTreeMap<String, FieldSpec>,
}

impl ModelRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields.insert(name.into(), spec);
        self
    }

    pub fn set(self, name: impl Into<String>, value: impl Into<GeneratedValue>) -> Self {
        self.field(name, FieldSpec::Scalar(ScalarSpec::Value(value.into())))
    }

    pub fn null(self, name: impl Into<String>) -> Self {
        self.field(name, FieldSpec::Scalar(ScalarSpec::Value(GeneratedValue::Null)))
    }

    pub fn default_value(self, name: impl Into<String>) -> Self {
        self.field(name, FieldSpec::Scalar(ScalarSpec::Default))
    }

    pub fn with<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&FieldContext<'_>) -> Result<GeneratedValue, CallbackError> + Send + Sync + 'static,
    {
        self.field(name, FieldSpec::Scalar(ScalarSpec::Callback(immediate(f))))
    }

    /// Column value from an awaited source. The future must own what it reads from the context.
    pub fn with_async<F, Fut>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&FieldContext<'_>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<GeneratedValue, CallbackError>> + Send + 'static,
    {
        self.field(name, FieldSpec::Scalar(ScalarSpec::Callback(deferred(f))))
    }

    pub fn parent(self, name: impl Into<String>, record: ModelRecord) -> Self {
        self.field(name, FieldSpec::Nested(Box::new(record)))
    }

    pub fn connect(self, name: impl Into<String>, spec: ConnectSpec) -> Self {
        self.field(name, FieldSpec::Connect(spec))
    }

    pub fn children(self, name: impl Into<String>, spec: ChildSpec) -> Self {
        self.field(name, FieldSpec::Child(spec))
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }
}

/// Top-level request for one model.
#[derive(Clone, Debug)]
pub struct PlanEntry {
    pub model: String,
    /// A repeat with no count produces a single record.
    pub records: ChildSpec,
}

/// Ordered list of top-level requests handed to one `generate()` call.
#[derive(Clone, Debug, Default)]
pub struct Plan {
    pub entries: Vec<PlanEntry>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model(mut self, model: impl Into<String>, records: ChildSpec) -> Self {
        self.entries.push(PlanEntry {
            model: model.into(),
            records,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
