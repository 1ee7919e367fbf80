use seedwright_core::{Cell, GeneratedValue, Model, Row};
use seedwright_plan::{Criteria, PredicateFn, StoreView};

/// Resolved form of a connect matcher; criteria callbacks are evaluated before lookup.
#[derive(Clone, Copy)]
pub enum Selector<'a> {
    Any,
    Criteria(&'a Criteria),
    Predicate(&'a PredicateFn),
}

impl Selector<'_> {
    fn matches(&self, target: &Model, row: &Row) -> bool {
        match self {
            Selector::Any => true,
            Selector::Criteria(criteria) => criteria.iter().all(|(name, expected)| {
                let column = target
                    .scalar_fields()
                    .find(|field| field.name == *name)
                    .map(|field| field.column_name.as_str())
                    .unwrap_or(name);
                matches!(row.get(column), Some(Cell::Value(actual)) if actual.key() == expected.key())
            }),
            Selector::Predicate(predicate) => predicate(row),
        }
    }
}

/// Rows of `target` the selector accepts whose `key_columns` hold concrete values.
///
/// Rows generated in this run come first, then pre-existing rows.
pub fn candidates<'s>(
    store: &'s dyn StoreView,
    target: &Model,
    selector: Selector<'_>,
    key_columns: &[String],
) -> Vec<&'s Row> {
    store
        .rows(&target.id)
        .iter()
        .chain(store.existing_rows(&target.id))
        .filter(|row| {
            key_columns.iter().all(|column| {
                matches!(row.get(column), Some(Cell::Value(value)) if !value.is_null())
            })
        })
        .filter(|row| selector.matches(target, row))
        .collect()
}

/// Key tuples of every candidate, in candidate order, one value per `key_columns` entry.
///
/// An empty pool and a pool with no match both yield an empty list.
pub fn key_choices(
    store: &dyn StoreView,
    target: &Model,
    selector: Selector<'_>,
    key_columns: &[String],
) -> Vec<Vec<GeneratedValue>> {
    candidates(store, target, selector, key_columns)
        .into_iter()
        .filter_map(|row| {
            key_columns
                .iter()
                .map(|column| row.get(column).and_then(Cell::value).cloned())
                .collect::<Option<Vec<_>>>()
        })
        .collect()
}
