use std::collections::{BTreeMap, HashSet};

use seedwright_core::{Cell, GeneratedValue, Row, UniqueKey};

/// Values already taken per (model, unique key) during a run.
///
/// Grows monotonically: values are never released, so uniqueness holds across every
/// `generate()` call of the run.
#[derive(Debug, Clone, Default)]
pub struct ConstraintTracker {
    keys: BTreeMap<String, Vec<UniqueKey>>,
    used: BTreeMap<String, BTreeMap<String, HashSet<String>>>,
}

impl ConstraintTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the unique keys of a model. Must be called before `reserve`.
    pub fn register(&mut self, model: &str, keys: Vec<UniqueKey>) {
        let used = self.used.entry(model.to_string()).or_default();
        for key in &keys {
            used.entry(key.field_key()).or_default();
        }
        self.keys.insert(model.to_string(), keys);
    }

    pub fn keys(&self, model: &str) -> &[UniqueKey] {
        self.keys.get(model).map(Vec::as_slice).unwrap_or_default()
    }

    /// Record the row's values for every unique key touching `fields`, unless one collides.
    ///
    /// Keys with an unresolved column are skipped, as are keys holding a NULL unless the
    /// constraint treats NULLs as equal.
    pub fn reserve(&mut self, model: &str, fields: &[String], row: &Row) -> bool {
        let Some(keys) = self.keys.get(model) else {
            return true;
        };

        let mut pending = Vec::new();
        for key in keys {
            if !key.columns.iter().any(|column| fields.contains(column)) {
                continue;
            }
            let Some(serialized) = serialize_key(key, row) else {
                continue;
            };
            let taken = self
                .used
                .get(model)
                .and_then(|used| used.get(&key.field_key()))
                .is_some_and(|values| values.contains(&serialized));
            if taken {
                return false;
            }
            pending.push((key.field_key(), serialized));
        }

        let used = self.used.entry(model.to_string()).or_default();
        for (field_key, serialized) in pending {
            used.entry(field_key).or_default().insert(serialized);
        }
        true
    }

    /// First unique key of `model` whose values in `row` are already taken.
    pub fn colliding_key(&self, model: &str, row: &Row) -> Option<&UniqueKey> {
        let used = self.used.get(model)?;
        self.keys(model).iter().find(|key| {
            serialize_key(key, row).is_some_and(|serialized| {
                used.get(&key.field_key())
                    .is_some_and(|values| values.contains(&serialized))
            })
        })
    }

    /// True when a unique key made only of `columns` already holds `values`.
    ///
    /// Keys reaching beyond `columns` are ignored; the caller cannot tell yet whether they
    /// collide.
    pub fn taken_within(&self, model: &str, columns: &[String], values: &[GeneratedValue]) -> bool {
        let Some(used) = self.used.get(model) else {
            return false;
        };
        let row: Row = columns
            .iter()
            .cloned()
            .zip(values.iter().cloned().map(Cell::Value))
            .collect();
        self.keys(model)
            .iter()
            .filter(|key| key.columns.iter().all(|column| columns.contains(column)))
            .any(|key| {
                serialize_key(key, &row).is_some_and(|serialized| {
                    used.get(&key.field_key())
                        .is_some_and(|taken| taken.contains(&serialized))
                })
            })
    }

    /// Preload values that already exist for `columns`, so new rows cannot collide with them.
    pub fn seed<I>(&mut self, model: &str, columns: &[String], existing: I)
    where
        I: IntoIterator<Item = Vec<GeneratedValue>>,
    {
        let field_key = columns.join("|");
        let null_not_distinct = self
            .keys(model)
            .iter()
            .find(|key| key.columns == columns)
            .is_some_and(|key| key.null_not_distinct);
        let values = self
            .used
            .entry(model.to_string())
            .or_default()
            .entry(field_key)
            .or_default();
        for tuple in existing {
            if !null_not_distinct && tuple.iter().any(GeneratedValue::is_null) {
                continue;
            }
            values.insert(join_values(tuple.iter()));
        }
    }

    pub fn used_count(&self, model: &str, columns: &[String]) -> usize {
        self.used
            .get(model)
            .and_then(|used| used.get(&columns.join("|")))
            .map(HashSet::len)
            .unwrap_or(0)
    }
}

fn serialize_key(key: &UniqueKey, row: &Row) -> Option<String> {
    let mut values = Vec::with_capacity(key.columns.len());
    for column in &key.columns {
        match row.get(column) {
            Some(Cell::Value(value)) => values.push(value),
            Some(Cell::Default) | None => return None,
        }
    }
    if !key.null_not_distinct && values.iter().any(|value| value.is_null()) {
        return None;
    }
    Some(join_values(values.into_iter()))
}

fn join_values<'a>(values: impl Iterator<Item = &'a GeneratedValue>) -> String {
    values
        .map(GeneratedValue::key)
        .collect::<Vec<_>>()
        .join("\u{1f}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str, columns: &[&str], null_not_distinct: bool) -> UniqueKey {
        UniqueKey {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            null_not_distinct,
        }
    }

    fn row(pairs: &[(&str, GeneratedValue)]) -> Row {
        pairs
            .iter()
            .map(|(column, value)| (column.to_string(), Cell::Value(value.clone())))
            .collect()
    }

    fn fields(columns: &[&str]) -> Vec<String> {
        columns.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn reserve_rejects_repeated_composite_values() {
        let mut tracker = ConstraintTracker::new();
        tracker.register("Post", vec![key("post_team_slug", &["team_id", "slug"], false)]);
        let all = fields(&["team_id", "slug"]);

        let first = row(&[("team_id", GeneratedValue::Int(1)), ("slug", "a".into())]);
        let other_team = row(&[("team_id", GeneratedValue::Int(2)), ("slug", "a".into())]);
        assert!(tracker.reserve("Post", &all, &first));
        assert!(tracker.reserve("Post", &all, &other_team));
        assert!(!tracker.reserve("Post", &all, &first));
        assert_eq!(
            tracker.colliding_key("Post", &first).map(|key| key.name.as_str()),
            Some("post_team_slug")
        );
        assert_eq!(tracker.used_count("Post", &all), 2);
    }

    #[test]
    fn failed_reserve_records_nothing() {
        let mut tracker = ConstraintTracker::new();
        tracker.register(
            "User",
            vec![key("PRIMARY", &["id"], false), key("user_email_key", &["email"], false)],
        );
        let all = fields(&["id", "email"]);
        assert!(tracker.reserve("User", &all, &row(&[("id", GeneratedValue::Int(1)), ("email", "a".into())])));
        assert!(!tracker.reserve("User", &all, &row(&[("id", GeneratedValue::Int(2)), ("email", "a".into())])));
        assert!(tracker.reserve("User", &all, &row(&[("id", GeneratedValue::Int(2)), ("email", "b".into())])));
    }

    #[test]
    fn nulls_are_distinct_unless_configured() {
        let mut tracker = ConstraintTracker::new();
        tracker.register(
            "Device",
            vec![
                key("serial", &["serial"], false),
                key("tag", &["tag"], true),
            ],
        );
        let nulls = row(&[("serial", GeneratedValue::Null), ("tag", GeneratedValue::Null)]);
        assert!(tracker.reserve("Device", &fields(&["serial"]), &nulls));
        assert!(tracker.reserve("Device", &fields(&["serial"]), &nulls));
        assert!(tracker.reserve("Device", &fields(&["tag"]), &nulls));
        assert!(!tracker.reserve("Device", &fields(&["tag"]), &nulls));
    }

    #[test]
    fn seeded_values_block_new_rows() {
        let mut tracker = ConstraintTracker::new();
        tracker.register("User", vec![key("user_email_key", &["email"], false)]);
        tracker.seed("User", &fields(&["email"]), vec![vec!["taken@example.com".into()]]);
        let candidate = row(&[("email", "taken@example.com".into())]);
        assert!(!tracker.reserve("User", &fields(&["email"]), &candidate));
    }

    #[test]
    fn taken_within_only_checks_keys_inside_the_columns() {
        let mut tracker = ConstraintTracker::new();
        tracker.register(
            "Profile",
            vec![
                key("profile_user_key", &["user_id"], false),
                key("profile_user_slot", &["user_id", "slot"], false),
            ],
        );
        let user_id = fields(&["user_id"]);
        let taken = row(&[("user_id", GeneratedValue::Int(1)), ("slot", GeneratedValue::Int(1))]);
        assert!(tracker.reserve("Profile", &fields(&["user_id", "slot"]), &taken));

        assert!(tracker.taken_within("Profile", &user_id, &[GeneratedValue::Int(1)]));
        assert!(!tracker.taken_within("Profile", &user_id, &[GeneratedValue::Int(2)]));
        assert!(!tracker.taken_within("Team", &user_id, &[GeneratedValue::Int(1)]));
    }

    #[test]
    fn default_cells_skip_the_key() {
        let mut tracker = ConstraintTracker::new();
        tracker.register("Log", vec![key("PRIMARY", &["id"], false)]);
        let mut pending = Row::new();
        pending.insert("id".to_string(), Cell::Default);
        assert!(tracker.reserve("Log", &fields(&["id"]), &pending));
        assert!(tracker.reserve("Log", &fields(&["id"]), &pending));
    }
}
