use crate::model::{DataModel, Field, Model, ObjectField};

/// A foreign key seen from the model that owns it.
#[derive(Debug, Clone, Copy)]
pub struct Relation<'a> {
    pub name: &'a str,
    /// Model holding the FK columns.
    pub owner: &'a str,
    /// Parent-side field on `owner`.
    pub owner_field: &'a str,
    /// Model referenced by the FK.
    pub target: &'a str,
    /// FK columns on `owner`.
    pub from_columns: &'a [String],
    /// Referenced key columns on `target`.
    pub to_columns: &'a [String],
    /// True when the FK may be NULL.
    pub nullable: bool,
}

impl<'a> Relation<'a> {
    pub fn is_self(&self) -> bool {
        self.owner == self.target
    }

    fn from_parent_field(model: &'a Model, field: &'a ObjectField) -> Self {
        Relation {
            name: &field.relation_name,
            owner: &model.id,
            owner_field: &field.name,
            target: &field.target,
            from_columns: &field.relation_from_fields,
            to_columns: &field.relation_to_fields,
            nullable: relation_is_nullable(model, field),
        }
    }
}

// Columns decide nullability; the object flag only matters when columns are unknown.
fn relation_is_nullable(model: &Model, field: &ObjectField) -> bool {
    let mut columns_known = false;
    for column in &field.relation_from_fields {
        if let Some(scalar) = model.scalar_by_column(column) {
            columns_known = true;
            if !scalar.is_required {
                return true;
            }
        }
    }
    if columns_known {
        false
    } else {
        !field.is_required
    }
}

impl DataModel {
    /// Relation for a parent-side field of `model_id`.
    pub fn parent_relation(&self, model_id: &str, field_name: &str) -> Option<Relation<'_>> {
        let model = self.model(model_id)?;
        let Field::Object(field) = model.field(field_name)? else {
            return None;
        };
        if !field.is_parent() {
            return None;
        }
        Some(Relation::from_parent_field(model, field))
    }

    /// Relation for a child-side field of `model_id`; the returned relation's owner is the child model.
    pub fn child_relation(&self, model_id: &str, field_name: &str) -> Option<Relation<'_>> {
        let model = self.model(model_id)?;
        let Field::Object(field) = model.field(field_name)? else {
            return None;
        };
        if !field.is_child() {
            return None;
        }
        let owner = self.model(&field.target)?;
        owner
            .object_fields()
            .find(|candidate| {
                candidate.is_parent()
                    && candidate.relation_name == field.relation_name
                    && candidate.target == model.id
            })
            .map(|parent_field| Relation::from_parent_field(owner, parent_field))
    }

    /// Every FK in the data model, ordered by owner model id then field order.
    pub fn relations(&self) -> Vec<Relation<'_>> {
        let mut relations = Vec::new();
        for model in self.models.values() {
            for field in model.object_fields().filter(|field| field.is_parent()) {
                relations.push(Relation::from_parent_field(model, field));
            }
        }
        relations
    }
}
