use seedwright_core::Row;

/// Read-only view of the rows a run has produced so far.
pub trait StoreView {
    /// Rows of `model`, in insertion order. Unknown models yield an empty slice.
    fn rows(&self, model: &str) -> &[Row];

    /// Rows that already exist in the database and can be connected to.
    fn existing_rows(&self, model: &str) -> &[Row];
}

/// Argument passed to every user callback.
#[derive(Clone, Copy)]
pub struct FieldContext<'a> {
    /// Ordinal of the record among its siblings.
    pub index: usize,
    /// Deterministic path of the field being resolved.
    pub seed: &'a str,
    pub store: &'a dyn StoreView,
    /// Columns of the record resolved so far.
    pub data: &'a Row,
}

impl std::fmt::Debug for FieldContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldContext")
            .field("index", &self.index)
            .field("seed", &self.seed)
            .field("data", &self.data)
            .finish_non_exhaustive()
    }
}
