use async_trait::async_trait;

use seedwright_core::{DataModel, Dialect};

use crate::errors::Result;

/// Implemented by database adapters that can describe their schema as a [`DataModel`].
#[async_trait]
pub trait Introspector: Send + Sync {
    fn dialect(&self) -> Dialect;

    async fn introspect(&self) -> Result<DataModel>;
}
