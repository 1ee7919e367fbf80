//! Boundary between the generator and real databases.
//!
//! Nothing here opens a connection: callers bring a [`DatabaseClient`] or [`Introspector`]
//! backed by the driver of their choice.

pub mod client;
pub mod errors;
pub mod introspect;
pub mod io;

pub use client::{DatabaseClient, apply_statements, fetch_existing_rows, query_as};
pub use errors::{AdapterError, Result};
pub use introspect::Introspector;
pub use io::{read_data_model, write_data_model};

pub use seedwright_core::DataModel;
