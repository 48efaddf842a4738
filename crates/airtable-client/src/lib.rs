//! Airtable Web API client.
//!
//! This crate defines the `AirtableApi` trait, the seam between the sync
//! engine and the remote service, plus:
//!
//! - [`AirtableClient`] - the `reqwest` implementation of the trait
//! - [`RemoteError`] - remote failures with their status and error type code,
//!   and the classification of those failures into [`RemoteErrorCategory`]
//! - [`testing::InMemoryAirtable`] - an in-memory implementation for tests
//!
//! All batch operations accept at most
//! [`MAX_RECORDS_PER_REQUEST`](sync_core::config::MAX_RECORDS_PER_REQUEST)
//! records per call.

mod error;
mod http;
pub mod testing;
mod traits;
mod types;

pub use error::{RemoteError, RemoteErrorCategory};
pub use http::AirtableClient;
pub use traits::AirtableApi;
pub use types::{
    BaseInfo, FieldDefinition, FieldSchema, Fields, RecordUpdate, RemoteRecord, TableHandle,
    TableSchema, UpsertResult,
};
