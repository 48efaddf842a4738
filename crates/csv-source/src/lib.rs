//! CSV input for airtable-sync
//!
//! This crate reads the input table in chunks of typed rows and drives a
//! whole run into an Airtable table.

mod reader;
mod sync;

pub use reader::{find_input_csv, CsvChunkReader};
pub use sync::{sync, Config, RunReport};
