//! CSV synchronization implementation
//!
//! This module drives one run: it reads the input table in chunks and writes
//! it into the destination Airtable table.

use crate::reader::CsvChunkReader;
use airtable_client::{AirtableApi, TableHandle, TableSchema};
use airtable_sink::{
    clear_table, provision_table, reconcile, FieldMapper, OutcomeLog, RecordSynchronizer,
    SchemaReport, SyncSummary, TableCatalog,
};
use std::path::PathBuf;
use sync_core::{Configuration, LoadType, Result, SyncError};
use tracing::{debug, info, warn};

/// Configuration for a CSV run
#[derive(Debug, Clone)]
pub struct Config {
    /// CSV file to load
    pub input: PathBuf,

    /// Connector parameters
    pub parameters: Configuration,

    /// Where to write the outcome report; `None` skips it
    pub log_output: Option<PathBuf>,

    /// CSV delimiter character (default: ',')
    pub delimiter: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            parameters: Configuration::default(),
            log_output: None,
            delimiter: b',',
        }
    }
}

/// What a run did.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub table: TableSchema,
    pub schema: SchemaReport,
    /// Records deleted before a full load
    pub cleared: usize,
    pub summary: SyncSummary,
    pub log: OutcomeLog,
    pub report_path: Option<PathBuf>,
}

/// Sync a CSV file into Airtable
///
/// Steps, in order: validate the parameters, find or create the destination
/// table, reconcile the mapping with the input and the table, clear the table
/// for a full load, then write the input chunk by chunk. The outcome report
/// is written once every chunk has been processed.
pub async fn sync<A: AirtableApi + ?Sized>(api: &A, config: &Config) -> Result<RunReport> {
    let parameters = &config.parameters;
    parameters.validate_for_run()?;

    let destination = &parameters.destination;
    let options = &parameters.advanced_options;

    info!("Starting CSV sync to Airtable");
    info!("Input: {}", config.input.display());
    info!(
        "Target: base '{}', table '{}' ({})",
        parameters.base_id, destination.table_name, destination.load_type
    );
    debug!(
        "Chunk size: {}, request batch size: {}",
        options.batch_size, options.request_batch_size
    );

    let mut reader = CsvChunkReader::open(
        &config.input,
        &destination.columns,
        config.delimiter,
        options.batch_size,
    )?;
    let headers = reader.headers().to_vec();

    for column in destination.columns.iter().filter(|c| c.dtype.is_computed()) {
        warn!(
            "Column '{}' is configured as {}; Airtable assigns its values, so input data \
             for it is never written",
            column.source_name, column.dtype
        );
    }

    if destination.load_type == LoadType::IncrementalLoad {
        let missing_keys: Vec<&str> = destination
            .columns
            .iter()
            .filter(|c| c.is_primary_key && !headers.contains(&c.source_name))
            .map(|c| c.source_name.as_str())
            .collect();
        if !missing_keys.is_empty() {
            return Err(SyncError::Configuration(format!(
                "Upsert key columns {missing_keys:?} are missing from the input table"
            )));
        }
    }

    let first_chunk = reader.next_chunk()?;

    info!(
        "Connecting to Airtable base '{}', table '{}'...",
        parameters.base_id, destination.table_name
    );
    let mut catalog = TableCatalog::load(api, &parameters.base_id).await?;
    let table = provision_table(
        api,
        &mut catalog,
        &destination.table_name,
        &destination.columns,
        first_chunk.as_deref().unwrap_or_default(),
    )
    .await?;

    let mapper = FieldMapper::new(destination.columns.clone())?
        .with_record_id_column(destination.record_id_column.clone());
    let schema = reconcile(&headers, &mapper, &table);
    if schema.usable_columns.is_empty() {
        return Err(SyncError::Schema(format!(
            "None of the configured columns can be written to table '{}'. \
             Missing in table: {:?}, missing in input: {:?}, computed: {:?}",
            table.name, schema.missing_in_table, schema.missing_in_input, schema.computed_fields
        )));
    }
    if schema.has_drift() {
        info!(
            "Writing {} of {} configured columns",
            schema.usable_columns.len(),
            mapper.columns().len()
        );
    }
    let mapper = mapper.restrict_to(&schema.usable_columns);

    if destination.load_type == LoadType::IncrementalLoad {
        let usable_keys = mapper.key_fields();
        let unusable_keys: Vec<String> = parameters
            .key_fields()
            .into_iter()
            .filter(|key| !usable_keys.contains(key))
            .collect();
        if !unusable_keys.is_empty() {
            return Err(SyncError::Configuration(format!(
                "Upsert key fields {unusable_keys:?} cannot be written to table '{}'. \
                 Every upsert key must exist in the table and must not be computed",
                table.name
            )));
        }
    }

    let handle = TableHandle::new(&parameters.base_id, &table);
    let mut synchronizer = RecordSynchronizer::new(
        api,
        handle.clone(),
        destination.load_type,
        mapper.key_fields(),
        options.request_batch_size,
    )?;

    let cleared = if destination.load_type == LoadType::FullLoad {
        clear_table(api, &handle).await?
    } else {
        0
    };

    let mut chunk = first_chunk;
    while let Some(rows) = chunk {
        let records = mapper.map_rows(&rows);
        synchronizer.sync_chunk(&records).await?;
        debug!("Processed {} input rows so far", reader.rows_read());
        chunk = reader.next_chunk()?;
    }

    let (log, summary) = synchronizer.finish();
    info!(
        "Processed {} records from {}",
        reader.rows_read(),
        config.input.display()
    );

    let report_path = match &config.log_output {
        Some(path) => {
            log.write_report(path)?;
            Some(path.clone())
        }
        None => None,
    };

    Ok(RunReport {
        table,
        schema,
        cleared,
        summary,
        log,
        report_path,
    })
}
