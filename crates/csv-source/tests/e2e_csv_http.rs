//! End-to-end integration tests for CSV runs over HTTP
//!
//! These tests run the whole pipeline with the real HTTP client against a
//! local server that stands in for the Airtable API.

use airtable_client::AirtableClient;
use airtable_sync_csv_source::{sync, Config};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use sync_core::{ColumnConfig, Configuration, Destination, FieldKind, LoadType};
use tokio::net::TcpListener;

/// Test CSV data
const TEST_CSV_DATA: &str = "id,name,age,active
1,Alice,30,true
2,Bob,25,false";

#[derive(Clone, Default)]
struct ServerState {
    created: Arc<Mutex<Vec<Value>>>,
    create_calls: Arc<Mutex<usize>>,
}

/// HTTP handler that serves the table metadata of base `app1`
async fn serve_tables(Path(base_id): Path<String>) -> Response {
    if base_id != "app1" {
        return (StatusCode::NOT_FOUND, Json(json!({"error": "NOT_FOUND"}))).into_response();
    }
    Json(json!({
        "tables": [{
            "id": "tblPeople",
            "name": "People",
            "primaryFieldId": "fldId",
            "fields": [
                {"id": "fldId", "name": "ID", "type": "singleLineText"},
                {"id": "fldName", "name": "Name", "type": "singleLineText"},
                {"id": "fldAge", "name": "Age", "type": "number"},
                {"id": "fldActive", "name": "Active", "type": "checkbox"}
            ]
        }]
    }))
    .into_response()
}

/// HTTP handler for batch record creation
async fn create_records(
    State(state): State<ServerState>,
    Path((_base_id, _table_id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    *state.create_calls.lock().unwrap() += 1;
    let records = body["records"].as_array().cloned().unwrap_or_default();
    let created: Vec<Value> = records
        .iter()
        .map(|r| {
            let mut created = state.created.lock().unwrap();
            created.push(r["fields"].clone());
            json!({"id": format!("rec{:03}", created.len()), "fields": r["fields"]})
        })
        .collect();
    Json(json!({ "records": created })).into_response()
}

/// Start a test HTTP server standing in for Airtable
async fn start_test_server() -> anyhow::Result<(String, ServerState, tokio::task::JoinHandle<()>)>
{
    let state = ServerState::default();
    let app = Router::new()
        .route("/v0/meta/bases/:base_id/tables", get(serve_tables))
        .route("/v0/:base_id/:table_id", post(create_records))
        .with_state(state.clone());

    // Bind to any available port
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let base_url = format!("http://{addr}");

    // Spawn server in background
    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Ok((base_url, state, server_handle))
}

fn people_config(load_type: LoadType) -> Configuration {
    Configuration {
        api_token: "patTEST".to_string(),
        base_id: "app1".to_string(),
        destination: Destination {
            table_name: "People".to_string(),
            columns: vec![
                ColumnConfig::new("id", "ID", FieldKind::Number).key(),
                ColumnConfig::new("name", "Name", FieldKind::SingleLineText),
                ColumnConfig::new("age", "Age", FieldKind::Number),
                ColumnConfig::new("active", "Active", FieldKind::Checkbox),
            ],
            load_type,
            record_id_column: None,
        },
        ..Default::default()
    }
}

#[tokio::test]
async fn test_csv_http_append() {
    // Initialize tracing
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .try_init();

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("people.csv");
    std::fs::write(&input, TEST_CSV_DATA).unwrap();

    // Start test HTTP server
    let (base_url, state, server_handle) = start_test_server().await.unwrap();
    tracing::info!("Test server started at: {}", base_url);

    let client = AirtableClient::with_api_url("patTEST", &base_url);
    let config = Config {
        input,
        parameters: people_config(LoadType::Append),
        log_output: Some(dir.path().join("out/tables/log.csv")),
        ..Default::default()
    };

    // Run the sync
    let result = sync(&client, &config).await;
    assert!(result.is_ok(), "CSV sync should succeed: {result:?}");
    let report = result.unwrap();

    assert_eq!(report.summary.created, 2);
    assert_eq!(report.summary.updated, 0);
    assert_eq!(report.summary.errors, 0);
    assert_eq!(*state.create_calls.lock().unwrap(), 1);

    // Verify the fields that went over the wire
    let created = state.created.lock().unwrap().clone();
    assert_eq!(
        created[0],
        json!({"ID": "1", "Name": "Alice", "Age": 30, "Active": true})
    );
    assert_eq!(created[1]["Active"], json!(false));

    // Verify the outcome report
    let log = std::fs::read_to_string(dir.path().join("out/tables/log.csv")).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].ends_with(",rec001,create,created"));
    assert!(lines[2].ends_with(",rec002,create,created"));

    // Stop test server
    server_handle.abort();
}

#[tokio::test]
async fn test_csv_http_unknown_base() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .try_init();

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("people.csv");
    std::fs::write(&input, TEST_CSV_DATA).unwrap();

    let (base_url, state, server_handle) = start_test_server().await.unwrap();

    let client = AirtableClient::with_api_url("patTEST", &base_url);
    let mut parameters = people_config(LoadType::Append);
    parameters.base_id = "appOther".to_string();
    let config = Config {
        input,
        parameters,
        ..Default::default()
    };

    let err = sync(&client, &config).await.unwrap_err();
    assert!(matches!(err, sync_core::SyncError::Schema(_)), "{err}");
    assert_eq!(*state.create_calls.lock().unwrap(), 0);

    server_handle.abort();
}
