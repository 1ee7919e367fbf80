use std::sync::Mutex;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use seedwright_adapter::{
    AdapterError, DatabaseClient, Result, apply_statements, fetch_existing_rows, query_as,
    read_data_model, write_data_model,
};
use seedwright_core::{Cell, DataModel, GeneratedValue};
use seedwright_generate::{GenerateOptions, Seeder};
use seedwright_plan::{ChildSpec, ConnectSpec, ModelRecord, Plan, StoreView};

const BLOG: &str = include_str!("../../seedwright-core/tests/fixtures/blog.json");

#[derive(Default)]
struct RecordingClient {
    executed: Mutex<Vec<String>>,
    fail_containing: Option<&'static str>,
    rows: Vec<Value>,
}

#[async_trait]
impl DatabaseClient for RecordingClient {
    async fn execute(&self, sql: &str) -> Result<()> {
        if let Some(needle) = self.fail_containing
            && sql.contains(needle)
        {
            return Err(AdapterError::Db(format!("rejected: {needle}")));
        }
        self.executed
            .lock()
            .map_err(|err| AdapterError::Db(err.to_string()))?
            .push(sql.to_string());
        Ok(())
    }

    async fn query(&self, sql: &str) -> Result<Vec<Value>> {
        self.executed
            .lock()
            .map_err(|err| AdapterError::Db(err.to_string()))?
            .push(sql.to_string());
        Ok(self.rows.clone())
    }
}

fn blog() -> DataModel {
    DataModel::from_json_str(BLOG).expect("parse blog fixture")
}

#[tokio::test]
async fn generated_sql_is_applied_in_order() {
    let mut seeder = Seeder::new(blog(), GenerateOptions::default()).expect("seeder");
    let store = seeder
        .generate(&Plan::new().model("Post", ChildSpec::count(2)))
        .await
        .expect("generate");
    let statements = seeder.to_sql(&store).expect("sql");

    let client = RecordingClient::default();
    let applied = apply_statements(&client, &statements).await.expect("apply");
    assert_eq!(applied, statements.len());
    assert_eq!(*client.executed.lock().expect("lock"), statements);
}

#[tokio::test]
async fn failing_statement_reports_its_index() {
    let statements = vec![
        "INSERT INTO \"a\" DEFAULT VALUES;".to_string(),
        "INSERT INTO \"b\" DEFAULT VALUES;".to_string(),
        "INSERT INTO \"c\" DEFAULT VALUES;".to_string(),
    ];
    let client = RecordingClient {
        fail_containing: Some("\"b\""),
        ..RecordingClient::default()
    };

    let err = apply_statements(&client, &statements).await.expect_err("second fails");
    assert!(matches!(err, AdapterError::Statement { index: 1, .. }));
    assert_eq!(client.executed.lock().expect("lock").len(), 1);
}

#[tokio::test]
async fn existing_rows_feed_connects() {
    let client = RecordingClient {
        rows: vec![json!({
            "id": "7f1c1c1e-8d0e-4c57-9a43-6b3f1f0f2a11",
            "email": "ops@example.com",
            "created_at": "2024-03-01T09:00:00Z"
        })],
        ..RecordingClient::default()
    };
    let data_model = blog();
    let rows = fetch_existing_rows(&client, &data_model, "User").await.expect("fetch");
    assert_eq!(
        client.executed.lock().expect("lock")[0],
        "SELECT \"id\", \"email\", \"created_at\" FROM \"public\".\"user\";"
    );
    assert!(matches!(rows[0].get("created_at"), Some(Cell::Value(GeneratedValue::Timestamp(_)))));

    let mut seeder = Seeder::new(data_model, GenerateOptions::default()).expect("seeder");
    seeder.add_existing("User", rows).expect("existing");
    let store = seeder
        .generate(&Plan::new().model(
            "Post",
            ChildSpec::count(1).each(ModelRecord::new().connect("author", ConnectSpec::any())),
        ))
        .await
        .expect("generate");
    assert!(store.rows("User").is_empty());
    assert_eq!(
        store.rows("Post")[0].get("author_id").and_then(Cell::value).map(GeneratedValue::key),
        Some("7f1c1c1e-8d0e-4c57-9a43-6b3f1f0f2a11".to_string())
    );
}

#[derive(Debug, Deserialize, PartialEq)]
struct Count {
    total: i64,
}

#[tokio::test]
async fn query_as_deserializes_rows() {
    let client = RecordingClient {
        rows: vec![json!({ "total": 3 })],
        ..RecordingClient::default()
    };
    let counts: Vec<Count> = query_as(&client, "SELECT count(*) AS total FROM \"post\";")
        .await
        .expect("query");
    assert_eq!(counts, vec![Count { total: 3 }]);
}

#[test]
fn data_model_files_round_trip() {
    let dir = std::env::temp_dir().join(format!("seedwright-adapter-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("temp dir");
    let path = dir.join("dataModel.json");

    write_data_model(&path, &blog()).expect("write");
    let loaded = read_data_model(&path).expect("read");
    assert_eq!(loaded.models.len(), 3);
    assert_eq!(
        loaded.to_json_pretty().expect("json"),
        blog().to_json_pretty().expect("json")
    );
    std::fs::remove_dir_all(&dir).expect("cleanup");
}
