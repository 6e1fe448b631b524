//! Integration tests for the query service: limit policy, paging and pivoting.

mod common;

use std::sync::Mutex;

use async_trait::async_trait;
use lumen::config::LumenConfig;
use lumen::error::Result;
use lumen::executor::{ColumnMeta, Executor, ResultPage, ResultRow};
use lumen::pivot::PivotConfig;
use lumen::registry::ExploreRegistry;
use lumen::service::{QueryService, UserContext};
use lumen::LumenError;
use serde_json::json;

use common::{orders_explore, query};

/// Serves a fixed result set, honouring the LIMIT/OFFSET the streamer adds.
struct FixedRows {
    rows: Vec<ResultRow>,
    statements: Mutex<Vec<String>>,
}

impl FixedRows {
    fn new(rows: Vec<serde_json::Value>) -> Self {
        Self {
            rows: rows
                .into_iter()
                .map(|v| match v {
                    serde_json::Value::Object(map) => map,
                    _ => panic!("rows must be objects"),
                })
                .collect(),
            statements: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Executor for FixedRows {
    async fn execute(&self, sql: &str) -> Result<ResultPage> {
        self.statements.lock().unwrap().push(sql.to_string());
        let last = sql.lines().last().unwrap();
        let parts: Vec<&str> = last.split_whitespace().collect();
        let limit: usize = parts[1].parse().unwrap();
        let offset: usize = parts[3].parse().unwrap();
        Ok(ResultPage {
            columns: vec![ColumnMeta {
                name: "orders_status".to_string(),
            }],
            rows: self.rows.iter().skip(offset).take(limit).cloned().collect(),
        })
    }
}

fn service(config: &str) -> QueryService {
    let registry = ExploreRegistry::from_explores(vec![orders_explore()]).unwrap();
    QueryService::with_config(registry, LumenConfig::from_toml(config).unwrap())
}

#[test]
fn zero_limit_uses_configured_default() {
    let service = service("[query]\ndefault_limit = 25\n");
    assert_eq!(service.validate_limit(0).unwrap(), 25);
    assert_eq!(service.validate_limit(7).unwrap(), 7);

    let q = query(json!({ "dimensions": ["orders_status"] }));
    let compiled = service.compile(&q, &UserContext::default()).unwrap();
    assert!(compiled.query.ends_with("LIMIT 25"));
}

#[test]
fn limit_above_max_is_rejected() {
    let service = service("[query]\nmax_limit = 100\ndefault_limit = 10\n");
    let err = service.validate_limit(101).unwrap_err();
    assert!(matches!(err, LumenError::Parameter(ref m) if m == "Limit cannot be greater than 100"));

    let q = query(json!({ "dimensions": ["orders_status"], "limit": 1000 }));
    assert!(service.compile(&q, &UserContext::default()).is_err());
}

#[test]
fn unknown_explore_is_reference_error() {
    let service = service("");
    let mut q = query(json!({ "dimensions": ["orders_status"] }));
    q.explore_name = "payments".to_string();
    assert!(matches!(
        service.compile(&q, &UserContext::default()),
        Err(LumenError::FieldReference(_))
    ));
}

#[test]
fn configured_warehouse_drives_quoting() {
    let service = service("[warehouse]\nadapter = \"bigquery\"\n");
    let q = query(json!({ "dimensions": ["orders_status"], "limit": 5 }));
    let compiled = service.compile(&q, &UserContext::default()).unwrap();
    assert!(compiled.query.contains("AS `orders_status`"));
}

#[tokio::test]
async fn run_fetches_every_page() {
    let service = service("[pagination]\npage_size = 2\n");
    let executor = FixedRows::new(vec![
        json!({ "orders_status": "open" }),
        json!({ "orders_status": "closed" }),
        json!({ "orders_status": "returned" }),
    ]);
    let q = query(json!({ "dimensions": ["orders_status"], "limit": 10 }));

    let results = service
        .run(&q, &UserContext::default(), &executor, None)
        .await
        .unwrap();
    assert_eq!(results.rows.len(), 3);
    assert_eq!(results.page_size, 2);

    let statements = executor.statements.lock().unwrap();
    assert_eq!(statements.len(), 2);
    assert!(statements[0].starts_with("SELECT * FROM (\nSELECT\n"));
    assert!(statements[1].ends_with("LIMIT 2 OFFSET 2"));
}

#[tokio::test]
async fn paged_statements_keep_the_sort() {
    let service = service("[pagination]\npage_size = 2\n");
    let executor = FixedRows::new(vec![
        json!({ "orders_status": "c" }),
        json!({ "orders_status": "b" }),
        json!({ "orders_status": "a" }),
    ]);
    let q = query(json!({
        "dimensions": ["orders_status"],
        "sorts": [{ "fieldId": "orders_status", "descending": true }],
        "limit": 10
    }));

    let compiled = service.compile(&q, &UserContext::default()).unwrap();
    assert_eq!(compiled.order_by.as_deref(), Some("\"orders_status\" DESC"));

    service
        .run(&q, &UserContext::default(), &executor, None)
        .await
        .unwrap();
    let statements = executor.statements.lock().unwrap();
    assert_eq!(statements.len(), 2);
    for statement in statements.iter() {
        assert!(statement.contains(") AS paginated_query\nORDER BY \"orders_status\" DESC\nLIMIT 2"));
    }
}

#[tokio::test]
async fn fetch_page_follows_cursors() {
    let service = service("[pagination]\npage_size = 2\n");
    let executor = FixedRows::new(vec![
        json!({ "orders_status": "a" }),
        json!({ "orders_status": "b" }),
        json!({ "orders_status": "c" }),
    ]);
    let q = query(json!({ "dimensions": ["orders_status"], "limit": 10 }));
    let user = UserContext::default();

    let first = service.fetch_page(&q, &user, &executor, None).await.unwrap();
    assert_eq!(first.page.rows.len(), 2);
    let cursor = first.next_cursor.unwrap();

    let second = service
        .fetch_page(&q, &user, &executor, Some(&cursor))
        .await
        .unwrap();
    assert_eq!(second.page.rows[0]["orders_status"], json!("c"));
    assert!(second.next_cursor.is_none());

    // a cursor only works for the query it was issued for
    let other = query(json!({ "dimensions": ["orders_status"], "limit": 11 }));
    assert!(matches!(
        service.fetch_page(&other, &user, &executor, Some(&cursor)).await,
        Err(LumenError::Parameter(_))
    ));
}

#[tokio::test]
async fn run_applies_pivot() {
    let service = service("");
    let executor = FixedRows::new(vec![
        json!({ "orders_created_month": "2024-01", "orders_status": "open", "orders_order_count": 3 }),
        json!({ "orders_created_month": "2024-01", "orders_status": "closed", "orders_order_count": 4 }),
    ]);
    let q = query(json!({
        "dimensions": ["orders_created_month", "orders_status"],
        "metrics": ["orders_order_count"],
        "limit": 10
    }));
    let pivot = PivotConfig {
        index: vec!["orders_created_month".to_string()],
        on: vec!["orders_status".to_string()],
        values: vec!["orders_order_count".to_string()],
    };

    let results = service
        .run(&q, &UserContext::default(), &executor, Some(&pivot))
        .await
        .unwrap();
    assert_eq!(results.rows.len(), 1);
    assert_eq!(results.rows[0]["orders_order_count_open"], json!(3));
    assert_eq!(results.rows[0]["orders_order_count_closed"], json!(4));
}
