//! In-process datastore used by the pipeline harnesses
//!
//! Rows are plain JSON objects. Filters, ordering and limits follow the REST
//! gateway: values that both read as numbers compare numerically, everything
//! else compares as text (ISO dates sort correctly that way) after all
//! numbers, and nulls sort last. Stored
//! procedures are recorded, not executed.

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{render_value, Datastore, Filter, FilterOp, Query, StoreError, StoreResult};
use crate::models::AuthUser;

/// One recorded stored-procedure invocation
#[derive(Debug, Clone, PartialEq)]
pub struct RpcCall {
    pub function: String,
    pub args: Value,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Vec<Value>>>,
    rpc_calls: RwLock<Vec<RpcCall>>,
    auth_users: RwLock<Vec<AuthUser>>,
    failing_tables: RwLock<HashSet<String>>,
    failing_procedures: RwLock<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append rows to a table as-is (no id assignment)
    pub async fn seed(&self, table: &str, rows: Vec<Value>) {
        let mut tables = self.tables.write().await;
        tables.entry(table.to_string()).or_default().extend(rows);
    }

    /// Current contents of a table in insertion order
    pub async fn rows(&self, table: &str) -> Vec<Value> {
        let tables = self.tables.read().await;
        tables.get(table).cloned().unwrap_or_default()
    }

    pub async fn rpc_calls(&self) -> Vec<RpcCall> {
        self.rpc_calls.read().await.clone()
    }

    /// Recorded calls to one procedure
    pub async fn calls_to(&self, function: &str) -> Vec<Value> {
        self.rpc_calls
            .read()
            .await
            .iter()
            .filter(|c| c.function == function)
            .map(|c| c.args.clone())
            .collect()
    }

    pub async fn add_auth_user(&self, id: &str, email: Option<&str>) {
        self.auth_users.write().await.push(AuthUser {
            id: id.to_string(),
            email: email.map(str::to_string),
        });
    }

    /// Make every request touching `table` fail
    pub async fn fail_table(&self, table: &str) {
        self.failing_tables.write().await.insert(table.to_string());
    }

    /// Make calls to `function` fail (they are still recorded)
    pub async fn fail_procedure(&self, function: &str) {
        self.failing_procedures
            .write()
            .await
            .insert(function.to_string());
    }

    async fn check_table(&self, table: &str) -> StoreResult<()> {
        if self.failing_tables.read().await.contains(table) {
            return Err(StoreError::Status {
                status: 503,
                body: format!("{} unavailable", table),
            });
        }
        Ok(())
    }
}

/// Numeric view of a cell: JSON numbers and numeric strings
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn compare(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        _ => match (as_number(left), as_number(right)) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => render_value(left).cmp(&render_value(right)),
        },
    }
}

fn cell<'a>(row: &'a Value, column: &str) -> &'a Value {
    row.get(column).unwrap_or(&Value::Null)
}

fn matches(row: &Value, filter: &Filter) -> bool {
    let value = cell(row, &filter.column);
    if value.is_null() {
        return filter.value.is_null() && filter.op == FilterOp::Eq;
    }
    let ordering = compare(value, &filter.value);
    match filter.op {
        FilterOp::Eq => ordering == Ordering::Equal,
        FilterOp::Lte => ordering != Ordering::Greater,
        FilterOp::Gte => ordering != Ordering::Less,
    }
}

fn project(row: &Value, columns: &str) -> Value {
    if columns.trim() == "*" {
        return row.clone();
    }
    let mut projected = Map::new();
    for column in columns.split(',').map(str::trim).filter(|c| !c.is_empty()) {
        if let Some(value) = row.get(column) {
            projected.insert(column.to_string(), value.clone());
        }
    }
    Value::Object(projected)
}

fn merge(target: &mut Value, patch: &Value) {
    if let (Value::Object(target), Value::Object(patch)) = (target, patch) {
        for (key, value) in patch {
            target.insert(key.clone(), value.clone());
        }
    }
}

fn stamp(mut row: Value) -> Value {
    if let Value::Object(fields) = &mut row {
        fields
            .entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        fields.entry("created_at").or_insert_with(|| {
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
        });
    }
    row
}

#[async_trait::async_trait]
impl Datastore for MemoryStore {
    async fn select(&self, table: &str, query: &Query) -> StoreResult<Vec<Value>> {
        self.check_table(table).await?;
        let tables = self.tables.read().await;
        let rows = tables.get(table).map(Vec::as_slice).unwrap_or(&[]);

        let mut selected: Vec<&Value> = rows
            .iter()
            .filter(|row| query.filters.iter().all(|f| matches(row, f)))
            .collect();

        if let Some(order) = &query.order {
            if order.descending {
                // Later inserts win ties, as with server-side timestamps
                selected.reverse();
                selected.sort_by(|a, b| compare(cell(b, &order.column), cell(a, &order.column)));
            } else {
                selected.sort_by(|a, b| compare(cell(a, &order.column), cell(b, &order.column)));
            }
        }

        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(selected
            .into_iter()
            .take(limit)
            .map(|row| project(row, query.selected_columns()))
            .collect())
    }

    async fn insert(&self, table: &str, rows: Vec<Value>) -> StoreResult<Vec<Value>> {
        self.check_table(table).await?;
        let stamped: Vec<Value> = rows.into_iter().map(stamp).collect();

        let mut tables = self.tables.write().await;
        tables
            .entry(table.to_string())
            .or_default()
            .extend(stamped.iter().cloned());
        Ok(stamped)
    }

    async fn upsert(&self, table: &str, rows: Vec<Value>, on_conflict: &[&str]) -> StoreResult<()> {
        self.check_table(table).await?;
        let mut tables = self.tables.write().await;
        let existing = tables.entry(table.to_string()).or_default();

        for row in rows {
            let position = existing.iter().position(|current| {
                on_conflict.iter().all(|column| {
                    let (a, b) = (cell(current, column), cell(&row, column));
                    !a.is_null() && compare(a, b) == Ordering::Equal
                })
            });

            match position {
                Some(index) => merge(&mut existing[index], &row),
                None => existing.push(stamp(row)),
            }
        }
        Ok(())
    }

    async fn update(&self, table: &str, filters: &[Filter], patch: Value) -> StoreResult<usize> {
        self.check_table(table).await?;
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(table) else {
            return Ok(0);
        };

        let mut touched = 0;
        for row in rows.iter_mut() {
            if filters.iter().all(|f| matches(row, f)) {
                merge(row, &patch);
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn rpc(&self, function: &str, args: Value) -> StoreResult<Value> {
        self.rpc_calls.write().await.push(RpcCall {
            function: function.to_string(),
            args,
        });

        if self.failing_procedures.read().await.contains(function) {
            return Err(StoreError::Status {
                status: 400,
                body: format!("{} failed", function),
            });
        }
        Ok(Value::Null)
    }

    async fn list_auth_users(&self) -> StoreResult<Vec<AuthUser>> {
        Ok(self.auth_users.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreExt;
    use serde_json::json;

    #[tokio::test]
    async fn test_numeric_aware_filters_and_ordering() {
        let store = MemoryStore::new();
        store
            .seed(
                "ai_league_stats",
                vec![
                    json!({"model_id": "a", "date": "2026-10-17", "wallet_balance": "9900.00"}),
                    json!({"model_id": "a", "date": "2026-10-19", "wallet_balance": 10250.5}),
                    json!({"model_id": "b", "date": "2026-10-18", "wallet_balance": "10000"}),
                ],
            )
            .await;

        let latest = store
            .select(
                "ai_league_stats",
                &Query::new().columns("wallet_balance").eq("model_id", "a").order_desc("date").limit(1),
            )
            .await
            .unwrap();
        assert_eq!(latest, vec![json!({"wallet_balance": 10250.5})]);

        let rich = store
            .select("ai_league_stats", &Query::new().gte("wallet_balance", 10000))
            .await
            .unwrap();
        assert_eq!(rich.len(), 2);
    }

    #[test]
    fn test_mixed_numbers_and_text_order_totally() {
        let (ten, text, nine) = (json!("10"), json!("1a"), json!("9"));
        assert_eq!(compare(&nine, &ten), Ordering::Less);
        assert_eq!(compare(&ten, &text), Ordering::Less);
        assert_eq!(compare(&nine, &text), Ordering::Less);
        assert_eq!(compare(&text, &Value::Null), Ordering::Less);
    }

    #[tokio::test]
    async fn test_order_by_mixed_column() {
        let store = MemoryStore::new();
        store
            .seed(
                "guilds",
                vec![
                    json!({"id": "a", "rank": "10"}),
                    json!({"id": "b", "rank": "1a"}),
                    json!({"id": "c", "rank": "9"}),
                    json!({"id": "d", "rank": 2}),
                ],
            )
            .await;

        let rows = store
            .select("guilds", &Query::new().columns("id").order_desc("rank"))
            .await
            .unwrap();
        let ids: Vec<&str> = rows.iter().filter_map(|r| r["id"].as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c", "d"]);
    }

    #[tokio::test]
    async fn test_fetch_each_skips_rows_that_do_not_decode() {
        #[derive(Debug, serde::Deserialize)]
        struct Row {
            balance: f64,
        }

        let store = MemoryStore::new();
        store
            .seed(
                "profiles",
                vec![
                    json!({"id": "u1", "balance": 10.0}),
                    json!({"id": "u2", "balance": "lots"}),
                    json!({"id": "u3", "balance": 2.5}),
                ],
            )
            .await;

        let decoded = store.fetch_each::<Row>("profiles", &Query::new()).await.unwrap();
        assert_eq!(decoded.malformed, 1);
        let balances: Vec<f64> = decoded.rows.iter().map(|r| r.balance).collect();
        assert_eq!(balances, vec![10.0, 2.5]);
    }

    #[tokio::test]
    async fn test_upsert_merges_on_conflict_columns() {
        let store = MemoryStore::new();
        store
            .upsert(
                "ai_league_news",
                vec![json!({"date": "2026-10-19", "headline": "first"})],
                &["date"],
            )
            .await
            .unwrap();
        store
            .upsert(
                "ai_league_news",
                vec![json!({"date": "2026-10-19", "headline": "second"})],
                &["date"],
            )
            .await
            .unwrap();

        let rows = store.rows("ai_league_news").await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["headline"], "second");
        assert!(rows[0].get("id").is_some());
    }

    #[tokio::test]
    async fn test_update_counts_and_insert_assigns_ids() {
        let store = MemoryStore::new();
        let inserted = store
            .insert_one("profiles", &json!({"balance": 5}))
            .await
            .unwrap();
        let id = inserted["id"].as_str().unwrap().to_string();

        let touched = store
            .update_by_id("profiles", &id, json!({"balance": 1554.0}))
            .await
            .unwrap();
        assert_eq!(touched, 1);
        assert_eq!(store.rows("profiles").await[0]["balance"], 1554.0);

        let none = store
            .update("profiles", &[Filter::eq("id", "missing")], json!({"balance": 1}))
            .await
            .unwrap();
        assert_eq!(none, 0);
    }

    #[tokio::test]
    async fn test_failing_procedure_is_recorded() {
        let store = MemoryStore::new();
        store.fail_procedure("award_user_xp").await;

        assert!(store.rpc("award_user_xp", json!({"p_amount": 1})).await.is_err());
        assert!(store.rpc("join_guild", json!({})).await.is_ok());
        assert_eq!(store.rpc_calls().await.len(), 2);
        assert_eq!(store.calls_to("award_user_xp").await.len(), 1);
    }
}
