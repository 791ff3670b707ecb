use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const DEFAULT_TOKEN: &str = "test-token";

/// Timestamp stamped on the seeded dataset.
pub const SEED_TIMESTAMP: i64 = 1_700_000_000;

pub const ENTITY_TYPES: [&str; 10] = [
    "instrument",
    "company",
    "user",
    "account",
    "tag",
    "merchant",
    "budget",
    "reminder",
    "reminderMarker",
    "transaction",
];

/// One stored entity, kept as the JSON object the client uploaded.
pub type Entity = Map<String, Value>;

/// A removal, as uploaded by the client and echoed back in later diffs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deletion {
    pub id: String,
    pub object: String,
    #[serde(default)]
    pub user: i64,
    #[serde(default)]
    pub stamp: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffRequest {
    pub current_client_timestamp: i64,
    pub server_timestamp: i64,
    #[serde(default)]
    pub force_fetch: Vec<String>,
    #[serde(default)]
    pub deletion: Vec<Deletion>,
    /// Uploaded entities keyed by entity type name.
    #[serde(flatten)]
    pub changes: HashMap<String, Vec<Entity>>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResponse {
    pub server_timestamp: i64,
    #[serde(flatten)]
    pub entities: BTreeMap<String, Vec<Entity>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub deletion: Vec<Deletion>,
}

/// Suggestion body: one transaction or a batch.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SuggestBody {
    One(Entity),
    Many(Vec<Entity>),
}

/// In-memory dataset, grouped by entity type name.
#[derive(Default)]
pub struct Store {
    entities: HashMap<String, Vec<Entity>>,
    deletions: Vec<Deletion>,
    clock: i64,
}

impl Store {
    /// A small dataset: one user, two instruments, an account, a category,
    /// a merchant and one categorized transaction at that merchant.
    pub fn seeded() -> Self {
        let mut store = Store {
            clock: SEED_TIMESTAMP,
            ..Store::default()
        };
        let account = Uuid::new_v4();
        let food = Uuid::new_v4();
        let merchant = Uuid::new_v4();
        let changed = SEED_TIMESTAMP;

        store.insert("user", json!({ "id": 1, "changed": changed, "login": "testuser", "currency": 2 }));
        store.insert("instrument", json!({ "id": 1, "changed": changed, "title": "US Dollar", "shortTitle": "USD", "symbol": "$", "rate": 74.5 }));
        store.insert("instrument", json!({ "id": 2, "changed": changed, "title": "Russian Ruble", "shortTitle": "RUB", "symbol": "₽", "rate": 1.0 }));
        store.insert("account", json!({ "id": account, "changed": changed, "user": 1, "instrument": 2, "type": "cash", "title": "Wallet", "balance": 1500.0, "inBalance": true }));
        store.insert("tag", json!({ "id": food, "changed": changed, "user": 1, "title": "Food", "showIncome": false, "showOutcome": true }));
        store.insert("merchant", json!({ "id": merchant, "changed": changed, "user": 1, "title": "McDonalds" }));
        store.insert("transaction", json!({
            "id": Uuid::new_v4(),
            "changed": changed,
            "created": changed,
            "user": 1,
            "incomeInstrument": 2,
            "incomeAccount": account,
            "income": 0.0,
            "outcomeInstrument": 2,
            "outcomeAccount": account,
            "outcome": 350.0,
            "tag": [food],
            "merchant": merchant,
            "payee": "McDonalds",
            "date": "2023-11-14"
        }));
        store
    }

    fn insert(&mut self, entity: &str, value: Value) {
        if let Value::Object(fields) = value {
            self.entities.entry(entity.to_string()).or_default().push(fields);
        }
    }

    /// Strictly increasing server clock, never behind wall-clock seconds.
    fn tick(&mut self) -> i64 {
        self.clock = unix_now().max(self.clock + 1);
        self.clock
    }

    /// Insert or replace `item` under `key` (see `entity_key`).
    fn upsert(&mut self, entity: &str, key: &str, mut item: Entity, stamp: i64) {
        item.insert("changed".to_string(), json!(stamp));
        let items = self.entities.entry(entity.to_string()).or_default();
        match items
            .iter_mut()
            .find(|existing| entity_key(entity, existing).as_deref() == Some(key))
        {
            Some(existing) => *existing = item,
            None => items.push(item),
        }
    }

    fn delete(&mut self, mut deletion: Deletion, stamp: i64) {
        if let Some(items) = self.entities.get_mut(&deletion.object) {
            items.retain(|item| item.get("id").map(id_string).as_deref() != Some(deletion.id.as_str()));
        }
        deletion.stamp = stamp;
        self.deletions.push(deletion);
    }

    fn diff(&self, since: i64, force_fetch: &HashSet<String>, stamp: i64) -> DiffResponse {
        let mut response = DiffResponse {
            server_timestamp: stamp,
            ..DiffResponse::default()
        };

        for entity in ENTITY_TYPES {
            let forced = force_fetch.contains(entity);
            let items: Vec<Entity> = self
                .entities
                .get(entity)
                .into_iter()
                .flatten()
                .filter(|item| forced || changed_at(item) > since)
                .cloned()
                .collect();
            if !items.is_empty() {
                response.entities.insert(entity.to_string(), items);
            }
        }

        response.deletion = self
            .deletions
            .iter()
            .filter(|d| d.stamp > since)
            .cloned()
            .collect();
        response
    }

    /// Fill `merchant` and `tag` from what the dataset knows about the payee.
    fn suggest(&self, mut transaction: Entity) -> Entity {
        let Some(payee) = transaction.get("payee").and_then(Value::as_str).map(str::to_lowercase) else {
            return transaction;
        };

        let merchant = self
            .entities
            .get("merchant")
            .into_iter()
            .flatten()
            .find(|m| m.get("title").and_then(Value::as_str).map(str::to_lowercase).as_deref() == Some(payee.as_str()))
            .and_then(|m| m.get("id").cloned());

        let tags = self
            .entities
            .get("transaction")
            .into_iter()
            .flatten()
            .filter(|t| t.get("payee").and_then(Value::as_str).map(str::to_lowercase).as_deref() == Some(payee.as_str()))
            .filter_map(|t| t.get("tag").filter(|tag| !tag.is_null()).cloned())
            .last();

        if let Some(merchant) = merchant {
            transaction.insert("merchant".to_string(), merchant);
        }
        if let Some(tags) = tags {
            transaction.insert("tag".to_string(), tags);
        }
        transaction
    }
}

#[derive(Clone)]
pub struct AppState {
    store: Arc<RwLock<Store>>,
    token: Arc<str>,
}

impl AppState {
    pub fn new(token: &str, store: Store) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            token: Arc::from(token),
        }
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), StatusCode> {
        let expected = format!("Bearer {}", self.token);
        match headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
            Some(value) if value == expected => Ok(()),
            _ => Err(StatusCode::UNAUTHORIZED),
        }
    }
}

/// Router over the seeded dataset, accepting `DEFAULT_TOKEN`.
pub fn app() -> Router {
    app_with(AppState::new(DEFAULT_TOKEN, Store::seeded()))
}

pub fn app_with(state: AppState) -> Router {
    Router::new()
        .route("/diff/", post(diff))
        .route("/suggest/", post(suggest))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn diff(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<DiffRequest>,
) -> Result<Json<DiffResponse>, StatusCode> {
    state.authorize(&headers)?;
    if input.current_client_timestamp < 0 || input.server_timestamp < 0 {
        return Err(StatusCode::BAD_REQUEST);
    }

    // Validate the whole upload before touching the store.
    let mut changes = Vec::new();
    for (entity, items) in input.changes {
        if !ENTITY_TYPES.contains(&entity.as_str()) {
            continue;
        }
        for item in items {
            let Some(key) = entity_key(&entity, &item) else {
                tracing::debug!(%entity, "rejecting entity without a key");
                return Err(StatusCode::BAD_REQUEST);
            };
            changes.push((entity.clone(), key, item));
        }
    }
    if input
        .deletion
        .iter()
        .any(|d| !ENTITY_TYPES.contains(&d.object.as_str()))
    {
        return Err(StatusCode::BAD_REQUEST);
    }

    let mut store = state.store.write().await;
    let stamp = store.tick();
    for (entity, key, item) in changes {
        store.upsert(&entity, &key, item, stamp);
    }
    for deletion in input.deletion {
        store.delete(deletion, stamp);
    }

    let force_fetch: HashSet<String> = input.force_fetch.into_iter().collect();
    tracing::debug!(since = input.server_timestamp, stamp, ?force_fetch, "diff");
    Ok(Json(store.diff(input.server_timestamp, &force_fetch, stamp)))
}

async fn suggest(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    state.authorize(&headers)?;
    let body: SuggestBody = serde_json::from_value(input).map_err(|_| StatusCode::BAD_REQUEST)?;
    let store = state.store.read().await;
    let output = match body {
        SuggestBody::One(transaction) => Value::Object(store.suggest(transaction)),
        SuggestBody::Many(items) => Value::Array(
            items
                .into_iter()
                .map(|t| Value::Object(store.suggest(t)))
                .collect(),
        ),
    };
    Ok(Json(output))
}

/// Identity of an entity within its type: budgets are keyed by category and
/// month, everything else by a non-null `id`.
fn entity_key(entity: &str, item: &Entity) -> Option<String> {
    if entity == "budget" {
        let tag = item
            .get("tag")
            .filter(|tag| !tag.is_null())
            .map(id_string)
            .unwrap_or_default();
        let date = item.get("date").and_then(Value::as_str)?;
        return Some(format!("{tag}:{date}"));
    }
    item.get("id").filter(|id| !id.is_null()).map(id_string)
}

fn id_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn changed_at(item: &Entity) -> i64 {
    item.get("changed").and_then(Value::as_i64).unwrap_or_default()
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(value: Value) -> Entity {
        match value {
            Value::Object(fields) => fields,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn seeded_store_has_every_fixture() {
        let store = Store::seeded();
        let body = store.diff(0, &HashSet::new(), SEED_TIMESTAMP);
        assert_eq!(body.entities["instrument"].len(), 2);
        assert_eq!(body.entities["user"][0]["login"], "testuser");
        assert!(!body.entities.contains_key("budget"));
    }

    #[test]
    fn tick_is_strictly_increasing() {
        let mut store = Store::default();
        let first = store.tick();
        let second = store.tick();
        assert!(second > first);
    }

    #[test]
    fn upsert_replaces_by_id() {
        let mut store = Store::default();
        store.upsert("merchant", "m1", entity(json!({ "id": "m1", "title": "Old" })), 10);
        store.upsert("merchant", "m1", entity(json!({ "id": "m1", "title": "New" })), 11);
        let merchants = &store.entities["merchant"];
        assert_eq!(merchants.len(), 1);
        assert_eq!(merchants[0]["title"], "New");
        assert_eq!(merchants[0]["changed"], 11);
    }

    #[test]
    fn budgets_are_keyed_by_tag_and_month() {
        let mut store = Store::default();
        for (date, outcome, stamp) in [("2024-01-01", 10.0, 1), ("2024-02-01", 20.0, 2), ("2024-01-01", 30.0, 3)] {
            let item = entity(json!({ "tag": "t1", "date": date, "outcome": outcome }));
            let key = entity_key("budget", &item).unwrap();
            store.upsert("budget", &key, item, stamp);
        }
        assert_eq!(store.entities["budget"].len(), 2);
    }

    #[test]
    fn entities_without_identity_have_no_key() {
        assert_eq!(entity_key("merchant", &entity(json!({ "title": "x" }))), None);
        assert_eq!(entity_key("merchant", &entity(json!({ "id": null }))), None);
        assert_eq!(entity_key("budget", &entity(json!({ "tag": "t1" }))), None);
        assert_eq!(
            entity_key("budget", &entity(json!({ "tag": null, "date": "2024-01-01" }))).as_deref(),
            Some(":2024-01-01")
        );
        assert_eq!(entity_key("instrument", &entity(json!({ "id": 3 }))).as_deref(), Some("3"));
    }

    #[test]
    fn delete_removes_entity_and_logs_deletion() {
        let mut store = Store::default();
        store.upsert("tag", "t1", entity(json!({ "id": "t1", "title": "Food" })), 5);
        let deletion = Deletion {
            id: "t1".to_string(),
            object: "tag".to_string(),
            user: 1,
            stamp: 0,
        };
        store.delete(deletion, 6);
        assert!(store.entities["tag"].is_empty());
        let body = store.diff(5, &HashSet::new(), 6);
        assert_eq!(body.deletion.len(), 1);
        assert_eq!(body.deletion[0].id, "t1");
        assert_eq!(body.deletion[0].stamp, 6);
    }

    #[test]
    fn suggest_without_payee_is_unchanged() {
        let store = Store::seeded();
        let input = entity(json!({ "comment": "no payee" }));
        assert_eq!(store.suggest(input.clone()), input);
    }
}
