//! REST client for the tree backend
//!
//! Endpoints (relative to the configured base URL):
//! - GET  /trees/            - list trees
//! - POST /trees/            - plant a tree
//! - GET  /trees/search/?q=  - search trees and planters
//! - GET  /trees/stats/      - aggregate counters

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::error::ApiError;
use crate::models::{ForestStats, SearchResultSet, Species, Tree};
use crate::settings::{self, ApiConfig};

/// Outcome of decoding a `/trees/` payload
#[derive(Debug, Clone, PartialEq)]
pub enum TreeListShape {
    Trees(Vec<Tree>),
    /// None of the known envelopes matched; carries the raw body
    Malformed(Value),
}

/// Accepts a bare array, `{results: [...]}`, `{data: [...]}` or a single
/// tree object. Array elements that do not decode are dropped.
pub fn decode_tree_list(body: Value) -> TreeListShape {
    match body {
        Value::Array(items) => TreeListShape::Trees(decode_items(items, "tree")),
        Value::Object(mut map) => {
            for key in ["results", "data"] {
                if matches!(map.get(key), Some(Value::Array(_))) {
                    if let Some(Value::Array(items)) = map.remove(key) {
                        return TreeListShape::Trees(decode_items(items, "tree"));
                    }
                }
            }
            let body = Value::Object(map);
            match serde_json::from_value::<Tree>(body.clone()) {
                Ok(tree) => TreeListShape::Trees(vec![tree]),
                Err(_) => TreeListShape::Malformed(body),
            }
        }
        other => TreeListShape::Malformed(other),
    }
}

/// Absent or non-array buckets become empty
pub fn decode_search(body: &Value) -> SearchResultSet {
    let bucket = |key: &str| match body.get(key) {
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    };
    SearchResultSet {
        trees: decode_items(bucket("trees"), "tree"),
        users: decode_items(bucket("users"), "user"),
    }
}

fn decode_items<T: DeserializeOwned>(items: Vec<Value>, what: &str) -> Vec<T> {
    items.into_iter()
        .filter_map(|item| match serde_json::from_value::<T>(item) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                log::warn!("[Api] Skipping {} entry: {}", what, e);
                None
            }
        })
        .collect()
}

/// A failed round trip, before it is mapped onto an `ApiError`
#[derive(Debug)]
struct Failure {
    /// Transport-level message, e.g. "Request failed with status code 500"
    transport: String,
    /// Response body, when the server sent one
    payload: Option<Value>,
    timed_out: bool,
}

impl Failure {
    /// Backend `.detail` if present, else the transport message
    fn detail(&self) -> String {
        match self.payload.as_ref().and_then(|p| p.get("detail")) {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(v) if !v.is_null() => v.to_string(),
            _ => self.transport.clone(),
        }
    }

    fn into_read_error(self, context: &str, wrap: fn(String) -> ApiError) -> ApiError {
        if self.timed_out {
            return ApiError::Fetch {
                message: format!("{}: {}", context, self.transport),
                timed_out: true,
            };
        }
        wrap(format!("{}: {}", context, self.detail()))
    }

    /// First validation message of a field-keyed error object, the raw text
    /// of a string payload, or the transport message
    fn creation_message(&self) -> String {
        match &self.payload {
            Some(Value::Object(fields)) => {
                let first = fields.values().next().and_then(|v| match v {
                    Value::Array(messages) => messages.first().and_then(Value::as_str),
                    Value::String(s) => Some(s.as_str()),
                    _ => None,
                });
                match first {
                    Some(message) => message.to_string(),
                    None => Value::Object(fields.clone()).to_string(),
                }
            }
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Array(items)) => items.first()
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| self.transport.clone()),
            _ => self.transport.clone(),
        }
    }
}

fn fetch_error(message: String) -> ApiError {
    ApiError::Fetch { message, timed_out: false }
}

#[derive(Debug, Serialize)]
struct PlantRequest<'a> {
    user_name: &'a str,
    tree_name: &'a str,
    tree_type: Species,
}

/// Client for the tree backend. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ForestClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl ForestClient {
    pub fn new(config: &ApiConfig) -> Result<Self, String> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .user_agent(concat!("amazonia/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        log::info!("[Api] Using {} (timeout {}ms)", config.base_url, config.timeout_ms());

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout,
        })
    }

    /// Client configured from env vars / stored settings
    pub fn from_settings() -> Result<Self, String> {
        Self::new(&settings::api_config())
    }

    pub fn config(&self) -> ApiConfig {
        ApiConfig::new(self.base_url.clone(), self.timeout)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder, label: &str) -> Result<Value, Failure> {
        log::debug!("[Api] {}", label);

        let response = request.send().await.map_err(|e| self.transport_failure(e, label))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| self.transport_failure(e, label))?;

        let payload = if text.trim().is_empty() {
            None
        } else {
            Some(serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text)))
        };

        if status.is_success() {
            return Ok(payload.unwrap_or(Value::Null));
        }

        if status.is_server_error() {
            log::error!("[Api] {} -> {}: server error - please try again later", label, status);
        } else {
            log::warn!("[Api] {} -> {}", label, status);
        }

        Err(Failure {
            transport: format!("Request failed with status code {}", status.as_u16()),
            payload,
            timed_out: false,
        })
    }

    fn transport_failure(&self, e: reqwest::Error, label: &str) -> Failure {
        if e.is_timeout() {
            let ms = self.timeout.as_millis();
            log::error!("[Api] {} timed out after {}ms", label, ms);
            return Failure {
                transport: format!("timeout of {}ms exceeded", ms),
                payload: None,
                timed_out: true,
            };
        }
        if e.is_connect() {
            log::error!("[Api] {}: backend connection refused - is the server running?", label);
        } else {
            log::error!("[Api] {}: network error - check your connection ({})", label, e);
        }
        Failure { transport: e.to_string(), payload: None, timed_out: false }
    }

    /// GET /trees/
    pub async fn list_trees(&self) -> Result<Vec<Tree>, ApiError> {
        let body = self.send(self.client.get(self.url("/trees/")), "GET /trees/").await
            .map_err(|f| f.into_read_error("Failed to fetch trees", fetch_error))?;

        match decode_tree_list(body) {
            TreeListShape::Trees(trees) => Ok(trees),
            TreeListShape::Malformed(raw) => {
                log::warn!("[Api] Unexpected tree list format: {}", truncate_for_log(&raw));
                Ok(Vec::new())
            }
        }
    }

    /// POST /trees/. Names are sent as given; callers trim and validate.
    pub async fn plant_tree(&self, user_name: &str, tree_name: &str, species: Species) -> Result<Tree, ApiError> {
        let body = PlantRequest { user_name, tree_name, tree_type: species };
        let request = self.client.post(self.url("/trees/")).json(&body);

        let created = self.send(request, "POST /trees/").await.map_err(|f| {
            if f.timed_out {
                f.into_read_error("Failed to plant tree", fetch_error)
            } else {
                ApiError::Creation(f.creation_message())
            }
        })?;

        serde_json::from_value::<Tree>(created)
            .map_err(|e| ApiError::Creation(format!("Failed to plant tree: unexpected response ({})", e)))
    }

    /// GET /trees/search/?q=. An empty query never reaches the network.
    pub async fn search(&self, query: &str) -> Result<SearchResultSet, ApiError> {
        if query.trim().is_empty() {
            return Ok(SearchResultSet::empty());
        }

        let request = self.client.get(self.url("/trees/search/")).query(&[("q", query)]);
        let body = self.send(request, "GET /trees/search/").await
            .map_err(|f| f.into_read_error("Search failed", ApiError::Search))?;

        Ok(decode_search(&body))
    }

    /// GET /trees/stats/
    pub async fn get_stats(&self) -> Result<ForestStats, ApiError> {
        let body = self.send(self.client.get(self.url("/trees/stats/")), "GET /trees/stats/").await
            .map_err(|f| f.into_read_error("Failed to fetch stats", ApiError::Stats))?;

        serde_json::from_value::<ForestStats>(body)
            .map_err(|e| ApiError::Stats(format!("Failed to fetch stats: unexpected response ({})", e)))
    }

    /// True iff the listing endpoint answers successfully. Never errors.
    pub async fn check_health(&self) -> bool {
        match self.send(self.client.get(self.url("/trees/")), "GET /trees/ (health)").await {
            Ok(_) => true,
            Err(f) => {
                log::warn!("[Api] Backend is not available: {}", f.transport);
                false
            }
        }
    }
}

fn truncate_for_log(value: &Value) -> String {
    let text = value.to_string();
    match text.char_indices().nth(200) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Vec3;
    use crate::test_backend;
    use axum::{http::StatusCode, routing::get, Json, Router};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn oak() -> Value {
        json!({"id": 1, "name": "Oak", "tree_type": "KAPOK", "position_x": 2, "position_z": 3})
    }

    async fn client_for(router: Router) -> ForestClient {
        let base = test_backend::spawn(router).await;
        ForestClient::new(&ApiConfig::new(base, Duration::from_secs(5))).unwrap()
    }

    async fn list_with(body: Value) -> Vec<Tree> {
        let router = Router::new().route("/trees/", get(move || async move { Json(body) }));
        client_for(router).await.list_trees().await.unwrap()
    }

    #[test]
    fn test_decode_envelopes_agree() {
        let bare = decode_tree_list(json!([oak()]));
        let results = decode_tree_list(json!({"results": [oak()], "count": 1}));
        let data = decode_tree_list(json!({"data": [oak()]}));
        let single = decode_tree_list(oak());

        assert!(matches!(&bare, TreeListShape::Trees(t) if t.len() == 1));
        assert_eq!(bare, results);
        assert_eq!(bare, data);
        assert_eq!(bare, single);
    }

    #[test]
    fn test_decode_malformed_shapes() {
        assert!(matches!(decode_tree_list(json!({"unexpected": true})), TreeListShape::Malformed(_)));
        assert!(matches!(decode_tree_list(json!("hello")), TreeListShape::Malformed(_)));
        assert!(matches!(decode_tree_list(Value::Null), TreeListShape::Malformed(_)));
        assert!(matches!(decode_tree_list(json!({"results": "nope"})), TreeListShape::Malformed(_)));
        assert_eq!(decode_tree_list(json!([])), TreeListShape::Trees(vec![]));
    }

    #[test]
    fn test_decode_skips_unknown_species() {
        let body = json!([oak(), {"id": 2, "name": "Odd", "tree_type": "BAOBAB"}]);
        match decode_tree_list(body) {
            TreeListShape::Trees(trees) => {
                assert_eq!(trees.len(), 1);
                assert_eq!(trees[0].name, "Oak");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_decode_keeps_tree_with_naive_timestamp() {
        let body = json!([{
            "id": 1, "name": "Oak", "tree_type": "KAPOK",
            "position_x": 2, "position_z": 3,
            "planted_at": "2025-03-01T12:00:00.123456"
        }]);
        match decode_tree_list(body) {
            TreeListShape::Trees(trees) => {
                assert_eq!(trees.len(), 1);
                assert!(trees[0].planted_at.is_some());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_decode_search_coerces_buckets() {
        let results = decode_search(&json!({"trees": "oops"}));
        assert!(results.is_empty());
        assert!(decode_search(&json!([])).is_empty());

        let results = decode_search(&json!({
            "trees": [oak()],
            "users": [{"id": 4, "name": "Ana", "trees_planted": 3}]
        }));
        assert_eq!(results.trees.len(), 1);
        assert_eq!(results.users[0].trees_planted, 3);
    }

    #[test]
    fn test_creation_message_variants() {
        let failure = |payload: Option<Value>| Failure {
            transport: "Request failed with status code 400".to_string(),
            payload,
            timed_out: false,
        };
        assert_eq!(
            failure(Some(json!({"tree_name": ["already exists"], "user_name": ["too long"]}))).creation_message(),
            "already exists"
        );
        assert_eq!(failure(Some(json!("Name taken"))).creation_message(), "Name taken");
        assert_eq!(failure(Some(json!({"code": 7}))).creation_message(), r#"{"code":7}"#);
        assert_eq!(failure(None).creation_message(), "Request failed with status code 400");
    }

    #[tokio::test]
    async fn test_list_trees_all_envelopes() {
        let bare = list_with(json!([oak()])).await;
        let results = list_with(json!({"results": [oak()]})).await;
        let data = list_with(json!({"data": [oak()]})).await;
        assert_eq!(bare, results);
        assert_eq!(bare, data);

        assert_eq!(bare.len(), 1);
        assert_eq!(bare[0].ground_position(), Vec3::new(2.0, 0.0, 3.0));
    }

    #[tokio::test]
    async fn test_list_trees_malformed_or_empty_is_empty() {
        assert!(list_with(json!({"weird": 1})).await.is_empty());
        assert!(list_with(json!([])).await.is_empty());
        assert!(list_with(json!(42)).await.is_empty());
    }

    #[tokio::test]
    async fn test_list_trees_failure_uses_detail() {
        let router = Router::new().route(
            "/trees/",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"detail": "Database offline"}))) }),
        );
        let err = client_for(router).await.list_trees().await.unwrap_err();
        assert_eq!(err, ApiError::Fetch {
            message: "Failed to fetch trees: Database offline".to_string(),
            timed_out: false,
        });
    }

    #[tokio::test]
    async fn test_list_trees_failure_without_detail() {
        let router = Router::new().route("/trees/", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }));
        let err = client_for(router).await.list_trees().await.unwrap_err();
        assert_eq!(err.message(), "Failed to fetch trees: Request failed with status code 500");
    }

    #[tokio::test]
    async fn test_unreachable_backend() {
        let base = test_backend::closed_port_url().await;
        let client = ForestClient::new(&ApiConfig::new(base, Duration::from_secs(2))).unwrap();

        let err = client.list_trees().await.unwrap_err();
        assert!(matches!(err, ApiError::Fetch { timed_out: false, .. }));
        assert!(err.message().starts_with("Failed to fetch trees: "));
        assert!(!client.check_health().await);
    }

    #[tokio::test]
    async fn test_timeout_is_fetch_error() {
        let router = Router::new().route(
            "/trees/search/",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                Json(json!({"trees": [], "users": []}))
            }),
        );
        let base = test_backend::spawn(router).await;
        let client = ForestClient::new(&ApiConfig::new(base, Duration::from_millis(50))).unwrap();

        let err = client.search("oak").await.unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(err.message(), "Search failed: timeout of 50ms exceeded");
    }

    #[tokio::test]
    async fn test_plant_tree_success() {
        let router = Router::new().route(
            "/trees/",
            axum::routing::post(|Json(req): Json<Value>| async move {
                (StatusCode::CREATED, Json(json!({
                    "id": 77,
                    "name": req["tree_name"],
                    "tree_type": req["tree_type"],
                    "tree_type_display": "Kapok Tree",
                    "planter": 5,
                    "planter_name": req["user_name"],
                    "position_x": 1.25,
                    "position_y": 0.0,
                    "position_z": -3.5,
                    "planted_at": "2025-06-01T10:00:00Z",
                    "is_real_tree_planted": false
                })))
            }),
        );
        let tree = client_for(router).await.plant_tree("Ana", "Yggdrasil", Species::Kapok).await.unwrap();
        assert_eq!(tree.id, 77);
        assert_eq!(tree.name, "Yggdrasil");
        assert_eq!(tree.planter_name, "Ana");
        assert_eq!(tree.tree_type, Species::Kapok);
    }

    #[tokio::test]
    async fn test_plant_tree_validation_error() {
        let router = Router::new().route(
            "/trees/",
            axum::routing::post(|| async {
                (StatusCode::BAD_REQUEST, Json(json!({"tree_name": ["already exists"]})))
            }),
        );
        let err = client_for(router).await.plant_tree("Ana", "Yggdrasil", Species::Kapok).await.unwrap_err();
        assert_eq!(err, ApiError::Creation("already exists".to_string()));
        assert_eq!(err.to_string(), "already exists");
    }

    #[tokio::test]
    async fn test_plant_tree_string_payload() {
        let router = Router::new().route(
            "/trees/",
            axum::routing::post(|| async { (StatusCode::BAD_REQUEST, "Planting is closed today") }),
        );
        let err = client_for(router).await.plant_tree("Ana", "Oak", Species::Cocoa).await.unwrap_err();
        assert_eq!(err.message(), "Planting is closed today");
    }

    #[tokio::test]
    async fn test_plant_tree_sends_wire_tokens() {
        let router = Router::new().route(
            "/trees/",
            axum::routing::post(|Json(req): Json<Value>| async move {
                assert_eq!(req["tree_type"], "ANDEAN_ALDER");
                (StatusCode::CREATED, Json(json!({
                    "id": 1, "name": req["tree_name"], "tree_type": req["tree_type"],
                    "planter_name": req["user_name"]
                })))
            }),
        );
        let tree = client_for(router).await.plant_tree("Bo", "Cloud", Species::AndeanAlder).await.unwrap();
        assert_eq!(tree.tree_type, Species::AndeanAlder);
    }

    #[tokio::test]
    async fn test_empty_search_makes_no_request() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/trees/search/",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Json(json!({"trees": [], "users": []}))
                }
            }),
        );
        let client = client_for(router).await;

        assert_eq!(client.search("").await.unwrap(), SearchResultSet::empty());
        assert_eq!(client.search("   ").await.unwrap(), SearchResultSet::empty());
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        client.search("oak").await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_search_passes_query_and_decodes() {
        let router = Router::new().route(
            "/trees/search/",
            get(|axum::extract::Query(params): axum::extract::Query<HashMap<String, String>>| async move {
                let q = params.get("q").cloned().unwrap_or_default();
                Json(json!({
                    "trees": [{"id": 1, "name": q, "tree_type": "RUBBER", "position_x": 1, "position_z": 1}],
                    "users": [{"id": 2, "name": "Ana Maria", "trees_planted": 4}]
                }))
            }),
        );
        let results = client_for(router).await.search("big oak").await.unwrap();
        assert_eq!(results.trees[0].name, "big oak");
        assert_eq!(results.users[0].name, "Ana Maria");
    }

    #[tokio::test]
    async fn test_search_failure_is_search_error() {
        let router = Router::new().route(
            "/trees/search/",
            get(|| async { (StatusCode::BAD_GATEWAY, Json(json!({"detail": "upstream down"}))) }),
        );
        let err = client_for(router).await.search("oak").await.unwrap_err();
        assert_eq!(err, ApiError::Search("Search failed: upstream down".to_string()));
    }

    #[tokio::test]
    async fn test_stats() {
        let router = Router::new().route(
            "/trees/stats/",
            get(|| async {
                Json(json!({
                    "total_trees": 1234,
                    "real_trees_planted": 10,
                    "top_planters": [{"name": "Ana", "trees_planted": 40}]
                }))
            }),
        );
        let stats = client_for(router).await.get_stats().await.unwrap();
        assert_eq!(stats.total_trees, 1234);
        assert_eq!(stats.top_planters[0].name, "Ana");
    }

    #[tokio::test]
    async fn test_stats_failure() {
        let router = Router::new().route("/trees/stats/", get(|| async { StatusCode::NOT_FOUND }));
        let err = client_for(router).await.get_stats().await.unwrap_err();
        assert_eq!(err, ApiError::Stats("Failed to fetch stats: Request failed with status code 404".to_string()));
    }

    #[tokio::test]
    async fn test_health() {
        let ok = Router::new().route("/trees/", get(|| async { Json(json!([])) }));
        assert!(client_for(ok).await.check_health().await);

        let down = Router::new().route("/trees/", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }));
        assert!(!client_for(down).await.check_health().await);
    }

    #[test]
    fn test_rejects_bad_base_url() {
        assert!(ForestClient::new(&ApiConfig::new("localhost:8000", Duration::from_secs(1))).is_err());
    }

    #[test]
    fn test_config_strips_trailing_slash() {
        let client = ForestClient::new(&ApiConfig::new("http://localhost:8000/api/", Duration::from_secs(3))).unwrap();
        assert_eq!(client.config().base_url, "http://localhost:8000/api");
        assert_eq!(client.url("/trees/"), "http://localhost:8000/api/trees/");
    }
}
