//! Qdrant-backed identity store.
//!
//! Talks to a Qdrant server over its REST API with a shared `reqwest` client.
//! On connect the named collection is created with dimension
//! [`EMBEDDING_DIM`] and cosine distance if it does not exist yet. Each
//! registration upserts one point keyed by a fresh UUID with the remaining
//! record fields as payload; queries are nearest-neighbor searches whose
//! payloads are mapped back into match results.
//!
//! Concurrency control is delegated to Qdrant: every call is an independent
//! request and no local locking is needed.

use super::{BackendError, IdentityStore};
use charid_core::config::{DEFAULT_SOURCE, EMBEDDING_DIM, REMOTE_TIMEOUT_SECS, UNKNOWN_LABEL};
use charid_core::{parse_tags, Embedding, IdentityRecord, MatchResult, NewIdentity};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::time::Duration;
use uuid::Uuid;

/// Header carrying the Qdrant API key.
const API_KEY_HEADER: &str = "api-key";

/// Connection parameters for the remote index.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Base URL, e.g. `http://localhost:6333`.
    pub url: String,
    pub collection: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl RemoteConfig {
    pub fn new(url: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            collection: collection.into(),
            api_key: None,
            timeout: Duration::from_secs(REMOTE_TIMEOUT_SECS),
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }
}

/// Envelope Qdrant wraps around every successful response.
#[derive(Debug, Deserialize)]
struct QdrantResponse<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct CollectionsList {
    collections: Vec<CollectionDescription>,
}

#[derive(Debug, Deserialize)]
struct CollectionDescription {
    name: String,
}

#[derive(Debug, Serialize)]
struct CreateCollection {
    vectors: VectorParams,
}

#[derive(Debug, Serialize)]
struct VectorParams {
    size: usize,
    distance: &'static str,
}

#[derive(Debug, Serialize)]
struct UpsertPoints<'a> {
    points: [PointStruct<'a>; 1],
}

#[derive(Debug, Serialize)]
struct PointStruct<'a> {
    id: Uuid,
    vector: &'a [f32],
    payload: PayloadRef<'a>,
}

#[derive(Debug, Serialize)]
struct PayloadRef<'a> {
    label: &'a str,
    notes: &'a str,
    tags: &'a BTreeSet<String>,
    source: &'a str,
}

#[derive(Debug, Serialize)]
struct SearchPoints<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
}

#[derive(Debug, Deserialize)]
struct ScoredPoint {
    id: PointId,
    score: f32,
    #[serde(default)]
    payload: Option<Payload>,
}

/// Qdrant point ids are either unsigned integers or UUID strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PointId {
    Num(u64),
    Uuid(String),
}

impl PointId {
    fn into_string(self) -> String {
        match self {
            PointId::Num(n) => n.to_string(),
            PointId::Uuid(s) => s,
        }
    }
}

/// Point payload. Other clients may write the same collection, so a field of
/// the wrong type is treated as missing instead of failing the whole search.
#[derive(Debug, Default, Deserialize)]
struct Payload {
    #[serde(default, deserialize_with = "lenient_string")]
    label: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    notes: Option<String>,
    #[serde(default, deserialize_with = "lenient_tags")]
    tags: BTreeSet<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    source: Option<String>,
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

/// Accepts a list of strings (non-strings skipped) or a comma-separated string.
fn lenient_tags<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BTreeSet<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        Value::String(s) => parse_tags(Some(&s)),
        _ => BTreeSet::new(),
    })
}

impl ScoredPoint {
    fn into_match(self) -> MatchResult {
        let payload = self.payload.unwrap_or_default();
        MatchResult {
            id: self.id.into_string(),
            label: payload.label.unwrap_or_else(|| UNKNOWN_LABEL.to_string()),
            score: self.score,
            notes: payload.notes.unwrap_or_default(),
            tags: payload.tags,
            source: payload.source.unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
        }
    }
}

/// Identity store backed by a Qdrant collection.
#[derive(Debug, Clone)]
pub struct RemoteStore {
    client: reqwest::Client,
    base_url: Url,
    collection: String,
    api_key: Option<String>,
}

impl RemoteStore {
    /// Connects to the index and makes sure the collection exists.
    pub async fn connect(config: RemoteConfig) -> Result<Self, BackendError> {
        let base_url = Url::parse(&config.url)
            .map_err(|e| BackendError::InvalidUrl(format!("{}: {e}", config.url)))?;
        if base_url.cannot_be_a_base() {
            return Err(BackendError::InvalidUrl(config.url));
        }
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        let store = Self {
            client,
            base_url,
            collection: config.collection,
            api_key: config.api_key,
        };
        store.ensure_collection().await?;
        Ok(store)
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Appends `segments` to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: reqwest::Method, segments: &[&str]) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, self.endpoint(segments));
        match &self.api_key {
            Some(key) => builder.header(API_KEY_HEADER, key),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(builder: reqwest::RequestBuilder) -> Result<T, BackendError> {
        let resp = builder.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::Remote {
                status: status.as_u16(),
                body,
            });
        }
        let envelope: QdrantResponse<T> = resp.json().await?;
        Ok(envelope.result)
    }

    async fn ensure_collection(&self) -> Result<(), BackendError> {
        let list: CollectionsList =
            Self::send(self.request(reqwest::Method::GET, &["collections"])).await?;
        if list.collections.iter().any(|c| c.name == self.collection) {
            tracing::info!("Using existing remote collection '{}'", self.collection);
            return Ok(());
        }

        let body = CreateCollection {
            vectors: VectorParams {
                size: EMBEDDING_DIM,
                distance: "Cosine",
            },
        };
        let _: serde_json::Value = Self::send(
            self.request(reqwest::Method::PUT, &["collections", self.collection.as_str()])
                .json(&body),
        )
        .await?;
        tracing::info!(
            "Created remote collection '{}' (dimension {}, cosine)",
            self.collection,
            EMBEDDING_DIM
        );
        Ok(())
    }
}

impl IdentityStore for RemoteStore {
    async fn register(&self, identity: NewIdentity) -> Result<IdentityRecord, BackendError> {
        let record = identity.into_record();
        let body = UpsertPoints {
            points: [PointStruct {
                id: record.id,
                vector: record.embedding.as_slice(),
                payload: PayloadRef {
                    label: &record.label,
                    notes: &record.notes,
                    tags: &record.tags,
                    source: &record.source,
                },
            }],
        };
        let _: serde_json::Value = Self::send(
            self.request(
                reqwest::Method::PUT,
                &["collections", self.collection.as_str(), "points"],
            )
            .query(&[("wait", "true")])
            .json(&body),
        )
        .await?;
        tracing::info!(
            id = %record.id,
            label = %record.label,
            collection = %self.collection,
            "Registered identity"
        );
        Ok(record)
    }

    async fn query(
        &self,
        embedding: &Embedding,
        limit: usize,
    ) -> Result<Vec<MatchResult>, BackendError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let body = SearchPoints {
            vector: embedding.as_slice(),
            limit,
            with_payload: true,
        };
        let hits: Vec<ScoredPoint> = Self::send(
            self.request(
                reqwest::Method::POST,
                &["collections", self.collection.as_str(), "points", "search"],
            )
            .json(&body),
        )
        .await?;
        Ok(hits.into_iter().map(ScoredPoint::into_match).collect())
    }
}
