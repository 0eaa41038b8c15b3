//! Firestore REST client for the student collection
//!
//! Documents are exchanged in Firestore's typed value format, where every value
//! is wrapped in an object naming its type (`{"stringValue": "..."}`,
//! `{"integerValue": "42"}`, ...). Student documents are converted through
//! `serde_json::Value` so the wire format stays independent of the model.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{StoreError, StoreResult, StudentStore};
use crate::{config::StoreConfig, models::StudentDocument};

/// One page of a collection listing
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<FirestoreDocument>,
    next_page_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FirestoreDocument {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Clone)]
pub struct FirestoreStore {
    client: Client,
    collection_url: String,
    access_token: Option<String>,
    page_size: u32,
}

impl FirestoreStore {
    pub fn new(config: &StoreConfig) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StoreError::Permanent(format!("Failed to create HTTP client: {}", e)))?;

        let collection_url = format!(
            "{}/v1/projects/{}/databases/{}/documents/{}",
            config.base_url.trim_end_matches('/'),
            config.project_id,
            config.database,
            config.collection
        );

        Ok(Self {
            client,
            collection_url,
            access_token: config.access_token.clone(),
            page_size: config.page_size,
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl StudentStore for FirestoreStore {
    async fn fetch_all(&self) -> StoreResult<Vec<StudentDocument>> {
        let mut students = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(&self.collection_url)
                .query(&[("pageSize", self.page_size.to_string())]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let response = self
                .authorize(request)
                .send()
                .await
                .map_err(classify_transport)?;
            let page: ListDocumentsResponse = check_status(response)
                .await?
                .json()
                .await
                .map_err(|e| StoreError::Permanent(format!("Malformed document listing: {}", e)))?;

            for document in page.documents {
                match decode_document(&document.fields) {
                    Ok(student) => students.push(student),
                    Err(e) => tracing::warn!("Skipping student document {}: {}", document.name, e),
                }
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        tracing::debug!("Fetched {} student documents", students.len());
        Ok(students)
    }

    async fn upsert(&self, document: &StudentDocument) -> StoreResult<()> {
        let body = FirestoreDocument {
            name: String::new(),
            fields: encode_document(document)?,
        };
        let url = format!("{}/{}", self.collection_url, document.key());

        let response = self
            .authorize(self.client.patch(&url).json(&body))
            .send()
            .await
            .map_err(classify_transport)?;
        check_status(response).await?;

        tracing::debug!("Student document {} written", document.key());
        Ok(())
    }
}

/// Everything that fails before an HTTP status comes back is worth retrying,
/// except a request that could not even be built.
fn classify_transport(e: reqwest::Error) -> StoreError {
    if e.is_builder() {
        StoreError::Permanent(e.to_string())
    } else {
        StoreError::Retryable(e.to_string())
    }
}

fn classify_status(status: StatusCode, body: &str) -> StoreError {
    let message = format!("HTTP {}: {}", status.as_u16(), body.trim());
    if status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
    {
        StoreError::Retryable(message)
    } else {
        StoreError::Permanent(message)
    }
}

async fn check_status(response: Response) -> StoreResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify_status(status, &body))
}

/// Wrap a plain JSON value in Firestore's typed value format
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match (n.as_i64(), n.as_u64()) {
            (Some(i), _) => json!({ "integerValue": i.to_string() }),
            (None, Some(u)) => json!({ "integerValue": u.to_string() }),
            _ => json!({ "doubleValue": n.as_f64() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() }
        }),
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

pub fn encode_fields(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .map(|(key, value)| (key.clone(), encode_value(value)))
        .collect()
}

/// Unwrap a Firestore typed value into plain JSON
pub fn decode_value(value: &Value) -> Result<Value, String> {
    let (kind, inner) = value
        .as_object()
        .and_then(|object| object.iter().next())
        .ok_or_else(|| format!("not a typed value: {}", value))?;

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" | "doubleValue" => Ok(inner.clone()),
        "integerValue" => match inner {
            Value::String(s) => s
                .parse::<i64>()
                .map(Value::from)
                .map_err(|e| format!("bad integerValue {}: {}", s, e)),
            Value::Number(_) => Ok(inner.clone()),
            _ => Err(format!("bad integerValue {}", inner)),
        },
        "stringValue" | "timestampValue" | "referenceValue" => Ok(inner.clone()),
        "arrayValue" => match inner.get("values") {
            Some(Value::Array(items)) => items
                .iter()
                .map(decode_value)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            _ => Ok(Value::Array(Vec::new())),
        },
        "mapValue" => match inner.get("fields") {
            Some(Value::Object(fields)) => decode_fields(fields).map(Value::Object),
            _ => Ok(Value::Object(Map::new())),
        },
        other => Err(format!("unsupported value type {}", other)),
    }
}

pub fn decode_fields(fields: &Map<String, Value>) -> Result<Map<String, Value>, String> {
    fields
        .iter()
        .map(|(key, value)| decode_value(value).map(|decoded| (key.clone(), decoded)))
        .collect()
}

pub fn encode_document(document: &StudentDocument) -> StoreResult<Map<String, Value>> {
    match serde_json::to_value(document) {
        Ok(Value::Object(map)) => Ok(encode_fields(&map)),
        Ok(other) => Err(StoreError::Permanent(format!(
            "student document is not an object: {}",
            other
        ))),
        Err(e) => Err(StoreError::Permanent(e.to_string())),
    }
}

pub fn decode_document(fields: &Map<String, Value>) -> Result<StudentDocument, String> {
    let plain = decode_fields(fields)?;
    serde_json::from_value(Value::Object(plain)).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::student::LoanRecord;
    use chrono::NaiveDate;

    #[test]
    fn test_document_survives_encoding() {
        let document = StudentDocument {
            id: 7_186_334_312_001_234_567,
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@campus.edu".to_string(),
            password: "engine".to_string(),
            current_books: vec!["9780441013593".to_string()],
            loans: vec![LoanRecord {
                copy_id: 2,
                isbn: "9780441013593".to_string(),
                borrowed_on: NaiveDate::from_ymd_opt(2024, 10, 1).unwrap(),
                due_date: NaiveDate::from_ymd_opt(2024, 10, 15).unwrap(),
            }],
        };

        let fields = encode_document(&document).unwrap();
        assert_eq!(fields["id"], json!({ "integerValue": "7186334312001234567" }));
        assert_eq!(
            fields["loans"]["arrayValue"]["values"][0]["mapValue"]["fields"]["dueDate"],
            json!({ "stringValue": "2024-10-15" })
        );
        assert_eq!(decode_document(&fields).unwrap(), document);
    }

    #[test]
    fn test_decode_listing_page() {
        let page: ListDocumentsResponse = serde_json::from_value(json!({
            "documents": [{
                "name": "projects/p/databases/(default)/documents/students/grace@campus.edu",
                "fields": {
                    "ID": { "integerValue": "100001" },
                    "firstName": { "stringValue": "Grace" },
                    "lastName": { "stringValue": "Hopper" },
                    "email": { "stringValue": "Grace@Campus.edu" },
                    "password": { "stringValue": "cobol" },
                    "currentBooks": { "arrayValue": {} }
                },
                "createTime": "2024-01-01T00:00:00Z"
            }],
            "nextPageToken": "abc"
        }))
        .unwrap();

        assert_eq!(page.next_page_token.as_deref(), Some("abc"));
        let student = decode_document(&page.documents[0].fields).unwrap();
        assert_eq!(student.id, 100001);
        assert_eq!(student.key(), "grace@campus.edu");
        assert!(student.current_books.is_empty());
    }

    #[test]
    fn test_empty_listing() {
        let page: ListDocumentsResponse = serde_json::from_value(json!({})).unwrap();
        assert!(page.documents.is_empty());
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        assert!(decode_value(&json!({ "geoPointValue": { "latitude": 1.0 } })).is_err());
        assert!(decode_value(&json!("bare")).is_err());
    }

    #[test]
    fn test_status_classification() {
        assert!(classify_status(StatusCode::SERVICE_UNAVAILABLE, "").is_retryable());
        assert!(classify_status(StatusCode::TOO_MANY_REQUESTS, "").is_retryable());
        assert!(!classify_status(StatusCode::FORBIDDEN, "denied").is_retryable());
        assert!(!classify_status(StatusCode::BAD_REQUEST, "").is_retryable());
    }

    mod http {
        use std::{collections::HashMap, sync::Arc};

        use axum::{
            extract::{Path, Query, State},
            http::{HeaderMap, StatusCode},
            routing::{get, patch},
            Json, Router,
        };
        use serde_json::{json, Value};
        use tokio::sync::Mutex;

        use super::super::FirestoreStore;
        use crate::{
            config::StoreConfig,
            models::StudentDocument,
            store::{StoreError, StudentStore},
        };

        const COLLECTION: &str = "/v1/projects/campus/databases/db/documents/students";

        #[derive(Clone, Default)]
        struct Backend {
            page_requests: Arc<Mutex<Vec<HashMap<String, String>>>>,
            writes: Arc<Mutex<Vec<(String, Value)>>>,
            tokens: Arc<Mutex<Vec<Option<String>>>>,
            unavailable: bool,
        }

        fn student_fields(id: &str, email: &str) -> Value {
            json!({
                "id": { "integerValue": id },
                "firstName": { "stringValue": "Doc" },
                "lastName": { "stringValue": "Student" },
                "email": { "stringValue": email },
                "password": { "stringValue": "pw" },
                "currentBooks": { "arrayValue": {} }
            })
        }

        async fn list(
            State(backend): State<Backend>,
            headers: HeaderMap,
            Query(params): Query<HashMap<String, String>>,
        ) -> Json<Value> {
            let token = headers
                .get("authorization")
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            backend.tokens.lock().await.push(token);
            let page_token = params.get("pageToken").cloned();
            backend.page_requests.lock().await.push(params);

            match page_token.as_deref() {
                None => Json(json!({
                    "documents": [
                        { "name": "students/a@campus.edu", "fields": student_fields("100000", "a@campus.edu") },
                        { "name": "students/broken", "fields": { "id": { "geoPointValue": {} } } }
                    ],
                    "nextPageToken": "page-2"
                })),
                Some(_) => Json(json!({
                    "documents": [
                        { "name": "students/b@campus.edu", "fields": student_fields("100001", "b@campus.edu") }
                    ]
                })),
            }
        }

        async fn write(
            State(backend): State<Backend>,
            Path(id): Path<String>,
            Json(body): Json<Value>,
        ) -> (StatusCode, Json<Value>) {
            backend.writes.lock().await.push((id, body.clone()));
            if backend.unavailable {
                (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "error": "backend down" })))
            } else {
                (StatusCode::OK, Json(body))
            }
        }

        async fn serve(backend: Backend) -> String {
            let app = Router::new()
                .route(COLLECTION, get(list))
                .route(&format!("{}/:id", COLLECTION), patch(write))
                .with_state(backend);
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });
            format!("http://{}", addr)
        }

        fn store(base_url: String) -> FirestoreStore {
            FirestoreStore::new(&StoreConfig {
                base_url,
                project_id: "campus".to_string(),
                database: "db".to_string(),
                collection: "students".to_string(),
                access_token: Some("secret-token".to_string()),
                timeout_secs: 5,
                page_size: 2,
                ..StoreConfig::default()
            })
            .unwrap()
        }

        fn document(email: &str) -> StudentDocument {
            StudentDocument {
                id: 100002,
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                email: email.to_string(),
                password: "engine".to_string(),
                current_books: vec!["9780441013593".to_string()],
                loans: Vec::new(),
            }
        }

        #[tokio::test]
        async fn test_fetch_all_follows_page_tokens() {
            let backend = Backend::default();
            let store = store(serve(backend.clone()).await);

            let students = store.fetch_all().await.unwrap();

            let emails: Vec<_> = students.iter().map(|s| s.email.as_str()).collect();
            assert_eq!(emails, vec!["a@campus.edu", "b@campus.edu"]);

            let requests = backend.page_requests.lock().await;
            assert_eq!(requests.len(), 2);
            assert_eq!(requests[0].get("pageSize").map(String::as_str), Some("2"));
            assert!(requests[0].get("pageToken").is_none());
            assert_eq!(requests[1].get("pageToken").map(String::as_str), Some("page-2"));

            let tokens = backend.tokens.lock().await;
            assert!(tokens
                .iter()
                .all(|t| t.as_deref() == Some("Bearer secret-token")));
        }

        #[tokio::test]
        async fn test_upsert_patches_document_under_lowercased_email() {
            let backend = Backend::default();
            let store = store(serve(backend.clone()).await);

            store.upsert(&document("Ada@Campus.edu")).await.unwrap();

            let writes = backend.writes.lock().await;
            assert_eq!(writes.len(), 1);
            let (id, body) = &writes[0];
            assert_eq!(id, "ada@campus.edu");
            assert_eq!(body["fields"]["email"], json!({ "stringValue": "Ada@Campus.edu" }));
            assert_eq!(body["fields"]["id"], json!({ "integerValue": "100002" }));
            assert_eq!(
                body["fields"]["currentBooks"]["arrayValue"]["values"][0],
                json!({ "stringValue": "9780441013593" })
            );
        }

        #[tokio::test]
        async fn test_unavailable_backend_is_retryable() {
            let backend = Backend {
                unavailable: true,
                ..Backend::default()
            };
            let store = store(serve(backend.clone()).await);

            let err = store.upsert(&document("ada@campus.edu")).await.unwrap_err();

            assert!(matches!(&err, StoreError::Retryable(reason) if reason.starts_with("HTTP 503")));
            assert_eq!(backend.writes.lock().await.len(), 1);
        }

        #[tokio::test]
        async fn test_unreachable_backend_is_retryable() {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            drop(listener);
            let store = store(format!("http://{}", addr));

            let err = store.fetch_all().await.unwrap_err();

            assert!(err.is_retryable());
        }

        #[tokio::test]
        async fn test_missing_collection_is_permanent() {
            let base_url = serve(Backend::default()).await;
            let store = FirestoreStore::new(&StoreConfig {
                base_url,
                project_id: "campus".to_string(),
                database: "db".to_string(),
                collection: "archived".to_string(),
                ..StoreConfig::default()
            })
            .unwrap();

            let err = store.fetch_all().await.unwrap_err();

            assert!(!err.is_retryable());
            assert!(matches!(err, StoreError::Permanent(reason) if reason.starts_with("HTTP 404")));
        }
    }
}
