//! Notification API client.
//!
//! Provides the HTTP client for the desktop notification endpoints and the
//! `NotificationApi` seam the store and the read-state synchronizer talk to.

use crate::config::InboxConfig;
use crate::error::AppError;
use crate::models::notification::{categorize, LocalizedText, NotificationId, NotificationMessage};
use reqwest::{header, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;

/// List endpoint path.
pub const LIST_ENDPOINT: &str = "/api/notification/list";

/// Mark-read endpoint path.
pub const READ_ENDPOINT: &str = "/api/notification/read";

/// Acknowledgement of a mark-read request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Ack {
    /// Ids that were sent.
    pub ids: Vec<NotificationId>,
}

/// Remote notification API.
///
/// Both calls are plain request/response; the caller decides when results are
/// applied.
pub trait NotificationApi: Send + Sync + 'static {
    /// Fetch the full notification list.
    fn list(&self) -> impl Future<Output = Result<Vec<NotificationMessage>, AppError>> + Send;

    /// Mark the given ids read. Repeated and already-read ids are accepted.
    fn mark_read(
        &self,
        ids: Vec<NotificationId>,
    ) -> impl Future<Output = Result<Ack, AppError>> + Send;
}

/// Notification item as returned by the list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiNotification {
    pub metadata: ApiMetadata,
    #[serde(default)]
    pub spec: ApiSpec,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMetadata {
    pub name: String,
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub namespace: String,
    pub creation_timestamp: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSpec {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub desktop_popup: bool,
    #[serde(default)]
    pub i18ns: BTreeMap<String, ApiI18n>,
}

/// Per-language override; each field may be missing independently.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiI18n {
    pub from: Option<String>,
    pub message: Option<String>,
    pub title: Option<String>,
}

/// List payload: `{"items": [...]}`.
///
/// `items` is required: an error body answered with a 2xx status must not
/// parse as an empty inbox.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiNotificationList {
    pub items: Vec<ApiNotification>,
}

/// The desktop API wraps payloads as `{"code": 200, "data": {...}}`; older
/// deployments return the payload bare.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListResponse {
    Envelope { data: ApiNotificationList },
    Bare(ApiNotificationList),
}

impl ListResponse {
    pub fn into_items(self) -> Vec<ApiNotification> {
        match self {
            Self::Envelope { data } => data.items,
            Self::Bare(list) => list.items,
        }
    }
}

#[derive(Debug, Serialize)]
struct ReadRequest<'a> {
    name: &'a [NotificationId],
}

/// The `isRead` label is a JSON boolean encoded as a string.
fn parse_is_read(labels: &BTreeMap<String, String>) -> bool {
    labels
        .get("isRead")
        .and_then(|v| serde_json::from_str::<bool>(v.trim()).ok())
        .unwrap_or(false)
}

fn localized(
    default: String,
    i18ns: &BTreeMap<String, ApiI18n>,
    field: impl Fn(&ApiI18n) -> Option<&String>,
) -> LocalizedText {
    i18ns
        .iter()
        .fold(LocalizedText::new(default), |text, (lang, fields)| {
            match field(fields) {
                Some(value) => text.with_override(lang.clone(), value.clone()),
                None => text,
            }
        })
}

impl ApiNotification {
    /// Convert into the inbox model.
    pub fn into_message(self, billing_sender: &str) -> NotificationMessage {
        let ApiNotification { metadata, spec } = self;
        let is_read = parse_is_read(&metadata.labels);
        let created_at = metadata
            .creation_timestamp
            .as_deref()
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&chrono::Utc));
        let category = categorize(&spec.from, billing_sender);

        NotificationMessage {
            id: metadata.name,
            uid: metadata.uid,
            namespace: metadata.namespace,
            created_at,
            is_read,
            timestamp: spec.timestamp,
            title: localized(spec.title, &spec.i18ns, |f| f.title.as_ref()),
            body: localized(spec.message, &spec.i18ns, |f| f.message.as_ref()),
            sender: localized(spec.from, &spec.i18ns, |f| f.from.as_ref()),
            triggers_popup: spec.desktop_popup,
            category,
        }
    }
}

/// HTTP client for the notification endpoints.
#[derive(Debug, Clone)]
pub struct NotificationClient {
    client: Client,
    base_url: String,
    billing_sender: String,
}

impl NotificationClient {
    /// Create a new client from the inbox configuration.
    pub fn new(config: &InboxConfig) -> Result<Self, AppError> {
        if config.base_url.trim().is_empty() {
            return Err(AppError::invalid_input_field(
                "Base URL is required",
                "base_url",
            ));
        }

        let mut headers = header::HeaderMap::new();
        if let Some(auth) = &config.authorization {
            let value = header::HeaderValue::from_str(auth).map_err(|_| {
                AppError::invalid_input_field("Invalid authorization header", "authorization")
            })?;
            headers.insert(header::AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            billing_sender: config.billing_sender.clone(),
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Turn a non-success response into an error; parse JSON on success.
    async fn handle_response<T: DeserializeOwned>(
        response: Response,
        endpoint: &str,
    ) -> Result<T, AppError> {
        let status = response.status();

        if status.is_success() {
            response
                .json::<T>()
                .await
                .map_err(|e| AppError::fetch(format!("Failed to parse response: {}", e)))
        } else {
            Err(Self::status_error(status, response, endpoint).await)
        }
    }

    async fn status_error(status: StatusCode, response: Response, endpoint: &str) -> AppError {
        let status_code = status.as_u16();
        let body = response.text().await.unwrap_or_default();
        let body_message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| {
                v.get("message")
                    .or_else(|| v.get("error"))
                    .map(|m| match m.as_str() {
                        Some(s) => s.to_string(),
                        None => m.to_string(),
                    })
            });

        let message = match (status, &body_message) {
            (StatusCode::UNAUTHORIZED, _) => "Session expired".to_string(),
            (StatusCode::FORBIDDEN, _) => "Access denied".to_string(),
            (StatusCode::NOT_FOUND, _) => "Resource not found".to_string(),
            (StatusCode::TOO_MANY_REQUESTS, _) => "Rate limit exceeded".to_string(),
            (_, Some(msg)) => msg.clone(),
            _ => format!("Request failed ({}): {}", status_code, body),
        };

        AppError::fetch_full(message, status_code, endpoint)
    }

    /// Fetch and convert the notification list.
    pub async fn fetch_notifications(&self) -> Result<Vec<NotificationMessage>, AppError> {
        let response = self.client.get(self.api_url(LIST_ENDPOINT)).send().await?;
        let list: ListResponse = Self::handle_response(response, LIST_ENDPOINT).await?;

        Ok(list
            .into_items()
            .into_iter()
            .map(|item| item.into_message(&self.billing_sender))
            .collect())
    }

    async fn send_read(&self, ids: &[NotificationId]) -> Result<(), AppError> {
        let response = self
            .client
            .post(self.api_url(READ_ENDPOINT))
            .json(&ReadRequest { name: ids })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::status_error(status, response, READ_ENDPOINT).await)
        }
    }

    /// Post a mark-read request. Every failure is reported as a mutation error.
    pub async fn post_read(&self, ids: Vec<NotificationId>) -> Result<Ack, AppError> {
        match self.send_read(&ids).await {
            Ok(()) => Ok(Ack { ids }),
            Err(e) => Err(e.into_mutation(ids.len())),
        }
    }
}

impl NotificationApi for NotificationClient {
    async fn list(&self) -> Result<Vec<NotificationMessage>, AppError> {
        self.fetch_notifications().await.map_err(AppError::into_fetch)
    }

    async fn mark_read(&self, ids: Vec<NotificationId>) -> Result<Ack, AppError> {
        self.post_read(ids).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "code": 200,
        "data": {
            "items": [
                {
                    "metadata": {
                        "name": "debt-1",
                        "uid": "u-1",
                        "namespace": "ns-alice",
                        "creationTimestamp": "2024-01-15T10:30:00Z",
                        "labels": { "isRead": "false" }
                    },
                    "spec": {
                        "from": "Debt-System",
                        "message": "Your balance is low",
                        "title": "Balance warning",
                        "timestamp": 1705314600,
                        "desktopPopup": true,
                        "i18ns": { "zh": { "title": "余额预警", "from": "", "message": "余额不足" } }
                    }
                },
                {
                    "metadata": { "name": "welcome", "labels": { "isRead": "true" } },
                    "spec": { "from": "Admin", "message": "Hi", "title": "Welcome", "timestamp": 1 }
                }
            ]
        }
    }"#;

    #[test]
    fn test_parse_envelope() {
        let list: ListResponse = serde_json::from_str(SAMPLE).unwrap();
        let messages: Vec<_> = list
            .into_items()
            .into_iter()
            .map(|i| i.into_message("Debt-System"))
            .collect();

        assert_eq!(messages.len(), 2);
        let debt = &messages[0];
        assert_eq!(debt.id, "debt-1");
        assert!(!debt.is_read);
        assert!(debt.triggers_popup);
        assert!(debt.is_billing());
        assert!(debt.created_at.is_some());
        assert_eq!(debt.title.resolve("zh"), "余额预警");
        // empty override falls back per field
        assert_eq!(debt.sender.resolve("zh"), "Debt-System");
        assert_eq!(debt.body.resolve("zh"), "余额不足");

        let welcome = &messages[1];
        assert!(welcome.is_read);
        assert!(!welcome.triggers_popup);
        assert_eq!(welcome.category, None);
    }

    #[test]
    fn test_parse_bare_list() {
        let list: ListResponse = serde_json::from_str(
            r#"{"items": [{"metadata": {"name": "a"}, "spec": {"timestamp": 5}}]}"#,
        )
        .unwrap();
        let items = list.into_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].metadata.name, "a");
    }

    #[test]
    fn test_payload_without_items_is_rejected() {
        let parse = |body: &str| serde_json::from_str::<ListResponse>(body);
        assert!(parse(r#"{"code":500,"message":"internal"}"#).is_err());
        assert!(parse(r#"{"code":200,"data":{}}"#).is_err());

        let empty: ListResponse = serde_json::from_str(r#"{"data":{"items":[]}}"#).unwrap();
        assert!(empty.into_items().is_empty());
    }

    #[test]
    fn test_parse_is_read_label() {
        let mut labels = BTreeMap::new();
        assert!(!parse_is_read(&labels));

        labels.insert("isRead".to_string(), "true".to_string());
        assert!(parse_is_read(&labels));

        labels.insert("isRead".to_string(), "garbage".to_string());
        assert!(!parse_is_read(&labels));
    }

    #[test]
    fn test_client_requires_base_url() {
        let err = NotificationClient::new(&InboxConfig::default()).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput { .. }));
    }

    #[test]
    fn test_read_request_body() {
        let ids = vec!["a".to_string(), "b".to_string()];
        let body = serde_json::to_string(&ReadRequest { name: &ids }).unwrap();
        assert_eq!(body, r#"{"name":["a","b"]}"#);
    }
}
