//! HTTP implementation of the resource contract
//!
//! [`HttpResourceApi`] talks to the school-management REST API with
//! `reqwest`. Tenant scoping (`X-Company-Id`) and the bearer token come from
//! [`ApiConfig`] and are added to every request.
//!
//! Failures map onto the error taxonomy:
//!
//! | Outcome | Error |
//! |---------|-------|
//! | connect / timeout / 5xx | `Transient` |
//! | 404 | `NotFound` |
//! | 422 with field errors | `Validation` |
//! | other 4xx | `Rejected` |
//! | unreadable body | `Decode` |

use campus_core::{
    ApiConfig, ConsoleError, ConsoleResult, Entity, EntityId, ListPage, Payload, QueryKey,
    Resource, ResourceApi, WireListResponse,
};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;

/// Header carrying the tenant id
pub const COMPANY_HEADER: &str = "X-Company-Id";

// ============================================================================
// Error bodies
// ============================================================================

/// Error body as the API sends it
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    /// Field → message (or list of messages)
    #[serde(default)]
    errors: Option<BTreeMap<String, Value>>,
}

/// Single records come bare or wrapped in `{"data": ...}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EntityBody {
    Wrapped { data: Entity },
    Bare(Entity),
}

impl From<EntityBody> for Entity {
    fn from(body: EntityBody) -> Self {
        match body {
            EntityBody::Wrapped { data } => data,
            EntityBody::Bare(entity) => entity,
        }
    }
}

/// Map a non-success response onto the error taxonomy
fn status_error(
    status: StatusCode,
    body: &str,
    resource: Resource,
    id: Option<EntityId>,
) -> ConsoleError {
    if status.is_server_error() {
        return ConsoleError::transient(format!("server returned {status}"));
    }
    if let (StatusCode::NOT_FOUND, Some(id)) = (status, id) {
        return ConsoleError::NotFound {
            resource: resource.display_name().to_string(),
            id,
        };
    }

    let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();
    if status == StatusCode::UNPROCESSABLE_ENTITY {
        if let Some(errors) = parsed.errors.filter(|e| !e.is_empty()) {
            let fields = errors
                .into_iter()
                .map(|(field, value)| {
                    let message = match value {
                        Value::String(s) => s,
                        Value::Array(items) => items
                            .first()
                            .and_then(Value::as_str)
                            .unwrap_or("Invalid value")
                            .to_string(),
                        other => other.to_string(),
                    };
                    (field, message)
                })
                .collect();
            return ConsoleError::validation(fields);
        }
    }

    let message = parsed
        .message
        .or(parsed.error)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request rejected")
                .to_string()
        });
    ConsoleError::rejected(status.as_u16(), message)
}

fn transport_error(err: reqwest::Error) -> ConsoleError {
    if err.is_decode() {
        ConsoleError::Decode(err.to_string())
    } else {
        ConsoleError::transient(err.to_string())
    }
}

// ============================================================================
// Client
// ============================================================================

/// Resource API over HTTP
#[derive(Debug, Clone)]
pub struct HttpResourceApi {
    client: Client,
    base_url: String,
    company_id: Option<String>,
    token: Option<String>,
}

impl HttpResourceApi {
    /// Build a client from the `[api]` configuration
    pub fn new(config: &ApiConfig) -> ConsoleResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ConsoleError::config(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            company_id: config.company_id.clone(),
            token: config.token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL of a resource collection or record
    pub fn url(&self, resource: Resource, id: Option<EntityId>) -> String {
        match id {
            Some(id) => format!("{}/{}/{id}", self.base_url, resource.path()),
            None => format!("{}/{}", self.base_url, resource.path()),
        }
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        let mut req = self.client.request(method, url);
        if let Some(company) = &self.company_id {
            req = req.header(COMPANY_HEADER, company);
        }
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        req
    }

    async fn send(&self, req: RequestBuilder) -> ConsoleResult<Response> {
        req.send().await.map_err(transport_error)
    }

    /// Check the status and decode a success body
    async fn decode<T: DeserializeOwned>(
        &self,
        response: Response,
        resource: Resource,
        id: Option<EntityId>,
    ) -> ConsoleResult<T> {
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(status_error(status, &body, resource, id));
        }
        serde_json::from_str(&body).map_err(|e| ConsoleError::Decode(e.to_string()))
    }
}

impl ResourceApi for HttpResourceApi {
    async fn list(&self, key: &QueryKey) -> ConsoleResult<ListPage> {
        let url = self.url(key.resource, None);
        tracing::debug!(%key, "GET list");
        let req = self.request(Method::GET, url).query(&key.query_params());
        let response = self.send(req).await?;
        let body: WireListResponse = self.decode(response, key.resource, None).await?;
        Ok(body.into_page(key.pagination))
    }

    async fn get(&self, resource: Resource, id: EntityId) -> ConsoleResult<Entity> {
        let req = self.request(Method::GET, self.url(resource, Some(id)));
        let response = self.send(req).await?;
        let body: EntityBody = self.decode(response, resource, Some(id)).await?;
        Ok(body.into())
    }

    async fn create(&self, resource: Resource, payload: &Payload) -> ConsoleResult<Entity> {
        let req = self.request(Method::POST, self.url(resource, None)).json(payload);
        let response = self.send(req).await?;
        let body: EntityBody = self.decode(response, resource, None).await?;
        Ok(body.into())
    }

    async fn update(
        &self,
        resource: Resource,
        id: EntityId,
        payload: &Payload,
    ) -> ConsoleResult<Entity> {
        let req = self
            .request(Method::PATCH, self.url(resource, Some(id)))
            .json(payload);
        let response = self.send(req).await?;
        let body: EntityBody = self.decode(response, resource, Some(id)).await?;
        Ok(body.into())
    }

    async fn delete(&self, resource: Resource, id: EntityId) -> ConsoleResult<()> {
        let req = self.request(Method::DELETE, self.url(resource, Some(id)));
        let response = self.send(req).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &body, resource, Some(id)))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn api(base_url: &str) -> HttpResourceApi {
        HttpResourceApi::new(&ApiConfig {
            base_url: base_url.to_string(),
            timeout_secs: 2,
            company_id: Some("42".to_string()),
            token: Some("secret".to_string()),
        })
        .unwrap()
    }

    #[test]
    fn test_urls() {
        let api = api("http://school.test/api/");
        assert_eq!(api.base_url(), "http://school.test/api");
        assert_eq!(
            api.url(Resource::SchoolYearPeriod, None),
            "http://school.test/api/school-year-periods"
        );
        assert_eq!(api.url(Resource::Class, Some(7)), "http://school.test/api/classes/7");
    }

    #[test]
    fn test_request_carries_tenant_and_token() {
        let api = api("http://school.test");
        let req = api
            .request(Method::GET, api.url(Resource::Level, None))
            .build()
            .unwrap();
        assert_eq!(req.headers()[COMPANY_HEADER], "42");
        assert_eq!(req.headers()[reqwest::header::AUTHORIZATION], "Bearer secret");
    }

    #[test]
    fn test_list_query_string() {
        let api = api("http://school.test");
        let key = QueryKey::first_page(Resource::Level, 5)
            .unwrap()
            .with_search(" L1 ");
        let req = api
            .request(Method::GET, api.url(key.resource, None))
            .query(&key.query_params())
            .build()
            .unwrap();
        assert_eq!(req.url().query(), Some("page=1&limit=5&search=L1"));
    }

    #[test]
    fn test_status_mapping() {
        let server = status_error(StatusCode::BAD_GATEWAY, "", Resource::Class, None);
        assert!(server.is_transient());

        let missing = status_error(StatusCode::NOT_FOUND, "", Resource::Class, Some(3));
        assert!(matches!(missing, ConsoleError::NotFound { id: 3, .. }));

        let conflict = status_error(
            StatusCode::CONFLICT,
            r#"{"message": "Email already in use"}"#,
            Resource::Administrator,
            None,
        );
        assert!(conflict.is_conflict());
        assert_eq!(conflict.user_message(), "Email already in use");

        let forbidden = status_error(StatusCode::FORBIDDEN, "<html>", Resource::Class, None);
        assert_eq!(forbidden.user_message(), "Forbidden");
    }

    #[test]
    fn test_field_errors_from_server() {
        let err = status_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"errors": {"email": ["has already been taken"], "name": "too short"}}"#,
            Resource::Administrator,
            None,
        );
        let fields = err.field_errors().unwrap();
        assert_eq!(fields["email"], "has already been taken");
        assert_eq!(fields["name"], "too short");
    }

    #[test]
    fn test_entity_body_shapes() {
        let bare: EntityBody = serde_json::from_str(r#"{"id": 1, "name": "Sciences"}"#).unwrap();
        let wrapped: EntityBody =
            serde_json::from_str(r#"{"data": {"id": 1, "name": "Sciences"}}"#).unwrap();
        assert_eq!(Entity::from(bare), Entity::from(wrapped));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transient() {
        let api = api("http://127.0.0.1:1");
        let key = QueryKey::first_page(Resource::Program, 10).unwrap();
        let err = api.list(&key).await.unwrap_err();
        assert!(err.is_transient());
    }
}
