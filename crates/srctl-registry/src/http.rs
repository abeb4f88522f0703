//! Live `reqwest`-backed implementation of [`TargetClient`] and
//! [`SourceClient`] against a Confluent-style Schema Registry REST API
//! (`spec.md` §6.2).

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use srctl_core::{
    ClientErrorKind, Reference, RegisterRequest, SourceClient, SourceSchema, SrctlError,
    TargetClient,
};
use std::time::Duration;

pub struct HttpRegistryClient {
    client: Client,
    base_url: String,
}

impl HttpRegistryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("reqwest client builder");
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[derive(Debug, Deserialize)]
struct RegistryErrorBody {
    #[serde(default)]
    error_code: Option<i32>,
    #[serde(default)]
    message: Option<String>,
}

/// Classifies an HTTP response into the tagged [`SrctlError`] variants
/// (`spec.md` §9's REDESIGN FLAG) so no other layer needs to inspect error
/// text again.
async fn classify_error(status: StatusCode, body_text: String) -> SrctlError {
    let message = serde_json::from_str::<RegistryErrorBody>(&body_text)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or(body_text);
    let code = status.as_u16();
    match code {
        400 => SrctlError::ClientError(ClientErrorKind::BadRequest, message),
        404 => SrctlError::ClientError(ClientErrorKind::NotFound, message),
        405 => SrctlError::ClientError(ClientErrorKind::MethodNotAllowed, message),
        409 => SrctlError::ClientError(ClientErrorKind::Conflict, message),
        422 => SrctlError::ClientError(ClientErrorKind::Unprocessable, message),
        400..=499 => SrctlError::ClientError(ClientErrorKind::Other, message),
        500..=599 => SrctlError::ServerError(code, message),
        _ => SrctlError::Transient(message),
    }
}

fn map_transport_error(e: reqwest::Error) -> SrctlError {
    SrctlError::Transient(e.to_string())
}

#[derive(Serialize)]
struct RegisterBody {
    schema: String,
    #[serde(rename = "schemaType")]
    schema_type: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    references: Vec<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "ruleSet")]
    rule_set: Option<Value>,
}

#[derive(Deserialize)]
struct RegisterResponse {
    id: i32,
}

#[derive(Serialize)]
struct ConfigBody<'a> {
    compatibility: &'a str,
}

#[derive(Serialize)]
struct ModeBody<'a> {
    mode: &'a str,
}

#[derive(Deserialize)]
struct SchemaVersionResponse {
    id: i32,
    schema: String,
    #[serde(default, rename = "schemaType")]
    schema_type: Option<String>,
    #[serde(default)]
    references: Vec<Reference>,
    #[serde(default)]
    metadata: Option<Value>,
    #[serde(default, rename = "ruleSet")]
    rule_set: Option<Value>,
}

#[async_trait]
impl TargetClient for HttpRegistryClient {
    async fn register_schema(
        &self,
        subject: &str,
        req: RegisterRequest,
    ) -> Result<i32, SrctlError> {
        let body = RegisterBody {
            schema: req.schema,
            schema_type: req.schema_type,
            references: req.references,
            id: req.id,
            metadata: req.metadata,
            rule_set: req.rule_set,
        };
        let resp = self
            .client
            .post(self.url(&format!("/subjects/{subject}/versions")))
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;
        if resp.status().is_success() {
            let parsed: RegisterResponse = resp.json().await.map_err(map_transport_error)?;
            Ok(parsed.id)
        } else {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            Err(classify_error(status, text).await)
        }
    }

    async fn delete_subject(&self, subject: &str, permanent: bool) -> Result<Vec<i32>, SrctlError> {
        let mut url = self.url(&format!("/subjects/{subject}"));
        if permanent {
            url.push_str("?permanent=true");
        }
        let resp = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(map_transport_error)?;
        if resp.status().is_success() {
            resp.json::<Vec<i32>>().await.map_err(map_transport_error)
        } else {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            Err(classify_error(status, text).await)
        }
    }

    async fn set_config(&self, compatibility: &str) -> Result<(), SrctlError> {
        let resp = self
            .client
            .put(self.url("/config"))
            .json(&ConfigBody { compatibility })
            .send()
            .await
            .map_err(map_transport_error)?;
        if resp.status().is_success() {
            Ok(())
        } else {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            Err(classify_error(status, text).await)
        }
    }

    async fn set_subject_config(
        &self,
        subject: &str,
        compatibility: &str,
    ) -> Result<(), SrctlError> {
        let resp = self
            .client
            .put(self.url(&format!("/config/{subject}")))
            .json(&ConfigBody { compatibility })
            .send()
            .await
            .map_err(map_transport_error)?;
        if resp.status().is_success() {
            Ok(())
        } else {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            Err(classify_error(status, text).await)
        }
    }

    async fn set_subject_mode(&self, subject: &str, mode: &str) -> Result<(), SrctlError> {
        let resp = self
            .client
            .put(self.url(&format!("/mode/{subject}")))
            .json(&ModeBody { mode })
            .send()
            .await
            .map_err(map_transport_error)?;
        if resp.status().is_success() {
            Ok(())
        } else {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            Err(classify_error(status, text).await)
        }
    }
}

#[async_trait]
impl SourceClient for HttpRegistryClient {
    async fn list_subjects(&self) -> Result<Vec<String>, SrctlError> {
        let resp = self
            .client
            .get(self.url("/subjects"))
            .send()
            .await
            .map_err(map_transport_error)?;
        if resp.status().is_success() {
            resp.json().await.map_err(map_transport_error)
        } else {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            Err(classify_error(status, text).await)
        }
    }

    async fn list_versions(&self, subject: &str) -> Result<Vec<i32>, SrctlError> {
        let resp = self
            .client
            .get(self.url(&format!("/subjects/{subject}/versions")))
            .send()
            .await
            .map_err(map_transport_error)?;
        if resp.status().is_success() {
            resp.json().await.map_err(map_transport_error)
        } else {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            Err(classify_error(status, text).await)
        }
    }

    async fn get_schema(&self, subject: &str, version: i32) -> Result<SourceSchema, SrctlError> {
        let resp = self
            .client
            .get(self.url(&format!("/subjects/{subject}/versions/{version}")))
            .send()
            .await
            .map_err(map_transport_error)?;
        if resp.status().is_success() {
            let parsed: SchemaVersionResponse = resp.json().await.map_err(map_transport_error)?;
            Ok(SourceSchema {
                id: parsed.id,
                schema: parsed.schema,
                schema_type: parsed.schema_type.filter(|t| !t.is_empty()).unwrap_or_else(|| "AVRO".to_string()),
                references: parsed.references,
                metadata: parsed.metadata,
                rule_set: parsed.rule_set,
            })
        } else {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            Err(classify_error(status, text).await)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn register_schema_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/subjects/u-v/versions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 7})))
            .mount(&server)
            .await;

        let client = HttpRegistryClient::new(server.uri());
        let id = client
            .register_schema(
                "u-v",
                RegisterRequest {
                    schema: "{}".to_string(),
                    schema_type: "AVRO".to_string(),
                    references: vec![],
                    id: None,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(id, 7);
    }

    #[tokio::test]
    async fn register_schema_conflict_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/subjects/u-v/versions"))
            .respond_with(ResponseTemplate::new(409).set_body_json(serde_json::json!({
                "error_code": 40901,
                "message": "Schema already registered with id 7"
            })))
            .mount(&server)
            .await;

        let client = HttpRegistryClient::new(server.uri());
        let err = client
            .register_schema(
                "u-v",
                RegisterRequest {
                    schema: "{}".to_string(),
                    schema_type: "AVRO".to_string(),
                    references: vec![],
                    id: Some(7),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_already_registered());
    }

    #[tokio::test]
    async fn delete_subject_not_found_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/subjects/gone"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "error_code": 40401,
                "message": "Subject not found."
            })))
            .mount(&server)
            .await;

        let client = HttpRegistryClient::new(server.uri());
        let err = client.delete_subject("gone", false).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn unprocessable_is_non_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/subjects/bad/versions"))
            .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
                "error_code": 42201,
                "message": "Invalid schema"
            })))
            .mount(&server)
            .await;

        let client = HttpRegistryClient::new(server.uri());
        let err = client
            .register_schema(
                "bad",
                RegisterRequest {
                    schema: "not a schema".to_string(),
                    schema_type: "AVRO".to_string(),
                    references: vec![],
                    id: None,
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn server_error_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/config/u-v"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
            .mount(&server)
            .await;

        let client = HttpRegistryClient::new(server.uri());
        let err = client
            .set_subject_config("u-v", "BACKWARD")
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
