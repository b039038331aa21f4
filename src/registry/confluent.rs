//! Confluent schema registry REST client.

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{RegistryError, RegistryResult, Schema, SchemaRegistry};
use crate::protocol::SchemaId;

/// Registry URL used when none is configured.
pub const DEFAULT_REGISTRY_URL: &str = "http://localhost:8081";

const CONTENT_TYPE_VALUE: &str = "application/vnd.schemaregistry.v1+json";
const ACCEPT_VALUE: &str =
    "application/vnd.schemaregistry.v1+json, application/vnd.schemaregistry+json, application/json";

#[derive(Serialize)]
struct SchemaBody<'a> {
    schema: &'a str,
}

#[derive(Deserialize)]
struct RegisterResponse {
    id: SchemaId,
}

#[derive(Deserialize)]
struct ErrorBody {
    error_code: i32,
    message: String,
}

/// Blocking client for the Confluent schema registry API.
///
/// Requests are sent once; failures are returned to the caller.
#[derive(Debug, Clone)]
pub struct ConfluentSchemaRegistry {
    base_url: String,
    client: Client,
}

impl ConfluentSchemaRegistry {
    /// Create a client for the registry at `base_url`.
    pub fn new(base_url: &str) -> RegistryResult<Self> {
        Self::with_client(base_url, Client::builder().build()?)
    }

    /// Create a client reusing an existing HTTP client.
    pub fn with_client(base_url: &str, client: Client) -> RegistryResult<Self> {
        let base_url = base_url.trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(RegistryError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            base_url: base_url.to_string(),
            client,
        })
    }

    /// Registry base URL.
    #[inline]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&SchemaBody<'_>>,
    ) -> RegistryResult<T> {
        let url = join_url(&self.base_url, path);
        tracing::debug!("Schema registry request {} {}", method, url);

        let mut request = self
            .client
            .request(method, url)
            .header(CONTENT_TYPE, CONTENT_TYPE_VALUE)
            .header(ACCEPT, ACCEPT_VALUE);
        if let Some(body) = body {
            request = request.body(serde_json::to_vec(body)?);
        }

        let response = request.send()?;
        let status = response.status();
        let text = response.text()?;
        if !status.is_success() {
            return Err(parse_error_body(status.as_u16(), &text));
        }
        Ok(serde_json::from_str(&text)?)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Turn a non-2xx response body into an API error.
///
/// Bodies that are not registry error documents keep the HTTP status as code.
fn parse_error_body(status: u16, body: &str) -> RegistryError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(err) => RegistryError::Api {
            code: err.error_code,
            message: err.message,
        },
        Err(_) => RegistryError::Api {
            code: i32::from(status),
            message: body.to_string(),
        },
    }
}

impl SchemaRegistry for ConfluentSchemaRegistry {
    fn subjects(&self) -> RegistryResult<Vec<String>> {
        self.request(Method::GET, "subjects", None)
    }

    fn versions(&self, subject: &str) -> RegistryResult<Vec<i32>> {
        self.request(Method::GET, &format!("subjects/{}/versions", subject), None)
    }

    fn register_new_schema(&self, subject: &str, schema: &str) -> RegistryResult<SchemaId> {
        let response: RegisterResponse = self.request(
            Method::POST,
            &format!("subjects/{}/versions", subject),
            Some(&SchemaBody { schema }),
        )?;
        Ok(response.id)
    }

    fn is_registered(
        &self,
        subject: &str,
        schema: &str,
    ) -> RegistryResult<(bool, Option<Schema>)> {
        match self.request::<Schema>(
            Method::POST,
            &format!("subjects/{}", subject),
            Some(&SchemaBody { schema }),
        ) {
            Ok(found) => Ok((true, Some(found))),
            Err(err) if err.is_not_found() => Ok((false, None)),
            Err(err) => Err(err),
        }
    }

    fn schema_by_id(&self, id: SchemaId) -> RegistryResult<String> {
        let found: Schema = self.request(Method::GET, &format!("schemas/ids/{}", id), None)?;
        Ok(found.schema)
    }

    fn schema_by_subject(&self, subject: &str, version: i32) -> RegistryResult<Schema> {
        self.request(
            Method::GET,
            &format!("subjects/{}/versions/{}", subject, version),
            None,
        )
    }

    fn latest_schema(&self, subject: &str) -> RegistryResult<Schema> {
        self.request(
            Method::GET,
            &format!("subjects/{}/versions/latest", subject),
            None,
        )
    }

    fn delete_subject(&self, subject: &str) -> RegistryResult<Vec<i32>> {
        self.request(Method::DELETE, &format!("subjects/{}", subject), None)
    }
}
