//! Minimal REST client for the Kubernetes API server.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;

use super::client::ClusterClient;
use super::error::ClientError;
use super::types::{GroupVersionKind, ObjectDocument, ObjectListDocument, ObjectRef, ReconcilableObject, ResourceView};
use crate::config::ClusterConfig;
use crate::error::Result;

const MERGE_PATCH: &str = "application/merge-patch+json";

/// Keeps API error bodies from flooding the logs.
const MAX_ERROR_BODY_LENGTH: usize = 200;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct KubeHttpClient {
    http: Client,
    server: String,
    token: Option<SecretString>,
}

impl KubeHttpClient {
    pub fn new(
        server: impl Into<String>,
        token: Option<SecretString>,
        insecure_skip_tls_verify: bool,
    ) -> std::result::Result<Self, ClientError> {
        let http = Client::builder()
            .danger_accept_invalid_certs(insecure_skip_tls_verify)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            server: server.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn from_config(config: &ClusterConfig) -> Result<Self> {
        let token = config.token.resolve_optional()?;
        Ok(Self::new(&config.server, token, config.insecure_skip_tls_verify)?)
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.server, path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    async fn fetch(&self, object: &ObjectRef) -> std::result::Result<ObjectDocument, ClientError> {
        let path = resource_path(&object.gvk, Some(&object.namespace), Some(&object.name));
        let response = self.authorized(self.http.get(self.url(&path))).send().await?;
        let response = check_status(response, object).await?;
        Ok(response.json::<ObjectDocument>().await?)
    }
}

#[async_trait]
impl ClusterClient for KubeHttpClient {
    async fn get_reconcilable(&self, object: &ObjectRef) -> std::result::Result<ReconcilableObject, ClientError> {
        Ok(self.fetch(object).await?.into_reconcilable())
    }

    async fn annotate(&self, object: &ObjectRef, key: &str, value: &str) -> std::result::Result<(), ClientError> {
        let path = resource_path(&object.gvk, Some(&object.namespace), Some(&object.name));
        let patch = json!({ "metadata": { "annotations": { key: value } } });

        let request = self
            .http
            .patch(self.url(&path))
            .header(CONTENT_TYPE, MERGE_PATCH)
            .body(patch.to_string());
        let response = self.authorized(request).send().await?;
        check_status(response, object).await?;

        debug!("Annotated {} with {}={}", object, key, value);
        Ok(())
    }

    async fn list_labelled(
        &self,
        gvk: &GroupVersionKind,
        labels: &BTreeMap<String, String>,
    ) -> std::result::Result<Vec<ResourceView>, ClientError> {
        let path = resource_path(gvk, None, None);
        let mut request = self.http.get(self.url(&path));
        if !labels.is_empty() {
            request = request.query(&[("labelSelector", label_selector(labels))]);
        }

        let response = self.authorized(request).send().await?;
        let response = check_status(response, gvk).await?;
        let list = response.json::<ObjectListDocument>().await?;

        Ok(list.items.into_iter().map(|item| item.into_view(gvk)).collect())
    }

    async fn delete(&self, object: &ObjectRef) -> std::result::Result<(), ClientError> {
        let path = resource_path(&object.gvk, Some(&object.namespace), Some(&object.name));
        let response = self.authorized(self.http.delete(self.url(&path))).send().await?;
        check_status(response, object).await?;
        Ok(())
    }
}

async fn check_status(
    response: Response,
    what: &(dyn std::fmt::Display + Sync),
) -> std::result::Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(ClientError::NotFound(what.to_string()));
    }

    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Status {
        code: status.as_u16(),
        message: truncate(&body),
    })
}

fn truncate(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY_LENGTH) {
        Some((idx, _)) => format!("{}... (truncated)", &body[..idx]),
        None => body.to_string(),
    }
}

/// REST path for a collection (`name` = None) or a single object.
///
/// Without a namespace the collection spans all namespaces.
pub fn resource_path(gvk: &GroupVersionKind, namespace: Option<&str>, name: Option<&str>) -> String {
    let mut path = if gvk.group.is_empty() {
        format!("/api/{}", gvk.version)
    } else {
        format!("/apis/{}/{}", gvk.group, gvk.version)
    };

    if let Some(ns) = namespace.filter(|ns| !ns.is_empty()) {
        path.push_str("/namespaces/");
        path.push_str(ns);
    }

    path.push('/');
    path.push_str(&plural(&gvk.kind));

    if let Some(name) = name {
        path.push('/');
        path.push_str(name);
    }
    path
}

/// Resource name for a kind, e.g. `Policy` -> `policies`.
pub fn plural(kind: &str) -> String {
    let lower = kind.to_lowercase();

    if lower == "endpoints" {
        return lower;
    }
    if let Some(stem) = lower.strip_suffix('y') {
        if !stem.ends_with(['a', 'e', 'i', 'o', 'u']) {
            return format!("{}ies", stem);
        }
    }
    if ["s", "x", "z", "ch", "sh"].iter().any(|s| lower.ends_with(s)) {
        return format!("{}es", lower);
    }
    format!("{}s", lower)
}

/// `k1=v1,k2=v2`, sorted by key.
pub fn label_selector(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}
