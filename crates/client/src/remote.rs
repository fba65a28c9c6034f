//! Authenticated HTTP transport for the Switcher API.

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use switcher_core::context::Context;
use switcher_core::entry::Entry;
use switcher_core::error::SwitcherError;
use switcher_core::result::ResultDetail;
use switcher_core::snapshot::{Snapshot, SnapshotDocument};

/// Shared HTTP client for every remote operation. One instance is built
/// per context; connection pooling and keep-alive come with it.
#[derive(Debug, Clone)]
pub(crate) struct Remote {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    domain: String,
    component: String,
    environment: String,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: String,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct SnapshotVersionResponse {
    status: bool,
}

impl Remote {
    pub(crate) fn new(context: &Context) -> Result<Self, SwitcherError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| SwitcherError::Connection(e.to_string()))?;

        Ok(Self {
            http,
            base_url: context.url.clone(),
            api_key: context.api_key.clone(),
            domain: context.domain.clone(),
            component: context.component.clone(),
            environment: context.environment.clone(),
        })
    }

    /// Authenticate the component, returning `(token, exp)`.
    pub(crate) async fn auth(&self) -> Result<(String, i64), SwitcherError> {
        let url = format!("{}/criteria/auth", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("switcher-api-key", &self.api_key)
            .json(&serde_json::json!({
                "domain": self.domain,
                "component": self.component,
                "environment": self.environment,
            }))
            .send()
            .await
            .map_err(|e| SwitcherError::Connection(e.to_string()))?;

        if response.status().is_success() {
            let auth = response
                .json::<AuthResponse>()
                .await
                .map_err(|e| SwitcherError::Deserialization(e.to_string()))?;
            if auth.token.is_empty() {
                return Err(SwitcherError::AuthFailed(
                    "no token returned by the service".to_string(),
                ));
            }
            debug!(exp = auth.exp, "authenticated against the remote API");
            Ok((auth.token, auth.exp))
        } else if response.status() == StatusCode::UNAUTHORIZED {
            Err(SwitcherError::AuthFailed("invalid API key".to_string()))
        } else {
            Err(SwitcherError::AuthFailed(format!(
                "unexpected status: {}",
                response.status().as_u16()
            )))
        }
    }

    /// Evaluate a switcher remotely.
    pub(crate) async fn check_criteria(
        &self,
        token: &str,
        key: &str,
        entries: &[Entry],
        show_reason: bool,
    ) -> Result<ResultDetail, SwitcherError> {
        let url = format!(
            "{}/criteria?showReason={show_reason}&key={key}",
            self.base_url
        );
        let body = if entries.is_empty() {
            serde_json::json!({})
        } else {
            serde_json::json!({"entry": entries})
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| SwitcherError::Connection(e.to_string()))?;

        if response.status().is_success() {
            response
                .json::<ResultDetail>()
                .await
                .map_err(|e| SwitcherError::Deserialization(e.to_string()))
        } else {
            Err(SwitcherError::CriteriaFailed {
                status: response.status().as_u16(),
            })
        }
    }

    /// Ask the service whether `version` is still current.
    ///
    /// Returns `true` when the snapshot is up to date.
    pub(crate) async fn check_snapshot_version(
        &self,
        token: &str,
        version: i64,
    ) -> Result<bool, SwitcherError> {
        let url = format!("{}/criteria/snapshot_check/{version}", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| SwitcherError::Connection(e.to_string()))?;

        if response.status().is_success() {
            let check = response
                .json::<SnapshotVersionResponse>()
                .await
                .map_err(|e| SwitcherError::Deserialization(e.to_string()))?;
            Ok(check.status)
        } else {
            Err(SwitcherError::RemoteFailed {
                operation: "check_snapshot_version",
                status: response.status().as_u16(),
            })
        }
    }

    /// Fetch the full domain tree over GraphQL.
    pub(crate) async fn resolve_snapshot(&self, token: &str) -> Result<Snapshot, SwitcherError> {
        let url = format!("{}/graphql", self.base_url);
        let query = format!(
            "query domain {{ domain(name:\"{}\", environment:\"{}\", _component:\"{}\") {{ \
             name version activated \
             group {{ name activated \
             config {{ key activated \
             strategies {{ strategy activated operation values }} \
             relay {{ type activated }} \
             components }} }} }} }}",
            self.domain, self.environment, self.component
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&serde_json::json!({"query": query}))
            .send()
            .await
            .map_err(|e| SwitcherError::Connection(e.to_string()))?;

        if response.status().is_success() {
            let document = response
                .json::<SnapshotDocument>()
                .await
                .map_err(|e| SwitcherError::Deserialization(e.to_string()))?;
            Ok(Snapshot::from_document(document))
        } else {
            Err(SwitcherError::RemoteFailed {
                operation: "resolve_snapshot",
                status: response.status().as_u16(),
            })
        }
    }

    /// Probe service health. Used while in silent mode to decide whether
    /// a fresh authentication is worth attempting.
    pub(crate) async fn check_health(&self) -> bool {
        let url = format!("{}/check", self.base_url);
        match self.http.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}
