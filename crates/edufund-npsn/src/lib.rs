//! # edufund-npsn: NPSN Registry Client
//!
//! Verifies a school's NPSN against the public school registry. The registry
//! is queried with an unauthenticated `GET {base_url}?npsn={npsn}` and
//! answers with
//!
//! ```json
//! { "data": { "satuanPendidikan": { "nama": "SD Negeri 1 Contoh" } } }
//! ```
//!
//! A present, non-empty `nama` means the NPSN is verified. Any other shape,
//! or a 404, means "not verified". Transport failures and 5xx responses are
//! returned as [`NpsnError`]; callers decide how to degrade. There is no
//! retry and no caching.

pub mod config;
pub mod error;

pub use config::NpsnConfig;
pub use error::NpsnError;

use std::time::Duration;

use edufund_core::Npsn;
use serde::{Deserialize, Serialize};

/// Outcome of a registry lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpsnLookup {
    pub npsn: Npsn,
    pub verified: bool,
    /// School name as registered, when verified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl NpsnLookup {
    /// The result used when a lookup could not be completed.
    pub fn unverified(npsn: Npsn) -> Self {
        Self {
            npsn,
            verified: false,
            name: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NpsnClient {
    http: reqwest::Client,
    base_url: url::Url,
}

impl NpsnClient {
    pub fn new(config: NpsnConfig) -> Result<Self, NpsnError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NpsnError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;
        Ok(Self {
            http,
            base_url: config.base_url,
        })
    }

    pub fn base_url(&self) -> &url::Url {
        &self.base_url
    }

    /// Look up an NPSN in the registry.
    pub async fn lookup(&self, npsn: &Npsn) -> Result<NpsnLookup, NpsnError> {
        let endpoint = format!("GET {}", self.base_url.path());

        let resp = self
            .http
            .get(self.base_url.clone())
            .query(&[("npsn", npsn.as_str())])
            .send()
            .await
            .map_err(|e| NpsnError::Http {
                endpoint: endpoint.clone(),
                source: e,
            })?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!(npsn = %npsn, "NPSN not found in registry");
            return Ok(NpsnLookup::unverified(npsn.clone()));
        }

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(NpsnError::ApiError {
                endpoint,
                status,
                body,
            });
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| NpsnError::Deserialization { endpoint, source: e })?;

        Ok(interpret(npsn, &body))
    }
}

/// Map a registry response body to a lookup result.
pub fn interpret(npsn: &Npsn, body: &serde_json::Value) -> NpsnLookup {
    let name = body
        .pointer("/data/satuanPendidikan/nama")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(String::from);

    NpsnLookup {
        npsn: npsn.clone(),
        verified: name.is_some(),
        name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn npsn() -> Npsn {
        Npsn::new("20100123").unwrap()
    }

    #[test]
    fn interpret_verified_body() {
        let body = json!({ "data": { "satuanPendidikan": { "nama": "SD Negeri 1 Contoh" } } });
        let res = interpret(&npsn(), &body);
        assert!(res.verified);
        assert_eq!(res.name.as_deref(), Some("SD Negeri 1 Contoh"));
    }

    #[test]
    fn interpret_missing_path_is_unverified() {
        for body in [
            json!({}),
            json!({ "data": null }),
            json!({ "data": { "satuanPendidikan": null } }),
            json!({ "data": { "satuanPendidikan": { "nama": "  " } } }),
            json!({ "data": { "satuanPendidikan": { "nama": 42 } } }),
        ] {
            let res = interpret(&npsn(), &body);
            assert!(!res.verified, "verified from {body}");
            assert!(res.name.is_none());
        }
    }

    #[test]
    fn unverified_serializes_without_name() {
        let json = serde_json::to_value(NpsnLookup::unverified(npsn())).unwrap();
        assert_eq!(json["npsn"], "20100123");
        assert_eq!(json["verified"], false);
        assert!(json.get("name").is_none());
    }
}
