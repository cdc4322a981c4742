use crate::models::{DiffEntry, WireNote};
use crate::sync::Backend;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

pub(crate) const TREE_PATH: &str = "/api/note/tree/";
pub(crate) const DIFF_PATH: &str = "/api/note/diff/";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApiErrorKind {
    Network,
    Http,
    Parse,
}

#[derive(Clone, Debug, Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl ApiError {
    fn network(e: reqwest::Error) -> Self {
        Self {
            kind: ApiErrorKind::Network,
            message: e.to_string(),
        }
    }

    pub(crate) fn parse(e: impl std::fmt::Display) -> Self {
        Self {
            kind: ApiErrorKind::Parse,
            message: e.to_string(),
        }
    }

    fn http(status: reqwest::StatusCode, body: String, ctx: &str) -> Self {
        Self {
            kind: ApiErrorKind::Http,
            message: format!("{ctx} ({status}): {body}"),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_FLUSH_INTERVAL_MS: u32 = 5000;
const DEFAULT_DEBOUNCE_MS: u32 = 5000;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct EnvConfig {
    pub api_url: String,

    /// Period of the background flush ticker.
    pub flush_interval_ms: u32,

    /// Quiet time after the last keystroke before a text Update is queued.
    pub debounce_ms: u32,
}

impl EnvConfig {
    /// Read overrides from `window.ENV`, falling back to defaults per field.
    ///
    /// Both `API_URL` and `api_url` are accepted for the backend origin.
    pub fn load() -> Self {
        let mut cfg = Self::default();

        let Some(env) = web_sys::window()
            .and_then(|w| w.get("ENV"))
            .filter(|env| !env.is_undefined() && env.is_object())
        else {
            return cfg;
        };

        let get = |key: &str| js_sys::Reflect::get(&env, &key.into()).ok();

        if let Some(url) = get("API_URL")
            .and_then(|v| v.as_string())
            .or_else(|| get("api_url").and_then(|v| v.as_string()))
        {
            cfg.api_url = url;
        }
        if let Some(ms) = get("FLUSH_INTERVAL_MS").and_then(|v| v.as_f64()) {
            if ms >= 1.0 {
                cfg.flush_interval_ms = ms as u32;
            }
        }
        if let Some(ms) = get("DEBOUNCE_MS").and_then(|v| v.as_f64()) {
            if ms >= 0.0 {
                cfg.debounce_ms = ms as u32;
            }
        }

        cfg
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            flush_interval_ms: DEFAULT_FLUSH_INTERVAL_MS,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    pub(crate) base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn from_config(cfg: &EnvConfig) -> Self {
        Self::new(cfg.api_url.clone())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, req: reqwest::RequestBuilder, ctx: &str) -> ApiResult<reqwest::Response> {
        let res = req.send().await.map_err(ApiError::network)?;

        if res.status().is_success() {
            Ok(res)
        } else {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            Err(ApiError::http(status, body, ctx))
        }
    }

    pub async fn get_tree(&self) -> ApiResult<Vec<WireNote>> {
        let res = self
            .send(self.http.get(self.url(TREE_PATH)), "Tree fetch failed")
            .await?;
        let data: serde_json::Value = res.json().await.map_err(ApiError::parse)?;
        Self::parse_tree_response(data)
    }

    pub async fn post_diff(&self, diff: &[DiffEntry]) -> ApiResult<()> {
        self.send(self.http.post(self.url(DIFF_PATH)).json(diff), "Diff rejected")
            .await?;
        Ok(())
    }

    /// Accepts `{"tree": [...]}` as well as a bare array.
    ///
    /// Items that do not parse are skipped so one bad row does not blank the
    /// whole outline.
    pub(crate) fn parse_tree_response(data: serde_json::Value) -> ApiResult<Vec<WireNote>> {
        let list = match data {
            serde_json::Value::Array(items) => items,
            serde_json::Value::Object(mut obj) => match obj.remove("tree") {
                Some(serde_json::Value::Array(items)) => items,
                Some(serde_json::Value::Null) | None => vec![],
                Some(other) => {
                    return Err(ApiError::parse(format!(
                        "tree payload is not a list: {other}"
                    )))
                }
            },
            other => {
                return Err(ApiError::parse(format!(
                    "unexpected tree response: {other}"
                )))
            }
        };

        let mut out: Vec<WireNote> = Vec::with_capacity(list.len());
        for item in list {
            match serde_json::from_value::<WireNote>(item) {
                Ok(note) => out.push(note),
                Err(e) => warn!(error = %e, "skipping unparsable root note"),
            }
        }
        Ok(out)
    }
}

impl Backend for ApiClient {
    async fn fetch_tree(&self) -> ApiResult<Vec<WireNote>> {
        self.get_tree().await
    }

    async fn apply_diff(&self, diff: &[DiffEntry]) -> ApiResult<()> {
        self.post_diff(diff).await
    }
}
