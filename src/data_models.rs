use std::fmt;
use std::str::FromStr;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CrawlError;

/// One extracted row. Key order is the order the crawl service emitted.
pub type Record = Map<String, Value>;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CrawlRequest {
    pub url: String,
    pub instructions: String,
}

impl CrawlRequest {
    /// Builds a request, rejecting anything that isn't an absolute http(s) URL.
    pub fn new(url: impl Into<String>, instructions: impl Into<String>) -> Result<Self, CrawlError> {
        let url: String = url.into();
        let url = url.trim().to_string();
        let parsed = Url::parse(&url).map_err(|e| CrawlError::InvalidUrl {
            url: url.clone(),
            reason: e.to_string(),
        })?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(CrawlError::InvalidUrl {
                reason: format!("unsupported scheme {}", parsed.scheme()),
                url,
            });
        }

        Ok(CrawlRequest {
            url,
            instructions: instructions.into(),
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CacheMode {
    Enabled,
    Disabled,
    ReadOnly,
    WriteOnly,
    #[default]
    Bypass,
}

impl FromStr for CacheMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "enabled" => Ok(CacheMode::Enabled),
            "disabled" => Ok(CacheMode::Disabled),
            "read_only" => Ok(CacheMode::ReadOnly),
            "write_only" => Ok(CacheMode::WriteOnly),
            "bypass" => Ok(CacheMode::Bypass),
            other => Err(format!(
                "unknown cache mode {other:?}, expected one of enabled, disabled, read_only, write_only, bypass"
            )),
        }
    }
}

impl fmt::Display for CacheMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CacheMode::Enabled => "enabled",
            CacheMode::Disabled => "disabled",
            CacheMode::ReadOnly => "read_only",
            CacheMode::WriteOnly => "write_only",
            CacheMode::Bypass => "bypass",
        };
        f.write_str(name)
    }
}

/// Options forwarded verbatim as the `config` object of a crawl call.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CrawlerOptions {
    pub word_count_threshold: u32,
    pub cache_mode: CacheMode,
    pub enable_rate_limiting: bool,
    pub verbose: bool,
    pub stream: bool,
}

impl Default for CrawlerOptions {
    fn default() -> Self {
        CrawlerOptions {
            word_count_threshold: 10,
            cache_mode: CacheMode::Bypass,
            enable_rate_limiting: false,
            verbose: false,
            // we only ever read a single JSON reply
            stream: false,
        }
    }
}

/// Body of `POST {api}/crawl`.
#[derive(Serialize, Debug)]
pub struct CrawlPayload<'a> {
    pub url: &'a str,
    pub instructions: &'a str,
    pub config: &'a CrawlerOptions,
}

/// Raw reply from the crawl service. Different deployments disagree on field
/// names, so everything but `success` is optional.
#[derive(Deserialize, Debug, Default)]
pub struct RemoteCrawlResponse {
    #[serde(default)]
    pub success: bool,
    pub markdown: Option<String>,
    pub html: Option<String>,
    pub extracted_content: Option<Value>,
    pub data: Option<Value>,
    pub error_message: Option<String>,
    pub error: Option<String>,
}

impl RemoteCrawlResponse {
    pub fn error_text(&self) -> Option<String> {
        self.error_message
            .clone()
            .or_else(|| self.error.clone())
            .filter(|m| !m.trim().is_empty())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct CrawlResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Record>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<RemoteCrawlResponse> for CrawlResult {
    fn from(remote: RemoteCrawlResponse) -> Self {
        let error = remote.error_text();
        let data = remote
            .extracted_content
            .or(remote.data)
            .and_then(records_from_value);

        CrawlResult {
            success: remote.success,
            markdown: remote.markdown,
            html: remote.html,
            data,
            error,
        }
    }
}

/// Turns whatever the service put in its content field into rows.
///
/// Strings are treated as embedded JSON. Arrays map element-to-row, a lone
/// object becomes a single row, scalars inside arrays are wrapped as `{"value": ..}`.
pub fn records_from_value(value: Value) -> Option<Vec<Record>> {
    match value {
        Value::Null => None,
        Value::String(raw) => {
            if raw.trim().is_empty() {
                return None;
            }
            match serde_json::from_str::<Value>(&raw) {
                Ok(Value::String(_)) => None,
                Ok(parsed) => records_from_value(parsed),
                Err(e) => {
                    log::warn!("extracted content is not JSON, leaving data empty: {e}");
                    None
                }
            }
        }
        Value::Array(items) => Some(
            items
                .into_iter()
                .map(|item| match item {
                    Value::Object(record) => record,
                    other => {
                        let mut record = Record::new();
                        record.insert("value".to_string(), other);
                        record
                    }
                })
                .collect(),
        ),
        Value::Object(record) => Some(vec![record]),
        Value::Bool(_) | Value::Number(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_accepts_http_urls_and_empty_instructions() {
        let req = CrawlRequest::new(" https://example.com/shop ", "").unwrap();
        assert_eq!(req.url, "https://example.com/shop");
        assert_eq!(req.instructions, "");
    }

    #[test]
    fn test_request_rejects_bad_urls() {
        assert!(matches!(
            CrawlRequest::new("example.com", "x"),
            Err(CrawlError::InvalidUrl { .. })
        ));
        assert!(matches!(
            CrawlRequest::new("ftp://example.com", "x"),
            Err(CrawlError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_cache_mode_parsing() {
        assert_eq!("bypass".parse::<CacheMode>(), Ok(CacheMode::Bypass));
        assert_eq!("Read-Only".parse::<CacheMode>(), Ok(CacheMode::ReadOnly));
        assert!("sometimes".parse::<CacheMode>().is_err());
        assert_eq!(CacheMode::WriteOnly.to_string(), "write_only");
    }

    #[test]
    fn test_payload_shape() {
        let options = CrawlerOptions::default();
        let payload = CrawlPayload {
            url: "https://example.com",
            instructions: "prices",
            config: &options,
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "url": "https://example.com",
                "instructions": "prices",
                "config": {
                    "word_count_threshold": 10,
                    "cache_mode": "bypass",
                    "enable_rate_limiting": false,
                    "verbose": false,
                    "stream": false
                }
            })
        );
    }

    #[test]
    fn test_records_from_embedded_json_string() {
        let records =
            records_from_value(Value::String(r#"[{"name":"a","price":1}]"#.to_string())).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["name"], json!("a"));
    }

    #[test]
    fn test_records_from_object_and_scalars() {
        let records = records_from_value(json!({"title": "Home"})).unwrap();
        assert_eq!(records, vec![json!({"title": "Home"}).as_object().unwrap().clone()]);

        let records = records_from_value(json!([1, {"a": 2}])).unwrap();
        assert_eq!(records[0]["value"], json!(1));
        assert_eq!(records[1]["a"], json!(2));

        assert!(records_from_value(json!(42)).is_none());
        assert!(records_from_value(Value::String("not json".to_string())).is_none());
    }

    #[test]
    fn test_result_prefers_extracted_content_and_keeps_order() {
        let remote: RemoteCrawlResponse = serde_json::from_value(json!({
            "success": true,
            "markdown": "# Shop",
            "extracted_content": "[{\"zeta\":1,\"alpha\":2}]",
            "data": [{"ignored": true}]
        }))
        .unwrap();
        let result = CrawlResult::from(remote);
        assert!(result.success);
        assert_eq!(result.markdown.as_deref(), Some("# Shop"));
        let keys: Vec<_> = result.data.unwrap()[0].keys().cloned().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }
}
