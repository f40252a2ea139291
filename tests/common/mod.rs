#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{Value, json};

use supercrawl::client::CrawlApi;
use supercrawl::data_models::{CrawlRequest, CrawlResult, Record};
use supercrawl::error::CrawlError;

#[derive(Clone, Debug)]
pub enum Outcome {
    Records(Vec<Record>),
    RemoteFailure(Option<String>),
    ServerError,
}

/// Stands in for the crawl service: each URL gets a fixed delay and outcome.
#[derive(Default)]
pub struct ScriptedApi {
    script: HashMap<String, (Duration, Outcome)>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, url: &str, delay: Duration, outcome: Outcome) -> Self {
        self.script.insert(url.to_string(), (delay, outcome));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl CrawlApi for ScriptedApi {
    async fn crawl(&self, request: &CrawlRequest) -> Result<CrawlResult, CrawlError> {
        self.calls.lock().unwrap().push(request.url.clone());
        let (delay, outcome) = self
            .script
            .get(&request.url)
            .cloned()
            .unwrap_or((Duration::ZERO, Outcome::ServerError));

        tokio::time::sleep(delay).await;

        match outcome {
            Outcome::Records(records) => Ok(CrawlResult {
                success: true,
                markdown: Some(format!("# {}", request.url)),
                data: Some(records),
                ..CrawlResult::default()
            }),
            Outcome::RemoteFailure(message) => Err(CrawlError::Remote { message }),
            Outcome::ServerError => Err(CrawlError::Status {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: "boom".to_string(),
            }),
        }
    }
}

pub fn record(value: Value) -> Record {
    value.as_object().cloned().expect("record must be a JSON object")
}

pub fn sample_records() -> Vec<Record> {
    vec![record(json!({"a": 1, "b": "x"})), record(json!({"a": 2, "b": "y"}))]
}

pub fn request(url: &str) -> CrawlRequest {
    CrawlRequest::new(url, "extract everything").unwrap()
}
