use reqwest::{Client, Url};

use crate::config::ApiSettings;
use crate::data_models::{CrawlPayload, CrawlRequest, CrawlResult, CrawlerOptions, RemoteCrawlResponse};
use crate::error::CrawlError;

/// Anything that can turn a [`CrawlRequest`] into a [`CrawlResult`].
///
/// The session and the HTTP layer only see this trait, so tests can swap the
/// remote service for a scripted one.
pub trait CrawlApi: Send + Sync + 'static {
    fn crawl(
        &self,
        request: &CrawlRequest,
    ) -> impl Future<Output = Result<CrawlResult, CrawlError>> + Send;
}

/// Client for a hosted crawl service exposing `POST /crawl`.
#[derive(Debug, Clone)]
pub struct CrawlClient {
    http: Client,
    endpoint: Url,
    api_key: Option<String>,
    options: CrawlerOptions,
}

impl CrawlClient {
    pub fn new(settings: &ApiSettings) -> Result<Self, CrawlError> {
        let http = Client::builder()
            .timeout(settings.timeout)
            .user_agent(concat!("supercrawl/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(CrawlClient {
            http,
            endpoint: crawl_endpoint(&settings.base_url)?,
            api_key: settings.api_key.clone(),
            options: settings.options.clone(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Crawl `url` following `instructions`.
    pub async fn crawl_url(&self, url: &str, instructions: &str) -> Result<CrawlResult, CrawlError> {
        let request = CrawlRequest::new(url, instructions)?;
        self.crawl(&request).await
    }

    async fn send(&self, request: &CrawlRequest) -> Result<CrawlResult, CrawlError> {
        let payload = CrawlPayload {
            url: &request.url,
            instructions: &request.instructions,
            config: &self.options,
        };

        let mut builder = self.http.post(self.endpoint.clone()).json(&payload);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let res = builder.send().await.map_err(CrawlError::from_transport)?;
        let status = res.status();
        let body = res.text().await.map_err(CrawlError::from_transport)?;

        if !status.is_success() {
            return Err(CrawlError::Status { status, body });
        }

        let remote: RemoteCrawlResponse = serde_json::from_str(&body)?;
        if !remote.success {
            return Err(CrawlError::Remote {
                message: remote.error_text(),
            });
        }

        Ok(CrawlResult::from(remote))
    }
}

impl CrawlApi for CrawlClient {
    async fn crawl(&self, request: &CrawlRequest) -> Result<CrawlResult, CrawlError> {
        log::info!("crawling url: {} via {}", request.url, self.endpoint);
        match self.send(request).await {
            Ok(result) => {
                log::info!(
                    "crawled {}: {} record(s)",
                    request.url,
                    result.data.as_ref().map_or(0, Vec::len)
                );
                Ok(result)
            }
            Err(e) => {
                log::error!("error crawling {}, error: {:#}", request.url, e);
                Err(e)
            }
        }
    }
}

/// `{base}/crawl`, tolerating a base with or without a trailing slash.
fn crawl_endpoint(base: &Url) -> Result<Url, CrawlError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("crawl").map_err(|e| CrawlError::InvalidUrl {
        url: base.to_string(),
        reason: e.to_string(),
    })
}
