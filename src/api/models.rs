use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CrawlSubmission {
    pub url: String,
    #[serde(default)]
    pub instructions: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct ExportParams {
    pub filename: Option<String>,
}
