use axum::{
    Json,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::client::CrawlApi;
use crate::csv_export::{CSV_CONTENT_TYPE, DEFAULT_CSV_FILENAME, sanitize_filename, to_csv};
use crate::data_models::CrawlRequest;
use crate::lifecycle::{RequestState, Session};

use super::models::{CrawlSubmission, ExportParams};

pub async fn submit_crawl<C: CrawlApi>(
    State(session): State<Arc<Session<C>>>,
    Json(submission): Json<CrawlSubmission>,
) -> Result<(StatusCode, Json<RequestState>), (StatusCode, String)> {
    let request = CrawlRequest::new(submission.url, submission.instructions)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.user_message()))?;

    // the session owns the task from here on; the page polls for the outcome
    drop(session.submit(request));

    Ok((StatusCode::ACCEPTED, Json(session.snapshot())))
}

pub async fn crawl_status<C: CrawlApi>(State(session): State<Arc<Session<C>>>) -> Json<RequestState> {
    Json(session.snapshot())
}

pub async fn export_csv<C: CrawlApi>(
    State(session): State<Arc<Session<C>>>,
    Query(params): Query<ExportParams>,
) -> Result<Response, (StatusCode, String)> {
    let state = session.snapshot();
    let records = state
        .result
        .and_then(|result| result.data)
        .ok_or((StatusCode::NOT_FOUND, "No crawl data to export".to_string()))?;

    let filename = params
        .filename
        .as_deref()
        .map(sanitize_filename)
        .unwrap_or_else(|| DEFAULT_CSV_FILENAME.to_string());
    log::info!("exporting {} record(s) as {filename}", records.len());

    Ok((
        [
            (header::CONTENT_TYPE, CSV_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        to_csv(&records),
    )
        .into_response())
}
