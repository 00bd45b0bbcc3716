//! Transcription endpoints: upload, list, get, delete.
//!
//! ## Pagination policy:
//! `page` defaults to 1 and is clamped to at least 1; `limit` defaults to
//! 20 and is clamped to 1..=100. Date bounds accept either RFC 3339
//! timestamps or bare `YYYY-MM-DD` dates; a bare start date means
//! start-of-day, a bare end date means end-of-day, so the range is
//! inclusive on both sides.

use std::path::Path;

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::storage::ListQuery;
use crate::transcription;
use crate::upload;

const DEFAULT_LIMIT: u32 = 20;
const MAX_LIMIT: u32 = 100;

/// Query parameters for `GET /transcriptions`. Accepts both snake_case and
/// the camelCase names used by earlier clients.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    #[serde(alias = "startDate")]
    pub start_date: Option<String>,
    #[serde(alias = "endDate")]
    pub end_date: Option<String>,
    pub search: Option<String>,
}

impl ListParams {
    fn into_query(self) -> AppResult<ListQuery> {
        Ok(ListQuery {
            page: self.page.unwrap_or(1).max(1),
            limit: self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
            start_date: self
                .start_date
                .as_deref()
                .map(|s| parse_date_bound(s, DayBound::Start))
                .transpose()?,
            end_date: self
                .end_date
                .as_deref()
                .map(|s| parse_date_bound(s, DayBound::End))
                .transpose()?,
            search: self.search.filter(|s| !s.is_empty()),
        })
    }
}

enum DayBound {
    Start,
    End,
}

fn parse_date_bound(raw: &str, bound: DayBound) -> AppResult<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        AppError::Validation(format!(
            "invalid date '{raw}': expected YYYY-MM-DD or an RFC 3339 timestamp"
        ))
    })?;

    let time = match bound {
        DayBound::Start => date.and_hms_opt(0, 0, 0),
        DayBound::End => date.and_hms_micro_opt(23, 59, 59, 999_999),
    }
    .ok_or_else(|| AppError::Validation(format!("invalid date '{raw}'")))?;

    Ok(time.and_utc())
}

/// `POST /transcriptions/upload`: stage the multipart `audio` field, run
/// the transcription pipeline, and return the persisted record.
pub async fn upload(
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let staging_dir = Path::new(&state.config.uploads.dir);
    let staged = upload::receive_audio(payload, staging_dir).await?;
    let record = transcription::run_pipeline(&state, &staged).await?;
    Ok(HttpResponse::Created().json(record))
}

/// `GET /transcriptions`: list records with pagination and filters.
pub async fn list(
    state: web::Data<AppState>,
    params: web::Query<ListParams>,
) -> Result<HttpResponse, AppError> {
    let query = params.into_inner().into_query()?;
    let records = state.store.list(&query)?;
    Ok(HttpResponse::Ok().json(records))
}

/// `GET /transcriptions/{id}`: fetch one record or 404.
pub async fn get(
    state: web::Data<AppState>,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let record = state.store.get(id.into_inner())?;
    Ok(HttpResponse::Ok().json(record))
}

/// `DELETE /transcriptions/{id}`: remove one record or 404.
pub async fn delete(
    state: web::Data<AppState>,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    state.store.delete(id.into_inner())?;
    Ok(HttpResponse::NoContent().finish())
}
