//! HTTP surface of the dashboard.

use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::dashboard::{AggregateResponse, Dataset};
use crate::dashboard_html::{render_page, Section};
use crate::excel_writer::excel_bytes;
use crate::filters::FilterSelection;
use crate::models::{Product, Testimonial};

#[derive(Clone)]
pub struct AppState {
    pub dataset: Arc<Dataset>,
    pub top_words: usize,
}

impl AppState {
    pub fn new(dataset: Dataset, top_words: usize) -> Self {
        AppState {
            dataset: Arc::new(dataset),
            top_words,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FilterParams {
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub month: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl FilterParams {
    fn selection(&self) -> Result<FilterSelection, (StatusCode, Json<ErrorBody>)> {
        FilterSelection::parse(self.month.as_deref(), self.category.as_deref())
            .map_err(|e| bad_request(e.to_string()))
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(page_handler))
        .route("/healthz", get(healthz))
        .route("/api/reviews", get(reviews_handler))
        .route("/api/products", get(products_handler))
        .route("/api/testimonials", get(testimonials_handler))
        .route("/report.xlsx", get(report_handler))
        .with_state(state)
}

pub async fn serve(state: AppState, addr: SocketAddr) -> Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Dashboard listening on http://{}", addr);
    axum::serve(listener, app).await.context("server shutdown")?;
    Ok(())
}

pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

pub async fn page_handler(
    State(state): State<AppState>,
    Query(params): Query<FilterParams>,
) -> Result<Html<String>, ApiError> {
    let section = params
        .section
        .as_deref()
        .unwrap_or("")
        .parse::<Section>()
        .map_err(|e| bad_request(e.to_string()))?;
    let selection = params.selection()?;
    Ok(Html(render_page(&state.dataset, section, &selection, state.top_words)))
}

pub async fn reviews_handler(
    State(state): State<AppState>,
    Query(params): Query<FilterParams>,
) -> Result<Response, ApiError> {
    let selection = params.selection()?;
    let aggregate = state.dataset.aggregate(&selection, state.top_words);
    let body = AggregateResponse::new(&state.dataset, &aggregate);
    Ok(Json(body).into_response())
}

pub async fn products_handler(State(state): State<AppState>) -> Json<Vec<Product>> {
    Json(state.dataset.products.clone())
}

pub async fn testimonials_handler(State(state): State<AppState>) -> Json<Vec<Testimonial>> {
    Json(state.dataset.testimonials.clone())
}

pub async fn report_handler(
    State(state): State<AppState>,
    Query(params): Query<FilterParams>,
) -> Result<Response, ApiError> {
    let selection = params.selection()?;
    let aggregate = state.dataset.aggregate(&selection, state.top_words);
    let bytes = excel_bytes(&state.dataset, &aggregate).map_err(internal_error)?;
    Ok((
        [
            (
                header::CONTENT_TYPE,
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            ),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"sentiment_report.xlsx\"",
            ),
        ],
        bytes,
    )
        .into_response())
}

fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            message: message.into(),
        }),
    )
}

fn internal_error(err: anyhow::Error) -> ApiError {
    warn!("Dashboard request failed: {:#}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            message: err.to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Review, Sentiment, SentimentLabel};

    fn state() -> AppState {
        let reviews = vec![
            Review {
                id: Some("1".into()),
                product_id: None,
                text: "Great product, fast shipping!".into(),
                rating: Some(5),
                date: Some("2024-01-04".into()),
                sentiment: Some(Sentiment::new(SentimentLabel::Positive, 0.9)),
            },
            Review {
                id: Some("3".into()),
                product_id: None,
                text: "Terrible quality".into(),
                rating: Some(1),
                date: Some("2024-02-14".into()),
                sentiment: Some(Sentiment::new(SentimentLabel::Negative, 0.95)),
            },
        ];
        AppState::new(Dataset::new(Vec::new(), reviews, Vec::new()), 10)
    }

    fn params(section: Option<&str>, month: Option<&str>) -> Query<FilterParams> {
        Query(FilterParams {
            section: section.map(str::to_string),
            month: month.map(str::to_string),
            category: None,
        })
    }

    #[test]
    fn page_renders_requested_section() {
        let Html(body) =
            tokio_test::block_on(page_handler(State(state()), params(Some("reviews"), Some("2024-02")))).unwrap();
        assert!(body.contains("Terrible quality"));
        assert!(!body.contains("fast shipping"));
    }

    #[test]
    fn invalid_month_is_a_bad_request() {
        let err = tokio_test::block_on(reviews_handler(State(state()), params(None, Some("Feb"))))
            .unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);

        let err = tokio_test::block_on(page_handler(State(state()), params(Some("admin"), None)))
            .unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn month_without_data_is_not_an_error() {
        let response = tokio_test::block_on(reviews_handler(State(state()), params(None, Some("2022-12"))));
        assert_eq!(response.unwrap().status(), StatusCode::OK);
    }

    #[test]
    fn report_is_served_as_xlsx() {
        let response = tokio_test::block_on(report_handler(State(state()), params(None, None))).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
    }

    #[test]
    fn healthz_is_ok() {
        assert_eq!(tokio_test::block_on(healthz()), StatusCode::OK);
    }
}
