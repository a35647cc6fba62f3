// 🌐 HTTP API - axum router over the cached datasets
//
// GET /health            liveness
// GET /fields            configured field labels
// GET /json              filtered records, distinct values, year bounds
// GET /csv               filtered records as a CSV download
// GET /geo/mints         raw mint GeoJSON
// GET /geo/authorities   raw authority GeoJSON
//
// Filter parameters come from the raw query string, so repeated keys
// (`MINT=eq:is:A&MINT=eq:is:B`) all reach the filter.

use crate::cache::{Dataset, Datasets};
use crate::config::Config;
use crate::export;
use crate::filter::{FilterQuery, RecordsFilter};
use axum::{
    extract::{RawQuery, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{error, warn};

pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";
pub const CSV_DISPOSITION: &str = "attachment;filename=mint.csv";
const GEO_CONTENT_TYPE: &str = "application/geo+json";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub datasets: Arc<Datasets>,
    pub fields: Arc<BTreeMap<String, String>>,
    pub filter: RecordsFilter,
}

impl AppState {
    pub fn new(datasets: Datasets, config: &Config) -> Self {
        AppState {
            datasets: Arc::new(datasets),
            fields: Arc::new(config.fields.clone()),
            filter: RecordsFilter::new().with_value_fields(config.fields.keys()),
        }
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self { success: true, data }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Any request failure: 400 with the message as plain-text body
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<crate::error::CoinsError> for ApiError {
    fn from(err: crate::error::CoinsError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status == StatusCode::BAD_REQUEST {
            error!(error = %self.message, "Request failed");
        }
        (self.status, self.message).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

// ============================================================================
// Query parsing
// ============================================================================

/// Decode `k=v&k=v` keeping order and repeated keys; `+` is a space
pub fn parse_query(raw: &str) -> ApiResult<Vec<(String, String)>> {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            Ok((decode(key)?, decode(value)?))
        })
        .collect()
}

fn decode(raw: &str) -> ApiResult<String> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| ApiError::bad_request(format!("Invalid query encoding: {}", e)))
}

fn filter_query(raw: Option<String>) -> ApiResult<FilterQuery> {
    let pairs = match raw {
        Some(raw) => parse_query(&raw)?,
        None => Vec::new(),
    };
    Ok(FilterQuery::from_pairs(pairs))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /fields
async fn get_fields(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.fields.as_ref().clone())
}

/// GET /json
async fn get_json(State(state): State<AppState>, RawQuery(raw): RawQuery) -> ApiResult<Response> {
    let query = filter_query(raw)?;

    let body = tokio::task::spawn_blocking(move || {
        let records = state.datasets.records();
        let outcome = state.filter.run(&records, &query);
        serde_json::to_vec(&outcome)
    })
    .await?
    .map_err(|e| ApiError::bad_request(e.to_string()))?;

    Ok(([(header::CONTENT_TYPE, "application/json; charset=utf-8")], body).into_response())
}

/// GET /csv
async fn get_csv(State(state): State<AppState>, RawQuery(raw): RawQuery) -> ApiResult<Response> {
    let query = filter_query(raw)?;

    let body = tokio::task::spawn_blocking(move || {
        let records = state.datasets.records();
        let selected = state.filter.apply(&*records, &query);
        export::records_to_csv_string(selected)
    })
    .await??;

    Ok((
        [
            (header::CONTENT_TYPE, CSV_CONTENT_TYPE),
            (header::CONTENT_DISPOSITION, CSV_DISPOSITION),
        ],
        body,
    )
        .into_response())
}

/// GET /geo/mints
async fn get_geo_mints(State(state): State<AppState>) -> ApiResult<Response> {
    geo(state, Dataset::GeoMints).await
}

/// GET /geo/authorities
async fn get_geo_authorities(State(state): State<AppState>) -> ApiResult<Response> {
    geo(state, Dataset::GeoAuthorities).await
}

async fn geo(state: AppState, dataset: Dataset) -> ApiResult<Response> {
    if !state.datasets.is_configured(dataset) {
        warn!(dataset = %dataset, "Geo dataset requested but not configured");
        return Err(ApiError::not_found(format!("{} is not configured", dataset)));
    }

    let bytes = tokio::task::spawn_blocking(move || state.datasets.geo_at(dataset, chrono::Utc::now())).await??;

    Ok(([(header::CONTENT_TYPE, GEO_CONTENT_TYPE)], bytes.to_vec()).into_response())
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState, config: &Config) -> Router {
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/fields", get(get_fields))
        .route("/json", get(get_json))
        .route("/csv", get(get_csv))
        .route("/geo/mints", get(get_geo_mints))
        .route("/geo/authorities", get(get_geo_authorities))
        .with_state(state);

    let app = match &config.server.static_dir {
        Some(dir) => app.fallback_service(ServeDir::new(dir)),
        None => app,
    };

    app.layer(CorsLayer::permissive())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FileSource;
    use crate::config::DataConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::fs;
    use tower::ServiceExt;

    const COINS: &str = "UID;MINT;DATEfrom;DATEto;CoinNAME;VALUEd\n\
                         C1;Utrecht;1-1-1750;31-12-1750;Gold Ducat;10\n\
                         C2;Dordrecht;1-1-1600;31-12-1600;Stiver;1\n\
                         C3;Utrecht;1-1-1760;31-12-1760;Silver Rider;200\n";
    const WAGES: &str = "Year;Hourly wage (VALUEd)\n1750;2.00\n1760;4.00\n";

    struct Fixture {
        _dir: tempfile::TempDir,
        app: Router,
    }

    fn fixture(with_geo: bool) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let coins = dir.path().join("coins.csv");
        let wages = dir.path().join("wages.csv");
        fs::write(&coins, COINS).unwrap();
        fs::write(&wages, WAGES).unwrap();

        let geo_mints = with_geo.then(|| {
            let path = dir.path().join("mints.geojson");
            fs::write(&path, "{\"type\":\"FeatureCollection\",\"features\":[]}").unwrap();
            path
        });

        let mut config = Config::new();
        config.data = DataConfig {
            coins: Some(coins),
            wages: Some(wages),
            geo_mints,
            geo_authorities: None,
        };
        config.fields.insert("MINT".to_string(), "Mint".to_string());

        let datasets = Datasets::new(Box::new(FileSource::new(config.data.clone())), config.cache.max_age());
        let app = router(AppState::new(datasets, &config), &config);
        Fixture { _dir: dir, app }
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn test_parse_query_keeps_repeats_and_decodes() {
        let pairs = parse_query("MINT=eq:is:Utrecht&MINT=eq:ctns:dord&CoinNAME=eq:ctns:gold+ducat&x=%3A").unwrap();

        assert_eq!(pairs.len(), 4);
        assert_eq!(pairs[1], ("MINT".to_string(), "eq:ctns:dord".to_string()));
        assert_eq!(pairs[2].1, "eq:ctns:gold ducat");
        assert_eq!(pairs[3].1, ":");
        assert!(parse_query("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_query_bad_encoding() {
        assert!(parse_query("MINT=%FF").is_err());
    }

    #[tokio::test]
    async fn test_health() {
        let (status, _, body) = get(fixture(false).app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("\"success\":true"));
    }

    #[tokio::test]
    async fn test_fields() {
        let (status, _, body) = get(fixture(false).app, "/fields").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["MINT"], "Mint");
    }

    #[tokio::test]
    async fn test_json_filters_records() {
        let fixture = fixture(false);
        let (status, _, body) = get(fixture.app, "/json?from=1700&to=1800&MINT=eq:is:utrecht&VALUEd=eq:0:100").await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        let records = json["records"].as_array().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["UID"], "C1");
        assert_eq!(json["minYear"], 1750);
        assert_eq!(json["maxYear"], 1750);
        assert_eq!(json["values"]["MINT"][0], "Utrecht");
        // only the configured fields are summarized
        assert!(json["values"].get("UID").is_none());
        assert!(json["values"].get("CoinNAME").is_none());

        assert_eq!(records[0]["VALUEd"].as_f64(), Some(10.0));
        assert_eq!(records[0]["DATEfrom"], serde_json::json!({"year": 1750, "month": 1, "day": 1}));
        assert!(records[0].get("TYPEID").is_none());
    }

    #[tokio::test]
    async fn test_json_without_query_returns_all() {
        let (_, _, body) = get(fixture(false).app, "/json").await;
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["records"].as_array().unwrap().len(), 3);
        assert_eq!(json["minYear"], 1600);
        assert_eq!(json["maxYear"], 1760);
    }

    #[tokio::test]
    async fn test_csv_download() {
        let (status, headers, body) = get(fixture(false).app, "/csv?CoinNAME=eq:ctns:rider").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], CSV_CONTENT_TYPE);
        assert_eq!(headers[header::CONTENT_DISPOSITION], CSV_DISPOSITION);

        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("UID;TYPEID;SOURCE;MINT"));
        assert!(lines[1].starts_with("C3;;;Utrecht;;31-12-1760;1-1-1760;Silver Rider"));
    }

    #[tokio::test]
    async fn test_bad_query_is_400() {
        let (status, _, body) = get(fixture(false).app, "/json?MINT=%FF").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("Invalid query encoding"));
    }

    #[tokio::test]
    async fn test_geo() {
        let fixture = fixture(true);
        let (status, _, body) = get(fixture.app.clone(), "/geo/mints").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("FeatureCollection"));

        let (status, _, _) = get(fixture.app, "/geo/authorities").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
