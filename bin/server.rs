// Sales Forecast - Web Server
// JSON API over the forecasting engine

use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use sales_forecast::{
    applies_to_market, event_label, events_by_month, forecast_to_csv, generate_events,
    report_filename, ExportFormat, ForecastEngine, ForecastError, ForecastReport,
    ForecastScenario, Market, MerchandisingEvent, MonthAnchor, ServerConfig, ShippingRateModel,
    TierCharge,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

/// Shared application state
#[derive(Clone, Default)]
struct AppState {
    engine: Arc<ForecastEngine>,
    shipping: ShippingRateModel,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn failed(message: String) -> Self {
        Self {
            success: false,
            data: (),
            error: Some(message),
        }
    }
}

/// Handler error rendered as an ApiResponse with `success: false`
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(err: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("{:#}", err),
        }
    }
}

impl From<ForecastError> for ApiError {
    fn from(err: ForecastError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(status = %self.status, error = %self.message, "request failed");
        }
        (self.status, Json(ApiResponse::failed(self.message))).into_response()
    }
}

#[derive(Deserialize)]
struct CalendarQuery {
    start: Option<String>,
    market: Option<String>,
}

#[derive(Serialize)]
struct CalendarMonth {
    month: MonthAnchor,
    label: String,
    events: Vec<String>,
}

#[derive(Serialize)]
struct CalendarResponse {
    start: MonthAnchor,
    #[serde(skip_serializing_if = "Option::is_none")]
    market: Option<Market>,
    events: Vec<MerchandisingEvent>,
    months: Vec<CalendarMonth>,
}

#[derive(Deserialize)]
struct ShippingQuery {
    weight: f64,
}

#[derive(Serialize)]
struct ShippingResponse {
    weight_kg: f64,
    shipping_cost: f64,
    effective_rate: f64,
    tiers: Vec<TierCharge>,
}

#[derive(Serialize)]
struct ForecastResponse {
    cache_key: String,
    summary_text: String,
    #[serde(flatten)]
    report: ForecastReport,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/calendar?start=YYYY-MM&market=EU - Events for a 12-month window
async fn get_calendar(
    Query(query): Query<CalendarQuery>,
) -> Result<Json<ApiResponse<CalendarResponse>>, ApiError> {
    let start = match query.start.as_deref() {
        Some(raw) => raw.parse::<MonthAnchor>()?,
        None => MonthAnchor::current(),
    };
    let market = query.market.as_deref().map(str::parse::<Market>).transpose()?;

    let events: Vec<MerchandisingEvent> = generate_events(start)
        .into_iter()
        .filter(|e| market.map_or(true, |m| applies_to_market(e, m.as_str())))
        .collect();

    let months = events_by_month(&events, start)
        .into_iter()
        .map(|(month, bucket)| CalendarMonth {
            month,
            label: month.label(),
            events: bucket.into_iter().map(event_label).collect(),
        })
        .collect();

    Ok(Json(ApiResponse::ok(CalendarResponse {
        start,
        market,
        events,
        months,
    })))
}

/// GET /api/shipping?weight=KG - Shipping cost breakdown
async fn get_shipping(
    State(state): State<AppState>,
    Query(query): Query<ShippingQuery>,
) -> impl IntoResponse {
    let model = &state.shipping;
    Json(ApiResponse::ok(ShippingResponse {
        weight_kg: query.weight,
        shipping_cost: model.shipping_cost(query.weight),
        effective_rate: model.effective_rate(query.weight),
        tiers: model.tier_breakdown(query.weight),
    }))
}

/// POST /api/forecast - Scenario JSON in, forecast report out
async fn post_forecast(
    State(state): State<AppState>,
    Json(scenario): Json<ForecastScenario>,
) -> impl IntoResponse {
    let request = scenario.request();
    let forecast = state
        .engine
        .compute(&request.inputs, request.start, &request.selection);
    let report = ForecastReport::from_forecast(&scenario.brand, &request, forecast);

    let cache_key = request.cache_key();
    info!(start = %request.start, cache_key = %cache_key, "forecast computed");

    Json(ApiResponse::ok(ForecastResponse {
        cache_key,
        summary_text: report.summary.to_string(),
        report,
    }))
}

/// POST /api/forecast/csv - Scenario JSON in, P&L CSV out
async fn post_forecast_csv(
    State(state): State<AppState>,
    Json(scenario): Json<ForecastScenario>,
) -> Result<impl IntoResponse, ApiError> {
    let request = scenario.request();
    let forecast = state
        .engine
        .compute(&request.inputs, request.start, &request.selection);
    let body = forecast_to_csv(&forecast).map_err(ApiError::internal)?;

    // Header values must be visible ASCII
    let filename: String = report_filename(&scenario.brand, ExportFormat::Csv)
        .chars()
        .filter(|c| c.is_ascii() && !c.is_ascii_control())
        .collect();
    let disposition = format!("attachment; filename=\"{}\"", filename);

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

fn app(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/calendar", get(get_calendar))
        .route("/shipping", get(get_shipping))
        .route("/forecast", post(post_forecast))
        .route("/forecast/csv", post(post_forecast_csv))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    sales_forecast::logging::init();

    let config = ServerConfig::from_env()?;
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.addr))?;

    info!(addr = %config.addr, version = sales_forecast::VERSION, "forecast server listening");

    axum::serve(listener, app(AppState::default()))
        .await
        .context("Server terminated")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn send(request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app(AppState::default()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    async fn get_json(uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let (status, body) = send(request).await;
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    fn post(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn scenario() -> Value {
        json!({
            "brand": "Acme",
            "aov": 50,
            "cogs": 15,
            "product_weight_kg": 0.5,
            "first_month_marketing_budget": 1000,
            "start": "2026-03",
            "include_events": false
        })
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get_json("/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], "OK");
    }

    #[tokio::test]
    async fn test_calendar_with_market() {
        let (status, body) = get_json("/api/calendar?start=2026-12&market=GCC").await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = body["data"]["events"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["name"].as_str().unwrap())
            .collect();
        assert!(names.contains(&"UAE National Day"));
        assert!(!names.contains(&"Boxing Day"));
        assert_eq!(body["data"]["months"].as_array().unwrap().len(), 12);
    }

    #[tokio::test]
    async fn test_calendar_rejects_bad_month() {
        let (status, body) = get_json("/api/calendar?start=2026-13").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_shipping() {
        let (status, body) = get_json("/api/shipping?weight=2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["shipping_cost"], 20.06);
        assert_eq!(body["data"]["tiers"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_forecast() {
        let (status, body) = send(post("/api/forecast", &scenario())).await;
        assert_eq!(status, StatusCode::OK);

        let body: Value = serde_json::from_slice(&body).unwrap();
        let data = &body["data"];
        assert_eq!(data["forecast"]["months"][0]["orders"], 57);
        assert_eq!(data["forecast"]["months"][0]["profit"], 686.06);
        assert_eq!(data["cache_key"].as_str().unwrap().len(), 64);
        assert!(data["summary_text"].as_str().unwrap().starts_with("12-mo revenue"));
    }

    #[tokio::test]
    async fn test_forecast_csv() {
        let (status, body) = send(post("/api/forecast/csv", &scenario())).await;
        assert_eq!(status, StatusCode::OK);

        let text = String::from_utf8(body).unwrap();
        assert_eq!(text.lines().count(), 14);
        assert!(text.starts_with("month,revenue,cogs"));
    }
}
