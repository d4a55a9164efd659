//! GeoIP HTTP Server
//!
//! JSON lookup API plus a ForwardAuth endpoint that hands the lookup
//! result to a reverse proxy as response headers.

use crate::application::GeoIpService;
use crate::domain::entities::GeoIpRecord;
use crate::domain::errors::LookupError;
use crate::domain::ports::RequestHeaders;
use crate::infrastructure::ShutdownController;
use axum::{
    extract::{ConnectInfo, Path, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

impl RequestHeaders for HeaderMap {
    fn get_all(&self, name: &str) -> Vec<&str> {
        HeaderMap::get_all(self, name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }
}

/// Health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub location_db: bool,
    pub asn_db: bool,
}

/// Proxy headers echoed back by `/myip` for troubleshooting.
#[derive(Debug, Serialize)]
pub struct ProxyHeaders {
    pub cf_connecting_ip: String,
    pub x_real_ip: String,
    pub x_forwarded_for: String,
}

/// Debug block attached to `/myip` responses.
#[derive(Debug, Serialize)]
pub struct ClientIpDebug {
    pub remote_addr: String,
    pub source: String,
    pub headers: ProxyHeaders,
}

/// `/myip` response: the lookup record plus how the IP was found.
#[derive(Debug, Serialize)]
pub struct ClientIpResponse {
    #[serde(flatten)]
    pub record: GeoIpRecord,
    pub debug: ClientIpDebug,
}

/// HTTP server state.
#[derive(Clone)]
pub struct HttpState {
    pub service: Arc<GeoIpService>,
}

/// HTTP server for the lookup API.
pub struct HttpServer {
    listen_addr: String,
    state: HttpState,
    cors_enabled: bool,
}

impl HttpServer {
    pub fn new(service: Arc<GeoIpService>, listen_addr: String) -> Self {
        Self {
            listen_addr,
            state: HttpState { service },
            cors_enabled: true,
        }
    }

    /// Enable or disable the permissive CORS layer.
    pub fn with_cors(mut self, enabled: bool) -> Self {
        self.cors_enabled = enabled;
        self
    }

    /// Build the router with all routes and layers.
    pub fn router(&self) -> Router {
        let router = Router::new()
            .route("/health", get(health_handler))
            .route("/myip", get(my_ip_handler))
            .route("/lookup", get(forward_auth_handler))
            .route("/:ip", get(lookup_ip_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone());

        if self.cors_enabled {
            router.layer(cors_layer())
        } else {
            router
        }
    }

    /// Run the server until shutdown is signalled.
    ///
    /// In-flight requests get `drain_timeout` to finish once shutdown starts.
    #[cfg_attr(coverage_nightly, coverage(off))]
    pub async fn run(
        &self,
        shutdown: ShutdownController,
        drain_timeout: Duration,
    ) -> anyhow::Result<()> {
        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();

        let listener = TcpListener::bind(&self.listen_addr).await?;
        tracing::info!("GeoIP API listening on {}", self.listen_addr);

        let graceful = {
            let shutdown = shutdown.clone();
            axum::serve(listener, app).with_graceful_shutdown(async move { shutdown.wait().await })
        };

        tokio::select! {
            result = async { graceful.await } => result?,
            _ = async {
                shutdown.wait().await;
                tokio::time::sleep(drain_timeout).await;
            } => {
                tracing::warn!("server forced to shutdown after {:?}", drain_timeout);
            }
        }

        tracing::info!("server exited");
        Ok(())
    }
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

fn error_response(err: &LookupError) -> Response {
    let (status, message) = match err {
        LookupError::InvalidIpSyntax(_) => (StatusCode::BAD_REQUEST, "Invalid IP address format"),
        LookupError::LocationNotFound(_) => {
            (StatusCode::NOT_FOUND, "IP address not found in database")
        }
        LookupError::DatabaseUnavailable => {
            (StatusCode::SERVICE_UNAVAILABLE, "GeoIP database not available")
        }
        LookupError::Database(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to lookup IP address")
        }
    };

    if status.is_server_error() {
        tracing::warn!("lookup failed: {}", err);
    } else {
        tracing::debug!("lookup rejected: {}", err);
    }

    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// Response headers for the ForwardAuth endpoint, in emission order.
///
/// ASN headers are present only when the record has them.
fn forward_auth_headers(record: &GeoIpRecord) -> Vec<(&'static str, String)> {
    let loc = &record.location;
    let mut headers = vec![
        ("x-geoip-ip", record.ip.clone()),
        ("x-geoip-country", loc.country_code.clone()),
        ("x-geoip-country-name", loc.country.clone()),
        ("x-geoip-region", loc.region_code.clone()),
        ("x-geoip-region-name", loc.region.clone()),
        ("x-geoip-city", loc.city.clone()),
        ("x-geoip-postal-code", loc.postal_code.clone()),
        ("x-geoip-latitude", format!("{:.6}", loc.latitude)),
        ("x-geoip-longitude", format!("{:.6}", loc.longitude)),
        (
            "x-geoip-accuracy-radius",
            loc.accuracy_radius.unwrap_or(0).to_string(),
        ),
        ("x-geoip-timezone", loc.timezone.clone()),
    ];

    if record.asn() != 0 {
        headers.push(("x-geoip-asn", record.asn().to_string()));
    }
    if !record.asn_org().is_empty() {
        headers.push(("x-geoip-asn-org", record.asn_org().to_string()));
    }
    if let Some(network) = record.asn_network().filter(|n| !n.is_empty()) {
        headers.push(("x-geoip-asn-network", network.to_string()));
    }

    // Downstream services see the resolved client
    headers.push(("x-forwarded-for", record.ip.clone()));
    headers
}

fn proxy_headers(headers: &HeaderMap) -> ProxyHeaders {
    let value = |name: &str| headers.first_value(name).unwrap_or_default().to_string();
    ProxyHeaders {
        cf_connecting_ip: value("CF-Connecting-IP"),
        x_real_ip: value("X-Real-IP"),
        x_forwarded_for: value("X-Forwarded-For"),
    }
}

// Handler functions

async fn health_handler(State(state): State<HttpState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        location_db: state.service.has_location_db(),
        asn_db: state.service.has_asn_db(),
    })
}

async fn lookup_ip_handler(
    State(state): State<HttpState>,
    Path(ip): Path<String>,
) -> Response {
    match state.service.lookup(&ip) {
        Ok(record) => Json(record).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn my_ip_handler(
    State(state): State<HttpState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    let resolved = state
        .service
        .resolve_client_ip(&headers, &peer.ip().to_string());

    let debug = ClientIpDebug {
        remote_addr: peer.to_string(),
        source: resolved.source.to_string(),
        headers: proxy_headers(&headers),
    };

    if resolved.addr().is_none() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": "Unable to determine client IP",
                "debug": {
                    "extracted_ip": resolved.ip,
                    "remote_addr": debug.remote_addr,
                    "headers": debug.headers,
                }
            })),
        )
            .into_response();
    }

    match state.service.lookup(&resolved.ip) {
        Ok(record) => Json(ClientIpResponse { record, debug }).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn forward_auth_handler(
    State(state): State<HttpState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    let resolved = state
        .service
        .resolve_client_ip(&headers, &peer.ip().to_string());

    // Never block the proxied request: failures answer 200 without geo headers.
    if resolved.addr().is_none() {
        return StatusCode::OK.into_response();
    }

    let record = match state.service.lookup(&resolved.ip) {
        Ok(record) => record,
        Err(e) => {
            tracing::debug!("forward-auth lookup for {} failed: {}", resolved.ip, e);
            return StatusCode::OK.into_response();
        }
    };

    let mut out = HeaderMap::new();
    for (name, value) in forward_auth_headers(&record) {
        match HeaderValue::from_bytes(value.as_bytes()) {
            Ok(v) => {
                out.insert(HeaderName::from_static(name), v);
            }
            Err(_) => tracing::debug!("skipping {} header with invalid value {:?}", name, value),
        }
    }

    (StatusCode::OK, out).into_response()
}
