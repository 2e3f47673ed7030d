//! StockScope Server Library
//!
//! A-share turnover statistics and financial screening over HTTP.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    stockscope (Rust Service)                        │
//! │                           :5000                                     │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────┐      │
//! │  │  Market Data    │  │  Turnover       │  │  Report Reader  │      │
//! │  │  (Eastmoney)    │  │  Statistics     │  │  & Screener     │      │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────┘      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Concepts
//!
//! ## Log Turnover
//! - Daily turnover rates are roughly log-normal
//! - Days outside `exp(μ ± 2σ)` of `ln(turnover)` are flagged as unusual
//!
//! ## Multi-year Screen
//! - A stock passes only if it meets every threshold in each of the last N
//!   annual reports

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod analysis;
pub mod csv_source;
pub mod data;
pub mod reports;
pub mod routes;
pub mod screener;

use anyhow::Result;
use axum::{
    extract::Request,
    http::{HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use stockscope_common::logging::RequestContext;
use stockscope_common::{request_span, Config};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::Instrument;

use crate::analysis::HistogramRenderer;
use crate::data::{EastmoneyAdapter, MarketDataProvider, SymbolDirectory};
use crate::reports::ReportDirectory;

/// Service name reported by `/health` and in request spans.
pub const SERVICE_NAME: &str = "stockscope";

/// Shared, read-only service state
pub struct AppState {
    /// Configuration
    pub config: Config,
    /// Market data provider
    pub provider: Arc<dyn MarketDataProvider>,
    /// Code to display name lookup
    pub symbols: Arc<SymbolDirectory>,
    /// Report files for the screener
    pub reports: ReportDirectory,
    /// Turnover histogram renderer
    pub histogram: HistogramRenderer,
}

impl AppState {
    /// Create state around an explicit provider and symbol directory
    pub fn new(
        config: Config,
        provider: Arc<dyn MarketDataProvider>,
        symbols: SymbolDirectory,
    ) -> Self {
        let reports = ReportDirectory::from_config(&config.reports);
        Self {
            config,
            provider,
            symbols: Arc::new(symbols),
            reports,
            histogram: HistogramRenderer::default(),
        }
    }

    /// Create state with the Eastmoney provider and the configured symbol file
    pub fn from_config(config: Config) -> Result<Self> {
        let provider: Arc<dyn MarketDataProvider> = Arc::new(EastmoneyAdapter::new(&config.market));
        let symbols = SymbolDirectory::load(&config.symbols.path)?;
        Ok(Self::new(config, provider, symbols))
    }
}

/// Build the HTTP router: API routes, static front-end, CORS and tracing.
///
/// CORS covers the API routes only; static files are same-origin.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);
    let static_files = ServeDir::new(&state.config.server.static_dir);

    let api = Router::new()
        .route("/health", get(routes::health))
        .route("/get_stock_data", get(routes::get_stock_data))
        .route("/get_stock_info", get(routes::get_stock_info))
        .route("/get_financial_report", get(routes::get_financial_report))
        .route("/get_filtered_stocks", post(routes::get_filtered_stocks))
        .layer(cors);

    Router::new()
        .merge(api)
        .fallback_service(static_files)
        .layer(middleware::from_fn(trace_requests))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

/// Open a request span, log completion and echo the trace id.
async fn trace_requests(request: Request, next: Next) -> Response {
    let ctx = RequestContext::from_headers(request.headers(), SERVICE_NAME);
    let span = request_span!(
        ctx.trace_id,
        method = %request.method(),
        path = %request.uri().path()
    );
    let started = Instant::now();

    let mut response = next.run(request).instrument(span.clone()).await;
    ctx.to_headers(response.headers_mut());

    span.in_scope(|| {
        tracing::info!(
            status = response.status().as_u16(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Request completed"
        );
    });

    response
}

/// Main StockScope service
pub struct StockScopeService {
    state: Arc<AppState>,
}

impl StockScopeService {
    /// Create the service, failing fast when the report directory is missing
    pub fn new(config: Config) -> Result<Self> {
        let state = AppState::from_config(config)?;
        state.reports.ensure_exists()?;
        Ok(Self {
            state: Arc::new(state),
        })
    }

    /// Start the HTTP server and run until Ctrl-C
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self.state.config.bind_address().parse()?;
        tracing::info!(
            address = %addr,
            provider = self.state.provider.name(),
            symbols = self.state.symbols.len(),
            reports = %self.state.reports.root().display(),
            "Starting HTTP server"
        );

        let app = build_router(self.state.clone());
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
