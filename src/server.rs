//! HTTP front end serving a route table.
//!
//! `OPTIONS` requests get an empty 204. Every other request is answered from
//! the route table: 200 with the stored payload, 404 when the path is
//! unknown, 500 when the database cannot be loaded.

use crate::config::ServerConfig;
use crate::database::{self, RouteTable};
use crate::error::LoadError;
use crate::generator::RandomSource;
use axum::body::Body;
use axum::extract::State;
use axum::http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE, ORIGIN};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::Response;
use axum::Router;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};

/// Header advertising the accepted request headers.
const ALLOW_HEADER: HeaderName = HeaderName::from_static("access-control-allow-header");

/// Why no route table is available for a request.
#[derive(Debug, thiserror::Error)]
enum RouteFailure {
    #[error(transparent)]
    Load(#[from] LoadError),
    /// The blocking load task panicked or was cancelled
    #[error("database load task failed: {0}")]
    Task(#[from] JoinError),
}

/// Mock server state.
pub struct MockServer {
    config: ServerConfig,
    rng: RandomSource,
    /// Table loaded at startup in static mode
    routes: Option<Arc<RouteTable>>,
    content_type: HeaderValue,
    allow_headers: HeaderValue,
    /// Total requests processed.
    requests_total: AtomicU64,
    /// Requests answered with a payload.
    requests_served: AtomicU64,
    /// Requests for unknown paths.
    requests_not_found: AtomicU64,
    /// Requests that failed to load the database.
    requests_failed: AtomicU64,
}

impl MockServer {
    /// Create a server. In static mode the database is loaded here and a
    /// load failure is returned.
    pub fn new(config: ServerConfig, rng: RandomSource) -> anyhow::Result<Self> {
        config.validate()?;
        let content_type = HeaderValue::from_str(&config.cors.content_type)?;
        let allow_headers = HeaderValue::from_str(&config.cors.allow_headers)?;

        let routes = if config.static_mode {
            let table = database::load(&config.db, &rng)?;
            info!(
                db = %config.db.display(),
                routes = table.len(),
                "Database loaded (static mode)"
            );
            Some(Arc::new(table))
        } else {
            None
        };

        info!(
            db = %config.db.display(),
            static_mode = config.static_mode,
            "Mock server initialized"
        );

        Ok(Self {
            config,
            rng,
            routes,
            content_type,
            allow_headers,
            requests_total: AtomicU64::new(0),
            requests_served: AtomicU64::new(0),
            requests_not_found: AtomicU64::new(0),
            requests_failed: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get total requests processed.
    pub fn total_requests(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    /// Get total requests answered with a payload.
    pub fn total_served(&self) -> u64 {
        self.requests_served.load(Ordering::Relaxed)
    }

    /// Get total requests for unknown paths.
    pub fn total_not_found(&self) -> u64 {
        self.requests_not_found.load(Ordering::Relaxed)
    }

    /// Get total requests that hit a load failure.
    pub fn total_failed(&self) -> u64 {
        self.requests_failed.load(Ordering::Relaxed)
    }

    /// Build the axum router. Every path is handled by the fallback.
    pub fn router(self: Arc<Self>) -> Router {
        Router::new().fallback(handle).with_state(self)
    }

    /// Serve until Ctrl-C.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> std::io::Result<()> {
        if let Ok(addr) = listener.local_addr() {
            info!(address = %addr, "Mock server listening");
        }
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
    }

    /// Route table for one request: the static table, or a fresh load.
    async fn routes(self: &Arc<Self>) -> Result<Arc<RouteTable>, RouteFailure> {
        if let Some(routes) = &self.routes {
            return Ok(Arc::clone(routes));
        }

        let server = Arc::clone(self);
        loaded_table(
            tokio::task::spawn_blocking(move || database::load(&server.config.db, &server.rng))
                .await,
        )
    }

    fn respond(&self, status: StatusCode, origin: Option<&HeaderValue>, body: Body) -> Response {
        let mut response = Response::new(body);
        *response.status_mut() = status;

        let headers = response.headers_mut();
        headers.insert(CONTENT_TYPE, self.content_type.clone());
        headers.insert(ALLOW_HEADER, self.allow_headers.clone());
        if let Some(origin) = origin.filter(|_| self.config.cors.echo_origin) {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
        }

        response
    }
}

async fn handle(
    State(server): State<Arc<MockServer>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    server.requests_total.fetch_add(1, Ordering::Relaxed);
    let origin = headers.get(ORIGIN);
    let path = uri.path();

    if method == Method::OPTIONS {
        debug!(path = %path, "Preflight request");
        return server.respond(StatusCode::NO_CONTENT, origin, Body::empty());
    }

    let routes = match server.routes().await {
        Ok(routes) => routes,
        Err(failure) => {
            server.requests_failed.fetch_add(1, Ordering::Relaxed);
            match failure {
                RouteFailure::Load(e) => {
                    error!(error = %e, db = %server.config.db.display(), "Failed to load database")
                }
                RouteFailure::Task(e) => {
                    error!(error = %e, panic = e.is_panic(), "Database load task failed")
                }
            }
            return server.respond(StatusCode::INTERNAL_SERVER_ERROR, None, Body::empty());
        }
    };

    match routes.lookup(path) {
        Some(payload) => {
            server.requests_served.fetch_add(1, Ordering::Relaxed);
            debug!(method = %method, path = %path, bytes = payload.len(), "Serving route");
            server.respond(StatusCode::OK, origin, Body::from(payload.to_vec()))
        }
        None => {
            server.requests_not_found.fetch_add(1, Ordering::Relaxed);
            warn!(method = %method, path = %path, "No route found");
            server.respond(StatusCode::NOT_FOUND, None, Body::empty())
        }
    }
}

fn loaded_table(
    joined: Result<Result<RouteTable, LoadError>, JoinError>,
) -> Result<Arc<RouteTable>, RouteFailure> {
    Ok(Arc::new(joined??))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
