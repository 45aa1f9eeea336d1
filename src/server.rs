//! Route registry, request dispatch, and the HTTP listener binding.
//!
//! The registry is built once from the loaded endpoint definitions and is
//! read-only afterwards, so concurrent dispatches share it without any
//! locking. Each inbound request runs as its own tokio task; the only
//! suspension point is the configured per-endpoint delay, which never
//! stalls the listener or other in-flight requests.

use axum::body::Body;
use axum::extract::State;
use axum::Router;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Request, Response, StatusCode};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::config::EndpointDefinition;
use crate::event::{Event, EventKind, EventNotifier, EventStatus};
use crate::response;

/// Immutable mapping from `(method, url)` to endpoint definition.
pub struct RouteRegistry {
    routes: HashMap<String, EndpointDefinition>,
}

impl RouteRegistry {
    /// Build the registry from the loaded definitions, in sequence order.
    ///
    /// Every insertion emits a `route.registered` event. On a key
    /// collision the later definition wins; the conflict is reported as a
    /// configuration warning.
    pub fn build(definitions: Vec<EndpointDefinition>, notifier: &EventNotifier) -> Self {
        let mut routes = HashMap::with_capacity(definitions.len());
        for definition in definitions {
            let method = definition.method.clone();
            let url = definition.url.clone();
            if let Some(replaced) = routes.insert(route_key(&method, &url), definition) {
                warn!(
                    method = %replaced.method,
                    url = %replaced.url,
                    "Duplicate endpoint definition, keeping the later one"
                );
            }
            info!(method = %method, url = %url, "Registered endpoint");
            notifier.notify(
                Event::new(EventKind::RouteRegistered, EventStatus::Success)
                    .with_attr("method", &method)
                    .with_attr("url", &url),
            );
        }
        Self { routes }
    }

    /// Exact, case-sensitive lookup.
    pub fn lookup(&self, method: &str, path: &str) -> Option<&EndpointDefinition> {
        self.routes.get(&route_key(method, path))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

fn route_key(method: &str, url: &str) -> String {
    format!("{method} {url}")
}

struct Inner {
    registry: RouteRegistry,
    notifier: EventNotifier,
}

/// The mock server: registry plus notifier, bound to an HTTP listener.
pub struct MockServer {
    inner: Arc<Inner>,
}

impl MockServer {
    /// Build the registry from `definitions` and take ownership of the
    /// notifier. Observers must already be attached.
    pub fn new(definitions: Vec<EndpointDefinition>, notifier: EventNotifier) -> Self {
        let registry = RouteRegistry::build(definitions, &notifier);
        info!(routes = registry.len(), "Mock server initialized");
        Self {
            inner: Arc::new(Inner { registry, notifier }),
        }
    }

    /// The axum router binding the transport to the dispatcher. Every
    /// request, whatever its path, goes through [`dispatch`].
    pub fn router(&self) -> Router {
        Router::new()
            .fallback(dispatch)
            .with_state(self.inner.clone())
    }

    /// Bind `addr` and serve until interrupted.
    pub async fn serve(self, addr: SocketAddr) -> anyhow::Result<()> {
        self.inner.notifier.notify(
            Event::new(EventKind::ServerStarting, EventStatus::Success).with_attr("addr", addr),
        );
        let listener = TcpListener::bind(addr).await?;
        self.run(listener).await
    }

    /// Serve on an already-bound listener until interrupted (ctrl-c).
    pub async fn run(self, listener: TcpListener) -> anyhow::Result<()> {
        let addr = listener.local_addr()?;
        info!(address = %addr, "Starting server");
        self.inner.notifier.notify(
            Event::new(EventKind::ServerStarted, EventStatus::Success).with_attr("addr", addr),
        );

        let router = self.router();
        let shutdown_inner = self.inner.clone();
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                info!("Shutting down server");
                shutdown_inner
                    .notifier
                    .notify(Event::new(EventKind::ServerShuttingDown, EventStatus::Success));
            })
            .await?;

        info!("Server stopped");
        self.inner
            .notifier
            .notify(Event::new(EventKind::ServerStopped, EventStatus::Success));
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        error!(error = %error, "Failed to listen for shutdown signal");
    }
}

/// Answer one inbound request.
async fn dispatch(State(inner): State<Arc<Inner>>, request: Request<Body>) -> Response<Body> {
    let method = request.method().as_str().to_owned();
    let path = request.uri().path().to_owned();

    let Some(endpoint) = inner.registry.lookup(&method, &path) else {
        warn!(method = %method, url = %path, "No matching endpoint");
        inner.notifier.notify(
            Event::new(EventKind::RequestNotFound, EventStatus::Error)
                .with_attr("method", &method)
                .with_attr("url", &path),
        );
        return not_found();
    };

    inner.notifier.notify(
        Event::new(EventKind::RequestStarted, EventStatus::Success)
            .with_attr("method", &method)
            .with_attr("url", &path),
    );

    match response::simulate(endpoint) {
        Ok(response) => {
            debug!(
                method = %method,
                url = %path,
                status = endpoint.response.status,
                "Request handled"
            );
            inner.notifier.notify(
                Event::new(
                    EventKind::RequestHandled,
                    EventStatus::from_http(endpoint.response.status),
                )
                .with_attr("method", &method)
                .with_attr("url", &path)
                .with_attr("status", endpoint.response.status),
            );
            response
        }
        Err(error) => {
            // The in-flight request is abandoned with a bare 500; the
            // listener keeps serving everything else.
            error!(method = %method, url = %path, error = %error, "Failed to construct response");
            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            response
        }
    }
}

fn not_found() -> Response<Body> {
    let mut response = Response::new(Body::from(r#"{"error": "not_found"}"#));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}
