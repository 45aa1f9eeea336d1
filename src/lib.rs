//! mockd - configuration-driven HTTP mock server
//!
//! Loads a declarative list of endpoint definitions and serves an HTTP
//! listener that answers each registered route with the configured status,
//! headers, and body, optionally holding the connection open for an
//! artificial delay. Lifecycle and request milestones are emitted through
//! an observer boundary, so instrumentation can attach without the server
//! ever depending on it.
//!
//! # Features
//!
//! - **Exact routing**: requests are matched on `(method, path)`, nothing
//!   else; duplicates resolve last-registration-wins
//! - **Canned responses**: status, headers, and a JSON body reconstructed
//!   deterministically from the configuration
//! - **Latency simulation**: a per-endpoint delay applied after the
//!   response is written
//! - **Event hooks**: `server.*`, `route.registered`, and `request.*`
//!   events delivered to any number of observers, or none
//!
//! # Example Configuration
//!
//! ```json
//! [
//!   {
//!     "url": "/ping",
//!     "method": "GET",
//!     "response": {
//!       "status": 200,
//!       "headers": { "X-Test": "1" },
//!       "body": { "ok": true }
//!     },
//!     "delay": 0
//!   }
//! ]
//! ```

pub mod config;
pub mod event;
pub mod response;
pub mod server;

pub use config::{ConfigError, EndpointDefinition, ResponseSpec};
pub use event::{Event, EventKind, EventNotifier, EventStatus, LogObserver, Observer};
pub use server::{MockServer, RouteRegistry};
