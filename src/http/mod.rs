//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, body buffering)
//!     → [routing decides local endpoint or upstream group]
//!     → handlers.rs (register, login, status, metrics, index)
//!       or server.rs proxy path (auth → cache → replica → forward)
//!     → response.rs (relay status/body, x-cache marker)
//!     → Send to client
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use response::{CacheStatus, X_CACHE};
pub use server::{GatewayServer, GatewayState, StartupError};
