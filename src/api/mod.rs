//! REST API module
//!
//! Provides HTTP access to the contract session.
//!
//! # Endpoints
//!
//! ## Session
//! - `GET /api/session` - Session overview
//! - `GET /api/account` - Active account
//! - `PUT /api/account` - Replace the active account
//!
//! ## Artifacts
//! - `GET /api/artifacts` - List loaded artifacts
//! - `POST /api/artifacts/:source_id` - Ingest an artifact notification
//!
//! ## Deployment & invocation
//! - `POST /api/deploy` - Deploy an artifact
//! - `GET /api/instances` - List deployed instances
//! - `GET /api/instances/:id` - Instance detail with derived state
//! - `POST /api/instances/:id/call` - Read-only invocation
//! - `POST /api/instances/:id/tx` - State-changing invocation
//! - `DELETE /api/instances/:id` - Dispose an instance
//! - `DELETE /api/instances/:id/state/:fn` - Clear cached outputs
//!
//! ## History
//! - `GET /api/history` - Full transaction history
//!
//! ## WebSocket
//! - `GET /ws` - Push stream of appended transaction records

pub mod handlers;
pub mod routes;
pub mod websocket;

pub use handlers::ApiState;
pub use routes::create_router;
pub use websocket::WsBroadcaster;
