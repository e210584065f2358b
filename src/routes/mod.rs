// HTTP route handlers, organized by API domain. New route modules are
// declared here and registered on the Router in `server.rs`.

/// Health check and monitoring endpoints
pub mod health;

/// Agent command dispatch and state endpoints
pub mod agent;

/// Conversational SSE endpoint backed by the advisory oracle
pub mod chat;
