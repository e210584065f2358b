pub mod market_data;
pub mod oracle;
pub mod orchestrator;
pub mod snapshot;
pub mod trade_flow;
pub mod types;

pub use orchestrator::AgentOrchestrator;
pub use types::*;
