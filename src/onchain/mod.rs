pub mod rpc;
pub mod tx_builder;
