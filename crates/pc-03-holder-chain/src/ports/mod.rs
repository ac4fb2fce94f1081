//! Ports for the Holder State Machine

pub mod inbound;
pub mod outbound;

pub use inbound::HolderChainApi;
pub use outbound::NotifySink;
