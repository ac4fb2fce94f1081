//! Ports for the Scan Processor

pub mod inbound;

pub use inbound::ScanProcessorApi;
