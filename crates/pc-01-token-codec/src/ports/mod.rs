//! Ports for the Token Codec
//!
//! The codec has no outbound dependencies beyond the shared `TimeSource`.

pub mod inbound;
