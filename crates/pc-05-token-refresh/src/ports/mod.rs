//! Ports for the Token Refresher

pub mod inbound;

pub use inbound::{RefreshedToken, RefreshedTokenWire, TokenRefreshApi};
