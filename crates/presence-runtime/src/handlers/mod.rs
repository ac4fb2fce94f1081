//! # Request Handlers
//!
//! The inbound surface: one JSON request in, one JSON response out.
//!
//! ```text
//! {"id":1,"caller":{"subject":"prof","role":"teacher"},
//!  "op":"seedChains","sessionId":"cs101","kind":"ENTRY","count":2}
//!       │
//!       ▼
//! RequestHandler ── capability check ── component service ── metrics
//!       │
//!       ▼
//! {"id":1,"ok":true,"result":[{"chain":{...},"token":{...}}, ...]}
//! ```

pub mod dispatch;
pub mod error;
pub mod request;
pub mod response;

pub use dispatch::RequestHandler;
pub use error::{HandlerError, HandlerResult};
pub use request::{Request, RequestEnvelope};
pub use response::{
    ChallengeView, ErrorBody, RefreshView, ResponseEnvelope, SeededChainView, SnapshotView,
};
