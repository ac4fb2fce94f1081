//! # Presence-Chain Runtime
//!
//! Wires every component onto one record store and one event bus, and serves
//! the inbound operations as JSON lines.
//!
//! ## Modular Structure
//!
//! - `container/` - Configuration and service wiring
//! - `adapters/` - Port implementations that need the whole process
//! - `handlers/` - Request parsing, authorization, dispatch
//! - `wiring/` - Event bus to output stream
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from the environment
//! 2. Validate the codec secret is not default
//! 3. Initialize logging and metrics
//! 4. Wire components in dependency order
//! 5. Serve requests until EOF or Ctrl+C
//!
//! ## Wire Protocol
//!
//! ```text
//! stdin  ─► {"id":..,"caller":{..},"op":"scan",..}      one request per line
//! stdout ◄─ {"id":..,"ok":true,"result":{..}}          one response per request
//! stdout ◄─ {"notification":{"chainId":..,..}}         interleaved, best-effort
//! ```
//!
//! Requests are handled strictly in input order, so a `join` followed by a
//! `seedChains` on the next line always sees the enrolment.

pub mod adapters;
pub mod container;
pub mod handlers;
pub mod wiring;

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tracing::{error, info};

use shared_types::{SystemTimeSource, TimeSource};

use crate::container::{RuntimeConfig, ServiceContainer};
use crate::handlers::{RequestHandler, ResponseEnvelope};
use crate::wiring::NotificationRelay;

/// The runtime: services, request handler and a shutdown signal.
pub struct PresenceRuntime<T: TimeSource + 'static = SystemTimeSource> {
    handler: RequestHandler<T>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl PresenceRuntime<SystemTimeSource> {
    pub fn new(config: RuntimeConfig) -> Self {
        Self::from_container(Arc::new(ServiceContainer::new(config)))
    }
}

impl<T: TimeSource + 'static> PresenceRuntime<T> {
    pub fn from_container(container: Arc<ServiceContainer<T>>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            handler: RequestHandler::new(container),
            shutdown_tx,
            shutdown_rx,
        }
    }

    pub fn container(&self) -> &Arc<ServiceContainer<T>> {
        self.handler.container()
    }

    /// Serve requests from `reader` until EOF or shutdown.
    ///
    /// Chain notifications published while serving are written to the same
    /// output between responses.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut relay = NotificationRelay::new(&self.container().event_bus);
        let mut lines = reader.lines();
        let mut shutdown = self.shutdown_rx.clone();
        let mut served = 0u64;

        info!("Serving requests");
        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    info!("Shutdown signal received");
                    break;
                }
                Some(note) = relay.next_line() => {
                    write_line(&mut writer, &note).await?;
                }
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    if line.trim().is_empty() {
                        continue;
                    }
                    let response = self.handler.handle_line(&line).await;
                    served += 1;
                    write_line(&mut writer, &encode_response(&response)).await?;
                }
            }
        }

        for note in relay.drain() {
            write_line(&mut writer, &note).await?;
        }
        writer.flush().await?;
        info!(served, "Request stream closed");
        Ok(())
    }

    /// Ask a running `serve` to stop after the current request.
    pub fn shutdown(&self) {
        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }
    }
}

fn encode_response(response: &ResponseEnvelope) -> String {
    serde_json::to_string(response).unwrap_or_else(|e| {
        error!(error = %e, "Failed to encode response");
        r#"{"ok":false,"error":{"code":"INTERNAL","message":"response encoding failed"}}"#
            .to_string()
    })
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) -> std::io::Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_crypto::SecretKey;
    use tokio::io::BufReader;

    fn create_test_runtime() -> PresenceRuntime {
        let mut config = RuntimeConfig::default();
        config.security.codec_secret = SecretKey::generate();
        PresenceRuntime::new(config)
    }

    #[tokio::test]
    async fn test_serve_answers_each_line_in_order() {
        let runtime = create_test_runtime();
        let input = concat!(
            r#"{"id":1,"caller":{"subject":"alice","role":"student"},"op":"join","sessionId":"cs101"}"#,
            "\n\n",
            r#"{"id":2,"caller":{"subject":"bob","role":"student"},"op":"join","sessionId":"cs101"}"#,
            "\n",
            r#"{"id":3,"caller":{"subject":"prof","role":"teacher"},"op":"seedChains","sessionId":"cs101","kind":"ENTRY","count":1}"#,
            "\n",
            "garbage\n",
        );
        let mut output = Vec::new();

        runtime
            .serve(BufReader::new(input.as_bytes()), &mut output)
            .await
            .unwrap();

        let lines: Vec<serde_json::Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        let responses: Vec<&serde_json::Value> =
            lines.iter().filter(|l| l.get("ok").is_some()).collect();

        assert_eq!(responses.len(), 4);
        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[2]["id"], 3);
        assert_eq!(responses[2]["ok"], true);
        assert_eq!(responses[2]["result"][0]["token"]["holderId"], "alice");
        assert_eq!(responses[3]["ok"], false);
        assert_eq!(responses[3]["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_shutdown_stops_serving() {
        let runtime = create_test_runtime();
        runtime.shutdown();

        let (_client, server) = tokio::io::duplex(64);
        let mut output = Vec::new();
        runtime
            .serve(BufReader::new(server), &mut output)
            .await
            .unwrap();
        assert!(output.is_empty());
    }
}
