//! View connected through a WebSocket relay.
//!
//! Demonstrates:
//! - Relay transport selected from a URL
//! - State bootstrap requests issued on connect
//! - State pushed by the relay and requests answered by view handlers
//!
//! The relay here is a minimal in-process WebSocket server playing the
//! editor's part.
//!
//! Usage:
//!   cargo run --example 002_relay
//!   cargo run --example 002_relay -- --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use common::Args;
use futures_util::{SinkExt, StreamExt};
use markwhen_lpc::{Envelope, Error, Handlers, Lpc, MessageType, Result, kind};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

// ============================================================================
// Constants
// ============================================================================

const DOCUMENT: &str = "title: Roadmap\n\n2025-01: Kickoff\n2025-03: Launch";

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run().await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    println!("=== 002: Relay ===\n");

    // ========================================================================
    // Relay
    // ========================================================================

    println!("[1] Starting relay...");

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .map_err(|e| Error::connection(e.to_string()))?;
    let addr = listener
        .local_addr()
        .map_err(|e| Error::connection(e.to_string()))?;
    let url = format!("ws://{addr}");
    tokio::spawn(async move {
        if let Ok((stream, _)) = listener.accept().await {
            relay(stream).await;
        }
    });

    println!("    ✓ Listening on {url}\n");

    // ========================================================================
    // View
    // ========================================================================

    println!("[2] Connecting view...");

    let handlers = Handlers::new()
        .on::<kind::MarkwhenState, _, _>(|state| async move {
            let text = state.and_then(|s| s.raw_text).unwrap_or_default();
            println!("    [view] document has {} lines", text.lines().count());
            None
        })
        .on::<kind::JumpToRange, _, _>(|jump| async move {
            println!(
                "    [view] jumpToRange: {} .. {}",
                jump.date_range_iso.from_date_time_iso, jump.date_range_iso.to_date_time_iso
            );
        });

    let view = Lpc::builder()
        .relay_url(url)
        .handlers(handlers)
        .connect()
        .await?;

    println!("    ✓ Transport: {:?}\n", view.transport_kind());

    println!("[3] Waiting for relay traffic...");
    tokio::time::sleep(Duration::from_millis(500)).await;

    println!("\n[4] Pending requests: {}", view.pending_count());

    view.close();
    println!("\n=== Done ===");

    Ok(())
}

// ============================================================================
// Relay Side
// ============================================================================

/// Answers bootstrap requests, then pushes the document and asks the view
/// to scroll.
async fn relay(stream: tokio::net::TcpStream) {
    let Ok(mut ws) = accept_async(stream).await else {
        return;
    };

    let mut answered = 0;
    while let Some(Ok(Message::Text(text))) = ws.next().await {
        let Ok(envelope) = serde_json::from_str::<Envelope>(&text) else {
            continue;
        };

        if envelope.response {
            println!("    [relay] view answered {}", envelope.message_type);
            continue;
        }

        let params: Value = match envelope.message_type {
            MessageType::MarkwhenState => json!({ "rawText": DOCUMENT, "parsed": [] }),
            MessageType::AppState => json!({ "isDark": false }),
            _ => Value::Null,
        };

        let reply = Envelope::response(envelope.message_type, envelope.id, Some(params));
        let Ok(reply) = serde_json::to_string(&reply) else {
            continue;
        };
        if ws.send(Message::Text(reply.into())).await.is_err() {
            return;
        }

        answered += 1;
        if answered == 2 {
            let push = json!({
                "type": "markwhenState",
                "request": true,
                "id": "markwhen_relay000000000000000000000001",
                "params": { "rawText": DOCUMENT, "parsed": [] },
            });
            if ws.send(Message::Text(push.to_string().into())).await.is_err() {
                return;
            }

            let request = json!({
                "type": "jumpToRange",
                "request": true,
                "id": "markwhen_relay000000000000000000000000",
                "params": {
                    "dateRangeIso": {
                        "fromDateTimeIso": "2025-01-01T00:00:00.000Z",
                        "toDateTimeIso": "2025-04-01T00:00:00.000Z",
                    }
                },
            });
            if ws.send(Message::Text(request.to_string().into())).await.is_err() {
                return;
            }
        }
    }
}
