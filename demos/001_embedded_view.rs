//! Host and embedded view in one process.
//!
//! Demonstrates:
//! - Two contexts wired with host and parent transports
//! - Typed requests in both directions
//! - A custom message type answered by a raw handler
//!
//! Usage:
//!   cargo run --example 001_embedded_view
//!   cargo run --example 001_embedded_view -- --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use common::Args;
use markwhen_lpc::{
    AppState, EventPath, Handlers, JumpToPath, Lpc, Result, SetText, Window, kind,
};
use serde_json::json;

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
    println!("=== 001: Embedded View ===\n");

    let host_window = Arc::new(Window::new());
    let view_window = Arc::new(Window::new());

    // ========================================================================
    // Host Side
    // ========================================================================

    println!("[1] Starting host...");

    let host_handlers = Handlers::new()
        .on::<kind::AppState, _, _>(|_| async {
            Some(AppState {
                is_dark: Some(true),
                ..Default::default()
            })
        })
        .on::<kind::SetText, _, _>(|edit| async move {
            println!("    [host] setText: {:?}", edit.text);
        });

    let host = Lpc::builder()
        .window(Arc::clone(&host_window))
        .host(view_window.clone())
        .handlers(host_handlers)
        .connect()
        .await?;

    println!("    ✓ Host ready ({})\n", host.context_id());

    // ========================================================================
    // View Side
    // ========================================================================

    println!("[2] Starting view...");

    let view_handlers = Handlers::new()
        .on::<kind::JumpToPath, _, _>(|jump| async move {
            println!("    [view] jumpToPath: {:?}", jump.path);
        })
        .on_raw("ping", |_| async { Some(json!("pong")) });

    let view = Lpc::builder()
        .window(Arc::clone(&view_window))
        .parent(host_window.clone())
        .handlers(view_handlers)
        .connect()
        .await?;

    println!("    ✓ View ready ({})\n", view.context_id());

    // ========================================================================
    // Requests
    // ========================================================================

    println!("[3] View asks for app state...");
    let app = view.request::<kind::AppState>(None).await?;
    println!("    ✓ isDark = {:?}\n", app.and_then(|a| a.is_dark));

    println!("[4] View edits the document...");
    view.request::<kind::SetText>(SetText {
        text: "2025-01: kickoff".into(),
        at: None,
    })
    .await?;
    println!("    ✓ Edit acknowledged\n");

    println!("[5] Host scrolls the view...");
    host.request::<kind::JumpToPath>(JumpToPath {
        path: EventPath(vec![0, 2]),
    })
    .await?;
    println!("    ✓ Jump acknowledged\n");

    println!("[6] Host pings the view...");
    let pong = host.send_request("ping", None).await?;
    println!("    ✓ {:?}\n", pong.params);

    view.close();
    host.close();
    println!("=== Done ===");

    Ok(())
}
