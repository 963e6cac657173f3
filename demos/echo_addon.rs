//! Echo addon.
//!
//! Demonstrates:
//! - Building an addon with identity, commands and event handlers
//! - Lifecycle notifications (ready, client register, offline, error)
//! - Replying with chat lines, embeds and direct messages
//!
//! Usage:
//!   WORDBOMB_TOKEN=... cargo run --example echo_addon
//!   WORDBOMB_TOKEN=... cargo run --example echo_addon -- --debug
//!   WORDBOMB_URL=ws://localhost:8080 WORDBOMB_TOKEN=... cargo run --example echo_addon

// ============================================================================
// Imports
// ============================================================================

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use wordbomb_addon::{Addon, Embed, LifecycleEvent, LifecycleKind};

// ============================================================================
// Constants
// ============================================================================

const TOKEN_VAR: &str = "WORDBOMB_TOKEN";
const URL_VAR: &str = "WORDBOMB_URL";

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let debug = std::env::args().any(|arg| arg == "--debug");
    init_logging(debug);

    if let Err(e) = run().await {
        eprintln!("\n[ERROR] {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    println!("=== Echo Addon ===\n");

    let token = std::env::var(TOKEN_VAR).with_context(|| format!("{TOKEN_VAR} is not set"))?;

    let mut builder = Addon::builder()
        .token(token)
        .name("Echo")
        .description("Repeats what you say")
        .welcome("<h3>Echo</h3><p>Try <code>/echo hello</code></p>")
        .permission("chat");

    if let Ok(url) = std::env::var(URL_VAR) {
        builder = builder.url(url);
    }

    let addon = builder
        // ====================================================================
        // Commands
        // ====================================================================
        .command("/echo", |addon, client, args| {
            let text = if args.is_empty() { "(nothing)" } else { args };
            addon.send_chat(&client.id, text);
        })
        .command("/whoami", |addon, client, _args| {
            let embed = Embed::new(client.name.clone())
                .icon("👤")
                .content(format!("Client ID: {}", client.id));
            addon.send_embed(&client.id, &embed);
        })
        .command("/dm", |addon, client, args| {
            let addon = addon.clone();
            let client = client.id.clone();
            let text = args.to_string();
            tokio::spawn(async move {
                match addon.send_discord_message(&client, text).await {
                    Ok(()) => addon.send_chat(&client, "Sent you a DM"),
                    Err(e) => addon.send_chat(&client, format!("DM failed: {e}")),
                }
            });
        })
        // ====================================================================
        // Game Events
        // ====================================================================
        .on_event("wordSubmitted", |_addon, data, client| {
            println!("[Event] {} submitted {}", client.name, data["word"]);
        })
        // ====================================================================
        // Lifecycle
        // ====================================================================
        .on(LifecycleKind::Ready, |addon, event| {
            if let LifecycleEvent::Ready { addon_id } = event {
                println!("[Ready] Registered as {addon_id:?}");
            }
            addon.broadcast_chat("Echo is online");
        })
        .on(LifecycleKind::Register, |addon, event| {
            if let LifecycleEvent::Register { client, .. } = event {
                println!("[Client] {} joined", client.name);
                addon.send_chat(&client.id, format!("Welcome, {}!", client.name));
            }
        })
        .on(LifecycleKind::Offline, |_addon, event| {
            if let LifecycleEvent::Offline { reason } = event {
                println!("[Offline] {reason}, reconnecting");
            }
        })
        .on(LifecycleKind::Error, |_addon, event| {
            if let LifecycleEvent::Error { message, fatal } = event {
                eprintln!("[Error] {message} (fatal: {fatal})");
            }
        })
        .build()?;

    addon.start();

    println!("Press Ctrl+C to exit...");
    tokio::signal::ctrl_c().await.ok();

    addon.stop().await;
    println!("\n=== Done ===");
    Ok(())
}

// ============================================================================
// Logging
// ============================================================================

fn init_logging(debug: bool) {
    let filter = if debug {
        "wordbomb_addon=debug"
    } else {
        "wordbomb_addon=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}
