//! Addon client module.
//!
//! This module provides the public entry point of the crate.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Addon`] | Handle to the running connection |
//! | [`AddonBuilder`] | Fluent configuration builder |
//! | [`AddonIdentity`] | Registration descriptor |
//! | [`Handlers`] | Command, event and lifecycle tables |
//!
//! # Example
//!
//! ```no_run
//! use wordbomb_addon::{Addon, LifecycleEvent, LifecycleKind};
//!
//! # async fn example() -> wordbomb_addon::Result<()> {
//! let addon = Addon::builder()
//!     .token("secret-token")
//!     .on(LifecycleKind::Ready, |_addon, event| {
//!         if let LifecycleEvent::Ready { addon_id } = event {
//!             println!("ready as {addon_id:?}");
//!         }
//!     })
//!     .build()?;
//!
//! addon.start();
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder for addon configuration.
pub mod builder;

/// Addon handle implementation.
pub mod core;

/// Handler tables and lifecycle types.
pub mod handlers;

/// Registration identity.
pub mod identity;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::AddonBuilder;
pub use core::Addon;
pub use handlers::{
    CommandHandler, EventHandler, Handlers, LifecycleEvent, LifecycleHandler, LifecycleKind,
};
pub use identity::AddonIdentity;
