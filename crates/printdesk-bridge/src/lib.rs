// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Printdesk: Native platform bridge abstractions.
//!
//! The print pipeline never talks to the OS directly. Render surfaces, the
//! "open with default application" action, the printer list and the file
//! picker are reached through the traits in [`traits`], and the view the user
//! is looking at is handed over explicitly as a [`session::ViewSession`].

pub mod session;
pub mod traits;

#[cfg(any(
    target_os = "linux",
    target_os = "macos",
    target_os = "windows",
    target_os = "freebsd"
))]
pub mod desktop;

#[cfg(not(any(
    target_os = "linux",
    target_os = "macos",
    target_os = "windows",
    target_os = "freebsd"
)))]
pub mod stub;

use std::sync::Arc;

pub use session::{SessionId, ViewSession};

/// Returns the bridge implementation for the target operating system.
///
/// The concrete type is kept so callers can coerce the same `Arc` into each
/// capability trait object they need.
pub fn platform_bridge() -> Arc<impl traits::PlatformBridge + 'static> {
    #[cfg(any(
        target_os = "linux",
        target_os = "macos",
        target_os = "windows",
        target_os = "freebsd"
    ))]
    {
        Arc::new(desktop::DesktopBridge::new())
    }
    #[cfg(not(any(
        target_os = "linux",
        target_os = "macos",
        target_os = "windows",
        target_os = "freebsd"
    )))]
    {
        Arc::new(stub::StubBridge)
    }
}
