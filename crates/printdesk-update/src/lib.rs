// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printdesk Update: self-update lifecycle.
//
// `UpdateLifecycleManager` owns the single update state and drives an
// `UpdateFeed` through check, download (with progress relay and payload
// verification) and install. Events go to whichever view session is attached.

pub mod feed;
pub mod integrity;
pub mod manager;

pub use feed::{HttpFeed, UpdateFeed};
pub use manager::UpdateLifecycleManager;
