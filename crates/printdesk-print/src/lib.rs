// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printdesk Print: the print request pipeline.
//
// A request enters `PrintRequestRouter::submit`, is classified once, and is
// either staged into a hidden render surface and printed, printed straight
// from the primary view, or handed to the OS default application. Hidden
// surfaces are leased from `SurfaceLifecycle` and torn down on every exit path.

pub mod fallback;
pub mod invoker;
pub mod render;
pub mod router;
pub mod surface;

#[cfg(test)]
mod testing;

pub use fallback::{FallbackOpener, FallbackOutcome};
pub use invoker::{PrintInvoker, PrintOutcome};
pub use render::ContentRenderer;
pub use router::PrintRequestRouter;
pub use surface::{SurfaceLease, SurfaceLifecycle, SurfaceTransition};
