//! Render target abstraction.
//!
//! A [`DisplaySurface`] is owned by the host UI toolkit. The engine only ever
//! holds it weakly, so a surface torn down by the host (window closed,
//! activity destroyed) simply stops being upgradeable.

use std::fmt;

/// Stable identity of a host surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u64);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface#{}", self.0)
    }
}

/// Host-provided video render target.
pub trait DisplaySurface: Send + Sync {
    fn id(&self) -> SurfaceId;

    /// `false` once the host has destroyed the underlying buffer queue.
    fn is_valid(&self) -> bool {
        true
    }

    /// Current buffer size in pixels, when known.
    fn size(&self) -> Option<(u32, u32)> {
        None
    }
}
