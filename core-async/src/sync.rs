//! Synchronization primitives.
//!
//! Async-aware channels used between the engine's background tasks. Session
//! state itself is guarded by blocking `parking_lot` locks in `core-playback`
//! because the public player API is synchronous; nothing in this module is
//! held across a native call.
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::{watch, CancellationToken};
//!
//! async fn example() {
//!     let (tx, mut rx) = watch::channel(false);
//!     let token = CancellationToken::new();
//!
//!     tx.send(true).unwrap();
//!     rx.changed().await.unwrap();
//!     assert!(*rx.borrow());
//!
//!     token.cancel();
//!     assert!(token.is_cancelled());
//! }
//! ```

pub use tokio::sync::{broadcast, mpsc, oneshot, watch, Notify};

pub use tokio_util::sync::CancellationToken;
