//! Surface binder.
//!
//! Tracks the one display target of a session. The target is held weakly:
//! the host UI owns it and may destroy it at any time, which the binder
//! treats as a detach. Native display calls that fail are logged and the
//! target is considered detached; decoding carries on without video output.

use std::sync::{Arc, Weak};

use bridge_traits::display::{DisplaySurface, SurfaceId};
use bridge_traits::native::NativePlayer;
use tracing::{debug, warn};

#[derive(Default)]
pub struct SurfaceBinder {
    target: Option<(SurfaceId, Weak<dyn DisplaySurface>)>,
    /// Whether the current native handle is drawing into `target`.
    attached: bool,
}

impl SurfaceBinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target_id(&self) -> Option<SurfaceId> {
        self.target.as_ref().map(|(id, _)| *id)
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Bind `surface`. With a live native handle the display call is issued
    /// now, otherwise on [`SurfaceBinder::attach`]. Binding the current
    /// target again does nothing.
    pub fn bind(&mut self, surface: &Arc<dyn DisplaySurface>, native: Option<&mut dyn NativePlayer>) {
        let id = surface.id();
        if self.target_id() == Some(id) && self.live_target().is_some() {
            if let Some(native) = native {
                if !self.attached {
                    self.attach(native);
                }
            }
            return;
        }

        if let Some(native) = native {
            if self.attached {
                detach_native(native);
                self.attached = false;
            }
            self.target = Some((id, Arc::downgrade(surface)));
            self.attach(native);
        } else {
            self.target = Some((id, Arc::downgrade(surface)));
            self.attached = false;
        }
        debug!(surface = %id, attached = self.attached, "Surface bound");
    }

    /// Forget the target and detach it from the native handle, if any.
    pub fn unbind(&mut self, native: Option<&mut dyn NativePlayer>) {
        if let Some((id, _)) = self.target.take() {
            debug!(surface = %id, "Surface unbound");
        }
        if self.attached {
            if let Some(native) = native {
                detach_native(native);
            }
            self.attached = false;
        }
    }

    /// Hand the stored target to a freshly prepared native handle.
    pub fn attach(&mut self, native: &mut dyn NativePlayer) {
        let Some(surface) = self.live_target() else {
            self.attached = false;
            return;
        };
        match native.set_display(Some(surface)) {
            Ok(()) => self.attached = true,
            Err(error) => {
                warn!(error = %error, "Native display bind failed; continuing without video output");
                self.attached = false;
            }
        }
    }

    /// Detach when the host destroyed the target behind our back.
    pub fn reconcile(&mut self, native: &mut dyn NativePlayer) {
        if self.attached && self.live_target().is_none() {
            debug!("Surface went away; detaching");
            detach_native(native);
            self.attached = false;
            self.target = None;
        }
    }

    /// The native handle is going away; keep the target for the next one.
    pub fn detach_for_teardown(&mut self, native: &mut dyn NativePlayer) {
        if self.attached {
            detach_native(native);
            self.attached = false;
        }
    }

    fn live_target(&self) -> Option<Arc<dyn DisplaySurface>> {
        self.target
            .as_ref()
            .and_then(|(_, weak)| weak.upgrade())
            .filter(|surface| surface.is_valid())
    }
}

fn detach_native(native: &mut dyn NativePlayer) {
    if let Err(error) = native.set_display(None) {
        warn!(error = %error, "Native display detach failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::native::{OptionCategory, OptionValue};
    use std::sync::atomic::{AtomicBool, Ordering};

    struct TestSurface {
        id: u64,
        valid: AtomicBool,
    }

    impl TestSurface {
        fn new(id: u64) -> Arc<dyn DisplaySurface> {
            Arc::new(Self {
                id,
                valid: AtomicBool::new(true),
            })
        }
    }

    impl DisplaySurface for TestSurface {
        fn id(&self) -> SurfaceId {
            SurfaceId(self.id)
        }

        fn is_valid(&self) -> bool {
            self.valid.load(Ordering::SeqCst)
        }
    }

    /// Records display calls; everything else is inert.
    #[derive(Default)]
    struct DisplayLog {
        calls: Vec<Option<SurfaceId>>,
        fail: bool,
    }

    impl NativePlayer for DisplayLog {
        fn set_option(&mut self, _: OptionCategory, _: &str, _: &OptionValue) -> BridgeResult<()> {
            Ok(())
        }
        fn prepare(&mut self) -> BridgeResult<()> {
            Ok(())
        }
        fn start(&mut self) -> BridgeResult<()> {
            Ok(())
        }
        fn pause(&mut self) -> BridgeResult<()> {
            Ok(())
        }
        fn stop(&mut self) -> BridgeResult<()> {
            Ok(())
        }
        fn seek_to(&mut self, _: i64) -> BridgeResult<()> {
            Ok(())
        }
        fn current_position(&self) -> i64 {
            0
        }
        fn duration(&self) -> i64 {
            0
        }
        fn video_width(&self) -> i32 {
            0
        }
        fn video_height(&self) -> i32 {
            0
        }
        fn set_display(&mut self, surface: Option<Arc<dyn DisplaySurface>>) -> BridgeResult<()> {
            self.calls.push(surface.map(|s| s.id()));
            if self.fail {
                return Err(BridgeError::OperationFailed("surface abandoned".into()));
            }
            Ok(())
        }
        fn release(&mut self) {}
    }

    #[test]
    fn bind_without_native_defers_attach() {
        let surface = TestSurface::new(1);
        let mut binder = SurfaceBinder::new();
        binder.bind(&surface, None);
        assert!(!binder.is_attached());

        let mut native = DisplayLog::default();
        binder.attach(&mut native);
        assert!(binder.is_attached());
        assert_eq!(native.calls, vec![Some(SurfaceId(1))]);
    }

    #[test]
    fn rebinding_same_target_is_a_no_op() {
        let surface = TestSurface::new(1);
        let mut native = DisplayLog::default();
        let mut binder = SurfaceBinder::new();

        binder.bind(&surface, Some(&mut native));
        binder.bind(&surface, Some(&mut native));
        assert_eq!(native.calls, vec![Some(SurfaceId(1))]);
    }

    #[test]
    fn switching_targets_detaches_the_old_one_first() {
        let first = TestSurface::new(1);
        let second = TestSurface::new(2);
        let mut native = DisplayLog::default();
        let mut binder = SurfaceBinder::new();

        binder.bind(&first, Some(&mut native));
        binder.bind(&second, Some(&mut native));
        assert_eq!(
            native.calls,
            vec![Some(SurfaceId(1)), None, Some(SurfaceId(2))]
        );
        assert_eq!(binder.target_id(), Some(SurfaceId(2)));
    }

    #[test]
    fn destroyed_target_is_detached_on_reconcile() {
        let surface = TestSurface::new(7);
        let mut native = DisplayLog::default();
        let mut binder = SurfaceBinder::new();
        binder.bind(&surface, Some(&mut native));

        drop(surface);
        binder.reconcile(&mut native);
        assert!(!binder.is_attached());
        assert_eq!(binder.target_id(), None);
        assert_eq!(native.calls.last(), Some(&None));
    }

    #[test]
    fn bind_failure_is_not_fatal() {
        let surface = TestSurface::new(3);
        let mut native = DisplayLog {
            fail: true,
            ..Default::default()
        };
        let mut binder = SurfaceBinder::new();
        binder.bind(&surface, Some(&mut native));
        assert!(!binder.is_attached());
        assert_eq!(binder.target_id(), Some(SurfaceId(3)));
    }

    #[test]
    fn unbind_detaches_live_native() {
        let surface = TestSurface::new(4);
        let mut native = DisplayLog::default();
        let mut binder = SurfaceBinder::new();
        binder.bind(&surface, Some(&mut native));
        binder.unbind(Some(&mut native));
        assert_eq!(native.calls, vec![Some(SurfaceId(4)), None]);
        assert_eq!(binder.target_id(), None);
    }
}
