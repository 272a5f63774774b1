use std::sync::atomic::{AtomicBool, Ordering};

pub trait VisibilityGate: Send + Sync {
    /// Whether the host surface is currently in the foreground.
    fn is_visible(&self) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysVisible;

impl VisibilityGate for AlwaysVisible {
    fn is_visible(&self) -> bool {
        true
    }
}

/// Visibility mirrored from host events (tab shown/hidden, window focus).
#[derive(Debug)]
pub struct FlagGate {
    visible: AtomicBool,
}

impl FlagGate {
    pub fn new(visible: bool) -> Self {
        Self { visible: AtomicBool::new(visible) }
    }

    pub fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::Relaxed);
    }
}

impl Default for FlagGate {
    fn default() -> Self {
        Self::new(true)
    }
}

impl VisibilityGate for FlagGate {
    fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Relaxed)
    }
}
