//! On-screen debug notice capability

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeDuration {
    Short,
    Long,
}

/// Platform toast-style notifier
pub trait DebugNotifier: Send + Sync {
    fn show(&self, text: &str, duration: NoticeDuration);
}
