//! Operation context and callback traits
//!
//! These traits allow the declarative crate to be used without
//! depending on specific implementations of progress bars, prompts, etc.

use crate::types::{Action, Address, ApplyResult};
use anyhow::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Context passed to every resource operation
///
/// Carries the operation deadline and a cancellation flag shared with the
/// executor.
#[derive(Debug, Clone, Default)]
pub struct OperationContext {
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl OperationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the operation to `timeout` from now
    ///
    /// A timeout too large to represent leaves the operation unbounded.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        self
    }

    /// Share a cancellation flag
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancelled = flag;
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The flag that cancels this operation when set
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Progress callback for execution operations
///
/// Implement this trait to receive progress updates during execution.
/// Calls may arrive from worker threads, one at a time.
pub trait ProgressCallback: Send {
    /// Called once before any change is applied
    fn on_start(&mut self, count: usize);

    /// Called when starting to apply a single change
    fn on_resource_start(&mut self, address: &Address, action: Action);

    /// Called when a change completes
    fn on_resource_complete(&mut self, address: &Address, result: &ApplyResult);

    /// Called after every change has completed
    fn on_complete(&mut self);
}

/// Confirmation callback for user interaction
///
/// Implement this trait to handle user confirmations.
pub trait ConfirmCallback: Send {
    /// Ask the user to confirm an action
    ///
    /// # Returns
    /// `true` if the user confirmed, `false` otherwise
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_start(&mut self, _count: usize) {}
    fn on_resource_start(&mut self, _address: &Address, _action: Action) {}
    fn on_resource_complete(&mut self, _address: &Address, _result: &ApplyResult) {}
    fn on_complete(&mut self) {}
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Auto-decline callback (always returns false)
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_cancel_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let ctx = OperationContext::new().with_cancel_flag(Arc::clone(&flag));
        assert!(!ctx.is_cancelled());

        flag.store(true, Ordering::SeqCst);
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn test_timeout_sets_deadline() {
        assert!(OperationContext::new().deadline().is_none());
        let ctx = OperationContext::new().with_timeout(Some(Duration::from_secs(5)));
        assert!(ctx.deadline().unwrap() > Instant::now());
    }

    #[test]
    fn test_oversized_timeout_is_unbounded() {
        let ctx = OperationContext::new().with_timeout(Some(Duration::from_secs(u64::MAX)));
        assert!(ctx.deadline().is_none());
    }

    #[test]
    fn test_auto_callbacks() {
        assert!(AutoConfirm.confirm("Apply?").unwrap());
        assert!(!AutoDecline.confirm("Apply?").unwrap());
    }
}
