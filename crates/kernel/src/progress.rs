//! Progress reporting and cooperative cancellation.

use crate::error::{KernelError, KernelResult};

/// Callback polled by long-running operators.
///
/// Returning `false` from [`ProgressTracker::progress`] aborts the in-flight
/// operation with [`KernelError::UserCancelled`]; no partial result is produced.
pub trait ProgressTracker {
    fn progress(&self, step: i32, total_expected_steps: i32) -> bool;
}

impl<F> ProgressTracker for F
where
    F: Fn(i32, i32) -> bool,
{
    fn progress(&self, step: i32, total_expected_steps: i32) -> bool {
        self(step, total_expected_steps)
    }
}

/// Poll an optional tracker, converting a refusal into a cancellation error.
pub fn check_progress(
    tracker: Option<&dyn ProgressTracker>,
    step: i32,
    total_expected_steps: i32,
) -> KernelResult<()> {
    match tracker {
        Some(t) if !t.progress(step, total_expected_steps) => Err(KernelError::UserCancelled),
        _ => Ok(()),
    }
}

/// Step counter that polls the tracker every `interval` units of work.
#[derive(Debug, Clone)]
pub(crate) struct ProgressTicker {
    interval: usize,
    accumulated: usize,
    step: i32,
    total: i32,
}

impl ProgressTicker {
    pub(crate) fn new(interval: usize, total: i32) -> Self {
        Self {
            interval: interval.max(1),
            accumulated: 0,
            step: 0,
            total,
        }
    }

    /// Record `work` units; polls the tracker whenever the interval is crossed.
    pub(crate) fn tick(
        &mut self,
        tracker: Option<&dyn ProgressTracker>,
        work: usize,
    ) -> KernelResult<()> {
        self.accumulated += work;
        if self.accumulated >= self.interval {
            self.accumulated = 0;
            self.step += 1;
            check_progress(tracker, self.step, self.total)?;
        }
        Ok(())
    }

    /// Unconditional poll, used at phase boundaries.
    pub(crate) fn poll(&mut self, tracker: Option<&dyn ProgressTracker>) -> KernelResult<()> {
        self.step += 1;
        check_progress(tracker, self.step, self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_no_tracker_never_cancels() {
        assert!(check_progress(None, 1, 10).is_ok());
    }

    #[test]
    fn test_closure_tracker_cancels() {
        let calls = Cell::new(0);
        let tracker = |_step: i32, _total: i32| {
            calls.set(calls.get() + 1);
            calls.get() < 2
        };
        assert!(check_progress(Some(&tracker), 1, 2).is_ok());
        assert_eq!(
            check_progress(Some(&tracker), 2, 2),
            Err(KernelError::UserCancelled)
        );
    }

    #[test]
    fn test_ticker_polls_on_interval() {
        let calls = Cell::new(0);
        let tracker = |_step: i32, _total: i32| {
            calls.set(calls.get() + 1);
            true
        };
        let mut ticker = ProgressTicker::new(10, -1);
        for _ in 0..25 {
            ticker.tick(Some(&tracker), 1).unwrap();
        }
        assert_eq!(calls.get(), 2);
        ticker.poll(Some(&tracker)).unwrap();
        assert_eq!(calls.get(), 3);
    }
}
