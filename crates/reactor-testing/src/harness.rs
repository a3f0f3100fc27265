//! Headless harness for driving a reactive graph in tests.

use reactor_core::{configure, reset, Options};

/// A headless test environment for `reactor-core` graphs: owns resetting
/// the process-wide runtime on creation so tests never leak effects,
/// watchers, or options from whatever ran before them in the same thread.
pub struct ReactorHarness {
    _private: (),
}

impl ReactorHarness {
    /// Reset the process-wide runtime and hand back a fresh harness.
    ///
    /// Every test using this crate should start from one of these instead
    /// of calling [`reactor_core::reset`] directly, so the isolation step
    /// reads the same way at every call site.
    pub fn create() -> Self {
        reset();
        Self { _private: () }
    }

    /// Reset the process-wide runtime and configure it in one step.
    pub fn create_with(configure_fn: impl FnOnce(&mut Options)) -> Self {
        let harness = Self::create();
        configure(configure_fn);
        harness
    }
}

impl Default for ReactorHarness {
    fn default() -> Self {
        Self::create()
    }
}

impl Drop for ReactorHarness {
    fn drop(&mut self) {
        reset();
    }
}
