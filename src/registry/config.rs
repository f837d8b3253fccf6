//! Registry configuration

/// What `publish` does when a subscriber callback panics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallbackFaults {
    /// The panic unwinds into the publisher; later callbacks for that
    /// publish are skipped
    #[default]
    Propagate,
    /// Each invocation is wrapped in `catch_unwind`; the panic is logged and
    /// counted, and the remaining callbacks still run
    Isolate,
}

/// Stream registry configuration options
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Handling of panicking subscriber callbacks
    pub callback_faults: CallbackFaults,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            callback_faults: CallbackFaults::Propagate,
        }
    }
}

impl RegistryConfig {
    /// Set the callback fault policy
    pub fn callback_faults(mut self, faults: CallbackFaults) -> Self {
        self.callback_faults = faults;
        self
    }

    /// Contain panics inside each callback invocation
    pub fn isolate_callbacks(self) -> Self {
        self.callback_faults(CallbackFaults::Isolate)
    }
}
