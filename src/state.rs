//! Connection lifecycle state and its transition table.

/// Lifecycle state of a [`crate::NumatoDevice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceState {
    /// No usable connection. The reconnect watchdog (if armed) retries.
    #[default]
    Uninitialized,
    /// Port open, setup sequence queued, poll loop running.
    Initialized,
}

/// Events that move the lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Discovery, open and setup-sequence enqueue all succeeded.
    SetupComplete,
    /// `initialize` started; any previous connection is dropped first.
    InitStarted,
    /// The serial layer reported an error.
    TransportError,
    /// A command could not be written.
    WriteError,
    /// Nothing received for longer than the receive timeout.
    ReceiveTimeout,
    /// Explicit teardown or disposal.
    TornDown,
}

impl DeviceState {
    /// Returns true if commands can be sent.
    pub fn is_initialized(&self) -> bool {
        matches!(self, DeviceState::Initialized)
    }

    /// Process an event and return the next state.
    pub fn transition(self, event: Transition) -> Self {
        use DeviceState::*;
        use Transition::*;

        match (self, event) {
            (_, SetupComplete) => Initialized,
            (_, InitStarted) => Uninitialized,
            (Initialized, TransportError | WriteError | ReceiveTimeout | TornDown) => Uninitialized,
            (Uninitialized, TransportError | WriteError | ReceiveTimeout | TornDown) => {
                Uninitialized
            }
        }
    }
}
