/// Driver Lifecycle State
/// Tracks how far setup got and where it stopped

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DriverState {
    Unconfigured,
    BusReady,
    BridgeConfigured,
    CommandModeEntered,
    Error,
}

impl DriverState {
    pub fn new() -> Self {
        DriverState::Unconfigured
    }

    /// Bridge registers are programmed and the FIFOs can be used
    pub fn is_configured(self) -> bool {
        matches!(self, DriverState::BridgeConfigured | DriverState::CommandModeEntered)
    }

    /// Move forward to `next`; an errored driver stays errored until setup restarts it
    pub fn advance(&mut self, next: DriverState) {
        if *self != DriverState::Error || next == DriverState::Unconfigured {
            *self = next;
        }
    }

    pub fn fail(&mut self) {
        *self = DriverState::Error;
    }
}

impl Default for DriverState {
    fn default() -> Self {
        DriverState::new()
    }
}
