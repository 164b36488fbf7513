/// Timing helpers for the simulation phases.
///
/// A [`ProfilerScope`] measures one phase of a step and reports it at `trace`
/// level when dropped; [`PhaseTimes`] accumulates the phases of one step.
use std::time::Instant;

/// A profiling scope that measures elapsed time using RAII.
///
/// The elapsed time is emitted as a `trace` event when dropped.
pub struct ProfilerScope {
    start: Instant,
    name: &'static str,
}

impl ProfilerScope {
    /// Creates a new profiling scope.
    pub fn new(name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            name,
        }
    }

    /// Gets elapsed time in milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for ProfilerScope {
    fn drop(&mut self) {
        tracing::trace!(phase = self.name, elapsed_ms = self.elapsed_ms(), "phase finished");
    }
}

/// Wall-clock time spent in each phase of the last step (ms)
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PhaseTimes {
    /// Injectors
    pub injectors: f64,
    /// Density/viscosity update
    pub properties: f64,
    /// Pressure solve and transport
    pub flow: f64,
    /// Capillary exchange
    pub capillary: f64,
    /// Heat conduction and fluid-rock exchange
    pub thermal: f64,
    /// Reactions
    pub reactions: f64,
}

impl PhaseTimes {
    /// Total time of the step
    pub fn total(&self) -> f64 {
        self.injectors
            + self.properties
            + self.flow
            + self.capillary
            + self.thermal
            + self.reactions
    }
}
