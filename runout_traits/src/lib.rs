//! Boundary traits between the runout core and everything it does not own:
//! the physical inputs and the print-side collaborators.
//!
//! Fallible calls use `Box<dyn Error + Send + Sync>` so adapters can surface
//! whatever their transport produces; the core maps these to typed errors.

pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// Error type crossing every trait boundary in this crate.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// What a physical filament input yields on one read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawSignal {
    /// Pin level of a presence switch (`true` = high).
    Level(bool),
    /// Monotonic edge counter of a motion encoder; wrapping is allowed.
    Pulses(u32),
}

/// Raw per-sensor input. One call per sensor per polling tick.
///
/// Implementations must not block for longer than a pin read.
pub trait FilamentInput {
    fn read(&mut self, sensor: usize) -> Result<RawSignal, BoxError>;
}

/// Print pause / filament-change pipeline.
pub trait PausePipeline {
    /// True while a pause or filament change is underway.
    fn is_pause_in_progress(&self) -> bool;
    /// Ask the pipeline to pause for a filament change on `tool`.
    fn request_filament_change_pause(&mut self, tool: usize) -> Result<(), BoxError>;
}

/// Queue that runs an opaque command string at the next safe point.
pub trait CommandQueue {
    fn inject(&mut self, command: &str) -> Result<(), BoxError>;
}

/// Host-side action/prompt protocol.
pub trait HostProtocol {
    fn prompt_filament_runout(&mut self, tool: usize) -> Result<(), BoxError>;
    fn action_pause(&mut self, tool: usize) -> Result<(), BoxError>;
}

/// Local display notifications.
pub trait RunoutUi {
    fn on_filament_runout(&mut self, tool: usize) -> Result<(), BoxError>;
}

/// Automatic tool migration (continue the print on another extruder).
pub trait Migration {
    fn is_in_progress(&self) -> bool;
    fn is_automode_armed(&self) -> bool;
    /// Attempt a migration away from the exhausted tool. Returns true when
    /// the print continues on another tool and no pause is needed.
    fn try_auto_migrate(&mut self) -> bool;
}

/// Upper bound on filament sensors per machine; sizes every per-extruder array.
pub const MAX_SENSORS: usize = 8;
