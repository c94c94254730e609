#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core filament runout logic (hardware-agnostic).
//!
//! This crate decides when a filament runout is genuine and hands exactly one
//! recovery action per event to the print pipeline. All hardware and
//! print-side interactions go through the traits in `runout_traits`.
//!
//! ## Architecture
//!
//! - **Sampling**: raw pin levels / encoder counters to `SensorSample` (`sampler`)
//! - **Strategies**: debounced presence or distance countdown (`strategy`)
//! - **Monitor**: per-extruder edge detection and enable gating (`monitor`)
//! - **Dispatch**: guard arbitration and recovery command emission (`dispatcher`)
//! - **Assembly**: `FilamentRunout` built via a type-state builder, and
//!   `SharedRunout` for multi-threaded callers
//!
//! ## Real-time path
//!
//! `on_tick` and `poll` do not allocate or block. Per-extruder state lives in
//! fixed arrays of `MAX_SENSORS` entries. Dispatch formats the recovery
//! command into a preallocated buffer and runs once per event, not per tick.

pub mod builder;
pub mod config;
pub mod conversions;
pub mod core;
pub mod dispatcher;
pub mod error;
pub mod hw_error;
pub mod mocks;
pub mod monitor;
pub mod sampler;
pub mod shared;
pub mod status;
pub mod strategy;
pub mod util;

pub use crate::builder::{FilamentRunoutBuilder, Missing, Set};
pub use crate::config::{
    DebounceCfg, DispatchConfig, DistanceCfg, EncoderCfg, MonitorConfig, SensorKind,
    SensorMapping, StrategyKind, WatchMode,
};
pub use crate::core::FilamentRunout;
pub use crate::dispatcher::{Collaborators, DispatchOutcome, RunoutDispatcher};
pub use crate::error::{BuildError, Result, RunoutError};
pub use crate::monitor::{EdgeSet, MonitorHandle, RunoutEdge, RunoutMonitor, RunoutState};
pub use crate::sampler::{BackgroundSampler, SampleSource, SensorSample, SensorSampler};
pub use crate::shared::SharedRunout;
pub use crate::status::{DispatchRecord, TickReport};
pub use crate::strategy::{ResponseStrategy, Verdict};
pub use runout_traits::MAX_SENSORS;
