//! The assembled runout pipeline (`FilamentRunout`).
//!
//! Wires one `RunoutMonitor` to one `RunoutDispatcher`: every edge the
//! monitor raises during a tick is dispatched before the tick returns, in
//! ascending extruder order.

use crate::builder::{FilamentRunoutBuilder, Missing};
use crate::dispatcher::{Collaborators, RunoutDispatcher};
use crate::error::RunoutError;
use crate::monitor::{MonitorHandle, RunoutEdge, RunoutMonitor, RunoutState};
use crate::sampler::{SampleSource, SensorSample};
use crate::status::{DispatchRecord, TickReport};

pub struct FilamentRunout {
    pub(crate) monitor: RunoutMonitor,
    pub(crate) dispatcher: RunoutDispatcher,
}

impl core::fmt::Debug for FilamentRunout {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FilamentRunout")
            .field("monitor", &self.monitor)
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

impl FilamentRunout {
    /// Start building a `FilamentRunout`.
    pub fn builder() -> FilamentRunoutBuilder<Missing> {
        FilamentRunoutBuilder::default()
    }

    /// Advance one extruder and dispatch its edge, if any.
    pub fn on_tick(
        &mut self,
        extruder: usize,
        sample: SensorSample,
        distance_mm: f32,
    ) -> Result<Option<DispatchRecord>, RunoutError> {
        let edge = self.monitor.on_tick(extruder, sample, distance_mm)?;
        Ok(edge.map(|edge| self.handle_edge(edge)))
    }

    /// Sample every configured extruder and dispatch all edges of this tick.
    pub fn poll<S: SampleSource + ?Sized>(&mut self, source: &mut S, distances: &[f32]) -> TickReport {
        let edges = self.monitor.poll(source, distances);
        let mut report = TickReport::default();
        for edge in edges.iter() {
            report.push(self.handle_edge(edge));
        }
        report
    }

    fn handle_edge(&mut self, edge: RunoutEdge) -> DispatchRecord {
        let outcome = self.dispatcher.dispatch(edge);
        if outcome.clears_runout() {
            self.monitor.clear(edge.extruder);
        }
        DispatchRecord {
            extruder: edge.extruder,
            outcome,
        }
    }

    pub fn monitor(&self) -> &RunoutMonitor {
        &self.monitor
    }

    pub fn handle(&self) -> MonitorHandle {
        self.monitor.handle()
    }

    pub fn collaborators_mut(&mut self) -> &mut Collaborators {
        self.dispatcher.collaborators_mut()
    }

    /// Completion callback: the filament change for `extruder` finished.
    pub fn clear(&mut self, extruder: usize) {
        self.monitor.clear(extruder);
    }

    pub fn clear_all(&mut self) {
        self.monitor.clear_all();
    }

    pub fn set_enabled(&mut self, on: bool) {
        self.monitor.set_enabled(on);
    }

    pub fn state(&self, extruder: usize) -> RunoutState {
        self.monitor.state(extruder)
    }

    /// Split for callers that drive monitor and dispatcher from different
    /// contexts (see `SharedRunout`).
    pub fn into_parts(self) -> (RunoutMonitor, RunoutDispatcher) {
        (self.monitor, self.dispatcher)
    }
}

