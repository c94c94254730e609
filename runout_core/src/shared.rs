//! Thread-safe wrapper for callers that poll and dispatch from different threads.
//!
//! The monitor lock is held for a single extruder update only. Dispatch runs
//! after it is released, so a slow collaborator never blocks the poller.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::core::FilamentRunout;
use crate::dispatcher::RunoutDispatcher;
use crate::error::RunoutError;
use crate::monitor::{EdgeSet, MonitorHandle, RunoutEdge, RunoutMonitor, RunoutState};
use crate::sampler::{SampleSource, SensorSample};
use crate::status::{DispatchRecord, TickReport};

// A poisoned lock only means another thread panicked mid-update; the state
// is plain data and still usable.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
pub struct SharedRunout {
    monitor: Mutex<RunoutMonitor>,
    dispatcher: Mutex<RunoutDispatcher>,
    handle: MonitorHandle,
}

impl From<FilamentRunout> for SharedRunout {
    fn from(runout: FilamentRunout) -> Self {
        let (monitor, dispatcher) = runout.into_parts();
        Self {
            handle: monitor.handle(),
            monitor: Mutex::new(monitor),
            dispatcher: Mutex::new(dispatcher),
        }
    }
}

impl SharedRunout {
    pub fn on_tick(
        &self,
        extruder: usize,
        sample: SensorSample,
        distance_mm: f32,
    ) -> Result<Option<DispatchRecord>, RunoutError> {
        let edge = lock(&self.monitor).on_tick(extruder, sample, distance_mm)?;
        Ok(edge.map(|edge| self.dispatch(edge)))
    }

    pub fn poll<S: SampleSource + ?Sized>(&self, source: &mut S, distances: &[f32]) -> TickReport {
        source.begin_tick();
        let count = lock(&self.monitor).extruder_count();
        let mut edges = EdgeSet::default();
        for e in 0..count {
            let sample = source.sample(e);
            let d = distances.get(e).copied().unwrap_or(0.0);
            if let Ok(Some(edge)) = lock(&self.monitor).on_tick(e, sample, d) {
                edges.insert(edge);
            }
        }
        let mut report = TickReport::default();
        for edge in edges.iter() {
            report.push(self.dispatch(edge));
        }
        report
    }

    fn dispatch(&self, edge: RunoutEdge) -> DispatchRecord {
        let outcome = lock(&self.dispatcher).dispatch(edge);
        if outcome.clears_runout() {
            lock(&self.monitor).clear(edge.extruder);
        }
        DispatchRecord {
            extruder: edge.extruder,
            outcome,
        }
    }

    /// Lock-free control surface (enable, printing, clears).
    pub fn handle(&self) -> MonitorHandle {
        self.handle.clone()
    }

    pub fn state(&self, extruder: usize) -> RunoutState {
        lock(&self.monitor).state(extruder)
    }

    pub fn clear(&self, extruder: usize) {
        lock(&self.monitor).clear(extruder);
    }

    pub fn set_enabled(&self, on: bool) {
        lock(&self.monitor).set_enabled(on);
    }
}
