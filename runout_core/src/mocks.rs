//! Test and helper mocks for runout_core
//!
//! The recording collaborators are cheap to clone: clones share their log, so
//! a test keeps one clone and hands the other to the builder.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use runout_traits::{
    BoxError, CommandQueue, FilamentInput, HostProtocol, Migration, PausePipeline, RawSignal,
    RunoutUi,
};

/// An input that always errors on read; useful when driving the monitor with
/// externally produced samples via `on_tick`.
pub struct NoopInput;

impl FilamentInput for NoopInput {
    fn read(&mut self, _sensor: usize) -> Result<RawSignal, BoxError> {
        Err(Box::new(std::io::Error::other("noop input")))
    }
}

fn snapshot<T: Clone>(log: &Mutex<Vec<T>>) -> Vec<T> {
    log.lock().unwrap_or_else(PoisonError::into_inner).clone()
}

fn record<T>(log: &Mutex<Vec<T>>, item: T) {
    log.lock().unwrap_or_else(PoisonError::into_inner).push(item);
}

/// Command queue that records every injected command.
#[derive(Clone, Default)]
pub struct RecordingQueue {
    commands: Arc<Mutex<Vec<String>>>,
    reject: Arc<AtomicBool>,
}

impl RecordingQueue {
    /// A queue that refuses every command.
    pub fn rejecting() -> Self {
        let q = Self::default();
        q.reject.store(true, Ordering::Relaxed);
        q
    }

    pub fn commands(&self) -> Vec<String> {
        snapshot(&self.commands)
    }
}

impl CommandQueue for RecordingQueue {
    fn inject(&mut self, command: &str) -> Result<(), BoxError> {
        if self.reject.load(Ordering::Relaxed) {
            return Err(Box::new(std::io::Error::other("queue full")));
        }
        record(&self.commands, command.to_string());
        Ok(())
    }
}

/// Pause pipeline with an externally controlled "in progress" flag.
#[derive(Clone, Default)]
pub struct RecordingPause {
    in_progress: Arc<AtomicBool>,
    latch_on_request: Arc<AtomicBool>,
    requests: Arc<Mutex<Vec<usize>>>,
}

impl RecordingPause {
    /// A pipeline that reports "in progress" once a pause was requested,
    /// like a real pipeline would until the filament change completes.
    pub fn latching() -> Self {
        let p = Self::default();
        p.latch_on_request.store(true, Ordering::Relaxed);
        p
    }

    pub fn set_in_progress(&self, on: bool) {
        self.in_progress.store(on, Ordering::Relaxed);
    }

    pub fn requests(&self) -> Vec<usize> {
        snapshot(&self.requests)
    }
}

impl PausePipeline for RecordingPause {
    fn is_pause_in_progress(&self) -> bool {
        self.in_progress.load(Ordering::Relaxed)
    }

    fn request_filament_change_pause(&mut self, tool: usize) -> Result<(), BoxError> {
        record(&self.requests, tool);
        if self.latch_on_request.load(Ordering::Relaxed) {
            self.in_progress.store(true, Ordering::Relaxed);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    Prompt(usize),
    ActionPause(usize),
}

/// Host protocol that records prompts and actions; optionally fails actions.
#[derive(Clone, Default)]
pub struct RecordingHost {
    calls: Arc<Mutex<Vec<HostCall>>>,
    fail_action: Arc<AtomicBool>,
}

impl RecordingHost {
    pub fn failing_action() -> Self {
        let h = Self::default();
        h.fail_action.store(true, Ordering::Relaxed);
        h
    }

    pub fn calls(&self) -> Vec<HostCall> {
        snapshot(&self.calls)
    }
}

impl HostProtocol for RecordingHost {
    fn prompt_filament_runout(&mut self, tool: usize) -> Result<(), BoxError> {
        record(&self.calls, HostCall::Prompt(tool));
        Ok(())
    }

    fn action_pause(&mut self, tool: usize) -> Result<(), BoxError> {
        if self.fail_action.load(Ordering::Relaxed) {
            return Err(Box::new(std::io::Error::other("host disconnected")));
        }
        record(&self.calls, HostCall::ActionPause(tool));
        Ok(())
    }
}

/// UI that records notifications; optionally fails every call.
#[derive(Clone, Default)]
pub struct RecordingUi {
    notified: Arc<Mutex<Vec<usize>>>,
    fail: Arc<AtomicBool>,
}

impl RecordingUi {
    pub fn failing() -> Self {
        let u = Self::default();
        u.fail.store(true, Ordering::Relaxed);
        u
    }

    pub fn notified(&self) -> Vec<usize> {
        snapshot(&self.notified)
    }
}

impl RunoutUi for RecordingUi {
    fn on_filament_runout(&mut self, tool: usize) -> Result<(), BoxError> {
        record(&self.notified, tool);
        if self.fail.load(Ordering::Relaxed) {
            return Err(Box::new(std::io::Error::other("display busy")));
        }
        Ok(())
    }
}

/// Migration subsystem with scripted answers.
#[derive(Clone, Default)]
pub struct ScriptedMigration {
    in_progress: Arc<AtomicBool>,
    armed: Arc<AtomicBool>,
    succeeds: Arc<AtomicBool>,
    attempts: Arc<AtomicUsize>,
}

impl ScriptedMigration {
    pub fn armed(succeeds: bool) -> Self {
        let m = Self::default();
        m.armed.store(true, Ordering::Relaxed);
        m.succeeds.store(succeeds, Ordering::Relaxed);
        m
    }

    pub fn set_in_progress(&self, on: bool) {
        self.in_progress.store(on, Ordering::Relaxed);
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::Relaxed)
    }
}

impl Migration for ScriptedMigration {
    fn is_in_progress(&self) -> bool {
        self.in_progress.load(Ordering::Relaxed)
    }

    fn is_automode_armed(&self) -> bool {
        self.armed.load(Ordering::Relaxed)
    }

    fn try_auto_migrate(&mut self) -> bool {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        self.succeeds.load(Ordering::Relaxed)
    }
}
