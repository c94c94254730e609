//! Console-side print collaborators for replay and watch runs.
//!
//! Nothing here talks to a real printer. Every collaborator appends what it
//! would have sent to a shared `Transcript`, which the caller prints next to
//! the dispatched event.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use runout_core::{DispatchConfig, FilamentRunout, MonitorConfig};
use runout_traits::{BoxError, CommandQueue, HostProtocol, PausePipeline, RunoutUi};

/// Lines emitted by the console collaborators since the last `drain`.
#[derive(Clone, Default)]
pub struct Transcript(Arc<Mutex<Vec<String>>>);

impl Transcript {
    fn push(&self, line: String) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line);
    }

    pub fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

pub struct ConsoleQueue {
    out: Transcript,
}

impl CommandQueue for ConsoleQueue {
    fn inject(&mut self, command: &str) -> Result<(), BoxError> {
        tracing::info!(command, "runout script queued");
        self.out.push(command.to_string());
        Ok(())
    }
}

/// Pause pipeline whose "in progress" flag is fixed by the caller.
pub struct ConsolePause {
    out: Transcript,
    in_progress: Arc<AtomicBool>,
}

impl PausePipeline for ConsolePause {
    fn is_pause_in_progress(&self) -> bool {
        self.in_progress.load(Ordering::Relaxed)
    }

    fn request_filament_change_pause(&mut self, tool: usize) -> Result<(), BoxError> {
        tracing::info!(tool, "filament change pause requested");
        self.out.push(format!("pause T{tool}"));
        Ok(())
    }
}

/// Host action protocol lines as a serial host would receive them.
pub struct ConsoleHost {
    out: Transcript,
}

impl HostProtocol for ConsoleHost {
    fn prompt_filament_runout(&mut self, tool: usize) -> Result<(), BoxError> {
        self.out
            .push(format!("//action:prompt_begin FilamentRunout T{tool}"));
        self.out.push("//action:prompt_show".to_string());
        Ok(())
    }

    fn action_pause(&mut self, tool: usize) -> Result<(), BoxError> {
        self.out.push("//action:pause".to_string());
        self.out.push(format!("//action:out_of_filament T{tool}"));
        Ok(())
    }
}

pub struct ConsoleUi;

impl RunoutUi for ConsoleUi {
    fn on_filament_runout(&mut self, tool: usize) -> Result<(), BoxError> {
        tracing::warn!(tool, "filament runout");
        Ok(())
    }
}

/// Build a `FilamentRunout` wired to console collaborators.
///
/// The host collaborator is only attached when host action commands are
/// enabled, matching what a printer without a host link would do.
pub fn console_runout(
    config: MonitorConfig,
    dispatch: DispatchConfig,
    transcript: &Transcript,
    pause_in_progress: bool,
) -> eyre::Result<FilamentRunout> {
    let host_actions = dispatch.host_action_commands;
    let mut builder = FilamentRunout::builder()
        .with_dispatch(dispatch)
        .with_command_queue(ConsoleQueue {
            out: transcript.clone(),
        })
        .with_pause_pipeline(ConsolePause {
            out: transcript.clone(),
            in_progress: Arc::new(AtomicBool::new(pause_in_progress)),
        })
        .with_ui(ConsoleUi);
    if host_actions {
        builder = builder.with_host(ConsoleHost {
            out: transcript.clone(),
        });
    }
    builder.with_config(config).build()
}
