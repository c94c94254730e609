//! Runout event dispatch: one edge in, at most one recovery action out.
//!
//! Every collaborator is optional. An absent pause pipeline or migration
//! subsystem reads as "not in progress"; absent notifiers are skipped.
//! No collaborator failure is fatal: notification failures are logged and
//! recovery continues, command failures fall back to the next channel.

use core::fmt::Write as _;

use runout_traits::{CommandQueue, HostProtocol, Migration, PausePipeline, RunoutUi};

use crate::config::DispatchConfig;
use crate::hw_error::map_collaborator_error;
use crate::monitor::RunoutEdge;

/// External subsystems the dispatcher talks to.
#[derive(Default)]
pub struct Collaborators {
    pub pause: Option<Box<dyn PausePipeline + Send>>,
    pub queue: Option<Box<dyn CommandQueue + Send>>,
    pub host: Option<Box<dyn HostProtocol + Send>>,
    pub ui: Option<Box<dyn RunoutUi + Send>>,
    pub migration: Option<Box<dyn Migration + Send>>,
}

impl core::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Collaborators")
            .field("pause", &self.pause.is_some())
            .field("queue", &self.queue.is_some())
            .field("host", &self.host.is_some())
            .field("ui", &self.ui.is_some())
            .field("migration", &self.migration.is_some())
            .finish()
    }
}

/// What happened to one runout edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A pause was already underway; the event was discarded.
    SuppressedPauseInProgress,
    /// A tool migration was already underway; the event was discarded.
    SuppressedMigrationInProgress,
    /// Automatic migration moved the print to another tool.
    Migrated,
    /// The host was prompted and asked to pause.
    HostHandled,
    /// The runout script was queued.
    ScriptInjected,
    /// The pause pipeline was asked directly.
    PauseRequested,
    /// No collaborator accepted a recovery action.
    Undelivered,
}

impl DispatchOutcome {
    /// True when the handoff completed and the extruder can return to Idle.
    pub const fn clears_runout(self) -> bool {
        matches!(self, Self::Migrated)
    }

    /// True when some collaborator accepted a recovery action.
    pub const fn is_delivered(self) -> bool {
        matches!(
            self,
            Self::Migrated | Self::HostHandled | Self::ScriptInjected | Self::PauseRequested
        )
    }

    pub const fn is_suppressed(self) -> bool {
        matches!(
            self,
            Self::SuppressedPauseInProgress | Self::SuppressedMigrationInProgress
        )
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SuppressedPauseInProgress => "suppressed_pause_in_progress",
            Self::SuppressedMigrationInProgress => "suppressed_migration_in_progress",
            Self::Migrated => "migrated",
            Self::HostHandled => "host_handled",
            Self::ScriptInjected => "script_injected",
            Self::PauseRequested => "pause_requested",
            Self::Undelivered => "undelivered",
        }
    }
}

impl core::fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct RunoutDispatcher {
    config: DispatchConfig,
    multi_sensor: bool,
    collab: Collaborators,
    script_buf: String,
}

impl RunoutDispatcher {
    pub fn new(config: DispatchConfig, multi_sensor: bool, collab: Collaborators) -> Self {
        let cap = config.runout_script.as_ref().map_or(0, |s| s.len() + 8);
        Self {
            config,
            multi_sensor,
            collab,
            script_buf: String::with_capacity(cap),
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn collaborators_mut(&mut self) -> &mut Collaborators {
        &mut self.collab
    }

    /// Handle one runout edge. The tool index is the extruder index.
    pub fn dispatch(&mut self, edge: RunoutEdge) -> DispatchOutcome {
        let tool = edge.extruder;

        if self
            .collab
            .pause
            .as_ref()
            .is_some_and(|p| p.is_pause_in_progress())
        {
            tracing::debug!(tool, "runout suppressed: pause already in progress");
            return DispatchOutcome::SuppressedPauseInProgress;
        }

        if let Some(m) = self.collab.migration.as_mut() {
            if m.is_in_progress() {
                tracing::debug!(tool, "runout suppressed: migration in progress");
                return DispatchOutcome::SuppressedMigrationInProgress;
            }
            if self.config.automatic_migration && m.is_automode_armed() {
                if m.try_auto_migrate() {
                    tracing::info!(tool, "runout handled by automatic migration");
                    return DispatchOutcome::Migrated;
                }
                tracing::warn!(tool, "automatic migration failed; pausing");
            }
        }

        if let Some(ui) = self.collab.ui.as_mut()
            && let Err(e) = ui.on_filament_runout(tool)
        {
            let e = map_collaborator_error("ui", &*e);
            tracing::warn!(error = %e, tool, "runout notification not delivered");
        }

        if self.config.host_action_commands
            && let Some(host) = self.collab.host.as_mut()
        {
            if let Err(e) = host.prompt_filament_runout(tool) {
                let e = map_collaborator_error("host prompt", &*e);
                tracing::warn!(error = %e, tool, "host prompt not delivered");
            }
            match host.action_pause(tool) {
                Ok(()) => {
                    tracing::info!(tool, "runout handed to host");
                    return DispatchOutcome::HostHandled;
                }
                Err(e) => {
                    let e = map_collaborator_error("host action", &*e);
                    tracing::warn!(error = %e, tool, "host pause not delivered; pausing locally");
                }
            }
        }

        if let (Some(script), Some(queue)) =
            (self.config.runout_script.as_deref(), self.collab.queue.as_mut())
        {
            self.script_buf.clear();
            self.script_buf.push_str(script);
            if self.multi_sensor {
                write!(self.script_buf, " T{tool}").ok();
            }
            match queue.inject(&self.script_buf) {
                Ok(()) => {
                    tracing::info!(tool, command = %self.script_buf, "runout script queued");
                    return DispatchOutcome::ScriptInjected;
                }
                Err(e) => {
                    let e = map_collaborator_error("command queue", &*e);
                    tracing::warn!(error = %e, tool, "runout script rejected; requesting pause");
                }
            }
        }

        if let Some(pause) = self.collab.pause.as_mut() {
            match pause.request_filament_change_pause(tool) {
                Ok(()) => {
                    tracing::info!(tool, "filament change pause requested");
                    return DispatchOutcome::PauseRequested;
                }
                Err(e) => {
                    let e = map_collaborator_error("pause pipeline", &*e);
                    tracing::error!(error = %e, tool, "pause request rejected");
                }
            }
        }

        tracing::error!(tool, "runout not delivered to any collaborator");
        DispatchOutcome::Undelivered
    }
}
