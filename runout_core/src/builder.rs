//! Type-state builder for `FilamentRunout`.
//!
//! The builder enforces at compile time that a `MonitorConfig` is provided
//! before `build()` is available. `try_build()` is always available for
//! dynamic checks. Collaborators are optional; missing ones are no-ops.

use std::marker::PhantomData;

use runout_traits::{CommandQueue, HostProtocol, Migration, PausePipeline, RunoutUi};

use crate::config::{DispatchConfig, MonitorConfig};
use crate::core::FilamentRunout;
use crate::dispatcher::{Collaborators, RunoutDispatcher};
use crate::error::{BuildError, Result};
use crate::monitor::RunoutMonitor;

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `FilamentRunout`. All config is validated on `build()`.
pub struct FilamentRunoutBuilder<C> {
    config: Option<MonitorConfig>,
    dispatch: Option<DispatchConfig>,
    collab: Collaborators,
    _c: PhantomData<C>,
}

impl Default for FilamentRunoutBuilder<Missing> {
    fn default() -> Self {
        Self {
            config: None,
            dispatch: None,
            collab: Collaborators::default(),
            _c: PhantomData,
        }
    }
}

/// Validate configuration and assemble the pipeline.
fn validate_and_build(
    config: MonitorConfig,
    dispatch: DispatchConfig,
    collab: Collaborators,
) -> Result<FilamentRunout> {
    config.validate().map_err(eyre::Report::new)?;
    dispatch.validate().map_err(eyre::Report::new)?;

    if collab.pause.is_none() && collab.queue.is_none() && collab.host.is_none() {
        tracing::warn!("no recovery collaborator configured; runouts will only be logged");
    }

    let multi_sensor = config.multi_sensor;
    Ok(FilamentRunout {
        monitor: RunoutMonitor::from_validated(config),
        dispatcher: RunoutDispatcher::new(dispatch, multi_sensor, collab),
    })
}

impl<C> FilamentRunoutBuilder<C> {
    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<FilamentRunout> {
        let config = self
            .config
            .ok_or_else(|| eyre::Report::new(BuildError::MissingConfig))?;
        validate_and_build(config, self.dispatch.unwrap_or_default(), self.collab)
    }
}

/// Chainable setters that do not affect type-state.
impl<C> FilamentRunoutBuilder<C> {
    pub fn with_dispatch(mut self, dispatch: DispatchConfig) -> Self {
        self.dispatch = Some(dispatch);
        self
    }
    pub fn with_pause_pipeline(mut self, pause: impl PausePipeline + Send + 'static) -> Self {
        self.collab.pause = Some(Box::new(pause));
        self
    }
    pub fn with_command_queue(mut self, queue: impl CommandQueue + Send + 'static) -> Self {
        self.collab.queue = Some(Box::new(queue));
        self
    }
    pub fn with_host(mut self, host: impl HostProtocol + Send + 'static) -> Self {
        self.collab.host = Some(Box::new(host));
        self
    }
    pub fn with_ui(mut self, ui: impl RunoutUi + Send + 'static) -> Self {
        self.collab.ui = Some(Box::new(ui));
        self
    }
    pub fn with_migration(mut self, migration: impl Migration + Send + 'static) -> Self {
        self.collab.migration = Some(Box::new(migration));
        self
    }
}

// Setter that advances type-state
impl FilamentRunoutBuilder<Missing> {
    pub fn with_config(self, config: MonitorConfig) -> FilamentRunoutBuilder<Set> {
        FilamentRunoutBuilder {
            config: Some(config),
            dispatch: self.dispatch,
            collab: self.collab,
            _c: PhantomData,
        }
    }
}

impl FilamentRunoutBuilder<Set> {
    /// Validate and build. Only available once a config is set.
    pub fn build(self) -> Result<FilamentRunout> {
        self.try_build()
    }
}
