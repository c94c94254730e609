use runout_core::mocks::{
    HostCall, RecordingHost, RecordingPause, RecordingQueue, RecordingUi, ScriptedMigration,
};
use runout_core::{Collaborators, DispatchConfig, DispatchOutcome, RunoutDispatcher, RunoutEdge};
use rstest::rstest;

const EDGE0: RunoutEdge = RunoutEdge { extruder: 0 };
const EDGE2: RunoutEdge = RunoutEdge { extruder: 2 };

struct Rig {
    pause: RecordingPause,
    queue: RecordingQueue,
    host: RecordingHost,
    ui: RecordingUi,
    migration: ScriptedMigration,
}

impl Rig {
    fn new() -> Self {
        Self {
            pause: RecordingPause::default(),
            queue: RecordingQueue::default(),
            host: RecordingHost::default(),
            ui: RecordingUi::default(),
            migration: ScriptedMigration::default(),
        }
    }

    fn dispatcher(&self, config: DispatchConfig, multi_sensor: bool) -> RunoutDispatcher {
        RunoutDispatcher::new(
            config,
            multi_sensor,
            Collaborators {
                pause: Some(Box::new(self.pause.clone())),
                queue: Some(Box::new(self.queue.clone())),
                host: Some(Box::new(self.host.clone())),
                ui: Some(Box::new(self.ui.clone())),
                migration: Some(Box::new(self.migration.clone())),
            },
        )
    }
}

#[test]
fn default_dispatch_injects_script_and_notifies_ui() {
    let rig = Rig::new();
    let mut d = rig.dispatcher(DispatchConfig::default(), false);
    assert_eq!(d.dispatch(EDGE0), DispatchOutcome::ScriptInjected);
    assert_eq!(rig.queue.commands(), vec!["M600".to_string()]);
    assert_eq!(rig.ui.notified(), vec![0]);
    assert!(rig.pause.requests().is_empty());
    assert!(rig.host.calls().is_empty());
}

#[rstest]
#[case(false, "M600")]
#[case(true, "M600 T2")]
fn script_carries_tool_only_with_multiple_sensors(#[case] multi: bool, #[case] expected: &str) {
    let rig = Rig::new();
    let mut d = rig.dispatcher(DispatchConfig::default(), multi);
    d.dispatch(EDGE2);
    assert_eq!(rig.queue.commands(), vec![expected.to_string()]);
}

#[test]
fn pause_in_progress_discards_event() {
    let rig = Rig::new();
    rig.pause.set_in_progress(true);
    let mut d = rig.dispatcher(DispatchConfig::default(), false);
    let outcome = d.dispatch(EDGE0);
    assert_eq!(outcome, DispatchOutcome::SuppressedPauseInProgress);
    assert!(outcome.is_suppressed());
    assert!(rig.queue.commands().is_empty());
    assert!(rig.ui.notified().is_empty());
}

#[test]
fn migration_in_progress_discards_event() {
    let rig = Rig::new();
    rig.migration.set_in_progress(true);
    let mut d = rig.dispatcher(DispatchConfig::default(), false);
    assert_eq!(
        d.dispatch(EDGE0),
        DispatchOutcome::SuppressedMigrationInProgress
    );
    assert!(rig.queue.commands().is_empty());
}

#[test]
fn armed_migration_replaces_pause() {
    let mut rig = Rig::new();
    rig.migration = ScriptedMigration::armed(true);
    let cfg = DispatchConfig {
        automatic_migration: true,
        ..DispatchConfig::default()
    };
    let mut d = rig.dispatcher(cfg, true);
    let outcome = d.dispatch(EDGE0);
    assert_eq!(outcome, DispatchOutcome::Migrated);
    assert!(outcome.clears_runout());
    assert_eq!(rig.migration.attempts(), 1);
    assert!(rig.queue.commands().is_empty());
    assert!(rig.ui.notified().is_empty());
}

#[test]
fn failed_migration_falls_back_to_pause() {
    let mut rig = Rig::new();
    rig.migration = ScriptedMigration::armed(false);
    let cfg = DispatchConfig {
        automatic_migration: true,
        ..DispatchConfig::default()
    };
    let mut d = rig.dispatcher(cfg, false);
    assert_eq!(d.dispatch(EDGE0), DispatchOutcome::ScriptInjected);
    assert_eq!(rig.migration.attempts(), 1);
}

#[test]
fn armed_migration_is_ignored_when_disabled_in_config() {
    let mut rig = Rig::new();
    rig.migration = ScriptedMigration::armed(true);
    let mut d = rig.dispatcher(DispatchConfig::default(), false);
    assert_eq!(d.dispatch(EDGE0), DispatchOutcome::ScriptInjected);
    assert_eq!(rig.migration.attempts(), 0);
}

#[test]
fn host_actions_take_over_the_pause() {
    let rig = Rig::new();
    let cfg = DispatchConfig {
        host_action_commands: true,
        ..DispatchConfig::default()
    };
    let mut d = rig.dispatcher(cfg, true);
    assert_eq!(d.dispatch(EDGE2), DispatchOutcome::HostHandled);
    assert_eq!(
        rig.host.calls(),
        vec![HostCall::Prompt(2), HostCall::ActionPause(2)]
    );
    assert!(rig.queue.commands().is_empty());
    assert_eq!(rig.ui.notified(), vec![2]);
}

#[test]
fn host_action_failure_falls_through_to_script() {
    let mut rig = Rig::new();
    rig.host = RecordingHost::failing_action();
    let cfg = DispatchConfig {
        host_action_commands: true,
        ..DispatchConfig::default()
    };
    let mut d = rig.dispatcher(cfg, false);
    assert_eq!(d.dispatch(EDGE0), DispatchOutcome::ScriptInjected);
    assert_eq!(rig.host.calls(), vec![HostCall::Prompt(0)]);
}

#[test]
fn ui_failure_does_not_block_recovery() {
    let mut rig = Rig::new();
    rig.ui = RecordingUi::failing();
    let mut d = rig.dispatcher(DispatchConfig::default(), false);
    assert_eq!(d.dispatch(EDGE0), DispatchOutcome::ScriptInjected);
    assert_eq!(rig.ui.notified(), vec![0]);
}

#[test]
fn rejected_script_falls_back_to_direct_pause() {
    let mut rig = Rig::new();
    rig.queue = RecordingQueue::rejecting();
    let mut d = rig.dispatcher(DispatchConfig::default(), true);
    assert_eq!(d.dispatch(EDGE2), DispatchOutcome::PauseRequested);
    assert_eq!(rig.pause.requests(), vec![2]);
}

#[test]
fn no_script_requests_pause_directly() {
    let rig = Rig::new();
    let cfg = DispatchConfig {
        runout_script: None,
        ..DispatchConfig::default()
    };
    let mut d = rig.dispatcher(cfg, true);
    assert_eq!(d.dispatch(EDGE2), DispatchOutcome::PauseRequested);
    assert_eq!(rig.pause.requests(), vec![2]);
    assert!(rig.queue.commands().is_empty());
}

#[test]
fn nothing_to_deliver_to_is_reported() {
    let mut d = RunoutDispatcher::new(DispatchConfig::default(), false, Collaborators::default());
    let outcome = d.dispatch(EDGE0);
    assert_eq!(outcome, DispatchOutcome::Undelivered);
    assert!(!outcome.is_delivered());
}

#[test]
fn outcome_names_are_stable() {
    assert_eq!(DispatchOutcome::ScriptInjected.to_string(), "script_injected");
    assert_eq!(
        DispatchOutcome::SuppressedPauseInProgress.as_str(),
        "suppressed_pause_in_progress"
    );
}
