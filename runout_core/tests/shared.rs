use std::sync::Arc;
use std::thread;

use runout_core::mocks::RecordingQueue;
use runout_core::{
    FilamentRunout, MonitorConfig, RunoutState, SampleSource, SensorSample, SharedRunout,
};

const ABSENT: SensorSample = SensorSample::Presence { present: false };

fn shared(threshold: u8, extruders: usize, queue: &RecordingQueue) -> SharedRunout {
    let mut cfg = MonitorConfig {
        extruder_count: extruders,
        multi_sensor: extruders > 1,
        ..MonitorConfig::default()
    };
    cfg.debounce.threshold = threshold;
    FilamentRunout::builder()
        .with_config(cfg)
        .with_command_queue(queue.clone())
        .build()
        .expect("build")
        .into()
}

#[test]
fn concurrent_ticks_dispatch_once_per_extruder() {
    let queue = RecordingQueue::default();
    let runout = Arc::new(shared(3, 4, &queue));

    let workers: Vec<_> = (0..4)
        .map(|e| {
            let r = Arc::clone(&runout);
            thread::spawn(move || {
                for _ in 0..500 {
                    r.on_tick(e, ABSENT, 0.0).expect("tick");
                }
            })
        })
        .collect();
    for w in workers {
        w.join().expect("worker");
    }

    let mut commands = queue.commands();
    commands.sort();
    assert_eq!(commands, vec!["M600 T0", "M600 T1", "M600 T2", "M600 T3"]);
    for e in 0..4 {
        assert_eq!(runout.state(e), RunoutState::RanOut);
    }
}

#[test]
fn handle_clear_from_another_thread() {
    let queue = RecordingQueue::default();
    let runout = shared(1, 1, &queue);
    runout.on_tick(0, ABSENT, 0.0).expect("tick");

    let handle = runout.handle();
    thread::spawn(move || handle.request_clear(0))
        .join()
        .expect("clear thread");

    runout.on_tick(0, ABSENT, 0.0).expect("tick");
    assert_eq!(queue.commands().len(), 2);
}

#[test]
fn poll_reports_in_ascending_order() {
    struct AllAbsent;
    impl SampleSource for AllAbsent {
        fn sample(&mut self, _extruder: usize) -> SensorSample {
            ABSENT
        }
    }
    let queue = RecordingQueue::default();
    let runout = shared(1, 3, &queue);
    let report = runout.poll(&mut AllAbsent, &[]);
    let order: Vec<usize> = report.iter().map(|r| r.extruder).collect();
    assert_eq!(order, vec![0, 1, 2]);
    assert_eq!(queue.commands(), vec!["M600 T0", "M600 T1", "M600 T2"]);
}
