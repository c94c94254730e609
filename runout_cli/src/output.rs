//! Event and summary lines on stdout (text or JSON lines).

use runout_core::DispatchRecord;
use serde_json::json;

pub fn event_line(json: bool, tick: u64, record: &DispatchRecord, emitted: &[String]) -> String {
    if json {
        return json!({
            "event": "runout",
            "tick": tick,
            "extruder": record.extruder,
            "outcome": record.outcome.as_str(),
            "delivered": record.outcome.is_delivered(),
            "emitted": emitted,
        })
        .to_string();
    }
    let mut line = format!(
        "tick {tick}: runout on T{} -> {}",
        record.extruder, record.outcome
    );
    for e in emitted {
        line.push_str("\n  > ");
        line.push_str(e);
    }
    line
}

/// Totals over a replay or watch run.
#[derive(Debug, Default, Clone, Copy)]
pub struct Summary {
    pub ticks: u64,
    pub events: u64,
    pub delivered: u64,
    pub suppressed: u64,
}

impl Summary {
    pub fn record(&mut self, record: &DispatchRecord) {
        self.events += 1;
        if record.outcome.is_delivered() {
            self.delivered += 1;
        }
        if record.outcome.is_suppressed() {
            self.suppressed += 1;
        }
    }

    pub fn line(&self, json: bool) -> String {
        if json {
            return json!({
                "event": "summary",
                "ticks": self.ticks,
                "events": self.events,
                "delivered": self.delivered,
                "suppressed": self.suppressed,
            })
            .to_string();
        }
        format!(
            "{} ticks, {} runout events ({} delivered, {} suppressed)",
            self.ticks, self.events, self.delivered, self.suppressed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runout_core::DispatchOutcome;

    #[test]
    fn json_event_carries_outcome_and_emitted_lines() {
        let rec = DispatchRecord {
            extruder: 1,
            outcome: DispatchOutcome::ScriptInjected,
        };
        let line = event_line(true, 7, &rec, &["M600 T1".to_string()]);
        let v: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(v["tick"], 7);
        assert_eq!(v["extruder"], 1);
        assert_eq!(v["outcome"], "script_injected");
        assert_eq!(v["emitted"][0], "M600 T1");
    }

    #[test]
    fn summary_counts_suppressed_separately() {
        let mut s = Summary::default();
        s.record(&DispatchRecord {
            extruder: 0,
            outcome: DispatchOutcome::SuppressedPauseInProgress,
        });
        s.record(&DispatchRecord {
            extruder: 0,
            outcome: DispatchOutcome::PauseRequested,
        });
        assert_eq!((s.events, s.delivered, s.suppressed), (2, 1, 1));
        assert!(s.line(false).contains("2 runout events"));
    }
}
