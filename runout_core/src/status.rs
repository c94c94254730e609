use runout_traits::MAX_SENSORS;

use crate::dispatcher::DispatchOutcome;

/// One dispatched runout event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchRecord {
    pub extruder: usize,
    pub outcome: DispatchOutcome,
}

/// Events dispatched during one tick, lowest extruder first.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickReport {
    records: [Option<DispatchRecord>; MAX_SENSORS],
    len: usize,
}

impl TickReport {
    pub(crate) fn push(&mut self, record: DispatchRecord) {
        if let Some(slot) = self.records.get_mut(self.len) {
            *slot = Some(record);
            self.len += 1;
        }
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = DispatchRecord> + '_ {
        self.records[..self.len].iter().flatten().copied()
    }

    /// Outcome for `extruder`, if it fired this tick.
    pub fn outcome_for(&self, extruder: usize) -> Option<DispatchOutcome> {
        self.iter()
            .find(|r| r.extruder == extruder)
            .map(|r| r.outcome)
    }
}
