use crate::JobSnapshot;

/// Rejects non-terminal snapshots that would move the display backwards.
///
/// Both channels race, so a late poll response can carry older data than a
/// push message that was already applied. The guard keeps the highest
/// `(stage index, progress)` pair seen and only admits snapshots at or above
/// it. Terminal snapshots are always admitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressGuard {
    highest: Option<Mark>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Mark {
    stage: Option<usize>,
    progress: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Apply,
    Regressed,
}

impl ProgressGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn admit(&mut self, snapshot: &JobSnapshot) -> Admission {
        if snapshot.is_terminal() {
            return Admission::Apply;
        }
        let mark = Mark {
            stage: snapshot.stage.map(|stage| stage.index()),
            progress: snapshot.progress,
        };
        match self.highest {
            Some(highest) if mark < highest => Admission::Regressed,
            _ => {
                self.highest = Some(mark);
                Admission::Apply
            }
        }
    }
}
