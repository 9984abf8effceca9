use crate::model::Rules;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TaskKind {
    HungerDecay,
    SleepDecay,
    EntertainmentDecay,
    HappinessRefresh,
    Allowance,
}

#[derive(Clone, Debug)]
struct PeriodicTask {
    kind: TaskKind,
    every: Duration,
    next_due: Duration,
}

/// Periodic tasks measured against elapsed session time.
///
/// Due tasks are handed out one at a time by [`Scheduler::next_due`], so a
/// cancellation requested while handling one tick stops every tick after it,
/// even those that were already due.
#[derive(Clone, Debug, Default)]
pub(crate) struct Scheduler {
    elapsed: Duration,
    tasks: Vec<PeriodicTask>,
}

impl Scheduler {
    /// Replaces any running tasks and restarts the clock at zero.
    pub(crate) fn start(&mut self, rules: &Rules) {
        self.cancel_all();
        self.elapsed = Duration::ZERO;
        let cadences = [
            (TaskKind::HungerDecay, rules.hunger_every_secs),
            (TaskKind::SleepDecay, rules.sleep_every_secs),
            (TaskKind::EntertainmentDecay, rules.entertainment_every_secs),
            (TaskKind::HappinessRefresh, rules.happiness_every_secs),
            (TaskKind::Allowance, rules.allowance_every_secs),
        ];
        for (kind, secs) in cadences {
            let every = Duration::from_secs(secs.max(1));
            self.tasks.push(PeriodicTask {
                kind,
                every,
                next_due: every,
            });
        }
    }

    /// Drops every task. Returns how many were dropped; a second call returns 0.
    pub(crate) fn cancel_all(&mut self) -> usize {
        let n = self.tasks.len();
        self.tasks.clear();
        n
    }

    pub(crate) fn is_running(&self) -> bool {
        !self.tasks.is_empty()
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub(crate) fn advance(&mut self, dt: Duration) {
        if self.is_running() {
            self.elapsed = self.elapsed.saturating_add(dt);
        }
    }

    /// Pops the earliest due task. Ties go to the task registered first.
    pub(crate) fn next_due(&mut self) -> Option<TaskKind> {
        let elapsed = self.elapsed;
        let task = self
            .tasks
            .iter_mut()
            .filter(|t| t.next_due <= elapsed)
            .min_by_key(|t| t.next_due)?;
        task.next_due += task.every;
        Some(task.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(s: &mut Scheduler) -> Vec<TaskKind> {
        std::iter::from_fn(|| s.next_due()).collect()
    }

    #[test]
    fn nothing_fires_before_its_interval() {
        let mut s = Scheduler::default();
        s.start(&Rules::default());
        s.advance(Duration::from_secs(29));
        assert!(drain(&mut s).is_empty());
        s.advance(Duration::from_secs(1));
        assert_eq!(drain(&mut s), vec![TaskKind::Allowance]);
    }

    #[test]
    fn due_ticks_come_out_in_deadline_order() {
        let mut s = Scheduler::default();
        s.start(&Rules::default());
        s.advance(Duration::from_secs(120));
        use TaskKind::*;
        // 30 40 50 60 60 80 90 90 100 120 120 120
        assert_eq!(
            drain(&mut s),
            vec![
                Allowance,
                HungerDecay,
                HappinessRefresh,
                SleepDecay,
                Allowance,
                HungerDecay,
                EntertainmentDecay,
                Allowance,
                HappinessRefresh,
                HungerDecay,
                SleepDecay,
                Allowance,
            ]
        );
    }

    #[test]
    fn cancel_is_all_or_nothing_and_idempotent() {
        let mut s = Scheduler::default();
        s.start(&Rules::default());
        s.advance(Duration::from_secs(100));
        assert_eq!(s.next_due(), Some(TaskKind::Allowance));

        assert_eq!(s.cancel_all(), 5);
        assert_eq!(s.cancel_all(), 0);
        assert!(!s.is_running());
        assert_eq!(s.next_due(), None);

        s.advance(Duration::from_secs(100));
        assert_eq!(s.next_due(), None);
    }

    #[test]
    fn restart_begins_from_zero_without_doubling_tasks() {
        let mut s = Scheduler::default();
        let rules = Rules::default();
        s.start(&rules);
        s.advance(Duration::from_secs(35));
        s.start(&rules);
        assert_eq!(s.elapsed(), Duration::ZERO);

        s.advance(Duration::from_secs(30));
        assert_eq!(drain(&mut s), vec![TaskKind::Allowance]);
    }

    #[test]
    fn stopped_scheduler_does_not_keep_time() {
        let mut s = Scheduler::default();
        s.advance(Duration::from_secs(500));
        assert_eq!(s.elapsed(), Duration::ZERO);
        assert_eq!(s.next_due(), None);
    }
}
