//! Skip resolution and skip-aware step counting
//!
//! A target counts as skipped when it is registered skippable and has no live
//! controller at the moment of the query. Presence is never cached.

use tracing::warn;

use super::state::Run;
use crate::target::TargetId;

/// Upper bound on skip-resolution iterations
pub const SKIP_ITERATION_CEILING: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Forward,
    Backward,
}

impl Direction {
    fn step(self, index: usize) -> Option<usize> {
        match self {
            Direction::Forward => index.checked_add(1),
            Direction::Backward => index.checked_sub(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SkipOutcome {
    /// Target at this index has a live controller
    Found(usize),
    /// Target at this index is absent and not skippable
    Paused(usize),
    /// Walked out of the list
    Exhausted,
    /// Hit the iteration ceiling; index is the last one computed
    Stalled(usize),
}

/// Walk from `start` in `direction` past absent skippable targets
pub(crate) fn resolve_skip(
    ids: &[TargetId],
    start: usize,
    direction: Direction,
    is_live: impl Fn(&TargetId) -> bool,
    is_skippable: impl Fn(&TargetId) -> bool,
) -> SkipOutcome {
    let mut index = start;
    for _ in 0..SKIP_ITERATION_CEILING {
        let Some(target) = ids.get(index) else {
            return SkipOutcome::Exhausted;
        };
        if is_live(target) {
            return SkipOutcome::Found(index);
        }
        if !is_skippable(target) {
            return SkipOutcome::Paused(index);
        }
        match direction.step(index) {
            Some(next) if next < ids.len() => index = next,
            _ => return SkipOutcome::Exhausted,
        }
    }
    SkipOutcome::Stalled(index)
}

fn partition_of<'a>(partitions: &'a [Vec<TargetId>], target: &TargetId) -> Option<&'a [TargetId]> {
    partitions
        .iter()
        .find(|p| p.iter().any(|t| t.same_target(target)))
        .map(Vec::as_slice)
}

/// Displayed index of the active step
///
/// `None` when the active index is out of bounds.
pub(crate) fn current_step_index(
    run: &Run,
    has_skippable: bool,
    is_skipped: impl Fn(&TargetId) -> bool,
) -> Option<usize> {
    let active = run.active_target()?;
    let preceding = &run.ids[..run.index];

    let Some(partitions) = &run.partitions else {
        if !has_skippable {
            return Some(run.index);
        }
        return Some(preceding.iter().filter(|&t| !is_skipped(t)).count());
    };

    match partition_of(partitions, active) {
        Some(partition) => Some(
            preceding
                .iter()
                .filter(|&t| partition.iter().any(|p| p.same_target(t)))
                .filter(|&t| !is_skipped(t))
                .count(),
        ),
        None => {
            warn!(target_id = %active, "Active target not found in any partition");
            Some(preceding.iter().filter(|&t| !is_skipped(t)).count())
        }
    }
}

/// Number of steps the active run displays
pub(crate) fn total_steps(run: &Run, is_skipped: impl Fn(&TargetId) -> bool) -> usize {
    let Some(partitions) = &run.partitions else {
        return run.ids.len() - run.ids.iter().filter(|&t| is_skipped(t)).count();
    };

    let Some(partition) = run
        .active_target()
        .and_then(|active| partition_of(partitions, active))
    else {
        return 0;
    };
    partition.len() - partition.iter().filter(|&t| is_skipped(t)).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn targets(labels: &[&str]) -> Vec<TargetId> {
        labels.iter().map(|l| TargetId::new(*l)).collect()
    }

    fn set(ids: &[&TargetId]) -> HashSet<TargetId> {
        ids.iter().map(|t| (*t).clone()).collect()
    }

    #[test]
    fn test_found_immediately() {
        let ids = targets(&["a", "b"]);
        let outcome = resolve_skip(&ids, 0, Direction::Forward, |_| true, |_| false);
        assert_eq!(outcome, SkipOutcome::Found(0));
    }

    #[test]
    fn test_skips_absent_skippable_forward() {
        let ids = targets(&["a", "b", "c"]);
        let live = set(&[&ids[0], &ids[2]]);
        let skippable = set(&[&ids[1]]);
        let outcome = resolve_skip(
            &ids,
            1,
            Direction::Forward,
            |t| live.contains(t),
            |t| skippable.contains(t),
        );
        assert_eq!(outcome, SkipOutcome::Found(2));
    }

    #[test]
    fn test_skips_absent_skippable_backward() {
        let ids = targets(&["a", "b", "c"]);
        let live = set(&[&ids[0], &ids[2]]);
        let skippable = set(&[&ids[1]]);
        let outcome = resolve_skip(
            &ids,
            1,
            Direction::Backward,
            |t| live.contains(t),
            |t| skippable.contains(t),
        );
        assert_eq!(outcome, SkipOutcome::Found(0));
    }

    #[test]
    fn test_pauses_on_absent_required_target() {
        let ids = targets(&["a", "b"]);
        let outcome = resolve_skip(&ids, 1, Direction::Forward, |t| *t == ids[0], |_| false);
        assert_eq!(outcome, SkipOutcome::Paused(1));
    }

    #[test]
    fn test_exhausts_at_either_end() {
        let ids = targets(&["a", "b"]);
        assert_eq!(
            resolve_skip(&ids, 0, Direction::Forward, |_| false, |_| true),
            SkipOutcome::Exhausted
        );
        assert_eq!(
            resolve_skip(&ids, 1, Direction::Backward, |_| false, |_| true),
            SkipOutcome::Exhausted
        );
        assert_eq!(
            resolve_skip(&ids, 2, Direction::Forward, |_| true, |_| false),
            SkipOutcome::Exhausted
        );
    }

    #[test]
    fn test_stalls_at_ceiling() {
        let labels: Vec<String> = (0..150).map(|i| format!("t{i}")).collect();
        let ids: Vec<TargetId> = labels.iter().map(TargetId::new).collect();
        let outcome = resolve_skip(&ids, 0, Direction::Forward, |_| false, |_| true);
        assert_eq!(outcome, SkipOutcome::Stalled(SKIP_ITERATION_CEILING));
    }

    #[test]
    fn test_counts_without_partitions() {
        let ids = targets(&["a", "b", "c"]);
        let skipped = set(&[&ids[1]]);
        let mut run = Run::new(ids.clone(), None);

        assert_eq!(total_steps(&run, |_| false), 3);
        assert_eq!(total_steps(&run, |t| skipped.contains(t)), 2);

        run.index = 2;
        assert_eq!(current_step_index(&run, false, |_| false), Some(2));
        assert_eq!(current_step_index(&run, true, |t| skipped.contains(t)), Some(1));
    }

    #[test]
    fn test_counts_within_partition() {
        let ids = targets(&["a", "b", "c", "d"]);
        let partitions = vec![ids[..2].to_vec(), ids[2..].to_vec()];
        let mut run = Run::new(ids.clone(), Some(partitions));

        run.index = 1;
        assert_eq!(total_steps(&run, |_| false), 2);
        assert_eq!(current_step_index(&run, false, |_| false), Some(1));

        run.index = 3;
        assert_eq!(total_steps(&run, |_| false), 2);
        assert_eq!(current_step_index(&run, false, |_| false), Some(1));

        let skipped = set(&[&ids[2]]);
        assert_eq!(total_steps(&run, |t| skipped.contains(t)), 1);
        assert_eq!(current_step_index(&run, true, |t| skipped.contains(t)), Some(0));
    }

    #[test]
    fn test_partitioned_total_is_zero_out_of_range() {
        let ids = targets(&["a", "b"]);
        let mut run = Run::new(ids.clone(), Some(vec![ids.clone()]));
        run.index = 2;
        assert_eq!(total_steps(&run, |_| false), 0);
        assert_eq!(current_step_index(&run, false, |_| false), None);
    }
}
