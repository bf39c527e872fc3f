//! Run state
//!
//! A run is either absent or active at some index into its target list. The
//! index may briefly sit one past either end while a step transition is in
//! flight; step-start resolves that to "finished" before any callback fires.

use crate::error::{Error, Result};
use crate::target::TargetId;

#[derive(Debug, Clone)]
pub(crate) struct Run {
    pub ids: Vec<TargetId>,
    pub partitions: Option<Vec<Vec<TargetId>>>,
    pub index: usize,
}

impl Run {
    pub fn new(ids: Vec<TargetId>, partitions: Option<Vec<Vec<TargetId>>>) -> Self {
        Self {
            ids,
            partitions,
            index: 0,
        }
    }

    /// Target at the active index, if it is in bounds
    pub fn active_target(&self) -> Option<&TargetId> {
        self.ids.get(self.index)
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) enum RunState {
    #[default]
    NoRun,
    Active(Run),
}

impl RunState {
    pub fn run(&self) -> Option<&Run> {
        match self {
            RunState::Active(run) => Some(run),
            RunState::NoRun => None,
        }
    }

    pub fn run_mut(&mut self) -> Option<&mut Run> {
        match self {
            RunState::Active(run) => Some(run),
            RunState::NoRun => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, RunState::Active(_))
    }
}

/// Check that `partitions` concatenate to exactly `ids`
pub fn validate_partitions(ids: &[TargetId], partitions: &[Vec<TargetId>]) -> Result<()> {
    let actual: usize = partitions.iter().map(Vec::len).sum();
    if actual != ids.len() {
        return Err(Error::PartitionLength {
            expected: ids.len(),
            actual,
        });
    }

    let flattened = partitions.iter().flatten();
    match ids
        .iter()
        .zip(flattened)
        .position(|(id, part)| !id.same_target(part))
    {
        Some(position) => Err(Error::PartitionOrder { position }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(n: usize) -> Vec<TargetId> {
        (0..n).map(|i| TargetId::new(format!("t{i}"))).collect()
    }

    #[test]
    fn test_valid_partitions() {
        let ids = targets(4);
        let partitions = vec![ids[..2].to_vec(), ids[2..].to_vec()];
        assert!(validate_partitions(&ids, &partitions).is_ok());
    }

    #[test]
    fn test_recreated_handles_pass_validation() {
        let ids = targets(2);
        let partitions = vec![ids
            .iter()
            .map(|t| TargetId::from_parts(t.id(), t.label()))
            .collect()];
        assert!(validate_partitions(&ids, &partitions).is_ok());
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let ids = targets(3);
        let partitions = vec![ids[..2].to_vec()];
        assert!(matches!(
            validate_partitions(&ids, &partitions),
            Err(Error::PartitionLength { expected: 3, actual: 2 })
        ));
    }

    #[test]
    fn test_order_mismatch_rejected() {
        let ids = targets(3);
        let partitions = vec![vec![ids[0].clone(), ids[2].clone()], vec![ids[1].clone()]];
        assert!(matches!(
            validate_partitions(&ids, &partitions),
            Err(Error::PartitionOrder { position: 1 })
        ));
    }

    #[test]
    fn test_active_target_out_of_bounds() {
        let mut run = Run::new(targets(2), None);
        assert!(run.active_target().is_some());
        run.index = 2;
        assert!(run.active_target().is_none());
    }
}
