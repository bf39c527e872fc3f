use std::path::Path;

use anyhow::{bail, Result};

use showcase_core::sequencer::validate_partitions;
use showcase_core::TargetId;

use crate::tour::{TourFile, TourPlan};

/// Steps shown for one partition: the ones not skipped at start
fn visible_steps(plan: &TourPlan, partition: &[TargetId]) -> usize {
    partition
        .iter()
        .filter(|id| {
            plan.targets
                .iter()
                .find(|(t, _)| t == *id)
                .map_or(true, |(_, spec)| spec.present || !spec.skippable)
        })
        .count()
}

/// Steps that would pause the run: absent and not skippable
fn pausing_steps(plan: &TourPlan) -> Vec<(usize, &str)> {
    plan.steps
        .iter()
        .enumerate()
        .filter_map(|(index, id)| {
            plan.targets
                .iter()
                .find(|(t, _)| t == id)
                .filter(|(_, spec)| !spec.present && !spec.skippable)
                .map(|(_, spec)| (index, spec.name.as_str()))
        })
        .collect()
}

pub async fn run(path: &Path) -> Result<()> {
    let plan = TourFile::load(path)?.plan()?;

    if let Some(partitions) = &plan.partitions {
        if let Err(e) = validate_partitions(&plan.steps, partitions) {
            println!("Tour {} is invalid: {}", path.display(), e);
            bail!(e);
        }
    }

    println!("Tour {} is valid.", path.display());
    println!("  Scope: {}", plan.scope);
    println!("  Steps: {}", plan.steps.len());

    match &plan.partitions {
        Some(partitions) => {
            for (i, partition) in partitions.iter().enumerate() {
                println!(
                    "  Partition {}: {} steps ({} shown at start)",
                    i + 1,
                    partition.len(),
                    visible_steps(&plan, partition)
                );
            }
        }
        None => {
            println!("  Shown at start: {}", visible_steps(&plan, &plan.steps));
        }
    }

    let pausing = pausing_steps(&plan);
    if !pausing.is_empty() {
        println!("\nThe run will pause until these targets are mounted:");
        for (index, name) in pausing {
            println!("  step {}: {}", index, name);
        }
    }

    Ok(())
}
