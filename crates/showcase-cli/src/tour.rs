//! Tour script model
//!
//! A tour file names the targets of a simulated host, says which of them are
//! mounted, and scripts the run played over them.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use showcase_core::{ShowcaseConfig, TargetId};

#[derive(Debug, Deserialize)]
pub struct TourFile {
    /// Overrides the `[showcase]` table of the user config
    #[serde(default)]
    pub showcase: Option<ShowcaseConfig>,
    #[serde(default)]
    pub targets: Vec<TargetSpec>,
    pub tour: TourSpec,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetSpec {
    pub name: String,
    #[serde(default = "default_scope")]
    pub scope: String,
    /// Whether a controller is attached when the tour begins
    #[serde(default = "default_true")]
    pub present: bool,
    #[serde(default)]
    pub skippable: bool,
    #[serde(default)]
    pub hide_floating_action: bool,
    pub reverse_animation_ms: Option<u64>,
    pub auto_play_delay_ms: Option<u64>,
    pub enable_auto_scroll: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct TourSpec {
    #[serde(default = "default_scope")]
    pub scope: String,
    pub steps: Vec<String>,
    #[serde(default)]
    pub partitions: Vec<Vec<String>>,
    #[serde(default)]
    pub delay_ms: u64,
    #[serde(default)]
    pub actions: Vec<Action>,
}

fn default_scope() -> String {
    "main".to_string()
}

fn default_true() -> bool {
    true
}

/// One scripted host interaction
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum Action {
    Next,
    /// `next` that bypasses the auto-play lock
    ForceNext,
    Previous,
    Complete,
    Dismiss,
    Resume,
    Mount(String),
    Unmount(String),
    Wait(Duration),
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let action = match s.split_once(':') {
            None => match s {
                "next" => Action::Next,
                "force-next" => Action::ForceNext,
                "previous" => Action::Previous,
                "complete" => Action::Complete,
                "dismiss" => Action::Dismiss,
                "resume" => Action::Resume,
                _ => return Err(format!("unknown action '{}'", s)),
            },
            Some(("wait", ms)) => {
                let ms: u64 = ms
                    .parse()
                    .map_err(|_| format!("invalid wait duration '{}'", ms))?;
                Action::Wait(Duration::from_millis(ms))
            }
            Some(("mount", name)) => Action::Mount(name.to_string()),
            Some(("unmount", name)) => Action::Unmount(name.to_string()),
            Some(_) => return Err(format!("unknown action '{}'", s)),
        };
        Ok(action)
    }
}

impl TryFrom<String> for Action {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

/// A tour with every name resolved to a target handle
#[derive(Debug)]
pub struct TourPlan {
    pub scope: String,
    pub steps: Vec<TargetId>,
    pub partitions: Option<Vec<Vec<TargetId>>>,
    pub delay: Duration,
    pub actions: Vec<Action>,
    pub targets: Vec<(TargetId, TargetSpec)>,
}

impl TourFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read tour file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid tour file {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Mint one handle per target name and resolve steps and partitions
    pub fn plan(&self) -> Result<TourPlan> {
        let mut handles: HashMap<&str, TargetId> = HashMap::new();
        let mut targets = Vec::with_capacity(self.targets.len());
        for spec in &self.targets {
            if handles.contains_key(spec.name.as_str()) {
                bail!("Target '{}' is declared twice", spec.name);
            }
            let id = TargetId::new(spec.name.as_str());
            handles.insert(spec.name.as_str(), id.clone());
            targets.push((id, spec.clone()));
        }

        let lookup = |name: &String| {
            handles
                .get(name.as_str())
                .cloned()
                .with_context(|| format!("Step '{}' names an undeclared target", name))
        };

        let steps = self.tour.steps.iter().map(lookup).collect::<Result<Vec<_>>>()?;
        let partitions = if self.tour.partitions.is_empty() {
            None
        } else {
            let resolved = self
                .tour
                .partitions
                .iter()
                .map(|p| p.iter().map(lookup).collect::<Result<Vec<_>>>())
                .collect::<Result<Vec<_>>>()?;
            Some(resolved)
        };

        for action in &self.tour.actions {
            if let Action::Mount(name) | Action::Unmount(name) = action {
                if !handles.contains_key(name.as_str()) {
                    bail!("Action names an undeclared target '{}'", name);
                }
            }
        }

        Ok(TourPlan {
            scope: self.tour.scope.clone(),
            steps,
            partitions,
            delay: Duration::from_millis(self.tour.delay_ms),
            actions: self.tour.actions.clone(),
            targets,
        })
    }
}

impl TourPlan {
    /// Every scope the tour touches, tour scope included
    pub fn scopes(&self) -> BTreeSet<&str> {
        let mut scopes: BTreeSet<&str> = self.targets.iter().map(|(_, s)| s.scope.as_str()).collect();
        scopes.insert(self.scope.as_str());
        scopes
    }

    pub fn target(&self, name: &str) -> Option<&(TargetId, TargetSpec)> {
        self.targets.iter().find(|(_, spec)| spec.name == name)
    }

    pub fn targets_in<'a>(&'a self, scope: &'a str) -> impl Iterator<Item = &'a (TargetId, TargetSpec)> {
        self.targets.iter().filter(move |(_, spec)| spec.scope == scope)
    }
}
