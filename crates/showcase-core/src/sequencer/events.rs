use std::fmt;
use std::sync::Arc;

use crate::target::TargetId;

/// Events emitted by a showcase view to notify the host of step changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShowcaseEvent {
    /// A step began presentation
    Started { index: usize, target: TargetId },
    /// A step ended
    Completed { index: usize, target: TargetId },
    /// The active target has no live controller and is not skippable
    Paused { index: usize, target: TargetId },
    /// Skip resolution hit its iteration ceiling
    Stalled { index: usize },
    /// The run walked off the end of its target list
    Finished,
    /// The run was dismissed
    Dismissed { target: Option<TargetId> },
}

pub type StepCallback = Arc<dyn Fn(usize, &TargetId) + Send + Sync>;
pub type FinishCallback = Arc<dyn Fn() + Send + Sync>;
pub type DismissCallback = Arc<dyn Fn(Option<&TargetId>) + Send + Sync>;

/// Callbacks configured when the view is built
#[derive(Clone, Default)]
pub(crate) struct ShowcaseCallbacks {
    pub on_start: Option<StepCallback>,
    pub on_complete: Option<StepCallback>,
    pub on_finish: Option<FinishCallback>,
    pub on_dismiss: Option<DismissCallback>,
}

impl ShowcaseCallbacks {
    pub fn start(&self, index: usize, target: &TargetId) {
        if let Some(f) = &self.on_start {
            f(index, target);
        }
    }

    pub fn complete(&self, index: usize, target: &TargetId) {
        if let Some(f) = &self.on_complete {
            f(index, target);
        }
    }

    pub fn finish(&self) {
        if let Some(f) = &self.on_finish {
            f();
        }
    }

    pub fn dismiss(&self, target: Option<&TargetId>) {
        if let Some(f) = &self.on_dismiss {
            f(target);
        }
    }
}

impl fmt::Debug for ShowcaseCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShowcaseCallbacks")
            .field("on_start", &self.on_start.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .field("on_finish", &self.on_finish.is_some())
            .field("on_dismiss", &self.on_dismiss.is_some())
            .finish()
    }
}
