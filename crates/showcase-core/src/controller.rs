use std::time::Duration;

/// Per-controller overrides of the sequencer-level defaults
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerConfig {
    pub enable_auto_scroll: Option<bool>,
    pub disable_scale_animation: Option<bool>,
    pub auto_play_delay: Option<Duration>,
}

/// Trait for the per-target helper that presents a showcase step
///
/// Controllers are owned by the host and registered with the
/// [`ShowcaseRegistry`](crate::ShowcaseRegistry) while their target is live.
#[async_trait::async_trait]
pub trait TargetController: Send + Sync {
    /// Overrides applied to this controller's steps
    fn config(&self) -> ControllerConfig {
        ControllerConfig::default()
    }

    /// Begin visual presentation of the target
    fn start_showcase(&self);

    /// Bring the target into view, then present it
    async fn scroll_into_view(&self);

    /// Whether `reverse_animation` should be awaited when the step ends
    fn has_reverse_animation(&self) -> bool {
        false
    }

    /// Play the exit animation for this step
    async fn reverse_animation(&self) {}
}
