use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{info, warn};

use showcase_core::{
    AppConfig, ControllerConfig, ControllerId, OverlayPresenter, ShowcaseConfig, ShowcaseEvent,
    ShowcaseRegistry, ShowcaseView, TargetController, TargetId,
};

use crate::tour::{Action, TargetSpec, TourFile, TourPlan};

const IDLE_POLL: Duration = Duration::from_millis(50);

/// Stand-in for a widget that highlights its target
struct SimulatedController {
    target: TargetId,
    config: ControllerConfig,
    scroll_duration: Duration,
    reverse_animation: Option<Duration>,
}

impl SimulatedController {
    fn new(target: TargetId, spec: &TargetSpec, showcase: &ShowcaseConfig) -> Self {
        Self {
            target,
            config: ControllerConfig {
                enable_auto_scroll: spec.enable_auto_scroll,
                disable_scale_animation: None,
                auto_play_delay: spec.auto_play_delay_ms.map(Duration::from_millis),
            },
            scroll_duration: showcase.scroll_duration(),
            reverse_animation: spec.reverse_animation_ms.map(Duration::from_millis),
        }
    }
}

#[async_trait::async_trait]
impl TargetController for SimulatedController {
    fn config(&self) -> ControllerConfig {
        self.config
    }

    fn start_showcase(&self) {
        info!(target_id = %self.target, "Highlighting target");
    }

    async fn scroll_into_view(&self) {
        tokio::time::sleep(self.scroll_duration).await;
        info!(target_id = %self.target, "Scrolled target into view");
        self.start_showcase();
    }

    fn has_reverse_animation(&self) -> bool {
        self.reverse_animation.is_some()
    }

    async fn reverse_animation(&self) {
        if let Some(duration) = self.reverse_animation {
            tokio::time::sleep(duration).await;
            info!(target_id = %self.target, "Reverse animation done");
        }
    }
}

struct LoggingOverlay;

impl OverlayPresenter for LoggingOverlay {
    fn update(&self, show: bool, scope: &str) {
        info!(scope = %scope, show, "Overlay updated");
    }

    fn dispose(&self, scope: &str) {
        info!(scope = %scope, "Overlay disposed");
    }
}

/// Simulated host: one view per scope plus the mounted controllers
struct Host<'a> {
    plan: &'a TourPlan,
    showcase: ShowcaseConfig,
    registry: Arc<ShowcaseRegistry>,
    views: BTreeMap<String, ShowcaseView>,
    mounted: HashMap<String, (String, ControllerId)>,
    events: mpsc::UnboundedReceiver<ShowcaseEvent>,
    json: bool,
    printed: usize,
}

impl<'a> Host<'a> {
    fn new(plan: &'a TourPlan, showcase: ShowcaseConfig, json: bool) -> Self {
        let registry = ShowcaseRegistry::new();
        let overlay: Arc<dyn OverlayPresenter> = Arc::new(LoggingOverlay);
        let (tx, events) = mpsc::unbounded_channel();

        let views = plan
            .scopes()
            .into_iter()
            .map(|scope| {
                let skippable = plan
                    .targets_in(scope)
                    .filter(|(_, spec)| spec.skippable)
                    .map(|(id, _)| id.clone());
                let hidden = plan
                    .targets_in(scope)
                    .filter(|(_, spec)| spec.hide_floating_action)
                    .map(|(id, _)| id.clone());
                let view = ShowcaseView::builder(scope, Arc::clone(&overlay))
                    .config(showcase.clone())
                    .registry(Arc::clone(&registry))
                    .with_event_sender(tx.clone())
                    .skippable(skippable)
                    .hide_floating_action_for(hidden)
                    .build();
                (scope.to_string(), view)
            })
            .collect();

        Self {
            plan,
            showcase,
            registry,
            views,
            mounted: HashMap::new(),
            events,
            json,
            printed: 0,
        }
    }

    fn mount(&mut self, name: &str) -> Result<()> {
        let plan = self.plan;
        let (id, spec) = plan
            .target(name)
            .with_context(|| format!("Unknown target '{}'", name))?;
        if self.mounted.contains_key(name) {
            return Ok(());
        }
        let controller_id = ControllerId::new();
        let controller = SimulatedController::new(id.clone(), spec, &self.showcase);
        self.registry
            .add_controller(&spec.scope, id.clone(), controller_id, Arc::new(controller));
        self.mounted
            .insert(name.to_string(), (spec.scope.clone(), controller_id));
        info!(scope = %spec.scope, target_id = %id, "Mounted target");
        Ok(())
    }

    fn unmount(&mut self, name: &str) -> Result<()> {
        let plan = self.plan;
        let (id, _) = plan
            .target(name)
            .with_context(|| format!("Unknown target '{}'", name))?;
        if let Some((scope, controller_id)) = self.mounted.remove(name) {
            self.registry.remove_controller(&scope, id, controller_id);
            info!(scope = %scope, target_id = %id, "Unmounted target");
        }
        Ok(())
    }

    /// View running the tour; the tour scope until a run is routed elsewhere
    fn active_view(&self) -> Result<ShowcaseView> {
        match self.registry.current_view() {
            Some(view) => Ok(view),
            None => Ok(self.registry.require_view(&self.plan.scope)?),
        }
    }

    fn is_idle(&self) -> bool {
        self.views.values().all(|v| v.is_run_complete())
    }

    async fn perform(&mut self, action: &Action) -> Result<()> {
        match action {
            Action::Wait(duration) => tokio::time::sleep(*duration).await,
            Action::Mount(name) => self.mount(name)?,
            Action::Unmount(name) => self.unmount(name)?,
            Action::Next => self.active_view()?.next(false).await,
            Action::ForceNext => self.active_view()?.next(true).await,
            Action::Previous => self.active_view()?.previous().await,
            Action::Resume => self.active_view()?.resume().await,
            Action::Complete => {
                let view = self.active_view()?;
                view.completed(view.active_target().as_ref()).await;
            }
            Action::Dismiss => self.active_view()?.dismiss(),
        }
        Ok(())
    }

    /// Wait for an auto-played run to end, giving up after `budget`
    async fn wait_idle(&mut self, budget: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + budget;
        while !self.is_idle() {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(IDLE_POLL).await;
            self.print_events();
        }
        true
    }

    fn print_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            let hidden = match &event {
                ShowcaseEvent::Started { target, .. } => {
                    self.views.values().any(|v| v.is_floating_action_hidden(target))
                }
                _ => false,
            };
            if self.json {
                println!("{}", event_json(&event, hidden));
            } else {
                println!("{}", describe(&event, hidden));
            }
            self.printed += 1;
        }
    }

    fn teardown(&mut self) {
        for view in self.views.values() {
            view.unregister();
        }
        self.print_events();
    }
}

/// Auto-play budget: every step's delay plus its reverse animation
fn auto_play_budget(plan: &TourPlan, showcase: &ShowcaseConfig) -> Duration {
    let per_step = plan
        .targets
        .iter()
        .map(|(_, spec)| {
            let delay = spec
                .auto_play_delay_ms
                .unwrap_or(showcase.auto_play_delay_ms);
            delay + spec.reverse_animation_ms.unwrap_or(0) + showcase.scroll_duration_ms
        })
        .max()
        .unwrap_or(showcase.auto_play_delay_ms);
    plan.delay + Duration::from_millis(per_step) * (plan.steps.len() as u32 + 1)
}

fn event_json(event: &ShowcaseEvent, hide_floating_action: bool) -> serde_json::Value {
    match event {
        ShowcaseEvent::Started { index, target } => json!({
            "event": "started",
            "index": index,
            "target": target.label(),
            "hide_floating_action": hide_floating_action,
        }),
        ShowcaseEvent::Completed { index, target } => json!({
            "event": "completed",
            "index": index,
            "target": target.label(),
        }),
        ShowcaseEvent::Paused { index, target } => json!({
            "event": "paused",
            "index": index,
            "target": target.label(),
        }),
        ShowcaseEvent::Stalled { index } => json!({ "event": "stalled", "index": index }),
        ShowcaseEvent::Finished => json!({ "event": "finished" }),
        ShowcaseEvent::Dismissed { target } => json!({
            "event": "dismissed",
            "target": target.as_ref().map(TargetId::label),
        }),
    }
}

fn describe(event: &ShowcaseEvent, hide_floating_action: bool) -> String {
    match event {
        ShowcaseEvent::Started { index, target } => {
            let fab = if hide_floating_action {
                " (floating action hidden)"
            } else {
                ""
            };
            format!("  > step {} started: {}{}", index, target, fab)
        }
        ShowcaseEvent::Completed { index, target } => {
            format!("  < step {} completed: {}", index, target)
        }
        ShowcaseEvent::Paused { index, target } => {
            format!("  | step {} paused, waiting for: {}", index, target)
        }
        ShowcaseEvent::Stalled { index } => format!("  ! run stalled at step {}", index),
        ShowcaseEvent::Finished => "Tour finished.".to_string(),
        ShowcaseEvent::Dismissed { target: Some(target) } => {
            format!("Tour dismissed at: {}", target)
        }
        ShowcaseEvent::Dismissed { target: None } => "Tour dismissed.".to_string(),
    }
}

pub async fn run(config: &AppConfig, path: &Path, json: bool) -> Result<()> {
    let tour = TourFile::load(path)?;
    let plan = tour.plan()?;
    let showcase = tour.showcase.clone().unwrap_or_else(|| config.showcase.clone());

    if !json {
        println!("Playing tour {} ({} steps)\n", path.display(), plan.steps.len());
    }

    let mut host = Host::new(&plan, showcase.clone(), json);
    for (_, spec) in plan.targets.iter().filter(|(_, spec)| spec.present) {
        host.mount(&spec.name)?;
    }

    let origin = host.registry.require_view(&plan.scope)?;
    origin
        .start_run(plan.steps.clone(), plan.partitions.clone(), plan.delay)
        .await?;
    host.print_events();

    for action in &plan.actions {
        host.perform(action).await?;
        host.print_events();
    }

    if showcase.auto_play && !host.wait_idle(auto_play_budget(&plan, &showcase)).await {
        warn!("Auto-played tour did not finish in time, dismissing");
        host.active_view()?.dismiss();
    }

    let unfinished = !host.is_idle();
    host.teardown();

    if !json {
        println!();
        if unfinished {
            println!("Tour left unfinished ({} events).", host.printed);
        } else {
            println!("{} events.", host.printed);
        }
    }

    Ok(())
}
