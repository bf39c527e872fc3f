//! Step sequencer
//!
//! A [`ShowcaseView`] owns one scope's showcase run: the ordered target list,
//! optional partitions, and the active index. It drives the registered
//! controllers and the overlay through each step:
//!
//! - step-start resolves skips, then pauses, finishes, or presents the step
//!   and arms the auto-play timer
//! - step-end awaits every reverse animation of the active target, then fires
//!   the completion callback
//!
//! Transitions are serialised by a transition mutex, so step-end of one step
//! always completes before step-start of the next begins. Run state sits
//! behind a plain mutex that is never held across an await; continuations
//! re-check the run generation and the mounted flag after every suspension.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::events::{ShowcaseCallbacks, ShowcaseEvent};
use super::skip::{self, Direction, SkipOutcome};
use super::state::{validate_partitions, Run, RunState};
use super::timer::AutoPlayTimer;
use crate::config::ShowcaseConfig;
use crate::overlay::OverlayPresenter;
use crate::registry::ShowcaseRegistry;
use crate::target::TargetId;
use crate::{Error, Result};

#[derive(Debug, Default)]
struct ViewState {
    run: RunState,
    /// Bumped whenever a run starts or is cleared
    generation: u64,
    /// Bumped whenever a step is presented or ended
    epoch: u64,
    /// Bumped by dismiss and unregister only; pending delayed starts check it
    cancellations: u64,
    timer: AutoPlayTimer,
    skippable: HashMap<TargetId, bool>,
    hidden_floating_action: HashMap<TargetId, bool>,
}

impl ViewState {
    fn clear_run(&mut self) -> bool {
        self.timer.cancel();
        self.generation += 1;
        self.epoch += 1;
        std::mem::take(&mut self.run).is_active()
    }
}

struct Shared {
    scope: String,
    config: ShowcaseConfig,
    registry: Arc<ShowcaseRegistry>,
    overlay: Arc<dyn OverlayPresenter>,
    callbacks: ShowcaseCallbacks,
    event_tx: Option<mpsc::UnboundedSender<ShowcaseEvent>>,
    mounted: AtomicBool,
    transition: tokio::sync::Mutex<()>,
    state: Mutex<ViewState>,
}

/// What asked for a step transition
enum Trigger {
    User,
    Completed(TargetId),
    Timer(u64),
}

/// Builder for [`ShowcaseView`]
pub struct ShowcaseViewBuilder {
    scope: String,
    overlay: Arc<dyn OverlayPresenter>,
    config: ShowcaseConfig,
    registry: Option<Arc<ShowcaseRegistry>>,
    callbacks: ShowcaseCallbacks,
    event_tx: Option<mpsc::UnboundedSender<ShowcaseEvent>>,
    skippable: Vec<TargetId>,
    hidden_floating_action: Vec<TargetId>,
}

impl ShowcaseViewBuilder {
    pub fn config(mut self, config: ShowcaseConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `registry` instead of the process-wide one
    pub fn registry(mut self, registry: Arc<ShowcaseRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn on_start(mut self, f: impl Fn(usize, &TargetId) + Send + Sync + 'static) -> Self {
        self.callbacks.on_start = Some(Arc::new(f));
        self
    }

    pub fn on_complete(mut self, f: impl Fn(usize, &TargetId) + Send + Sync + 'static) -> Self {
        self.callbacks.on_complete = Some(Arc::new(f));
        self
    }

    pub fn on_finish(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.callbacks.on_finish = Some(Arc::new(f));
        self
    }

    pub fn on_dismiss(mut self, f: impl Fn(Option<&TargetId>) + Send + Sync + 'static) -> Self {
        self.callbacks.on_dismiss = Some(Arc::new(f));
        self
    }

    /// Set the event sender for host notifications
    pub fn with_event_sender(mut self, tx: mpsc::UnboundedSender<ShowcaseEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Targets that are silently bypassed while absent
    pub fn skippable(mut self, targets: impl IntoIterator<Item = TargetId>) -> Self {
        self.skippable.extend(targets);
        self
    }

    /// Targets whose step hides the global floating action
    pub fn hide_floating_action_for(mut self, targets: impl IntoIterator<Item = TargetId>) -> Self {
        self.hidden_floating_action.extend(targets);
        self
    }

    /// Build the view and register it under its scope
    pub fn build(self) -> ShowcaseView {
        let registry = self.registry.unwrap_or_else(ShowcaseRegistry::global);
        let state = ViewState {
            skippable: self.skippable.into_iter().map(|t| (t, true)).collect(),
            hidden_floating_action: self
                .hidden_floating_action
                .into_iter()
                .map(|t| (t, true))
                .collect(),
            ..ViewState::default()
        };

        let view = ShowcaseView {
            shared: Arc::new(Shared {
                scope: self.scope,
                config: self.config,
                registry: Arc::clone(&registry),
                overlay: self.overlay,
                callbacks: self.callbacks,
                event_tx: self.event_tx,
                mounted: AtomicBool::new(true),
                transition: tokio::sync::Mutex::new(()),
                state: Mutex::new(state),
            }),
        };
        registry.register(view.clone());
        debug!(scope = %view.scope(), "Registered showcase view");
        view
    }
}

/// Step sequencer for one showcase scope
///
/// Cloning yields another handle to the same sequencer.
#[derive(Clone)]
pub struct ShowcaseView {
    shared: Arc<Shared>,
}

impl ShowcaseView {
    pub fn builder(scope: impl Into<String>, overlay: Arc<dyn OverlayPresenter>) -> ShowcaseViewBuilder {
        ShowcaseViewBuilder {
            scope: scope.into(),
            overlay,
            config: ShowcaseConfig::default(),
            registry: None,
            callbacks: ShowcaseCallbacks::default(),
            event_tx: None,
            skippable: Vec::new(),
            hidden_floating_action: Vec::new(),
        }
    }

    pub fn scope(&self) -> &str {
        &self.shared.scope
    }

    pub fn config(&self) -> &ShowcaseConfig {
        &self.shared.config
    }

    pub fn registry(&self) -> &Arc<ShowcaseRegistry> {
        &self.shared.registry
    }

    /// True when both handles refer to the same sequencer
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// False once the view has been unregistered
    pub fn is_mounted(&self) -> bool {
        self.shared.mounted.load(Ordering::SeqCst)
    }

    fn lock_state(&self) -> MutexGuard<'_, ViewState> {
        self.shared.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: ShowcaseEvent) {
        if let Some(ref tx) = self.shared.event_tx {
            if tx.send(event).is_err() {
                warn!("Failed to send showcase event: receiver dropped");
            }
        }
    }

    fn is_current(&self, generation: u64, epoch: u64) -> bool {
        let state = self.lock_state();
        self.is_mounted() && state.generation == generation && state.epoch == epoch
    }

    fn is_skipped(&self, skippable: &HashMap<TargetId, bool>, target: &TargetId) -> bool {
        skippable.get(target).copied().unwrap_or(false)
            && !self.shared.registry.has_controllers(self.scope(), target)
    }

    /// Start a run over `targets`
    ///
    /// When `partitions` is non-empty it must concatenate to exactly
    /// `targets`. The run is installed on whichever registered view owns the
    /// targets (see [`resolve_owner`](Self::resolve_owner)); a non-zero
    /// `delay` defers installation to a background task that is dropped if
    /// the owner is dismissed or unregistered in the meantime.
    pub async fn start_run(
        &self,
        targets: Vec<TargetId>,
        partitions: Option<Vec<Vec<TargetId>>>,
        delay: Duration,
    ) -> Result<()> {
        if !self.is_mounted() {
            error!(scope = %self.scope(), "start_run called on an unregistered showcase view");
            return Err(Error::Unregistered(self.scope().to_string()));
        }
        if !self.shared.config.enable_showcase {
            debug!(scope = %self.scope(), "Showcase disabled, ignoring start");
            return Ok(());
        }

        let partitions = partitions.filter(|p| !p.is_empty());
        if let Some(partitions) = &partitions {
            if let Err(e) = validate_partitions(&targets, partitions) {
                error!(scope = %self.scope(), error = %e, "Rejecting showcase run");
                return Err(e);
            }
        }

        let owner = self.resolve_owner(&targets);
        if delay.is_zero() {
            owner.install_run(targets, partitions, None).await;
        } else {
            let cancellations = owner.lock_state().cancellations;
            debug!(scope = %owner.scope(), delay_ms = delay.as_millis() as u64, "Deferring showcase start");
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                owner.install_run(targets, partitions, Some(cancellations)).await;
            });
        }
        Ok(())
    }

    /// The registered view that should run `targets`
    ///
    /// This view when it has a live controller for every target; otherwise the
    /// first other registered scope (the initial scope excluded) holding any
    /// of the missing ones; otherwise this view again.
    pub fn resolve_owner(&self, targets: &[TargetId]) -> ShowcaseView {
        let registry = &self.shared.registry;
        let unresolved: Vec<TargetId> = targets
            .iter()
            .filter(|t| !registry.has_controllers(self.scope(), t))
            .cloned()
            .collect();
        if unresolved.is_empty() {
            return self.clone();
        }

        match registry.find_owner(self.scope(), &unresolved) {
            Some(owner) => {
                debug!(from = %self.scope(), to = %owner.scope(), "Routing showcase run to owning scope");
                owner
            }
            None => self.clone(),
        }
    }

    async fn install_run(
        &self,
        ids: Vec<TargetId>,
        partitions: Option<Vec<Vec<TargetId>>>,
        expected_cancellations: Option<u64>,
    ) {
        let _transition = self.shared.transition.lock().await;
        if !self.is_mounted() {
            debug!(scope = %self.scope(), "Dropping showcase start for unregistered view");
            return;
        }

        let steps = ids.len();
        {
            let mut state = self.lock_state();
            if expected_cancellations.is_some_and(|c| c != state.cancellations) {
                debug!(scope = %self.scope(), "Dropping delayed showcase start cancelled by dismiss");
                return;
            }
            state.clear_run();
            state.run = RunState::Active(Run::new(ids, partitions));
        }

        info!(scope = %self.scope(), steps, "Showcase run started");
        self.shared.registry.update_current_scope(self.scope());
        self.step_start(Direction::Forward).await;
    }

    /// Advance to the next step
    ///
    /// Ignored while the auto-play lock is enabled unless `force` is set.
    pub async fn next(&self, force: bool) {
        if !self.is_mounted() || !self.is_running() {
            return;
        }
        if self.shared.config.enable_auto_play_lock && !force {
            debug!(scope = %self.scope(), "Auto-play lock active, ignoring next");
            return;
        }
        let _transition = self.shared.transition.lock().await;
        self.advance(Direction::Forward, Trigger::User).await;
    }

    /// Go back one step; ignored on the first step
    pub async fn previous(&self) {
        if !self.is_mounted() || !self.is_running() {
            return;
        }
        let _transition = self.shared.transition.lock().await;
        self.advance(Direction::Backward, Trigger::User).await;
    }

    /// Report that `target` finished its step
    ///
    /// Advances only when `target` is the active target.
    pub async fn completed(&self, target: Option<&TargetId>) {
        let Some(target) = target else {
            return;
        };
        if !self.is_mounted() || self.active_target().as_ref() != Some(target) {
            return;
        }
        let _transition = self.shared.transition.lock().await;
        self.advance(Direction::Forward, Trigger::Completed(target.clone()))
            .await;
    }

    /// Present the active step again without moving
    ///
    /// Hosts call this once a paused target's controller becomes live.
    pub async fn resume(&self) {
        if !self.is_mounted() || !self.is_running() {
            return;
        }
        let _transition = self.shared.transition.lock().await;
        if self.is_running() {
            self.step_start(Direction::Forward).await;
        }
    }

    /// End the run without finishing it
    pub fn dismiss(&self) {
        let target = self.active_target();
        self.shared.callbacks.dismiss(target.as_ref());
        self.emit(ShowcaseEvent::Dismissed { target });

        if !self.is_mounted() {
            return;
        }
        let was_running = {
            let mut state = self.lock_state();
            state.cancellations += 1;
            state.clear_run()
        };
        if was_running {
            info!(scope = %self.scope(), "Showcase dismissed");
        }
        self.shared.overlay.update(false, self.scope());
    }

    /// Tear the view down; every later run-affecting call is a no-op
    pub fn unregister(&self) {
        if !self.shared.mounted.swap(false, Ordering::SeqCst) {
            return;
        }
        let was_running = {
            let mut state = self.lock_state();
            state.cancellations += 1;
            state.clear_run()
        };
        if was_running {
            self.shared.overlay.dispose(self.scope());
        }

        let registry = &self.shared.registry;
        if registry.view(self.scope()).is_some_and(|v| v.ptr_eq(self)) {
            registry.unregister(self.scope());
        }
        info!(scope = %self.scope(), "Showcase view unregistered");
    }

    /// Caller must hold the transition lock
    async fn advance(&self, direction: Direction, trigger: Trigger) {
        if !self.is_mounted() {
            return;
        }
        let generation = {
            let state = self.lock_state();
            let Some(run) = state.run.run() else {
                return;
            };
            match &trigger {
                Trigger::Timer(epoch) if *epoch != state.epoch => return,
                Trigger::Completed(target) if run.active_target() != Some(target) => return,
                _ => {}
            }
            if direction == Direction::Backward && run.index == 0 {
                return;
            }
            state.generation
        };

        self.step_end().await;

        {
            let mut state = self.lock_state();
            if !self.is_mounted() || state.generation != generation {
                debug!(scope = %self.scope(), "Run changed during step end, not advancing");
                return;
            }
            let Some(run) = state.run.run_mut() else {
                return;
            };
            run.index = match direction {
                Direction::Forward => run.index + 1,
                Direction::Backward => run.index.saturating_sub(1),
            };
        }

        self.step_start(direction).await;
    }

    async fn step_end(&self) {
        let active = {
            let mut state = self.lock_state();
            state.epoch += 1;
            state
                .run
                .run()
                .and_then(|run| run.active_target().map(|t| (run.index, t.clone())))
        };
        let Some((index, target)) = active else {
            self.lock_state().timer.cancel();
            return;
        };

        let disable_default = self.shared.config.disable_scale_animation;
        let mut reversals = JoinSet::new();
        for controller in self.shared.registry.controllers(self.scope(), &target) {
            let disabled = controller
                .config()
                .disable_scale_animation
                .unwrap_or(disable_default);
            if controller.has_reverse_animation() && !disabled {
                reversals.spawn(async move { controller.reverse_animation().await });
            }
        }
        while let Some(result) = reversals.join_next().await {
            if let Err(e) = result {
                warn!(scope = %self.scope(), target_id = %target, "Reverse animation failed: {}", e);
            }
        }

        let in_bounds = self
            .lock_state()
            .run
            .run()
            .is_some_and(|run| index < run.ids.len());
        if in_bounds {
            debug!(scope = %self.scope(), index, target_id = %target, "Step completed");
            self.shared.callbacks.complete(index, &target);
            self.emit(ShowcaseEvent::Completed { index, target });
        }

        self.lock_state().timer.cancel();
    }

    async fn step_start(&self, direction: Direction) {
        let scope = self.scope();
        let registry = &self.shared.registry;

        let (generation, outcome, target) = {
            let mut state = self.lock_state();
            let generation = state.generation;
            let ViewState {
                run: run_state,
                skippable,
                ..
            } = &mut *state;
            let Some(run) = run_state.run_mut() else {
                return;
            };
            let outcome = skip::resolve_skip(
                &run.ids,
                run.index,
                direction,
                |t| registry.has_controllers(scope, t),
                |t| skippable.get(t).copied().unwrap_or(false),
            );
            if let SkipOutcome::Found(i) | SkipOutcome::Paused(i) | SkipOutcome::Stalled(i) = outcome {
                run.index = i;
            }
            (generation, outcome, run.active_target().cloned())
        };

        let index = match outcome {
            SkipOutcome::Exhausted => {
                self.finish();
                return;
            }
            SkipOutcome::Stalled(index) => {
                warn!(
                    scope = %scope,
                    index,
                    ceiling = skip::SKIP_ITERATION_CEILING,
                    "Skip resolution hit its iteration ceiling, run stalled"
                );
                self.shared.overlay.update(false, scope);
                self.emit(ShowcaseEvent::Stalled { index });
                return;
            }
            SkipOutcome::Found(index) | SkipOutcome::Paused(index) => index,
        };
        let Some(target) = target else {
            self.finish();
            return;
        };

        let controllers = registry.controllers(scope, &target);
        if controllers.is_empty() {
            if self.is_skippable(&target) {
                warn!(scope = %scope, index, target_id = %target, "Absent skippable target survived skip resolution, finishing run");
                self.finish();
            } else {
                debug!(scope = %scope, index, target_id = %target, "Target absent, showcase paused");
                self.shared.overlay.update(false, scope);
                self.emit(ShowcaseEvent::Paused { index, target });
            }
            return;
        }

        let epoch = {
            let mut state = self.lock_state();
            state.epoch += 1;
            state.epoch
        };
        debug!(scope = %scope, index, target_id = %target, controllers = controllers.len(), "Presenting step");
        self.shared.overlay.update(true, scope);
        self.shared.callbacks.start(index, &target);
        self.emit(ShowcaseEvent::Started {
            index,
            target: target.clone(),
        });
        if !self.is_current(generation, epoch) {
            return;
        }

        let auto_scroll_default = self.shared.config.enable_auto_scroll;
        let sole = controllers.len() == 1;
        for controller in &controllers {
            let auto_scroll = controller
                .config()
                .enable_auto_scroll
                .unwrap_or(auto_scroll_default);
            if sole && auto_scroll {
                controller.scroll_into_view().await;
                if !self.is_current(generation, epoch) {
                    debug!(scope = %scope, target_id = %target, "Step changed while scrolling into view");
                    return;
                }
            } else {
                controller.start_showcase();
            }
        }

        if self.shared.config.auto_play {
            let delay = controllers
                .iter()
                .find_map(|c| c.config().auto_play_delay)
                .unwrap_or_else(|| self.shared.config.auto_play_delay());
            self.arm_auto_play(epoch, delay);
        }
    }

    fn finish(&self) {
        self.lock_state().clear_run();
        info!(scope = %self.scope(), "Showcase run finished");
        self.shared.overlay.update(false, self.scope());
        self.shared.callbacks.finish();
        self.emit(ShowcaseEvent::Finished);
    }

    fn arm_auto_play(&self, epoch: u64, delay: Duration) {
        let mut state = self.lock_state();
        if state.epoch != epoch {
            return;
        }
        let handle = tokio::spawn(self.clone().auto_play_task(epoch, delay));
        state.timer.arm(epoch, handle);
        debug!(scope = %self.scope(), delay_ms = delay.as_millis() as u64, "Auto-play armed");
    }

    fn auto_play_task(self, epoch: u64, delay: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            let released = self.lock_state().timer.release(epoch);
            if !released || !self.is_mounted() {
                return;
            }
            let _transition = self.shared.transition.lock().await;
            self.advance(Direction::Forward, Trigger::Timer(epoch)).await;
        })
    }

    pub fn register_skippable(&self, target: TargetId, skippable: bool) {
        self.lock_state().skippable.insert(target, skippable);
    }

    pub fn is_skippable(&self, target: &TargetId) -> bool {
        self.lock_state()
            .skippable
            .get(target)
            .copied()
            .unwrap_or(false)
    }

    pub fn hide_floating_action_for(&self, target: TargetId, hidden: bool) {
        self.lock_state().hidden_floating_action.insert(target, hidden);
    }

    pub fn is_floating_action_hidden(&self, target: &TargetId) -> bool {
        self.lock_state()
            .hidden_floating_action
            .get(target)
            .copied()
            .unwrap_or(false)
    }

    pub fn is_running(&self) -> bool {
        self.lock_state().run.is_active()
    }

    pub fn is_run_complete(&self) -> bool {
        !self.is_running()
    }

    pub fn active_target(&self) -> Option<TargetId> {
        self.lock_state()
            .run
            .run()
            .and_then(|run| run.active_target().cloned())
    }

    /// Displayed index of the active step, skip- and partition-aware
    pub fn current_step_index(&self) -> Option<usize> {
        let state = self.lock_state();
        let run = state.run.run()?;
        let has_skippable = state.skippable.values().any(|&s| s);
        skip::current_step_index(run, has_skippable, |t| self.is_skipped(&state.skippable, t))
    }

    /// Number of steps displayed for the active run, 0 when idle
    pub fn total_steps(&self) -> usize {
        let state = self.lock_state();
        match state.run.run() {
            Some(run) => skip::total_steps(run, |t| self.is_skipped(&state.skippable, t)),
            None => 0,
        }
    }
}

impl fmt::Debug for ShowcaseView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShowcaseView")
            .field("scope", &self.shared.scope)
            .field("mounted", &self.is_mounted())
            .finish()
    }
}
