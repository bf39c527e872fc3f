//! Process-wide scope registry
//!
//! Maps each scope name to its [`ShowcaseView`] and to the controllers
//! currently live for each target in that scope. Views register themselves
//! on construction and leave on [`ShowcaseView::unregister`]; controllers are
//! attached by the host while their target is mounted.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::controller::TargetController;
use crate::error::{Error, Result};
use crate::sequencer::ShowcaseView;
use crate::target::{ControllerId, TargetId};

/// Reserved scope that never takes part in cross-scope owner search
pub const INITIAL_SCOPE: &str = "_showcaseInitialScope";

static GLOBAL: OnceLock<Arc<ShowcaseRegistry>> = OnceLock::new();

type ControllerEntry = (ControllerId, Arc<dyn TargetController>);

#[derive(Default)]
struct ScopeEntry {
    view: Option<ShowcaseView>,
    controllers: HashMap<TargetId, Vec<ControllerEntry>>,
}

#[derive(Default)]
struct RegistryState {
    scopes: HashMap<String, ScopeEntry>,
    /// Scopes with a registered view, in registration order
    order: Vec<String>,
    current_scope: Option<String>,
}

/// Snapshot of one scope as seen by the registry
#[derive(Clone)]
pub struct ScopeSnapshot {
    pub view: Option<ShowcaseView>,
    pub targets: Vec<TargetId>,
}

/// Registry of showcase scopes and their live controllers
#[derive(Default)]
pub struct ShowcaseRegistry {
    state: RwLock<RegistryState>,
}

impl ShowcaseRegistry {
    /// Create an isolated registry
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The process-wide registry, created on first access
    pub fn global() -> Arc<Self> {
        Arc::clone(GLOBAL.get_or_init(Self::new))
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `view` under its scope, replacing any previous view there
    pub fn register(&self, view: ShowcaseView) {
        let scope = view.scope().to_string();
        let mut state = self.write();
        let entry = state.scopes.entry(scope.clone()).or_default();
        if entry.view.replace(view).is_some() {
            debug!(scope = %scope, "Replacing registered showcase view");
        }
        if !state.order.iter().any(|s| s == &scope) {
            state.order.push(scope);
        }
    }

    /// Remove the view registered under `scope`
    ///
    /// Controllers attached to the scope stay until their host detaches them.
    pub fn unregister(&self, scope: &str) -> Option<ShowcaseView> {
        let mut state = self.write();
        state.order.retain(|s| s != scope);
        if state.current_scope.as_deref() == Some(scope) {
            state.current_scope = None;
        }
        let entry = state.scopes.get_mut(scope)?;
        let view = entry.view.take();
        if entry.controllers.is_empty() {
            state.scopes.remove(scope);
        }
        view
    }

    /// Scopes with a registered view, in registration order
    pub fn scopes(&self) -> Vec<String> {
        self.read().order.clone()
    }

    pub fn view(&self, scope: &str) -> Option<ShowcaseView> {
        self.read().scopes.get(scope).and_then(|e| e.view.clone())
    }

    /// Like [`view`](Self::view), but a missing scope is an error
    pub fn require_view(&self, scope: &str) -> Result<ShowcaseView> {
        self.view(scope)
            .ok_or_else(|| Error::ScopeNotFound(scope.to_string()))
    }

    pub fn get_scope(&self, scope: &str) -> Option<ScopeSnapshot> {
        let state = self.read();
        let entry = state.scopes.get(scope)?;
        Some(ScopeSnapshot {
            view: entry.view.clone(),
            targets: entry.controllers.keys().cloned().collect(),
        })
    }

    pub fn update_current_scope(&self, scope: &str) {
        self.write().current_scope = Some(scope.to_string());
    }

    pub fn current_scope(&self) -> Option<String> {
        self.read().current_scope.clone()
    }

    /// View for the current scope, if one is registered
    pub fn current_view(&self) -> Option<ShowcaseView> {
        let state = self.read();
        let scope = state.current_scope.as_deref()?;
        state.scopes.get(scope).and_then(|e| e.view.clone())
    }

    /// Attach a live controller for `target` in `scope`
    pub fn add_controller(
        &self,
        scope: &str,
        target: TargetId,
        id: ControllerId,
        controller: Arc<dyn TargetController>,
    ) {
        let mut state = self.write();
        let entries = state
            .scopes
            .entry(scope.to_string())
            .or_default()
            .controllers
            .entry(target)
            .or_default();
        match entries.iter_mut().find(|(existing, _)| *existing == id) {
            Some(slot) => slot.1 = controller,
            None => entries.push((id, controller)),
        }
    }

    /// Detach a controller; returns false if it was not attached
    pub fn remove_controller(&self, scope: &str, target: &TargetId, id: ControllerId) -> bool {
        let mut state = self.write();
        let Some(entry) = state.scopes.get_mut(scope) else {
            return false;
        };
        let Some(entries) = entry.controllers.get_mut(target) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(existing, _)| *existing != id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            entry.controllers.remove(target);
        }
        if entry.controllers.is_empty() && entry.view.is_none() {
            state.scopes.remove(scope);
        }
        removed
    }

    /// Live controllers for `target` in `scope`, in attach order
    pub fn controllers(&self, scope: &str, target: &TargetId) -> Vec<Arc<dyn TargetController>> {
        self.read()
            .scopes
            .get(scope)
            .and_then(|e| e.controllers.get(target))
            .map(|entries| entries.iter().map(|(_, c)| Arc::clone(c)).collect())
            .unwrap_or_default()
    }

    pub fn has_controllers(&self, scope: &str, target: &TargetId) -> bool {
        self.read()
            .scopes
            .get(scope)
            .and_then(|e| e.controllers.get(target))
            .is_some_and(|entries| !entries.is_empty())
    }

    /// Targets with at least one live controller in `scope`
    pub fn target_keys(&self, scope: &str) -> Vec<TargetId> {
        self.read()
            .scopes
            .get(scope)
            .map(|e| e.controllers.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// First registered scope, other than `exclude` and the initial scope,
    /// holding a controller for any of `targets`
    pub(crate) fn find_owner(&self, exclude: &str, targets: &[TargetId]) -> Option<ShowcaseView> {
        let state = self.read();
        state
            .order
            .iter()
            .filter(|scope| scope.as_str() != exclude && scope.as_str() != INITIAL_SCOPE)
            .filter_map(|scope| state.scopes.get(scope))
            .find(|entry| targets.iter().any(|t| entry.controllers.contains_key(t)))
            .and_then(|entry| entry.view.clone())
    }
}

impl fmt::Debug for ShowcaseRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read();
        f.debug_struct("ShowcaseRegistry")
            .field("scopes", &state.order)
            .field("current_scope", &state.current_scope)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    #[async_trait::async_trait]
    impl TargetController for Noop {
        fn start_showcase(&self) {}
        async fn scroll_into_view(&self) {}
    }

    #[test]
    fn test_add_and_remove_controllers() {
        let registry = ShowcaseRegistry::new();
        let target = TargetId::new("search");
        let first = ControllerId::new();
        let second = ControllerId::new();

        registry.add_controller("home", target.clone(), first, Arc::new(Noop));
        registry.add_controller("home", target.clone(), second, Arc::new(Noop));
        assert_eq!(registry.controllers("home", &target).len(), 2);
        assert!(registry.has_controllers("home", &target));
        assert!(!registry.has_controllers("settings", &target));

        assert!(registry.remove_controller("home", &target, first));
        assert!(!registry.remove_controller("home", &target, first));
        assert!(registry.remove_controller("home", &target, second));
        assert!(!registry.has_controllers("home", &target));
        assert!(registry.target_keys("home").is_empty());
    }

    #[test]
    fn test_readding_same_controller_id_replaces() {
        let registry = ShowcaseRegistry::new();
        let target = TargetId::new("search");
        let id = ControllerId::new();

        registry.add_controller("home", target.clone(), id, Arc::new(Noop));
        registry.add_controller("home", target.clone(), id, Arc::new(Noop));
        assert_eq!(registry.controllers("home", &target).len(), 1);
    }

    struct HiddenOverlay;

    impl crate::overlay::OverlayPresenter for HiddenOverlay {
        fn update(&self, _show: bool, _scope: &str) {}
        fn dispose(&self, _scope: &str) {}
    }

    fn view(registry: &Arc<ShowcaseRegistry>, scope: &str) -> ShowcaseView {
        ShowcaseView::builder(scope, Arc::new(HiddenOverlay))
            .registry(Arc::clone(registry))
            .build()
    }

    #[test]
    fn test_require_view_reports_missing_scope() {
        let registry = ShowcaseRegistry::new();
        assert!(matches!(
            registry.require_view("home"),
            Err(Error::ScopeNotFound(scope)) if scope == "home"
        ));

        let home = view(&registry, "home");
        assert!(registry.require_view("home").unwrap().ptr_eq(&home));
    }

    #[test]
    fn test_find_owner_skips_excluded_and_initial_scopes() {
        let registry = ShowcaseRegistry::new();
        let target = TargetId::new("search");
        let _initial = view(&registry, INITIAL_SCOPE);
        let _home = view(&registry, "home");
        let settings = view(&registry, "settings");
        for scope in [INITIAL_SCOPE, "home", "settings"] {
            registry.add_controller(scope, target.clone(), ControllerId::new(), Arc::new(Noop));
        }

        let owner = registry.find_owner("home", &[target.clone()]).unwrap();
        assert!(owner.ptr_eq(&settings));

        registry.unregister("settings");
        assert!(registry.find_owner("home", &[target]).is_none());
        assert_eq!(registry.scopes(), vec![INITIAL_SCOPE.to_string(), "home".to_string()]);
    }

    #[test]
    fn test_unregister_clears_current_scope() {
        let registry = ShowcaseRegistry::new();
        let _home = view(&registry, "home");
        registry.update_current_scope("home");
        assert!(registry.current_view().is_some());

        assert!(registry.unregister("home").is_some());
        assert_eq!(registry.current_scope(), None);
        assert!(registry.get_scope("home").is_none());
    }

    #[test]
    fn test_global_is_shared() {
        assert!(Arc::ptr_eq(&ShowcaseRegistry::global(), &ShowcaseRegistry::global()));
    }
}
