/// Trait for the component that paints the highlight and tooltip for a scope
pub trait OverlayPresenter: Send + Sync {
    /// Show or hide the overlay for `scope`
    fn update(&self, show: bool, scope: &str);

    /// Tear down the overlay for `scope`
    fn dispose(&self, scope: &str);
}
