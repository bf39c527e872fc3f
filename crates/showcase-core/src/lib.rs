pub mod config;
pub mod controller;
pub mod error;
pub mod overlay;
pub mod registry;
pub mod sequencer;
pub mod target;

pub use config::{AppConfig, GeneralConfig, ShowcaseConfig};
pub use controller::{ControllerConfig, TargetController};
pub use error::{Error, Result};
pub use overlay::OverlayPresenter;
pub use registry::{ScopeSnapshot, ShowcaseRegistry, INITIAL_SCOPE};
pub use sequencer::{ShowcaseEvent, ShowcaseView, ShowcaseViewBuilder};
pub use target::{ControllerId, TargetId};
