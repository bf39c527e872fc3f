mod events;
mod skip;
mod state;
mod timer;
mod view;

pub use events::{DismissCallback, FinishCallback, ShowcaseEvent, StepCallback};
pub use skip::SKIP_ITERATION_CEILING;
pub use state::validate_partitions;
pub use view::{ShowcaseView, ShowcaseViewBuilder};
