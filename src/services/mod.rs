pub mod comparison;
pub mod correlation;
pub mod providers;
pub mod retry;
pub mod run_lock;

pub use comparison::{ComparisonJob, ComparisonService, RunOutcome, StartOutcome};
pub use correlation::{correlate, score_comparison};
pub use providers::{PlatformProvider, RatingProvider};
pub use run_lock::{LocalRunLock, RunLock};
