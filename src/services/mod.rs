pub mod availability_monitor;
pub mod preference_store;
pub mod progress_estimator;

pub use availability_monitor::{AvailabilityMonitor, MonitorSettings};
pub use preference_store::PreferenceStore;
pub use progress_estimator::{estimate, ExpectedDurations, ProgressEstimator, ProgressSettings};
