pub mod availability;
pub mod comparison;
pub mod control;
pub mod document;
pub mod extraction;
pub mod preferences;
pub mod progress;
pub mod validation;

pub use availability::AvailabilitySignal;
pub use comparison::{ComparisonReport, Decision, ValidationDetails};
pub use control::{ControlStatus, VerifiedControl};
pub use document::{Document, MediaCategory};
pub use extraction::ExtractionResult;
pub use preferences::{Preferences, Theme};
pub use progress::{ProgressSnapshot, ProgressTone};
pub use validation::{RiskLevel, ValidationResult};
