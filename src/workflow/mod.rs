pub mod document_flow;
pub mod workflow_state;

pub use document_flow::DocumentFlow;
pub use workflow_state::{DocumentId, FlowError, FlowStage, Phase, WorkflowState};
