pub mod engine;
pub mod outcome;

pub use engine::{LeaveWorkflow, WorkflowSettings, DEFAULT_APPROVER_ROLE};
pub use outcome::{ApprovalError, ApprovalReceipt};
