pub mod audit;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod oracle;
pub mod store;
pub mod summary;
pub mod workflow;

pub use audit::{AuditEvent, AuditSink, InMemoryAuditSink, NoopAuditSink};
pub use catalog::{CatalogError, PolicyCatalog};
pub use config::{AppConfig, ConfigError, LoadOptions};
pub use domain::leave::{
    ApprovalRecord, ApprovalSubmission, LeaveRequest, LeaveRequestId, LeaveStatus,
    NewLeaveRequest,
};
pub use domain::policy::{ApprovalChain, ApproverAuthority, PolicyRule};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use oracle::{
    AuthorityOracle, AuthorityQuery, AuthorityVerdict, EligibilityOracle, EligibilityQuery,
    EligibilityVerdict, OracleError, RuleBasedOracle,
};
pub use store::LeaveStore;
pub use summary::LeaveSummary;
pub use workflow::{ApprovalError, ApprovalReceipt, LeaveWorkflow, WorkflowSettings};
