pub mod leave;
pub mod policy;
