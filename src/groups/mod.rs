pub mod domain;
pub mod membership;

pub use domain::{Group, GroupId, GroupName, GroupNameInvalidity};
pub use membership::LeaveOutcome;
