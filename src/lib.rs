pub mod cli;
pub mod error;
pub mod groups;
pub mod identities;
pub mod ledger;
pub mod messaging;
pub mod payments;
pub mod seed;
pub mod session;
pub mod storage;
