pub mod activity;
pub mod balance;
pub mod bills;
pub mod money;
