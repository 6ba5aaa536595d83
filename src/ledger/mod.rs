pub mod domain;
pub mod recorder;
pub mod settlement;
