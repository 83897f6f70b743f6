pub mod assignment;
pub mod billing;
pub mod listing;
