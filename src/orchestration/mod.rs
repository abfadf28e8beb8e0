pub mod ledger;
pub mod report;
pub mod runner;
pub mod state;
pub mod transcript;
