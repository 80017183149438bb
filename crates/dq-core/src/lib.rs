pub mod config;
pub mod logging;

pub mod audit;
pub mod error;
pub mod fetch;
pub mod filename;
pub mod lock;
pub mod queue;
pub mod retry;
pub mod runner;
pub mod select;
pub mod state;
