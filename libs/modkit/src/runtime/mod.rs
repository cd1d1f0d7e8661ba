mod runner;
pub mod shutdown;

pub use runner::{db_factory, run, DbFactory, DbOptions, RunOptions, ShutdownOptions};
