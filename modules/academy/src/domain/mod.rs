pub mod batch_code;
pub mod error;
pub mod repo;
pub mod service;
