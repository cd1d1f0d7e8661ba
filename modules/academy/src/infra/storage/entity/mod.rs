//! SeaORM entities, one table per academy record type. Enum columns hold
//! the `as_str` text of the contract enums.

pub mod attendance;
pub mod batch;
pub mod branch;
pub mod course;
pub mod employee;
pub mod enrollment;
pub mod message;
pub mod payment;
pub mod payroll;
pub mod student;
pub mod user;
