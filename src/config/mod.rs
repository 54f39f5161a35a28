mod database;

pub use database::{DatabaseConfig, DefaultGroupGrant};
