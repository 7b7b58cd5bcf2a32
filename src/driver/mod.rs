pub mod cli;

pub use cli::{CliDriver, CliDriverError, DriverCommand, DriverResult, map_key};
