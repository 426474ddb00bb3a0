//! Docker container management for probe integration tests.

pub mod container;

pub use container::MySQLContainer;
