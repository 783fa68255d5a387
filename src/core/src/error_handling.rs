//! Error taxonomy shared by every subsystem.
pub mod types;
