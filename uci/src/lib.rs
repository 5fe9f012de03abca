//! Serialization and deserialization of Mallorn's traffic with a UCI host.

pub mod client;
pub mod engine;
pub mod options;
pub mod search_info;
pub mod time_control;
pub mod wdl;
