//! Cross-crate choreography tests.


mod bootstrap;
mod persistence;
mod stall_recovery;
