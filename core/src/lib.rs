//! Core utilities and shared types for the hunter engine.

pub mod error;
pub mod gate;

pub use error::{ConfigError, Irrelevant};
pub use gate::{AdmissionGate, Slot};

pub const fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!version().is_empty());
    }
}
