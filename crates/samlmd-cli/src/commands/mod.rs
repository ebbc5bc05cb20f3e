//! Command implementations.

pub mod config;
pub mod inspect;
pub mod roundtrip;
pub mod sign;
pub mod verify;

pub use config::run_config;
pub use inspect::run_inspect;
pub use roundtrip::run_roundtrip;
pub use sign::run_sign;
pub use verify::run_verify;
