pub mod logger;
pub mod serde;
pub mod signal;
