pub mod core;
pub mod utils;

// Re-export everything from core for ergonomic library use
// Callers can write `pagegate::gate` instead of `pagegate::core::gate`
pub use core::*;
pub use utils::*;
