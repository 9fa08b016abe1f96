//! Shared utilities: seeded random number generation.

pub mod rng;

pub use rng::SimpleRng;
