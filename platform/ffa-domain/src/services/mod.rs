pub mod benchmark;
pub mod engine;
pub mod numeric;
pub mod rolling;
pub mod signals;
