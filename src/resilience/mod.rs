pub mod breaker;
pub mod executor;
