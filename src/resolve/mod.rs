pub mod resolver;
pub mod target;
