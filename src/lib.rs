pub mod backend;
pub mod cli;
pub mod crawler;
pub mod guard;
pub mod hash;
pub mod model;
pub mod oracle;
pub mod resilience;
pub mod resolve;
pub mod store;
pub mod trace;
