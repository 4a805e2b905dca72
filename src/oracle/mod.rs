pub mod heuristic;
pub mod oracle;
pub mod remote;
