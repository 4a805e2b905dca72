pub mod device;
pub mod sim;
