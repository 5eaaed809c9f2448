pub mod config;
pub mod device;
pub mod link;
pub mod w100;
