pub mod client;
pub mod decode;
pub mod mapping;
