//! Wire vocabulary shared by the mixplay remote: command codes, status
//! payloads, the request codec and the client configuration file.

pub mod codec;
pub mod config;
pub mod platform;
pub mod protocol;
