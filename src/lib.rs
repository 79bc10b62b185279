pub mod config;
pub mod protocol;
pub mod runtime;
pub mod session;
pub mod syntax;
