pub mod abi;
pub mod config;
pub mod guest;
pub mod invoker;
pub mod lease;
pub mod module;
pub mod prelude;
pub mod runtime;
