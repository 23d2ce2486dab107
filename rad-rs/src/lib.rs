pub mod attr;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod richstr;
pub mod script;
pub mod shell;
