pub mod commands;
pub mod compose;
pub mod error;
pub mod http;
pub mod metadata;
pub mod package;
pub mod prompt;
pub mod remote;
pub mod selection;
pub mod session;
pub mod workshop;
