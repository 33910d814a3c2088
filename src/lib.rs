pub mod archive;
pub mod commands;
pub mod dependency;
pub mod error;
pub mod http;
pub mod layout;
pub mod manifest;
pub mod runtime;
pub mod source;
pub mod version;
