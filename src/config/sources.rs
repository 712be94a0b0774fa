pub mod config_file;
pub mod environment;
pub mod global_file;
