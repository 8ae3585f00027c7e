pub mod request;
pub mod show_config;
