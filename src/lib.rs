pub mod archive;
pub mod config;
pub mod daemon;
pub mod domains;
pub mod error;
pub mod interfaces;
pub mod logging;
pub mod privacy;
pub mod prompt;
pub mod providers;
pub mod services;
pub mod store;

pub type Result<T> = std::result::Result<T, error::ParleyError>;

pub const GIT_SHA: &str = env!("PARLEY_GIT_SHA");
