pub mod config;
pub mod error;
pub mod file_config;
pub mod matrix;
pub mod sites;
pub mod types;

pub use config::AppConfig;
pub use error::{ConfigError, ConfigResult};
pub use file_config::FileConfig;
pub use matrix::{MaterialMatrix, MaterialRef};
pub use sites::{CompiledSiteConfig, Detection, SiteConfig, SiteRegistry};
pub use types::*;
