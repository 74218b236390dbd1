//! User configuration (`~/.panotile/config.ini`).
//!
//! The INI file is parsed onto [`ConfigFile::default()`], so every key is
//! optional. `ConfigFile` converts into the runtime configs consumed by the
//! engine:
//!
//! ```
//! use panotile::config::ConfigFile;
//!
//! let config = ConfigFile::default();
//! let scheduler = config.scheduler_config();
//! assert_eq!(scheduler.threshold, 0.1);
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::*;
