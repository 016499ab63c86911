//! # Histofan
//!
//! Fans letter-frequency histograms out across one worker process per input
//! file and harvests each result as its worker exits.
//!
//! ## Usage
//!
//! ```bash
//! histofan [-o DIR] [--json] <FILE|SIG>...
//! ```
//!
//! ## Modules
//!
//! - `config` - Run configuration from defaults, TOML and environment
//! - `fleet` - Launcher, channel registry, completion handler and dispatcher
//! - `histogram` - Letter counting, payload codec and artifact text
//! - `worker` - The child process that counts one input and publishes it
pub mod config;
pub mod error;
pub mod fleet;
pub mod histogram;
pub mod worker;

pub use error::{Error, Result};
