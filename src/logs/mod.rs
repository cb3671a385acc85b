//! Structured logging facade
//!
//! Records are built from a level, a message and typed [`Field`]s and written
//! either to the console (colored, tab separated) or to a size-rotated file as
//! JSON lines.
//!
//! Most code logs through the process-wide [`Factory`] and the macros exported
//! here:
//!
//! ```ignore
//! use appkit::logs::{self, Field};
//!
//! let cfg = logs::Config::file("info", logs::RotationConfig::new("/var/log/demo.log"));
//! logs::set_factory(logs::Factory::new(&cfg, logs::Options::default()));
//!
//! logs::info!("listening on {}", addr; Field::uint("workers", 4));
//! logs::error_ctx!(&request, &err, "upload failed");
//! ```
//!
//! Until a factory is installed, a debug-level console factory is used.

mod bridge;
mod config;
mod encoder;
mod factory;
mod field;
mod flags;
mod helper;
mod level;
mod logger;
mod options;
mod rotation;

#[cfg(test)]
pub(crate) mod test_support;

pub use bridge::{init_tracing_bridge, FacadeLayer};
pub use config::{Config, ConfigError, Output, RotationConfig};
pub use encoder::{
    console_encoder_config, file_encoder_config, Caller, Encoder, EncoderConfig, Encoding,
    LevelEncoder, Record,
};
pub use factory::{factory, set_factory, Arg, Factory};
pub use field::{Field, Value};
pub use flags::FLAG_SET;
pub use helper::{
    debug, debug_ctx, error, error_ctx, fatal, fatal_ctx, info, info_ctx, panic, panic_ctx, sync,
    warn, warn_ctx,
};
pub use level::{level, Level, ParseLevelError};
pub use logger::Logger;
pub use options::{CtxHandler, ErrHandler, Options, DEFAULT_NAMESPACE};
pub use rotation::{Backup, RotatingFile, RotatingWriter, RotationError};

pub use crate::__logs_debug as debug;
pub use crate::__logs_debug_ctx as debug_ctx;
pub use crate::__logs_error as error;
pub use crate::__logs_error_ctx as error_ctx;
pub use crate::__logs_fatal as fatal;
pub use crate::__logs_fatal_ctx as fatal_ctx;
pub use crate::__logs_info as info;
pub use crate::__logs_info_ctx as info_ctx;
pub use crate::__logs_panic as panic;
pub use crate::__logs_panic_ctx as panic_ctx;
pub use crate::__logs_warn as warn;
pub use crate::__logs_warn_ctx as warn_ctx;
