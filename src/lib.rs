//! appkit - command builder and structured logging facade for command-line tools
//!
//! [`app`] builds a clap command tree from named flag sets and run callbacks.
//! [`logs`] provides leveled, structured logging to the console or to a
//! rotating file, with a process-wide factory and call-site macros.

pub mod app;
pub mod logs;
