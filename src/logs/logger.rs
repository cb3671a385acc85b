//! Logger core
//!
//! A [`Logger`] is an immutable value: a shared sink plus the fields attached to
//! it. Deriving a child logger copies the field list and extends it, so the
//! parent never observes the child's fields.

use std::any::Any;
use std::backtrace::Backtrace;
use std::error::Error;
use std::fmt;
use std::io::{self, Write};
use std::panic::Location;
use std::sync::Arc;

use chrono::Local;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;

use super::config::{Config, ConfigError, Output};
use super::encoder::{Caller, Encoder, Record};
use super::field::Field;
use super::level::{level, Level};
use super::options::Options;
use super::rotation::{RotatingWriter, RotationError};

/// Encoder, writer and filter shared by a logger and all of its children
struct Core {
    level: Level,
    encoder: Encoder,
    writer: BoxMakeWriter,
    /// Receives sink failures
    error_output: BoxMakeWriter,
    /// Records at or above this level carry a stacktrace
    stacktrace_level: Option<Level>,
    rotation: Option<RotatingWriter>,
}

impl Core {
    fn console(min: Level) -> Self {
        Self {
            level: min,
            encoder: Encoder::console(),
            writer: BoxMakeWriter::new(io::stdout),
            error_output: BoxMakeWriter::new(io::stderr),
            stacktrace_level: Some(Level::Error),
            rotation: None,
        }
    }

    fn file(min: Level, writer: RotatingWriter) -> Self {
        Self {
            level: min,
            encoder: Encoder::json(),
            writer: BoxMakeWriter::new(writer.clone()),
            error_output: BoxMakeWriter::new(io::stderr),
            stacktrace_level: None,
            rotation: Some(writer),
        }
    }

    fn report_write_error(&self, err: &io::Error) {
        let mut out = self.error_output.make_writer();
        let _ = writeln!(
            out,
            "{} write error: {}",
            Local::now().format("%Y-%m-%d %H:%M:%S%.f %z"),
            err
        );
    }
}

/// Structured logger bound to a console or rotating-file sink
#[derive(Clone)]
pub struct Logger {
    core: Arc<Core>,
    fields: Arc<Vec<Field>>,
    name: Option<Arc<str>>,
    opts: Arc<Options>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.core.level)
            .field("encoding", &self.core.encoder.encoding())
            .field("name", &self.name)
            .field("fields", &self.fields)
            .finish()
    }
}

impl Logger {
    /// Build a logger from configuration.
    ///
    /// # Panics
    ///
    /// Panics when the configuration is unusable: file output without rotation settings.
    pub fn new(cfg: &Config) -> Self {
        match Self::try_new(cfg) {
            Ok(logger) => logger,
            Err(e) => panic!("{}", e),
        }
    }

    /// Build a logger from configuration, reporting configuration errors
    pub fn try_new(cfg: &Config) -> Result<Self, ConfigError> {
        Self::from_config(cfg, Arc::new(Options::default()))
    }

    pub(crate) fn from_config(cfg: &Config, opts: Arc<Options>) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let min = level(&cfg.level);

        let core = match (cfg.output, &cfg.rotation) {
            (Output::File, Some(rotation)) => Core::file(min, RotatingWriter::new(rotation.clone())),
            (Output::File, None) => return Err(ConfigError::MissingRotation),
            // Rotation settings are irrelevant on the console
            (Output::Console, _) => Core::console(min),
        };

        Ok(Self::from_core(core, opts))
    }

    /// Build a logger writing through any `tracing_subscriber` writer
    pub fn from_writer<W>(encoder: Encoder, min: Level, writer: W) -> Self
    where
        W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    {
        let core = Core {
            level: min,
            encoder,
            writer: BoxMakeWriter::new(writer),
            error_output: BoxMakeWriter::new(io::stderr),
            stacktrace_level: None,
            rotation: None,
        };
        Self::from_core(core, Arc::new(Options::default()))
    }

    fn from_core(core: Core, opts: Arc<Options>) -> Self {
        Self {
            core: Arc::new(core),
            fields: Arc::new(Vec::new()),
            name: None,
            opts,
        }
    }

    /// Same sink and fields, different options
    pub(crate) fn with_options(mut self, opts: Arc<Options>) -> Self {
        self.opts = opts;
        self
    }

    pub fn options(&self) -> &Options {
        &self.opts
    }

    /// Minimum severity written by this logger
    pub fn level(&self) -> Level {
        self.core.level
    }

    pub fn enabled(&self, level: Level) -> bool {
        level >= self.core.level
    }

    /// Fields attached to every record of this logger
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// True when both loggers are the same value: same sink and same attached fields
    pub fn ptr_eq(&self, other: &Logger) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
            && Arc::ptr_eq(&self.fields, &other.fields)
            && self.name == other.name
    }

    /// Child logger with `fields` attached to all of its records.
    /// With no fields this returns the receiver unchanged.
    pub fn with(&self, fields: Vec<Field>) -> Logger {
        if fields.is_empty() {
            return self.clone();
        }

        let mut merged = Vec::with_capacity(self.fields.len() + fields.len());
        merged.extend(self.fields.iter().cloned());
        merged.extend(fields);

        Logger {
            core: Arc::clone(&self.core),
            fields: Arc::new(merged),
            name: self.name.clone(),
            opts: Arc::clone(&self.opts),
        }
    }

    /// Child logger with a dot-separated name segment appended
    pub fn named(&self, name: &str) -> Logger {
        if name.is_empty() {
            return self.clone();
        }
        let full: Arc<str> = match &self.name {
            Some(parent) => format!("{}.{}", parent, name).into(),
            None => name.into(),
        };
        Logger {
            name: Some(full),
            ..self.clone()
        }
    }

    /// Child logger carrying the fields the context handler extracts from `ctx`
    pub fn ctx(&self, ctx: &dyn Any) -> Logger {
        self.with(self.opts.ctx_fields(ctx))
    }

    /// Child logger carrying the fields the error handler extracts from `err`
    pub fn err(&self, err: &(dyn Error + 'static)) -> Logger {
        self.with(self.opts.err_fields(err))
    }

    /// Emit a record at `level` from an explicit caller location.
    /// Never terminates, whatever the level.
    pub fn log(&self, level: Level, caller: Option<Caller>, msg: &str, fields: &[Field]) {
        if !self.enabled(level) {
            return;
        }

        let stacktrace = match self.core.stacktrace_level {
            Some(min) if level >= min => Some(Backtrace::force_capture().to_string()),
            _ => None,
        };

        let record = Record {
            level,
            time: Local::now(),
            name: self.name.as_deref(),
            caller,
            message: msg,
            context: &self.fields,
            fields,
            stacktrace,
        };
        let line = self.core.encoder.encode(&record);

        let mut writer = self.core.writer.make_writer();
        if let Err(e) = writer.write_all(&line) {
            self.core.report_write_error(&e);
        }
    }

    #[track_caller]
    fn log_here(&self, level: Level, msg: &str, fields: &[Field]) {
        self.log(level, Some(Caller::from(Location::caller())), msg, fields);
    }

    #[track_caller]
    pub fn debug(&self, msg: &str, fields: &[Field]) {
        self.log_here(Level::Debug, msg, fields);
    }

    #[track_caller]
    pub fn info(&self, msg: &str, fields: &[Field]) {
        self.log_here(Level::Info, msg, fields);
    }

    #[track_caller]
    pub fn warn(&self, msg: &str, fields: &[Field]) {
        self.log_here(Level::Warn, msg, fields);
    }

    #[track_caller]
    pub fn error(&self, msg: &str, fields: &[Field]) {
        self.log_here(Level::Error, msg, fields);
    }

    /// Emit the record, then unwind with `msg` as the panic payload.
    /// The unwind can be intercepted with `std::panic::catch_unwind`.
    #[track_caller]
    pub fn panic(&self, msg: &str, fields: &[Field]) -> ! {
        self.log_here(Level::Panic, msg, fields);
        panic!("{}", msg);
    }

    /// Emit the record, flush the sink, then exit the process with status 1
    #[track_caller]
    pub fn fatal(&self, msg: &str, fields: &[Field]) -> ! {
        self.log_here(Level::Fatal, msg, fields);
        let _ = self.sync();
        std::process::exit(1);
    }

    /// Flush buffered output
    pub fn sync(&self) -> io::Result<()> {
        self.core.writer.make_writer().flush()
    }

    /// Force a rotation of the log file. A no-op for console loggers.
    pub fn rotate(&self) -> Result<(), RotationError> {
        match &self.core.rotation {
            Some(writer) => writer.rotate(),
            None => Ok(()),
        }
    }
}
