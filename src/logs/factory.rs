//! Logger factory and the process-wide instance
//!
//! A [`Factory`] pairs one [`Logger`] with the options it was built with. Code
//! that wants explicit wiring passes factories (or their loggers) around; the
//! global accessors below are a convenience for call sites that do not.

use std::fmt;
use std::sync::{Arc, OnceLock};

use super::config::{Config, ConfigError};
use super::field::Field;
use super::logger::Logger;
use super::options::Options;

/// One element of a log call's argument list
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// Structured field attached to the record
    Field(Field),
    /// Value substituted into the message template
    Value(String),
}

impl Arg {
    pub fn value(value: impl fmt::Display) -> Self {
        Arg::Value(value.to_string())
    }
}

impl From<Field> for Arg {
    fn from(field: Field) -> Self {
        Arg::Field(field)
    }
}

/// Owns a logger and the options its contextual children consult
#[derive(Debug, Clone)]
pub struct Factory {
    logger: Logger,
    opts: Arc<Options>,
}

impl Factory {
    /// Build a factory from configuration.
    ///
    /// # Panics
    ///
    /// Panics when the configuration is unusable (see [`Logger::new`]).
    pub fn new(cfg: &Config, opts: Options) -> Self {
        match Self::try_new(cfg, opts) {
            Ok(factory) => factory,
            Err(e) => panic!("{}", e),
        }
    }

    pub fn try_new(cfg: &Config, opts: Options) -> Result<Self, ConfigError> {
        let opts = Arc::new(opts);
        let logger = Logger::from_config(cfg, Arc::clone(&opts))?;
        Ok(Self { logger, opts })
    }

    /// Wrap an existing logger, binding `opts` into it
    pub fn from_logger(logger: Logger, opts: Options) -> Self {
        let opts = Arc::new(opts);
        Self {
            logger: logger.with_options(Arc::clone(&opts)),
            opts,
        }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn options(&self) -> &Options {
        &self.opts
    }

    /// Split `args` into a message and a field list.
    ///
    /// Values fill the `{}` placeholders of `template` in order; with no values the
    /// template is used verbatim. Fields keep their order and, when there are any,
    /// are preceded by the namespace marker.
    pub fn parse(&self, template: &str, args: Vec<Arg>) -> (String, Vec<Field>) {
        let mut fields = Vec::new();
        let mut values = Vec::new();

        for arg in args {
            match arg {
                Arg::Field(field) => fields.push(field),
                Arg::Value(value) => values.push(value),
            }
        }

        let msg = if values.is_empty() {
            template.to_string()
        } else {
            render_template(template, &values)
        };

        if !fields.is_empty() {
            fields.insert(0, Field::namespace(self.opts.namespace()));
        }

        (msg, fields)
    }
}

/// Substitute `values` into the `{}` placeholders of `template`.
///
/// `{{` and `}}` are literal braces. Placeholders left without a value stay as
/// they are; values left without a placeholder are appended, space separated.
fn render_template(template: &str, values: &[String]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut remaining = values.iter();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, chars.peek()) {
            ('{', Some('{')) => {
                chars.next();
                out.push('{');
            }
            ('}', Some('}')) => {
                chars.next();
                out.push('}');
            }
            ('{', Some('}')) => {
                chars.next();
                match remaining.next() {
                    Some(value) => out.push_str(value),
                    None => out.push_str("{}"),
                }
            }
            _ => out.push(c),
        }
    }

    for extra in remaining {
        out.push(' ');
        out.push_str(extra);
    }

    out
}

static DEFAULT_FACTORY: OnceLock<Factory> = OnceLock::new();
static INSTALLED_FACTORY: OnceLock<Factory> = OnceLock::new();

fn default_factory() -> Factory {
    Factory::new(&Config::console("debug"), Options::default())
}

/// Install `factory` as the process-wide instance.
///
/// Only the first call takes effect; it returns `true`. Every later call leaves
/// the installed factory in place and returns `false`.
pub fn set_factory(factory: Factory) -> bool {
    let installed = INSTALLED_FACTORY.set(factory).is_ok();
    if !installed {
        tracing::debug!("log factory already installed, ignoring replacement");
    }
    installed
}

/// The process-wide factory: the installed one, or a debug-level console default
pub fn factory() -> &'static Factory {
    match INSTALLED_FACTORY.get() {
        Some(factory) => factory,
        None => DEFAULT_FACTORY.get_or_init(default_factory),
    }
}
