//! Record encoders
//!
//! Two fixed layouts: JSON lines for files and tab-separated, colored lines for
//! the console. Both share the same key naming scheme.

use std::panic::Location;

use chrono::{DateTime, Local};
use crossterm::style::Stylize;

use super::field::{fields_to_json, Field};
use super::level::Level;

/// How the level is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelEncoder {
    /// `info`
    Lowercase,
    /// `INFO` wrapped in an ANSI color
    CapitalColor,
}

/// Key names and value renderings for encoded records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderConfig {
    pub message_key: &'static str,
    pub level_key: &'static str,
    pub time_key: &'static str,
    pub name_key: &'static str,
    pub caller_key: &'static str,
    /// Reserved: call sites carry no function name, so it is never written
    pub function_key: &'static str,
    pub stacktrace_key: &'static str,
    pub line_ending: &'static str,
    pub level_encoder: LevelEncoder,
    /// ISO8601 with milliseconds and offset
    pub time_format: &'static str,
}

const ISO8601_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

/// Naming scheme for JSON records written to files
pub fn file_encoder_config() -> EncoderConfig {
    EncoderConfig {
        message_key: "msg",
        level_key: "level",
        time_key: "ts",
        name_key: "logger",
        caller_key: "caller",
        function_key: "function",
        stacktrace_key: "stacktrace",
        line_ending: "\n",
        level_encoder: LevelEncoder::Lowercase,
        time_format: ISO8601_FORMAT,
    }
}

/// Naming scheme for human-readable records written to the console
pub fn console_encoder_config() -> EncoderConfig {
    EncoderConfig {
        level_encoder: LevelEncoder::CapitalColor,
        ..file_encoder_config()
    }
}

/// Source location of the code that emitted a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub file: &'static str,
    pub line: u32,
}

impl Caller {
    pub fn new(file: &'static str, line: u32) -> Self {
        Self { file, line }
    }

    /// `dir/file.rs:line`, keeping only the last directory of the path
    pub fn short(&self) -> String {
        let normalized = self.file.replace('\\', "/");
        let mut parts = normalized.rsplitn(3, '/');
        let file = parts.next().unwrap_or_default();
        let trimmed = match parts.next() {
            Some(dir) => format!("{}/{}", dir, file),
            None => file.to_string(),
        };
        format!("{}:{}", trimmed, self.line)
    }
}

impl From<&'static Location<'static>> for Caller {
    fn from(location: &'static Location<'static>) -> Self {
        Self::new(location.file(), location.line())
    }
}

/// Everything an encoder needs to render one record
#[derive(Debug, Clone)]
pub struct Record<'a> {
    pub level: Level,
    pub time: DateTime<Local>,
    pub name: Option<&'a str>,
    pub caller: Option<Caller>,
    pub message: &'a str,
    /// Fields attached to the logger, written first
    pub context: &'a [Field],
    /// Fields passed with this record
    pub fields: &'a [Field],
    pub stacktrace: Option<String>,
}

impl<'a> Record<'a> {
    fn all_fields(&self) -> impl Iterator<Item = &'a Field> {
        self.context.iter().chain(self.fields.iter())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Json,
    Console,
}

/// Renders records into bytes ready for a sink
#[derive(Debug, Clone)]
pub struct Encoder {
    encoding: Encoding,
    config: EncoderConfig,
}

impl Encoder {
    pub fn new(encoding: Encoding, config: EncoderConfig) -> Self {
        Self { encoding, config }
    }

    pub fn json() -> Self {
        Self::new(Encoding::Json, file_encoder_config())
    }

    pub fn console() -> Self {
        Self::new(Encoding::Console, console_encoder_config())
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    pub fn encode(&self, record: &Record<'_>) -> Vec<u8> {
        let mut line = match self.encoding {
            Encoding::Json => self.encode_json(record),
            Encoding::Console => self.encode_console(record),
        };
        line.push_str(self.config.line_ending);
        line.into_bytes()
    }

    fn encode_level(&self, level: Level) -> String {
        match self.config.level_encoder {
            LevelEncoder::Lowercase => level.as_str().to_string(),
            LevelEncoder::CapitalColor => {
                let name = level.as_capital_str();
                match level {
                    Level::Debug => name.magenta().to_string(),
                    Level::Info => name.blue().to_string(),
                    Level::Warn => name.yellow().to_string(),
                    Level::Error | Level::Panic | Level::Fatal => name.red().to_string(),
                }
            }
        }
    }

    fn encode_json(&self, record: &Record<'_>) -> String {
        let cfg = &self.config;
        let mut map = serde_json::Map::new();

        map.insert(cfg.level_key.into(), self.encode_level(record.level).into());
        map.insert(
            cfg.time_key.into(),
            record.time.format(cfg.time_format).to_string().into(),
        );
        if let Some(name) = record.name {
            map.insert(cfg.name_key.into(), name.into());
        }
        if let Some(caller) = &record.caller {
            map.insert(cfg.caller_key.into(), caller.short().into());
        }
        map.insert(cfg.message_key.into(), record.message.into());
        map.extend(fields_to_json(record.all_fields()));
        if let Some(stack) = &record.stacktrace {
            map.insert(cfg.stacktrace_key.into(), stack.as_str().into());
        }

        serde_json::Value::Object(map).to_string()
    }

    fn encode_console(&self, record: &Record<'_>) -> String {
        let mut parts = vec![
            record.time.format(self.config.time_format).to_string(),
            self.encode_level(record.level),
        ];
        if let Some(name) = record.name {
            parts.push(name.to_string());
        }
        if let Some(caller) = &record.caller {
            parts.push(caller.short());
        }
        parts.push(record.message.to_string());

        let fields = fields_to_json(record.all_fields());
        if !fields.is_empty() {
            parts.push(serde_json::Value::Object(fields).to_string());
        }

        let mut line = parts.join("\t");
        if let Some(stack) = &record.stacktrace {
            line.push('\n');
            line.push_str(stack.trim_end());
        }
        line
    }
}
