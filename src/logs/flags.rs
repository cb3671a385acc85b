//! Command-line flags for the logging configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{value_parser, Arg, ArgAction, ArgMatches};

use super::config::{Config, Output, RotationConfig};
use super::level::Level;
use crate::app::{CliOptions, NamedFlagSets};

/// Name of the flag set the logging flags are grouped under
pub const FLAG_SET: &str = "logs";

const LEVEL: &str = "log.level";
const OUTPUT: &str = "log.output";
const FILE: &str = "log.file";
const MAX_SIZE: &str = "log.max-size";
const MAX_AGE: &str = "log.max-age";
const MAX_BACKUPS: &str = "log.max-backups";
const COMPRESS: &str = "log.compress";

impl Config {
    fn rotation_mut(&mut self) -> &mut RotationConfig {
        self.rotation.get_or_insert_with(RotationConfig::default)
    }
}

impl CliOptions for Config {
    fn flags(&self) -> NamedFlagSets {
        let mut sets = NamedFlagSets::new();
        let levels: Vec<&str> = Level::ALL.iter().map(|l| l.as_str()).collect();

        sets.flag_set(FLAG_SET)
            .add(
                Arg::new(LEVEL)
                    .long(LEVEL)
                    .value_name("LEVEL")
                    .help(format!(
                        "Minimum log level ({}) [current: {}]",
                        levels.join(", "),
                        self.level
                    )),
            )
            .add(
                Arg::new(OUTPUT)
                    .long(OUTPUT)
                    .value_name("OUTPUT")
                    .value_parser(["console", "file"])
                    .help(format!("Where logs are written [current: {}]", self.output)),
            )
            .add(
                Arg::new(FILE)
                    .long(FILE)
                    .value_name("PATH")
                    .value_parser(value_parser!(PathBuf))
                    .help("Log file used when output is file"),
            )
            .add(
                Arg::new(MAX_SIZE)
                    .long(MAX_SIZE)
                    .value_name("MB")
                    .value_parser(value_parser!(u64))
                    .help("Rotate the log file once it reaches this size"),
            )
            .add(
                Arg::new(MAX_AGE)
                    .long(MAX_AGE)
                    .value_name("DAYS")
                    .value_parser(value_parser!(u64))
                    .help("Delete backups older than this many days (0 keeps all)"),
            )
            .add(
                Arg::new(MAX_BACKUPS)
                    .long(MAX_BACKUPS)
                    .value_name("COUNT")
                    .value_parser(value_parser!(usize))
                    .help("Number of backups to keep (0 keeps all)"),
            )
            .add(
                Arg::new(COMPRESS)
                    .long(COMPRESS)
                    .action(ArgAction::SetTrue)
                    .help("Gzip rotated backups"),
            );

        sets
    }

    fn apply(&mut self, matches: &ArgMatches) -> Result<()> {
        if let Some(level) = matches.get_one::<String>(LEVEL) {
            self.level = level.clone();
        }
        if let Some(output) = matches.get_one::<String>(OUTPUT) {
            self.output = output.parse()?;
        }
        if let Some(file) = matches.get_one::<PathBuf>(FILE) {
            self.rotation_mut().filename = file.clone();
        }
        if let Some(size) = matches.get_one::<u64>(MAX_SIZE) {
            self.rotation_mut().max_size_mb = *size;
        }
        if let Some(age) = matches.get_one::<u64>(MAX_AGE) {
            self.rotation_mut().max_age_days = *age;
        }
        if let Some(backups) = matches.get_one::<usize>(MAX_BACKUPS) {
            self.rotation_mut().max_backups = *backups;
        }
        if matches.get_flag(COMPRESS) {
            self.rotation_mut().compress = true;
        }
        if self.output == Output::File {
            self.rotation_mut();
        }
        Ok(())
    }

    fn validate(&self) -> Vec<anyhow::Error> {
        // Unknown level names are not an error: they log at info
        match Config::validate(self) {
            Ok(()) => Vec::new(),
            Err(e) => vec![e.into()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn parse(config: &Config, args: &[&str]) -> ArgMatches {
        let cmd = config
            .flags()
            .iter()
            .fold(clap::Command::new("demo"), |cmd, set| cmd.args(set.to_args()));
        cmd.try_get_matches_from(std::iter::once("demo").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_flags_grouped_under_logs() {
        let sets = Config::default().flags();
        let set = sets.get(FLAG_SET).unwrap();
        let longs: Vec<&str> = set.args().iter().filter_map(|a| a.get_long()).collect();
        assert_eq!(
            longs,
            vec![LEVEL, OUTPUT, FILE, MAX_SIZE, MAX_AGE, MAX_BACKUPS, COMPRESS]
        );
    }

    #[test]
    fn test_no_flags_keeps_config() {
        let mut config = Config::console("warn");
        let matches = parse(&config, &[]);
        CliOptions::apply(&mut config, &matches).unwrap();
        assert_eq!(config, Config::console("warn"));
    }

    #[test]
    fn test_apply_file_output() {
        let mut config = Config::default();
        let matches = parse(
            &config,
            &[
                "--log.level",
                "debug",
                "--log.output",
                "file",
                "--log.file",
                "/var/log/demo.log",
                "--log.max-size",
                "10",
                "--log.max-backups",
                "4",
                "--log.compress",
            ],
        );
        CliOptions::apply(&mut config, &matches).unwrap();

        assert_eq!(config.level, "debug");
        assert_eq!(config.output, Output::File);
        let rotation = config.rotation.as_ref().unwrap();
        assert_eq!(rotation.filename, PathBuf::from("/var/log/demo.log"));
        assert_eq!(rotation.max_size_mb, 10);
        assert_eq!(rotation.max_backups, 4);
        assert_eq!(rotation.max_age_days, 0);
        assert!(rotation.compress);
        assert!(CliOptions::validate(&config).is_empty());
    }

    #[test]
    fn test_file_output_gets_default_rotation() {
        let mut config = Config::default();
        let matches = parse(&config, &["--log.output", "file"]);
        CliOptions::apply(&mut config, &matches).unwrap();
        assert_eq!(config.rotation.as_ref().unwrap().max_size_mb, 100);
    }

    #[test]
    fn test_unknown_output_rejected_by_parser() {
        let config = Config::default();
        let cmd = config
            .flags()
            .iter()
            .fold(clap::Command::new("demo"), |cmd, set| cmd.args(set.to_args()));
        assert!(cmd
            .try_get_matches_from(["demo", "--log.output", "syslog"])
            .is_err());
    }

    #[test]
    fn test_validate_accepts_unknown_level() {
        let config = Config::console("loud");
        assert!(CliOptions::validate(&config).is_empty());
        assert_eq!(crate::logs::level(&config.level), Level::Info);
    }

    #[test]
    fn test_validate_missing_rotation() {
        let config = Config {
            level: "info".to_string(),
            output: Output::File,
            rotation: None,
        };
        let errors = CliOptions::validate(&config);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_config_as_shared_options() {
        let config = Arc::new(Mutex::new(Config::default()));
        let shared: crate::app::SharedOptions = config.clone();
        assert!(shared.lock().unwrap().flags().get(FLAG_SET).is_some());
    }
}
