//! Command-line application builder
//!
//! An [`App`] wraps a clap command tree: options registered as named flag sets,
//! a root run callback and any number of nested [`Command`]s.
//!
//! ```ignore
//! let opts = Arc::new(Mutex::new(logs::Config::default()));
//! App::new("demo", "Demo server")
//!     .description("Serves the demo API")
//!     .options(opts.clone())
//!     .default_args()
//!     .run_func(move |basename| serve(basename, &opts))
//!     .run();
//! ```

mod command;
mod flags;
mod options;

use std::ffi::OsString;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use crossterm::style::Stylize;

pub use command::{Command, CommandRunFunc};
pub use flags::{add_global_flags, FlagSet, NamedFlagSets, GLOBAL_FLAG_SET};
pub use options::{CliOptions, SharedOptions};

use command::{positional_args, positional_values};
use options::{apply_options, register_flags};

/// Root callback, called with the application's basename
pub type RunFunc = Box<dyn Fn(&str) -> Result<()>>;

/// Validates the root command's positional arguments
pub type ArgsValidator = Box<dyn Fn(&str, &[String]) -> Result<()>>;

/// A command-line application
pub struct App {
    basename: String,
    name: String,
    description: String,
    version: Option<String>,
    silence: bool,
    options: Option<SharedOptions>,
    run_func: Option<RunFunc>,
    args: Option<ArgsValidator>,
    commands: Vec<Command>,
}

impl App {
    pub fn new(basename: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            basename: basename.into(),
            name: name.into(),
            description: String::new(),
            version: None,
            silence: false,
            options: None,
            run_func: None,
            args: None,
            commands: Vec::new(),
        }
    }

    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Suppress the startup banner
    pub fn silence(mut self) -> Self {
        self.silence = true;
        self
    }

    pub fn options<O>(mut self, opts: Arc<Mutex<O>>) -> Self
    where
        O: CliOptions + Send + 'static,
    {
        let opts: SharedOptions = opts;
        self.options = Some(opts);
        self
    }

    pub fn run_func<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Result<()> + 'static,
    {
        self.run_func = Some(Box::new(f));
        self
    }

    /// Validate positional arguments with `f`, which receives the command path
    pub fn args<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &[String]) -> Result<()> + 'static,
    {
        self.args = Some(Box::new(f));
        self
    }

    /// Reject any positional argument
    pub fn default_args(self) -> Self {
        self.args(|path, args| {
            if args.is_empty() {
                Ok(())
            } else {
                anyhow::bail!("{:?} doesn't take any arguments, got {:?}", path, args)
            }
        })
    }

    pub fn add_command(&mut self, cmd: Command) {
        self.commands.push(cmd);
    }

    pub fn add_commands(&mut self, cmds: impl IntoIterator<Item = Command>) {
        self.commands.extend(cmds);
    }

    pub fn basename(&self) -> &str {
        &self.basename
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The clap command tree for this application
    pub fn command(&self) -> Result<clap::Command> {
        let mut cmd = clap::Command::new(format_base_name(&self.basename))
            .about(self.name.clone())
            .next_display_order(None)
            .disable_help_flag(true)
            .disable_version_flag(true);

        if !self.description.is_empty() {
            cmd = cmd.long_about(self.description.clone());
        }
        if let Some(opts) = &self.options {
            cmd = register_flags(cmd, opts)?;
        }

        let mut global = FlagSet::new(GLOBAL_FLAG_SET);
        add_global_flags(&mut global, &self.name);
        if let Some(version) = &self.version {
            cmd = cmd.version(version.clone());
            global.add(
                clap::Arg::new("version")
                    .short('V')
                    .long("version")
                    .action(clap::ArgAction::Version)
                    .help(format!("version for {}", self.name)),
            );
        }
        cmd = cmd.args(global.to_args());

        if self.commands.is_empty() {
            cmd = cmd.arg(positional_args());
        }
        for child in &self.commands {
            cmd = cmd.subcommand(child.to_clap()?);
        }
        Ok(cmd)
    }

    /// Parse `args` (program name first) and run the matched command
    pub fn run_from<I, T>(&self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let mut cmd = self.command()?;
        let path = cmd.get_name().to_string();
        let matches = cmd.try_get_matches_from_mut(args)?;

        if let Some(opts) = &self.options {
            apply_options(opts, &matches)?;
        }

        if let Some((name, sub_matches)) = matches.subcommand() {
            tracing::debug!(command = name, "dispatching sub-command");
            return match self.commands.iter().find(|c| c.name() == name) {
                Some(child) => child.dispatch(sub_matches),
                None => anyhow::bail!("unknown command {:?}", name),
            };
        }

        let positional = positional_values(&matches);
        if let Some(validate) = &self.args {
            validate(&path, &positional)?;
        }

        if !self.silence {
            println!("{} starting {} ...", "==>".green(), self.name);
        }

        match &self.run_func {
            Some(run) => run(&self.basename),
            None => {
                cmd.print_help()?;
                Ok(())
            }
        }
    }

    /// Run with the process arguments, exiting on failure
    pub fn run(&self) {
        if let Err(err) = self.run_from(std::env::args_os()) {
            if let Some(clap_err) = err.downcast_ref::<clap::Error>() {
                clap_err.exit();
            }
            eprintln!("{} {:#}", "Error:".red(), err);
            std::process::exit(1);
        }
    }
}

/// Command name derived from the binary's basename
pub fn format_base_name(basename: &str) -> String {
    if cfg!(windows) {
        let lower = basename.to_lowercase();
        match lower.strip_suffix(".exe") {
            Some(stem) => stem.to_string(),
            None => lower,
        }
    } else {
        basename.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_run_func_receives_basename() {
        let seen = Rc::new(RefCell::new(String::new()));
        let sink = Rc::clone(&seen);
        let app = App::new("demo", "Demo").silence().run_func(move |basename| {
            sink.borrow_mut().push_str(basename);
            Ok(())
        });

        app.run_from(["demo"]).unwrap();
        assert_eq!(*seen.borrow(), "demo");
    }

    #[test]
    fn test_default_args_rejects_positionals() {
        let app = App::new("demo", "Demo")
            .silence()
            .default_args()
            .run_func(|_| Ok(()));

        let err = app.run_from(["demo", "a", "b"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            r#""demo" doesn't take any arguments, got ["a", "b"]"#
        );
    }

    #[test]
    fn test_custom_args_validator() {
        let app = App::new("demo", "Demo")
            .silence()
            .args(|_, args| {
                if args.len() == 1 {
                    Ok(())
                } else {
                    anyhow::bail!("expected exactly one argument")
                }
            })
            .run_func(|_| Ok(()));

        assert!(app.run_from(["demo", "x"]).is_ok());
        assert!(app.run_from(["demo"]).is_err());
    }

    #[test]
    fn test_options_applied_before_run() {
        let opts = Arc::new(Mutex::new(crate::logs::Config::default()));
        let reader = Arc::clone(&opts);
        let seen = Rc::new(RefCell::new(String::new()));
        let sink = Rc::clone(&seen);
        let app = App::new("demo", "Demo")
            .silence()
            .options(opts)
            .run_func(move |_| {
                let level = reader.lock().unwrap().level.clone();
                sink.borrow_mut().push_str(&level);
                Ok(())
            });

        app.run_from(["demo", "--log.level", "warn"]).unwrap();
        assert_eq!(*seen.borrow(), "warn");
    }

    #[test]
    fn test_unknown_level_from_config_runs_at_info() {
        let config = crate::logs::Config::from_toml_str("level = \"trace\"").unwrap();
        let opts = Arc::new(Mutex::new(config));
        let reader = Arc::clone(&opts);
        let ran = Rc::new(RefCell::new(false));
        let flag = Rc::clone(&ran);
        let app = App::new("demo", "Demo")
            .silence()
            .options(opts)
            .run_func(move |_| {
                let cfg = reader.lock().unwrap().clone();
                let logger = crate::logs::Logger::try_new(&cfg)?;
                assert_eq!(logger.level(), crate::logs::Level::Info);
                assert!(!logger.enabled(crate::logs::Level::Debug));
                *flag.borrow_mut() = true;
                Ok(())
            });

        app.run_from(["demo"]).unwrap();
        assert!(*ran.borrow());
    }

    #[test]
    fn test_invalid_options_fail_before_run() {
        let opts = Arc::new(Mutex::new(crate::logs::Config::default()));
        let app = App::new("demo", "Demo")
            .silence()
            .options(opts)
            .run_func(|_| panic!("run must not be reached"));

        assert!(app.run_from(["demo", "--log.output", "syslog"]).is_err());
    }

    #[test]
    fn test_sub_command_dispatch() {
        let hits = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&hits);
        let mut app = App::new("demo", "Demo")
            .silence()
            .run_func(|_| panic!("root must not run"));
        app.add_command(Command::new("echo", "Echo args").run_func(move |args| {
            sink.borrow_mut().extend_from_slice(args);
            Ok(())
        }));

        app.run_from(["demo", "echo", "hi"]).unwrap();
        assert_eq!(*hits.borrow(), vec!["hi".to_string()]);
    }

    #[test]
    fn test_help_is_a_clap_error() {
        let app = App::new("demo", "Demo").silence();
        let err = app.run_from(["demo", "--help"]).unwrap_err();
        let clap_err = err.downcast_ref::<clap::Error>().unwrap();
        assert_eq!(clap_err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_version_flag() {
        let app = App::new("demo", "Demo").silence().version("1.2.3");
        let err = app.run_from(["demo", "--version"]).unwrap_err();
        let clap_err = err.downcast_ref::<clap::Error>().unwrap();
        assert_eq!(clap_err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_flag_sets_render_under_headings() {
        let opts = Arc::new(Mutex::new(crate::logs::Config::default()));
        let app = App::new("demo", "Demo").options(opts);
        let help = app.command().unwrap().render_help().to_string();

        assert!(help.contains("Logs flags:"));
        assert!(help.contains("Global flags:"));
        assert!(help.contains("--log.max-size"));
    }

    #[test]
    fn test_format_base_name() {
        if cfg!(windows) {
            assert_eq!(format_base_name("Demo.EXE"), "demo");
        } else {
            assert_eq!(format_base_name("Demo"), "Demo");
        }
    }
}
