use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches};

use super::flags::{add_global_flags, FlagSet, GLOBAL_FLAG_SET};
use super::options::{apply_options, register_flags, CliOptions, SharedOptions};

/// Id of the positional arguments collected for run callbacks
pub(crate) const ARGS_ID: &str = "args";

/// Callback run by a [`Command`] with its positional arguments
pub type CommandRunFunc = Box<dyn Fn(&[String]) -> Result<()>>;

/// A sub-command of an [`App`](super::App)
pub struct Command {
    usage: String,
    desc: String,
    options: Option<SharedOptions>,
    commands: Vec<Command>,
    run_func: Option<CommandRunFunc>,
}

impl Command {
    pub fn new(usage: impl Into<String>, desc: impl Into<String>) -> Self {
        Self {
            usage: usage.into(),
            desc: desc.into(),
            options: None,
            commands: Vec::new(),
            run_func: None,
        }
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
        F: Fn(&[String]) -> Result<()> + 'static,
    {
        self.run_func = Some(Box::new(f));
        self
    }

    pub fn add_command(&mut self, cmd: Command) {
        self.commands.push(cmd);
    }

    pub fn add_commands(&mut self, cmds: impl IntoIterator<Item = Command>) {
        self.commands.extend(cmds);
    }

    pub fn name(&self) -> &str {
        &self.usage
    }

    pub(crate) fn to_clap(&self) -> Result<clap::Command> {
        let mut cmd = clap::Command::new(self.usage.clone())
            .about(self.desc.clone())
            .next_display_order(None)
            .disable_help_flag(true);

        if let Some(opts) = &self.options {
            cmd = register_flags(cmd, opts)?;
        }

        let mut global = FlagSet::new(GLOBAL_FLAG_SET);
        add_global_flags(&mut global, &self.usage);
        cmd = cmd.args(global.to_args());

        if self.commands.is_empty() {
            cmd = cmd.arg(positional_args());
        }
        for child in &self.commands {
            cmd = cmd.subcommand(child.to_clap()?);
        }
        Ok(cmd)
    }

    pub(crate) fn dispatch(&self, matches: &ArgMatches) -> Result<()> {
        if let Some(opts) = &self.options {
            apply_options(opts, matches)?;
        }

        if let Some((name, sub_matches)) = matches.subcommand() {
            let child = self
                .commands
                .iter()
                .find(|c| c.usage == name)
                .with_context(|| format!("unknown command {:?}", name))?;
            return child.dispatch(sub_matches);
        }

        match &self.run_func {
            Some(run) => run(&positional_values(matches)),
            None => {
                self.to_clap()?.print_help()?;
                Ok(())
            }
        }
    }
}

/// Trailing positional arguments accepted by leaf commands
pub(crate) fn positional_args() -> Arg {
    Arg::new(ARGS_ID)
        .num_args(0..)
        .action(ArgAction::Append)
        .trailing_var_arg(true)
        .hide(true)
}

pub(crate) fn positional_values(matches: &ArgMatches) -> Vec<String> {
    matches
        .try_get_many::<String>(ARGS_ID)
        .ok()
        .flatten()
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}
