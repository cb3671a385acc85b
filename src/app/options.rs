use std::sync::{Arc, Mutex};

use anyhow::Result;
use clap::ArgMatches;

use super::flags::NamedFlagSets;

/// Options that can be populated from the command line
pub trait CliOptions {
    /// Flags exposing the options, grouped by set name
    fn flags(&self) -> NamedFlagSets;

    /// Copy parsed flag values into the options
    fn apply(&mut self, matches: &ArgMatches) -> Result<()>;

    /// Problems with the applied values; empty when they are usable
    fn validate(&self) -> Vec<anyhow::Error> {
        Vec::new()
    }
}

/// Options shared between the command that fills them and the code that reads them
pub type SharedOptions = Arc<Mutex<dyn CliOptions + Send>>;

/// Apply parsed flags to `opts` and run their validation
pub(crate) fn apply_options(opts: &SharedOptions, matches: &ArgMatches) -> Result<()> {
    let mut guard = opts
        .lock()
        .map_err(|_| anyhow::anyhow!("options lock poisoned"))?;
    guard.apply(matches)?;

    let errors = guard.validate();
    if errors.is_empty() {
        return Ok(());
    }
    let messages: Vec<String> = errors.iter().map(|e| format!("{:#}", e)).collect();
    anyhow::bail!("{}", messages.join("; "))
}

/// Register every flag of `opts` on `cmd`
pub(crate) fn register_flags(cmd: clap::Command, opts: &SharedOptions) -> Result<clap::Command> {
    let guard = opts
        .lock()
        .map_err(|_| anyhow::anyhow!("options lock poisoned"))?;
    let cmd = guard
        .flags()
        .iter()
        .fold(cmd, |cmd, set| cmd.args(set.to_args()));
    Ok(cmd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Arg;

    #[derive(Default)]
    struct PortOptions {
        port: u16,
    }

    impl CliOptions for PortOptions {
        fn flags(&self) -> NamedFlagSets {
            let mut sets = NamedFlagSets::new();
            sets.flag_set("server").add(
                Arg::new("port")
                    .long("port")
                    .value_parser(clap::value_parser!(u16)),
            );
            sets
        }

        fn apply(&mut self, matches: &ArgMatches) -> Result<()> {
            if let Some(port) = matches.get_one::<u16>("port") {
                self.port = *port;
            }
            Ok(())
        }

        fn validate(&self) -> Vec<anyhow::Error> {
            if self.port == 0 {
                vec![anyhow::anyhow!("port must not be 0")]
            } else {
                Vec::new()
            }
        }
    }

    fn shared() -> (Arc<Mutex<PortOptions>>, SharedOptions) {
        let opts = Arc::new(Mutex::new(PortOptions::default()));
        let dyn_opts: SharedOptions = opts.clone();
        (opts, dyn_opts)
    }

    #[test]
    fn test_apply_and_validate() {
        let (opts, dyn_opts) = shared();
        let cmd = register_flags(clap::Command::new("srv"), &dyn_opts).unwrap();
        let matches = cmd.try_get_matches_from(["srv", "--port", "8080"]).unwrap();

        apply_options(&dyn_opts, &matches).unwrap();
        assert_eq!(opts.lock().unwrap().port, 8080);
    }

    #[test]
    fn test_validation_errors_are_reported() {
        let (_, dyn_opts) = shared();
        let cmd = register_flags(clap::Command::new("srv"), &dyn_opts).unwrap();
        let matches = cmd.try_get_matches_from(["srv"]).unwrap();

        let err = apply_options(&dyn_opts, &matches).unwrap_err();
        assert_eq!(err.to_string(), "port must not be 0");
    }
}
