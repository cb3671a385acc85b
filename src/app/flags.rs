//! Named flag sets
//!
//! Flags are grouped under a name; each group is rendered under its own heading
//! in the command's help output.

use clap::{Arg, ArgAction};

/// Name of the flag set that carries `--help`
pub const GLOBAL_FLAG_SET: &str = "global";

/// An ordered group of flags
#[derive(Debug, Clone, Default)]
pub struct FlagSet {
    name: String,
    args: Vec<Arg>,
}

impl FlagSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add(&mut self, arg: Arg) -> &mut Self {
        self.args.push(arg);
        self
    }

    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Help heading for this set, e.g. "Global flags"
    pub fn heading(&self) -> String {
        let mut chars = self.name.chars();
        match chars.next() {
            Some(first) => format!("{}{} flags", first.to_uppercase(), chars.as_str()),
            None => "Flags".to_string(),
        }
    }

    /// The set's flags, normalized and tagged with the set's heading
    pub fn to_args(&self) -> Vec<Arg> {
        let heading = self.heading();
        self.args
            .iter()
            .cloned()
            .map(normalize_flag_name)
            .map(|arg| arg.help_heading(heading.clone()))
            .collect()
    }
}

/// Flag sets in insertion order, looked up by name
#[derive(Debug, Clone, Default)]
pub struct NamedFlagSets {
    sets: Vec<FlagSet>,
}

impl NamedFlagSets {
    pub fn new() -> Self {
        Self::default()
    }

    /// The set called `name`, created at the end if it does not exist yet
    pub fn flag_set(&mut self, name: &str) -> &mut FlagSet {
        let index = match self.sets.iter().position(|s| s.name == name) {
            Some(index) => index,
            None => {
                self.sets.push(FlagSet::new(name));
                self.sets.len() - 1
            }
        };
        &mut self.sets[index]
    }

    pub fn get(&self, name: &str) -> Option<&FlagSet> {
        self.sets.iter().find(|s| s.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FlagSet> {
        self.sets.iter()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

/// Add the flags every command carries to `fs`
pub fn add_global_flags(fs: &mut FlagSet, name: &str) {
    fs.add(
        Arg::new("help")
            .short('h')
            .long("help")
            .action(ArgAction::Help)
            .help(format!("help for {}", name)),
    );
}

/// Long flag names use dashes between words: `max_size` is exposed as `--max-size`
fn normalize_flag_name(arg: Arg) -> Arg {
    match arg.get_long().map(|long| long.replace('_', "-")) {
        Some(long) => arg.long(long),
        None => arg,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_set_created_once_in_order() {
        let mut sets = NamedFlagSets::new();
        sets.flag_set("server").add(Arg::new("port").long("port"));
        sets.flag_set("global");
        sets.flag_set("server").add(Arg::new("host").long("host"));

        let names: Vec<&str> = sets.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["server", "global"]);
        assert_eq!(sets.get("server").unwrap().args().len(), 2);
        assert!(sets.get("global").unwrap().is_empty());
    }

    #[test]
    fn test_heading() {
        assert_eq!(FlagSet::new("global").heading(), "Global flags");
        assert_eq!(FlagSet::new("").heading(), "Flags");
    }

    #[test]
    fn test_to_args_normalizes_and_tags() {
        let mut fs = FlagSet::new("logs");
        fs.add(Arg::new("max_size").long("max_size"));
        let args = fs.to_args();

        assert_eq!(args[0].get_long(), Some("max-size"));
        assert_eq!(args[0].get_help_heading(), Some("Logs flags"));
    }

    #[test]
    fn test_add_global_flags() {
        let mut fs = FlagSet::new(GLOBAL_FLAG_SET);
        add_global_flags(&mut fs, "demo");
        let help = &fs.args()[0];
        assert_eq!(help.get_short(), Some('h'));
        assert_eq!(help.get_long(), Some("help"));
    }
}
