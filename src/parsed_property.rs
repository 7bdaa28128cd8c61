use std::{fmt::Display, ops::Deref, path::PathBuf};

/// A configuration value together with the place it was read from.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedProperty<T> {
    /// Value from a command line flag (parsed_value, flag_name)
    Cli(T, &'static str),
    /// Value from an environment variable (parsed_value, variable_name)
    Env(T, &'static str),
    /// Value from the configuration file (parsed_value, file_path)
    File(T, PathBuf),
    /// Built-in default
    Default(T),
}

impl<T> ParsedProperty<T> {
    /// Get the parsed value
    pub fn value(&self) -> &T {
        match self {
            ParsedProperty::Cli(value, _)
            | ParsedProperty::Env(value, _)
            | ParsedProperty::File(value, _)
            | ParsedProperty::Default(value) => value,
        }
    }

    /// Get the source name as a string
    pub fn source_name(&self) -> &'static str {
        match self {
            ParsedProperty::Cli(..) => "cli",
            ParsedProperty::Env(..) => "env",
            ParsedProperty::File(..) => "file",
            ParsedProperty::Default(_) => "default",
        }
    }

    /// Where the value came from, in a form a user can act on
    /// (`--flag`, `VARIABLE`, a file path or `default`).
    pub fn origin(&self) -> String {
        match self {
            ParsedProperty::Cli(_, flag) => format!("--{}", flag),
            ParsedProperty::Env(_, var) => (*var).to_string(),
            ParsedProperty::File(_, path) => path.display().to_string(),
            ParsedProperty::Default(_) => "default".to_string(),
        }
    }
}

impl<T> Deref for ParsedProperty<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.value()
    }
}

impl<T: Display> Display for ParsedProperty<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.value().fmt(f)
    }
}

impl<T> From<T> for ParsedProperty<T> {
    fn from(value: T) -> Self {
        ParsedProperty::Default(value)
    }
}
