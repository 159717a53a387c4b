use std::collections::BTreeMap;
use std::fmt;

/// Selects a probe backend and its options.
///
/// Constructed from a string of the form `NAME:KEY=VALUE:KEY=VALUE...`. The name can also be
/// given as a `name=NAME` option, in any position.
///
/// Values which parse as an integer (decimal, or with a `0x`, `0o` or `0b` prefix) are stored as
/// [`OptionValue::Integer`], everything else as [`OptionValue::Text`].
///
/// ## Example:
///
/// ```
/// use swd_probe::probe::{BackendConfig, OptionValue};
///
/// let config: BackendConfig = "cmsis-dap:vid=0xc251:serial=A0B1".parse().unwrap();
///
/// assert_eq!(config.name(), "cmsis-dap");
/// assert_eq!(config.get("vid"), Some(&OptionValue::Integer(0xc251)));
/// assert_eq!(config.text("serial"), Some("A0B1"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    name: String,
    options: BTreeMap<String, Entry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    raw: String,
    value: OptionValue,
}

/// The value of a single backend option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Integer(u64),
    Text(String),
}

impl OptionValue {
    fn parse(raw: &str) -> Self {
        match parse_int::parse::<u64>(raw) {
            Ok(value) => OptionValue::Integer(value),
            Err(_) => OptionValue::Text(raw.to_string()),
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Integer(value) => write!(f, "{value}"),
            OptionValue::Text(text) => f.write_str(text),
        }
    }
}

#[derive(thiserror::Error, docsplay::Display, Debug, Clone, PartialEq, Eq)]
pub enum BackendConfigError {
    /// No backend name was given.
    MissingName,

    /// The backend name is given more than once.
    DuplicateName,

    /// Invalid option '{0}', expected KEY=VALUE.
    InvalidOption(String),

    /// The option '{key}' has to be {expected}.
    WrongType { key: String, expected: &'static str },

    /// The value {value} of option '{key}' is out of range.
    OutOfRange { key: String, value: u64 },
}

impl BackendConfig {
    /// The backend name, e.g. `cmsis-dap`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.options.get(key).map(|entry| &entry.value)
    }

    /// Iterate over all options, in key order.
    pub fn options(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.options
            .iter()
            .map(|(key, entry)| (key.as_str(), &entry.value))
    }

    /// The option as an integer.
    pub fn integer(&self, key: &str) -> Result<Option<u64>, BackendConfigError> {
        match self.get(key) {
            None => Ok(None),
            Some(OptionValue::Integer(value)) => Ok(Some(*value)),
            Some(OptionValue::Text(_)) => Err(BackendConfigError::WrongType {
                key: key.to_string(),
                expected: "an integer",
            }),
        }
    }

    /// The option as an integer which has to fit into `T`.
    pub fn integer_as<T: TryFrom<u64>>(&self, key: &str) -> Result<Option<T>, BackendConfigError> {
        self.integer(key)?
            .map(|value| {
                T::try_from(value).map_err(|_| BackendConfigError::OutOfRange {
                    key: key.to_string(),
                    value,
                })
            })
            .transpose()
    }

    /// The option as it was written, also for values which look like integers.
    ///
    /// Serial numbers consisting only of digits are parsed as integers, this returns
    /// them unchanged.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(|entry| entry.raw.as_str())
    }

    /// A boolean option. Missing options are `false`.
    pub fn flag(&self, key: &str) -> Result<bool, BackendConfigError> {
        match self.get(key) {
            None => Ok(false),
            Some(OptionValue::Integer(value)) => Ok(*value != 0),
            Some(OptionValue::Text(text)) => match text.to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" => Ok(true),
                "false" | "no" | "off" => Ok(false),
                _ => Err(BackendConfigError::WrongType {
                    key: key.to_string(),
                    expected: "a boolean",
                }),
            },
        }
    }
}

impl std::str::FromStr for BackendConfig {
    type Err = BackendConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(BackendConfigError::MissingName);
        }

        let mut name = None;
        let mut options = BTreeMap::new();

        for (position, token) in s.split(':').map(str::trim).enumerate() {
            match token.split_once('=') {
                None if position == 0 && !token.is_empty() => name = Some(token.to_string()),
                None => return Err(BackendConfigError::InvalidOption(token.to_string())),
                Some((key, value)) if key.is_empty() || value.is_empty() => {
                    return Err(BackendConfigError::InvalidOption(token.to_string()))
                }
                Some(("name", value)) => {
                    if name.replace(value.to_string()).is_some() {
                        return Err(BackendConfigError::DuplicateName);
                    }
                }
                Some((key, value)) => {
                    let entry = Entry {
                        raw: value.to_string(),
                        value: OptionValue::parse(value),
                    };
                    // Later options override earlier ones.
                    options.insert(key.to_string(), entry);
                }
            }
        }

        let name = name.ok_or(BackendConfigError::MissingName)?;

        Ok(BackendConfig { name, options })
    }
}

impl fmt::Display for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for (key, entry) in &self.options {
            write!(f, ":{key}={}", entry.raw)?;
        }
        Ok(())
    }
}
