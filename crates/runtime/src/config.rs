//! Config and debug strings supplied at session creation.
//!
//! Config strings are `key=value` entries separated by commas or whitespace,
//! e.g. `"NvI2cPorts=2, NvI2cDevice=0:0x50"`. Keys may repeat. Debug strings
//! name a default level, optionally followed by per-subsystem overrides:
//! `"info,I2C=trace"`.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Parsed config string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
	entries: Vec<(String, String)>,
}

impl Config {
	/// Parses a config string; `None` and the empty string give an empty config.
	pub fn parse(input: Option<&str>) -> Result<Self> {
		let mut entries = Vec::new();
		for token in input.unwrap_or_default().split(|c: char| c == ',' || c.is_whitespace()) {
			if token.is_empty() {
				continue;
			}
			let Some((key, value)) = token.split_once('=') else {
				return Err(Error::Configuration(format!("config entry '{token}' is not key=value")));
			};
			if key.is_empty() {
				return Err(Error::Configuration(format!("config entry '{token}' has an empty key")));
			}
			entries.push((key.to_string(), value.to_string()));
		}
		Ok(Self { entries })
	}

	/// Last value given for `key`.
	pub fn get(&self, key: &str) -> Option<&str> {
		self.entries
			.iter()
			.rev()
			.find(|(k, _)| k == key)
			.map(|(_, v)| v.as_str())
	}

	/// Every value given for `key`, in order.
	pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
		self.entries
			.iter()
			.filter(move |(k, _)| k == key)
			.map(|(_, v)| v.as_str())
	}

	/// Last value for `key` parsed as a decimal or `0x` hex number.
	pub fn get_number(&self, key: &str) -> Result<Option<u64>> {
		match self.get(key) {
			None => Ok(None),
			Some(value) => parse_number(value)
				.map(Some)
				.ok_or_else(|| Error::Configuration(format!("{key}={value} is not a number"))),
		}
	}

	/// Keys present in the config, in order of first appearance.
	pub fn keys(&self) -> Vec<&str> {
		let mut keys: Vec<&str> = Vec::new();
		for (key, _) in &self.entries {
			if !keys.contains(&key.as_str()) {
				keys.push(key.as_str());
			}
		}
		keys
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

/// Parses a decimal, `0x` hex or `0` octal number the way C's `strtoull(.., 0)` would.
pub fn parse_number(input: &str) -> Option<u64> {
	let input = input.trim();
	if let Some(hex) = input.strip_prefix("0x").or_else(|| input.strip_prefix("0X")) {
		u64::from_str_radix(hex, 16).ok()
	} else if input.len() > 1 && input.starts_with('0') {
		u64::from_str_radix(&input[1..], 8).ok()
	} else {
		input.parse().ok()
	}
}

/// Verbosity of a session or subsystem, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum DebugLevel {
	Fatal,
	#[default]
	Error,
	Warn,
	Info,
	Debug,
	Trace,
	Paranoia,
	Spam,
}

impl DebugLevel {
	const NAMES: [(&'static str, DebugLevel); 8] = [
		("fatal", DebugLevel::Fatal),
		("error", DebugLevel::Error),
		("warn", DebugLevel::Warn),
		("info", DebugLevel::Info),
		("debug", DebugLevel::Debug),
		("trace", DebugLevel::Trace),
		("paranoia", DebugLevel::Paranoia),
		("spam", DebugLevel::Spam),
	];

	pub fn as_str(self) -> &'static str {
		Self::NAMES
			.iter()
			.find(|(_, level)| *level == self)
			.map(|(name, _)| *name)
			.unwrap_or("error")
	}
}

impl fmt::Display for DebugLevel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for DebugLevel {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		Self::NAMES
			.iter()
			.find(|(name, _)| name.eq_ignore_ascii_case(s))
			.map(|(_, level)| *level)
			.ok_or_else(|| Error::Configuration(format!("unknown debug level '{s}'")))
	}
}

/// Parsed debug string: a default level plus per-subsystem overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugConfig {
	level: DebugLevel,
	overrides: Vec<(String, DebugLevel)>,
}

impl DebugConfig {
	/// Parses a debug string; `None` gives the default `error` level.
	pub fn parse(input: Option<&str>) -> Result<Self> {
		let mut config = Self::default();
		for token in input.unwrap_or_default().split(',').map(str::trim) {
			if token.is_empty() {
				continue;
			}
			match token.split_once('=') {
				Some((subdev, level)) if !subdev.is_empty() => {
					config.overrides.push((subdev.to_ascii_uppercase(), level.parse()?));
				}
				Some(_) => {
					return Err(Error::Configuration(format!("debug entry '{token}' has an empty subsystem")));
				}
				None => config.level = token.parse()?,
			}
		}
		Ok(config)
	}

	/// Default level.
	pub fn level(&self) -> DebugLevel {
		self.level
	}

	/// Level for `subdev`, falling back to the default.
	pub fn level_for(&self, subdev: &str) -> DebugLevel {
		self.overrides
			.iter()
			.rev()
			.find(|(name, _)| name.eq_ignore_ascii_case(subdev))
			.map(|(_, level)| *level)
			.unwrap_or(self.level)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_config_splits_on_commas_and_whitespace() {
		let config = Config::parse(Some("NvI2cPorts=3, NvChipset=0x50\tNvI2cDevice=0:0x50")).unwrap();
		assert_eq!(config.get("NvI2cPorts"), Some("3"));
		assert_eq!(config.get_number("NvChipset").unwrap(), Some(0x50));
		assert_eq!(config.keys(), vec!["NvI2cPorts", "NvChipset", "NvI2cDevice"]);
	}

	#[test]
	fn test_config_repeated_keys_accumulate_and_last_wins() {
		let config = Config::parse(Some("NvI2cDevice=0:0x50,NvI2cDevice=1:0x1c,NvI2cPorts=1,NvI2cPorts=2")).unwrap();
		assert_eq!(config.get_all("NvI2cDevice").collect::<Vec<_>>(), vec!["0:0x50", "1:0x1c"]);
		assert_eq!(config.get("NvI2cPorts"), Some("2"));
	}

	#[test]
	fn test_config_rejects_bare_words() {
		let err = Config::parse(Some("NvI2cPorts")).unwrap_err();
		assert!(matches!(err, Error::Configuration(_)));
		assert!(Config::parse(Some("=1")).is_err());
	}

	#[test]
	fn test_config_empty_inputs() {
		assert!(Config::parse(None).unwrap().is_empty());
		assert!(Config::parse(Some(" , ")).unwrap().is_empty());
	}

	#[test]
	fn test_config_number_errors_name_the_key() {
		let config = Config::parse(Some("NvI2cPorts=lots")).unwrap();
		let err = config.get_number("NvI2cPorts").unwrap_err();
		assert!(err.to_string().contains("NvI2cPorts=lots"));
	}

	#[test]
	fn test_numbers_follow_strtoull_bases() {
		assert_eq!(parse_number("42"), Some(42));
		assert_eq!(parse_number("0x2a"), Some(42));
		assert_eq!(parse_number("052"), Some(42));
		assert_eq!(parse_number("0"), Some(0));
		assert_eq!(parse_number("0x"), None);
		assert_eq!(parse_number("-1"), None);
	}

	#[test]
	fn test_debug_levels_parse_case_insensitively() {
		assert_eq!("TRACE".parse::<DebugLevel>().unwrap(), DebugLevel::Trace);
		assert!("loud".parse::<DebugLevel>().is_err());
		assert!(DebugLevel::Error < DebugLevel::Debug);
	}

	#[test]
	fn test_debug_config_overrides_per_subsystem() {
		let debug = DebugConfig::parse(Some("info,i2c=spam")).unwrap();
		assert_eq!(debug.level(), DebugLevel::Info);
		assert_eq!(debug.level_for("I2C"), DebugLevel::Spam);
		assert_eq!(debug.level_for("VBIOS"), DebugLevel::Info);
	}

	#[test]
	fn test_debug_config_defaults_to_error() {
		assert_eq!(DebugConfig::parse(None).unwrap().level(), DebugLevel::Error);
		assert!(DebugConfig::parse(Some("=debug")).is_err());
		assert!(DebugConfig::parse(Some("I2C=verbose")).is_err());
	}
}
