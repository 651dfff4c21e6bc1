//! Source → destination pairs from indexed properties.
//!
//! Pairs are given as `<prefix>.from[i]` / `<prefix>.to[i]` with indices
//! counting up from zero. The settings file, `-D` defines and the
//! `--from/--to` flags all end up here, so validation and its messages are
//! the same whichever way a pair was supplied.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::types::WatchConfig;

/// Prefix used when none is configured.
pub const DEFAULT_PREFIX: &str = "watchcopy";

/// Fatal configuration errors. The messages name the define that is missing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    #[error("need params -D{prefix}.from[0]=value -D{prefix}.to[0]=value")]
    NoPairs { prefix: String },

    #[error("need param -D{key}=value")]
    MissingParam { key: String },

    #[error("invalid define '{0}', expected key=value")]
    InvalidDefine(String),
}

/// Flat key → value property set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    values: BTreeMap<String, String>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Add a `key=value` define.
    pub fn define(&mut self, define: &str) -> Result<(), MappingError> {
        let (key, value) = parse_define(define)?;
        self.insert(key, value);
        Ok(())
    }

    /// Append a pair at the first index where neither half is set.
    ///
    /// A missing half is left unset so validation reports it. A pair with
    /// neither half still takes its index, as an empty `from`.
    pub fn push_pair(&mut self, prefix: &str, from: Option<&str>, to: Option<&str>) {
        let index = (0..)
            .find(|i| {
                self.get(&from_key(prefix, *i)).is_none() && self.get(&to_key(prefix, *i)).is_none()
            })
            .unwrap_or_default();

        if from.is_none() && to.is_none() {
            self.insert(from_key(prefix, index), "");
        }
        if let Some(from) = from {
            self.insert(from_key(prefix, index), from);
        }
        if let Some(to) = to {
            self.insert(to_key(prefix, index), to);
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut properties = Properties::new();
        for (key, value) in iter {
            properties.insert(key, value);
        }
        properties
    }
}

/// Split `key=value`. The value may be empty; the key may not.
pub fn parse_define(define: &str) -> Result<(String, String), MappingError> {
    let define = define.strip_prefix("-D").unwrap_or(define);
    match define.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(MappingError::InvalidDefine(define.to_string())),
    }
}

fn from_key(prefix: &str, index: usize) -> String {
    format!("{prefix}.from[{index}]")
}

fn to_key(prefix: &str, index: usize) -> String {
    format!("{prefix}.to[{index}]")
}

/// Read every indexed pair under `prefix`.
///
/// Reading stops at the first index where neither `from` nor `to` is
/// present. An index with only one half, or an empty value, is an error.
pub fn configs_from_properties(
    prefix: &str,
    properties: &Properties,
) -> Result<Vec<WatchConfig>, MappingError> {
    let mut configs = Vec::new();

    for index in 0.. {
        let from_name = from_key(prefix, index);
        let to_name = to_key(prefix, index);
        let from = properties.get(&from_name);
        let to = properties.get(&to_name);

        if from.is_none() && to.is_none() {
            break;
        }

        let from = non_empty(from).ok_or(MappingError::MissingParam { key: from_name })?;
        let to = non_empty(to).ok_or(MappingError::MissingParam { key: to_name })?;
        configs.push(WatchConfig::new(from, to));
    }

    if configs.is_empty() {
        return Err(MappingError::NoPairs {
            prefix: prefix.to_string(),
        });
    }

    Ok(configs)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn by_from<'a>(configs: &'a [WatchConfig], from: &str) -> Option<&'a WatchConfig> {
        configs.iter().find(|c| c.source == PathBuf::from(from))
    }

    #[test]
    fn test_two_pairs() {
        let properties: Properties = [
            ("watchcopy.from[0]", "/tmp/from1"),
            ("watchcopy.to[0]", "/tmp/to1"),
            ("watchcopy.from[1]", "/tmp/from2"),
            ("watchcopy.to[1]", "/tmp/to2"),
        ]
        .into_iter()
        .collect();

        let configs = configs_from_properties("watchcopy", &properties).unwrap();

        assert_eq!(configs.len(), 2);
        assert_eq!(
            by_from(&configs, "/tmp/from1").unwrap().destination,
            PathBuf::from("/tmp/to1")
        );
        assert_eq!(
            by_from(&configs, "/tmp/from2").unwrap().destination,
            PathBuf::from("/tmp/to2")
        );
    }

    #[test]
    fn test_empty_properties() {
        let err = configs_from_properties("watchcopy", &Properties::new()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "need params -Dwatchcopy.from[0]=value -Dwatchcopy.to[0]=value"
        );
    }

    #[test]
    fn test_incomplete_pair() {
        let properties: Properties = [("watchcopy.from[0]", "/tmp/from1")].into_iter().collect();

        let err = configs_from_properties("watchcopy", &properties).unwrap_err();
        assert_eq!(err.to_string(), "need param -Dwatchcopy.to[0]=value");
    }

    #[test]
    fn test_empty_value() {
        let properties: Properties = [("watchcopy.from[0]", ""), ("watchcopy.from[1]", "")]
            .into_iter()
            .collect();

        let err = configs_from_properties("watchcopy", &properties).unwrap_err();
        assert_eq!(err.to_string(), "need param -Dwatchcopy.from[0]=value");
    }

    #[test]
    fn test_gap_ends_the_list() {
        let properties: Properties = [
            ("watchcopy.from[0]", "/a"),
            ("watchcopy.to[0]", "/b"),
            ("watchcopy.from[2]", "/c"),
            ("watchcopy.to[2]", "/d"),
        ]
        .into_iter()
        .collect();

        let configs = configs_from_properties("watchcopy", &properties).unwrap();
        assert_eq!(configs.len(), 1);
    }

    #[test]
    fn test_other_prefix_ignored() {
        let properties: Properties = [("other.from[0]", "/a"), ("other.to[0]", "/b")]
            .into_iter()
            .collect();

        assert!(matches!(
            configs_from_properties("watchcopy", &properties),
            Err(MappingError::NoPairs { .. })
        ));
        assert_eq!(configs_from_properties("other", &properties).unwrap().len(), 1);
    }

    #[test]
    fn test_define_parsing() {
        assert_eq!(
            parse_define("-Dwatchcopy.from[0]=/tmp/a=b").unwrap(),
            ("watchcopy.from[0]".to_string(), "/tmp/a=b".to_string())
        );
        assert_eq!(
            parse_define("watchcopy.to[0]=").unwrap(),
            ("watchcopy.to[0]".to_string(), String::new())
        );
        assert!(parse_define("novalue").is_err());
        assert!(parse_define("=value").is_err());
    }

    #[test]
    fn test_push_pair_appends_after_existing() {
        let mut properties = Properties::new();
        properties.define("watchcopy.from[0]=/a").unwrap();
        properties.define("watchcopy.to[0]=/b").unwrap();

        properties.push_pair("watchcopy", Some("/c"), Some("/d"));
        properties.push_pair("watchcopy", Some("/e"), None);

        assert_eq!(properties.get("watchcopy.from[1]"), Some("/c"));
        assert_eq!(properties.get("watchcopy.to[1]"), Some("/d"));
        assert_eq!(properties.get("watchcopy.from[2]"), Some("/e"));
        assert_eq!(
            configs_from_properties("watchcopy", &properties)
                .unwrap_err()
                .to_string(),
            "need param -Dwatchcopy.to[2]=value"
        );
    }

    #[test]
    fn test_push_pair_without_halves_keeps_its_index() {
        let mut properties = Properties::new();
        properties.push_pair("watchcopy", None, None);
        properties.push_pair("watchcopy", Some("/a"), Some("/b"));

        assert_eq!(properties.get("watchcopy.from[0]"), Some(""));
        assert_eq!(properties.get("watchcopy.from[1]"), Some("/a"));
        assert_eq!(
            configs_from_properties("watchcopy", &properties)
                .unwrap_err()
                .to_string(),
            "need param -Dwatchcopy.from[0]=value"
        );
    }
}
