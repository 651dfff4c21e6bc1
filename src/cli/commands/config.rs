//! `config` command: active settings plus the mirror pairs they yield.

use std::fmt::Write;
use std::path::Path;

use crate::config::Settings;
use crate::mapping::{MappingError, configs_from_properties};

/// Render the settings file view and the resolved `[[mirrors]]` pairs.
///
/// Incomplete pairs are shown with the same message `watch` would fail with.
pub fn render(settings: &Settings, loaded_from: Option<&Path>) -> String {
    let mut out = String::new();

    match loaded_from {
        Some(path) if path.exists() => {
            let _ = writeln!(out, "Settings: {}", path.display());
        }
        _ => out.push_str("Settings: defaults (no settings.toml found)\n"),
    }
    out.push('\n');

    match toml::to_string_pretty(settings) {
        Ok(toml_str) => out.push_str(&toml_str),
        Err(e) => {
            let _ = writeln!(out, "(cannot render settings: {e})");
        }
    }

    out.push_str("\nMirrors:\n");
    let prefix = &settings.watch.property_prefix;
    match configs_from_properties(prefix, &settings.properties()) {
        Ok(configs) => {
            for (index, config) in configs.iter().enumerate() {
                let _ = writeln!(out, "  [{index}] {config}");
            }
        }
        Err(MappingError::NoPairs { .. }) => {
            out.push_str("  (none configured; pass --from/--to or -D defines to `watch`)\n");
        }
        Err(e) => {
            let _ = writeln!(out, "  invalid: {e}");
        }
    }

    out
}

pub fn run_config(settings: &Settings, loaded_from: Option<&Path>) {
    print!("{}", render(settings, loaded_from));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MirrorSettings;

    fn mirror(from: Option<&str>, to: Option<&str>) -> MirrorSettings {
        MirrorSettings {
            from: from.map(str::to_string),
            to: to.map(str::to_string),
        }
    }

    #[test]
    fn test_lists_resolved_pairs() {
        let mut settings = Settings::default();
        settings.mirrors = vec![mirror(Some("/a"), Some("/b")), mirror(Some("/c"), Some("/d"))];

        let out = render(&settings, None);

        assert!(out.contains("Settings: defaults"));
        assert!(out.contains("[0] /a -> /b"));
        assert!(out.contains("[1] /c -> /d"));
    }

    #[test]
    fn test_reports_incomplete_pair() {
        let mut settings = Settings::default();
        settings.mirrors = vec![mirror(Some("/a"), None)];

        let out = render(&settings, None);
        assert!(out.contains("invalid: need param -Dwatchcopy.to[0]=value"));
    }

    #[test]
    fn test_no_pairs_is_not_an_error() {
        let out = render(&Settings::default(), None);
        assert!(out.contains("(none configured"));
        assert!(!out.contains("invalid:"));
    }
}
