//! Watch command.

use std::time::Duration;

use anyhow::Context;

use crate::cli::args::WatchArgs;
use crate::config::Settings;
use crate::mapping::{MappingError, Properties, configs_from_properties};
use crate::types::WatchConfig;
use crate::watcher::{StopHandle, WatchCopy};

/// Merge pairs from settings, `-D` defines and `--from/--to`, in that order.
///
/// Defines overwrite settings entries with the same key; flag pairs are
/// appended after everything else.
pub fn collect_properties(args: &WatchArgs, settings: &Settings) -> Result<Properties, MappingError> {
    let prefix = &settings.watch.property_prefix;
    let mut properties = settings.properties();

    for define in &args.defines {
        properties.define(define)?;
    }

    for index in 0..args.from.len().max(args.to.len()) {
        properties.push_pair(
            prefix,
            args.from.get(index).map(String::as_str),
            args.to.get(index).map(String::as_str),
        );
    }

    Ok(properties)
}

/// Resolve every configured pair, or print the reason and exit.
pub fn resolve_configs(args: &WatchArgs, settings: &Settings) -> Vec<WatchConfig> {
    let prefix = &settings.watch.property_prefix;
    match collect_properties(args, settings)
        .and_then(|properties| configs_from_properties(prefix, &properties))
    {
        Ok(configs) => configs,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!(
                "Usage: watchcopy watch -D{prefix}.from[0]=<yourBuildDirectory> -D{prefix}.to[0]=<yourTargetDirectory>"
            );
            std::process::exit(1);
        }
    }
}

/// Run watch command until Ctrl+C or until the loop ends on its own.
pub async fn run_watch(args: WatchArgs, settings: &Settings) -> anyhow::Result<()> {
    let configs = resolve_configs(&args, settings);

    let poll_timeout = args
        .poll_timeout
        .map(|secs| Duration::from_secs(secs.max(1)))
        .unwrap_or_else(|| settings.watch.poll_timeout());
    let sync_new_directories = settings.watch.sync_new_directories && !args.no_sync;

    let mut watch_copy = WatchCopy::builder()
        .configs(configs)
        .poll_timeout(poll_timeout)
        .sync_new_directories(sync_new_directories)
        .build()
        .context("Failed to set up watches")?;

    for config in watch_copy.configs() {
        eprintln!("Mirroring {config}");
    }
    eprintln!(
        "Watching {} directories. Press Ctrl+C to stop.",
        watch_copy.initially_watched()
    );

    watch_copy.start(true).context("Failed to start watch loop")?;

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl+C")?;
            eprintln!("Received shutdown signal");
        }
        _ = worker_finished(watch_copy.stop_handle()) => {
            eprintln!("Watch loop ended");
        }
    }

    watch_copy.stop();
    watch_copy.join().context("Watch loop failed")?;
    Ok(())
}

async fn worker_finished(handle: StopHandle) {
    while handle.is_active() {
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MirrorSettings;

    fn args(from: &[&str], to: &[&str], defines: &[&str]) -> WatchArgs {
        WatchArgs {
            from: from.iter().map(|s| s.to_string()).collect(),
            to: to.iter().map(|s| s.to_string()).collect(),
            defines: defines.iter().map(|s| s.to_string()).collect(),
            ..WatchArgs::default()
        }
    }

    #[test]
    fn test_flags_append_after_settings() {
        let mut settings = Settings::default();
        settings.mirrors.push(MirrorSettings {
            from: Some("/s".to_string()),
            to: Some("/t".to_string()),
        });

        let properties = collect_properties(&args(&["/a"], &["/b"], &[]), &settings).unwrap();
        let configs = configs_from_properties("watchcopy", &properties).unwrap();

        assert_eq!(configs.len(), 2);
        assert_eq!(configs[0], WatchConfig::new("/s", "/t"));
        assert_eq!(configs[1], WatchConfig::new("/a", "/b"));
    }

    #[test]
    fn test_define_overrides_settings() {
        let mut settings = Settings::default();
        settings.mirrors.push(MirrorSettings {
            from: Some("/s".to_string()),
            to: Some("/t".to_string()),
        });

        let properties = collect_properties(
            &args(&[], &[], &["-Dwatchcopy.to[0]=/elsewhere"]),
            &settings,
        )
        .unwrap();
        let configs = configs_from_properties("watchcopy", &properties).unwrap();

        assert_eq!(configs, vec![WatchConfig::new("/s", "/elsewhere")]);
    }

    #[test]
    fn test_unpaired_flag_reports_missing_half() {
        let properties =
            collect_properties(&args(&["/a", "/c"], &["/b"], &[]), &Settings::default()).unwrap();

        assert_eq!(
            configs_from_properties("watchcopy", &properties)
                .unwrap_err()
                .to_string(),
            "need param -Dwatchcopy.to[1]=value"
        );
    }

    #[test]
    fn test_malformed_define() {
        let err = collect_properties(&args(&[], &[], &["nonsense"]), &Settings::default())
            .unwrap_err();
        assert!(matches!(err, MappingError::InvalidDefine(_)));
    }
}
