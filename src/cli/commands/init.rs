//! `init` command.

use crate::config::Settings;

/// Write `.watchcopy/settings.toml` with defaults and a commented example.
pub fn run_init(force: bool) {
    let path = match Settings::init_config_file(force) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    println!("Created {}", path.display());
    println!("Add a [[mirrors]] table with `from` and `to`, then run `watchcopy watch`.");
}
