//! End-to-end tests against the real OS notification backend.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempDir;
use watchcopy::{
    ChangeEvent, ChangeHandler, ChangeKind, WatchConfig, WatchCopy, WatchError, WatchHandle,
};

type Seen = Arc<Mutex<Vec<(WatchHandle, ChangeEvent, WatchConfig)>>>;

struct RecordingHandler {
    seen: Seen,
}

impl ChangeHandler for RecordingHandler {
    fn name(&self) -> &str {
        "recording"
    }

    fn handle(
        &mut self,
        handle: WatchHandle,
        event: &ChangeEvent,
        config: &WatchConfig,
    ) -> Result<(), WatchError> {
        self.seen
            .lock()
            .unwrap()
            .push((handle, event.clone(), config.clone()));
        Ok(())
    }
}

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(25));
    }
    condition()
}

fn source_tree(temp_dir: &TempDir) -> (PathBuf, PathBuf) {
    let source = temp_dir.path().join("src");
    let destination = temp_dir.path().join("dst");
    fs::create_dir_all(&source).unwrap();
    (source.canonicalize().unwrap(), destination)
}

fn saw(seen: &Seen, kind: ChangeKind, path: &Path) -> Option<(WatchHandle, ChangeEvent, WatchConfig)> {
    seen.lock()
        .unwrap()
        .iter()
        .find(|(_, event, _)| event.kind == kind && event.path() == path)
        .cloned()
}

#[test]
fn test_events_routed_to_owning_config() {
    let temp_dir = TempDir::new().unwrap();
    let (source, destination) = source_tree(&temp_dir);
    let seen = Seen::default();

    let mut watch_copy = WatchCopy::builder()
        .config(WatchConfig::new(&source, &destination))
        .handler(RecordingHandler { seen: seen.clone() })
        .poll_timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    let config = watch_copy.configs()[0].as_ref().clone();
    watch_copy.start(true).unwrap();

    fs::write(source.join("a.txt"), "hello").unwrap();
    assert!(wait_until(|| saw(&seen, ChangeKind::Created, &source.join("a.txt")).is_some()));
    let (root_handle, event, routed) = saw(&seen, ChangeKind::Created, &source.join("a.txt")).unwrap();
    assert_eq!(event.watched_directory, source);
    assert_eq!(routed, config);

    // A directory created after start is watched too
    fs::create_dir(source.join("sub")).unwrap();
    fs::write(source.join("sub/b.txt"), "nested").unwrap();
    let nested = source.join("sub/b.txt");
    assert!(wait_until(|| saw(&seen, ChangeKind::Created, &nested).is_some()));
    let (sub_handle, event, routed) = saw(&seen, ChangeKind::Created, &nested).unwrap();
    assert_eq!(event.watched_directory, source.join("sub"));
    assert_ne!(sub_handle, root_handle);
    assert_eq!(routed, config);

    // Files written later in the new directory arrive through its own watch
    fs::write(source.join("sub/c.txt"), "later").unwrap();
    assert!(wait_until(|| saw(&seen, ChangeKind::Created, &source.join("sub/c.txt")).is_some()));

    watch_copy.stop();
    watch_copy.join().unwrap();
    assert!(!watch_copy.is_active());
}

#[test]
fn test_copy_handler_mirrors_tree() {
    let temp_dir = TempDir::new().unwrap();
    let (source, destination) = source_tree(&temp_dir);
    fs::create_dir_all(source.join("existing")).unwrap();

    let mut watch_copy = WatchCopy::builder()
        .config(WatchConfig::new(&source, &destination))
        .poll_timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    assert_eq!(watch_copy.initially_watched(), 2);
    watch_copy.start(true).unwrap();

    fs::write(source.join("existing/one.txt"), "1").unwrap();
    let mirrored = destination.join("existing/one.txt");
    assert!(wait_until(|| fs::read_to_string(&mirrored).ok().as_deref() == Some("1")));

    fs::create_dir_all(source.join("fresh/deeper")).unwrap();
    fs::write(source.join("fresh/deeper/two.txt"), "2").unwrap();
    let mirrored_deep = destination.join("fresh/deeper/two.txt");
    assert!(wait_until(|| fs::read_to_string(&mirrored_deep).ok().as_deref() == Some("2")));

    fs::write(source.join("existing/one.txt"), "changed").unwrap();
    assert!(wait_until(|| {
        fs::read_to_string(&mirrored).ok().as_deref() == Some("changed")
    }));

    fs::remove_file(source.join("existing/one.txt")).unwrap();
    assert!(wait_until(|| !mirrored.exists()));

    watch_copy.stop();
    watch_copy.join().unwrap();
}

#[test]
fn test_deleted_directory_does_not_stop_loop() {
    let temp_dir = TempDir::new().unwrap();
    let (source, destination) = source_tree(&temp_dir);
    fs::create_dir_all(source.join("doomed/inner")).unwrap();

    let mut watch_copy = WatchCopy::builder()
        .config(WatchConfig::new(&source, &destination))
        .poll_timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    assert_eq!(watch_copy.initially_watched(), 3);
    watch_copy.start(true).unwrap();

    fs::remove_dir_all(source.join("doomed")).unwrap();
    // Still mirroring afterwards
    fs::write(source.join("after.txt"), "alive").unwrap();
    let mirrored = destination.join("after.txt");
    assert!(wait_until(|| fs::read_to_string(&mirrored).ok().as_deref() == Some("alive")));
    assert!(watch_copy.is_active());

    watch_copy.stop();
    watch_copy.join().unwrap();
}

#[test]
fn test_two_configs_stay_separate() {
    let temp_dir = TempDir::new().unwrap();
    let first = temp_dir.path().join("first");
    let second = temp_dir.path().join("second");
    fs::create_dir_all(&first).unwrap();
    fs::create_dir_all(&second).unwrap();
    let seen = Seen::default();

    let mut watch_copy = WatchCopy::builder()
        .config(WatchConfig::new(&first, temp_dir.path().join("out1")))
        .config(WatchConfig::new(&second, temp_dir.path().join("out2")))
        .handler(RecordingHandler { seen: seen.clone() })
        .poll_timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    let configs: Vec<WatchConfig> = watch_copy
        .configs()
        .iter()
        .map(|config| config.as_ref().clone())
        .collect();
    watch_copy.start(true).unwrap();

    let second_file = configs[1].source.join("x.txt");
    fs::write(&second_file, "x").unwrap();
    assert!(wait_until(|| saw(&seen, ChangeKind::Created, &second_file).is_some()));
    let (_, _, routed) = saw(&seen, ChangeKind::Created, &second_file).unwrap();
    assert_eq!(routed, configs[1]);

    watch_copy.stop();
    watch_copy.join().unwrap();
}
