use termboard::logging;

#[test]
fn init_writes_to_file_and_tolerates_second_call() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("board.log"), "stale").unwrap();
    let guard = logging::init(dir.path(), "board.log");
    assert!(guard.is_some());
    assert!(logging::init(dir.path(), "other.log").is_none());
    logging::install_panic_hook();
    logging::install_panic_hook();
    tracing::warn!(target: "config", "logging_smoke");
    drop(guard);
    let log = std::fs::read_to_string(dir.path().join("board.log")).unwrap();
    assert!(!log.contains("stale"));
}
