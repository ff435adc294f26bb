// Installs the global subscriber, so this lives in its own test binary.

use typist::logging::{init_subscriber, Verbosity};

#[test]
fn subscriber_writes_to_the_log_file() {
    std::env::remove_var("TYPIST_LOG");
    std::env::remove_var("RUST_LOG");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("typist.log");

    init_subscriber(Verbosity::Normal, &path).unwrap();
    tracing::info!(target: "typist", "hello from the log test");
    tracing::debug!(target: "typist", "too chatty for info");

    let logged = std::fs::read_to_string(&path).unwrap();
    assert!(logged.contains("hello from the log test"));
    assert!(!logged.contains("too chatty"));

    // a second subscriber can't be installed
    assert!(init_subscriber(Verbosity::Verbose, &path).is_err());
}
