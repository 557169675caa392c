use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::write;
use tempfile::NamedTempFile;

#[test]
fn help_lists_every_command() {
    let mut cmd = Command::cargo_bin("agencyiq").expect("Binary exists");
    cmd.arg("--help");
    cmd.assert().success().stdout(
        predicate::str::contains("calendar")
            .and(predicate::str::contains("quota"))
            .and(predicate::str::contains("generate"))
            .and(predicate::str::contains("approve"))
            .and(predicate::str::contains("edit"))
            .and(predicate::str::contains("video"))
            .and(predicate::str::contains("publish")),
    );
}

#[test]
fn missing_session_cookie_fails_before_any_request() {
    let config = NamedTempFile::new().expect("Creating temp config file failed");
    write(config.path(), b"api:\n  base_url: \"http://127.0.0.1:9\"\n")
        .expect("Writing temp config failed");

    let mut cmd = Command::cargo_bin("agencyiq").expect("Binary exists");
    cmd.arg("quota")
        .arg("--config")
        .arg(config.path())
        .env_remove("AGENCYIQ_SESSION_COOKIE")
        .current_dir(std::env::temp_dir());

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("AGENCYIQ_SESSION_COOKIE"));
}

#[test]
fn unknown_platform_is_rejected_by_the_parser() {
    let mut cmd = Command::cargo_bin("agencyiq").expect("Binary exists");
    cmd.args(["generate", "--platform", "myspace"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("myspace"));
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*; // needed for .with()
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        use std::fmt::Write as FmtWrite;
        let mut msg = String::new();
        let _ = write!(&mut msg, "{:?}", event);
        self.events.lock().unwrap().push(msg);
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use agencyiq::cli::{run, Cli, Commands};

    // A dummy path: loading fails, but the first event is already out.
    let cli = Cli {
        config: std::path::PathBuf::from("dummy.yaml"),
        command: Commands::Quota,
    };

    let result = run(cli).await;
    assert!(result.is_err());

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}
