use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::write;
use std::path::Path;
use tempfile::{tempdir, TempDir};

/// Writes a config with a small threshold and a job server that refuses
/// connections, so nothing here can reach a real network service.
fn write_config(dir: &TempDir, threshold: u64) -> std::path::PathBuf {
    let config_path = dir.path().join("size-rotate.yaml");
    let audit_path = dir.path().join("audit.log");
    let yaml = format!(
        "threshold_bytes: {threshold}\n\
         remote_base_url: \"http://127.0.0.1:1\"\n\
         job_name: log-upload\n\
         audit_log: \"{}\"\n\
         request_timeout_secs: 5\n\
         region: us-east-1\n",
        audit_path.display()
    );
    write(&config_path, yaml).expect("Writing temp config failed");
    config_path
}

fn write_log(dir: &TempDir, size: usize) -> std::path::PathBuf {
    let path = dir.path().join("app.log");
    write(&path, vec![b'a'; size]).expect("Writing temp log failed");
    path
}

fn size_rotate() -> Command {
    let mut cmd = Command::cargo_bin("size-rotate").expect("Binary exists");
    cmd.env_remove("JENKINS_URL")
        .env_remove("LOG_PATH")
        .env_remove("S3_BUCKET");
    cmd
}

#[test]
fn check_below_threshold_exits_zero() {
    let dir = tempdir().unwrap();
    let config = write_config(&dir, 1024);
    let log = write_log(&dir, 1023);

    size_rotate()
        .arg("check")
        .arg(&log)
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Below threshold"));

    let audit = std::fs::read_to_string(dir.path().join("audit.log")).unwrap();
    assert!(audit.contains("INFO: Below threshold"));
    assert!(!audit.contains("crumb"), "no request may be made below threshold");
}

#[test]
fn check_missing_file_exits_one() {
    let dir = tempdir().unwrap();
    let config = write_config(&dir, 1024);

    size_rotate()
        .arg("check")
        .arg(dir.path().join("nope.log"))
        .arg("--config")
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn check_with_unreachable_job_server_exits_two() {
    let dir = tempdir().unwrap();
    let config = write_config(&dir, 1024);
    let log = write_log(&dir, 1024);

    size_rotate()
        .arg("check")
        .arg(&log)
        .arg("--config")
        .arg(&config)
        .env("JENKINS_USER", "ci")
        .env("JENKINS_API_TOKEN", "token")
        .assert()
        .code(2);

    let audit = std::fs::read_to_string(dir.path().join("audit.log")).unwrap();
    assert!(audit.contains("ERROR: Crumb issuer unreachable"));
}

#[test]
fn unparsable_config_exits_with_config_code() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("broken.yaml");
    write(&config, b"threshold_bytes: [:::").unwrap();

    size_rotate()
        .arg("check")
        .arg("--config")
        .arg(&config)
        .assert()
        .code(78)
        .stderr(predicate::str::contains("parse"));
}

#[test]
fn upload_of_missing_file_exits_one_before_contacting_store() {
    let dir = tempdir().unwrap();
    let config = write_config(&dir, 1024);
    let missing = dir.path().join("rotated.log");

    size_rotate()
        .arg("upload")
        .arg("--config")
        .arg(&config)
        .env("LOG_PATH", &missing)
        .env("S3_BUCKET", "archive-test")
        .assert()
        .code(1);

    assert!(!Path::new(&missing).exists());
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::Context, Layer, Registry};
use tracing_subscriber::prelude::*;

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(format!("{:?}", event));
    }
}

#[tokio::test]
async fn run_surfaces_not_found_as_rotate_error() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use size_rotate::cli::{run, Cli, Commands};
    use size_rotate_core::RotateError;

    let dir = tempdir().unwrap();
    let config = write_config(&dir, 1024);
    let cli = Cli {
        command: Commands::Check {
            log_path: Some(dir.path().join("absent.log")),
            config: Some(config),
        },
    };

    let err = run(cli).await.unwrap_err();
    let rotate = err
        .downcast_ref::<RotateError>()
        .expect("error should carry a RotateError");
    assert_eq!(rotate.exit_code(), 1);

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}
