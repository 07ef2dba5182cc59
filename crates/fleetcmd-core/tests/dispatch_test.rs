#![allow(clippy::unwrap_used)]

// Engine tests against an in-memory device fleet.
//
// `StubConnector` scripts per-device outcomes and records when each unit
// starts and finishes on one monotonic counter, so batch barriers and
// concurrency bounds can be asserted without touching the network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fleetcmd_core::{
    Credentials, DeviceDirectory, DeviceSession, DispatchConfig, Dispatcher, ExecutionResult,
    FailureKind, FileSink, Payload, ResultSink, Scheduling, SessionConnector, SessionFailure,
};
use pretty_assertions::assert_eq;
use secrecy::SecretString;

// ── Stub fleet ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum Script {
    Timeout,
    AuthRejected,
    CommandFails,
    Panics,
}

#[derive(Debug, Default)]
struct Probe {
    clock: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    opened: AtomicUsize,
    closed: AtomicUsize,
    /// (device, start tick, finish tick) per completed session.
    spans: Mutex<Vec<(String, usize, usize)>>,
}

impl Probe {
    fn tick(&self) -> usize {
        self.clock.fetch_add(1, Ordering::SeqCst)
    }

    fn enter(&self) -> usize {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.tick()
    }

    fn leave(&self, device: &str, started: usize) {
        let finished = self.tick();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.spans
            .lock()
            .unwrap()
            .push((device.to_owned(), started, finished));
    }

    fn span_of(&self, device: &str) -> (usize, usize) {
        let spans = self.spans.lock().unwrap();
        let (_, start, finish) = spans.iter().find(|(d, _, _)| d == device).unwrap();
        (*start, *finish)
    }
}

struct StubConnector {
    scripts: HashMap<String, Script>,
    probe: Arc<Probe>,
    delay: Duration,
}

impl StubConnector {
    fn new(probe: Arc<Probe>) -> Self {
        Self {
            scripts: HashMap::new(),
            probe,
            delay: Duration::from_millis(10),
        }
    }

    fn script(mut self, device: &str, script: Script) -> Self {
        self.scripts.insert(device.to_owned(), script);
        self
    }
}

impl SessionConnector for StubConnector {
    type Session = StubSession;

    async fn open(
        &self,
        address: &str,
        credentials: &Credentials,
    ) -> Result<StubSession, SessionFailure> {
        let started = self.probe.enter();
        tokio::time::sleep(self.delay).await;

        match self.scripts.get(address) {
            Some(Script::Timeout) => {
                self.probe.leave(address, started);
                Err(SessionFailure::timeout(format!("{address} did not answer")))
            }
            Some(Script::AuthRejected) => {
                self.probe.leave(address, started);
                Err(SessionFailure::auth_rejected(format!(
                    "Authentication failed for {}@{address}",
                    credentials.username
                )))
            }
            script => {
                self.probe.opened.fetch_add(1, Ordering::SeqCst);
                Ok(StubSession {
                    device: address.to_owned(),
                    script: script.copied(),
                    probe: Arc::clone(&self.probe),
                    started,
                    delay: self.delay,
                })
            }
        }
    }
}

struct StubSession {
    device: String,
    script: Option<Script>,
    probe: Arc<Probe>,
    started: usize,
    delay: Duration,
}

fn hostname_for(device: &str) -> String {
    format!("sw-{}", device.replace('.', "-"))
}

impl DeviceSession for StubSession {
    async fn resolve_identity(&mut self) -> Result<String, SessionFailure> {
        Ok(format!("{}#", hostname_for(&self.device)))
    }

    async fn run_command(&mut self, command: &str) -> Result<String, SessionFailure> {
        tokio::time::sleep(self.delay).await;
        match self.script {
            Some(Script::CommandFails) => Err(SessionFailure::session("channel closed")),
            Some(Script::Panics) => panic!("stub exploded on {}", self.device),
            _ => Ok(format!("{command} on {}", self.device)),
        }
    }

    async fn run_configuration(&mut self, lines: &[String]) -> Result<String, SessionFailure> {
        tokio::time::sleep(self.delay).await;
        Ok(lines.join("\n"))
    }

    async fn close(&mut self) {
        self.probe.closed.fetch_add(1, Ordering::SeqCst);
        self.probe.leave(&self.device, self.started);
    }
}

#[derive(Default)]
struct CollectingSink {
    results: Mutex<Vec<ExecutionResult>>,
}

impl CollectingSink {
    fn take(&self) -> Vec<ExecutionResult> {
        std::mem::take(&mut *self.results.lock().unwrap())
    }
}

impl ResultSink for CollectingSink {
    async fn record(&self, result: &ExecutionResult) {
        self.results.lock().unwrap().push(result.clone());
    }
}

/// In-memory log writer for a `tracing-subscriber` fmt layer.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn credentials() -> Credentials {
    Credentials::new("netops", SecretString::from("hunter2"))
}

fn fleet(n: usize) -> DeviceDirectory {
    (0..n)
        .map(|i| (format!("10.{}.{}.1", i / 256, i % 256), ""))
        .collect()
}

fn successes(results: &[ExecutionResult]) -> usize {
    results.iter().filter(|r| r.is_success()).count()
}

// ── Scenarios ────────────────────────────────────────────────────────

#[tokio::test]
async fn show_mode_writes_one_artifact_per_device() {
    let dir = tempfile::tempdir().unwrap();
    let probe = Arc::new(Probe::default());
    let directory = DeviceDirectory::parse(b"10.0.0.1;show version\n10.0.0.2;show clock\n").unwrap();

    let dispatcher = Dispatcher::new(
        DispatchConfig::default(),
        StubConnector::new(Arc::clone(&probe)),
        credentials(),
        FileSink::new(dir.path()),
    );
    let batches = dispatcher.plan(&directory).unwrap();
    assert_eq!(batches.len(), 1);

    dispatcher.run(&directory).await.unwrap();

    let first = std::fs::read_to_string(dir.path().join("10.0.0.1_sw-10-0-0-1.txt")).unwrap();
    assert!(first.contains("Hostname  : sw-10-0-0-1"));
    assert!(first.contains("IP        : 10.0.0.1"));
    assert!(first.contains("Command   : show version"));
    assert!(first.contains("show version on 10.0.0.1"));

    let second = std::fs::read_to_string(dir.path().join("10.0.0.2_sw-10-0-0-2.txt")).unwrap();
    assert!(second.contains("Command   : show clock"));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
}

#[tokio::test]
async fn config_mode_sends_the_same_lines_everywhere() {
    let probe = Arc::new(Probe::default());
    let sink = Arc::new(CollectingSink::default());
    let directory = DeviceDirectory::parse(b"10.0.0.1;show version\n10.0.0.2;show clock\n").unwrap();
    let lines = vec!["interface Gi0/1".to_owned(), "shutdown".to_owned()];

    let dispatcher = Dispatcher::new(
        DispatchConfig::config(lines.clone()),
        StubConnector::new(Arc::clone(&probe)),
        credentials(),
        Arc::clone(&sink),
    );
    dispatcher.run(&directory).await.unwrap();

    let results = sink.take();
    assert_eq!(results.len(), 2);
    for result in results {
        let ExecutionResult::Success(success) = result else {
            panic!("expected success, got {result:?}");
        };
        assert_eq!(success.payload, Payload::Configuration(lines.clone()));
        assert_eq!(success.output, "interface Gi0/1\nshutdown");
    }
}

#[tokio::test(start_paused = true)]
async fn batches_are_separated_by_a_barrier() {
    let probe = Arc::new(Probe::default());
    let sink = Arc::new(CollectingSink::default());
    let directory = fleet(250);

    let dispatcher = Dispatcher::new(
        DispatchConfig::default().with_batch_size(100),
        StubConnector::new(Arc::clone(&probe)),
        credentials(),
        Arc::clone(&sink),
    );
    let sizes: Vec<usize> = dispatcher
        .plan(&directory)
        .unwrap()
        .iter()
        .map(fleetcmd_core::Batch::len)
        .collect();
    assert_eq!(sizes, vec![100, 100, 50]);

    dispatcher.run(&directory).await.unwrap();

    assert_eq!(sink.take().len(), 250);
    assert_eq!(probe.peak.load(Ordering::SeqCst), 100);

    // Every unit of batch k finishes before any unit of batch k+1 starts.
    let addresses: Vec<String> = directory.iter().map(|(a, _)| a.to_owned()).collect();
    for pair in addresses.chunks(100).collect::<Vec<_>>().windows(2) {
        let last_finish = pair[0].iter().map(|d| probe.span_of(d).1).max().unwrap();
        let first_start = pair[1].iter().map(|d| probe.span_of(d).0).min().unwrap();
        assert!(
            last_finish < first_start,
            "batch overlap: finish {last_finish} >= start {first_start}"
        );
    }
}

#[tokio::test]
async fn one_rejected_login_does_not_stop_the_batch() {
    let probe = Arc::new(Probe::default());
    let sink = Arc::new(CollectingSink::default());
    let directory: DeviceDirectory = (1..=10).map(|i| (format!("10.0.0.{i}"), "")).collect();

    let connector = StubConnector::new(Arc::clone(&probe)).script("10.0.0.7", Script::AuthRejected);
    let dispatcher = Dispatcher::new(
        DispatchConfig::default(),
        connector,
        credentials(),
        Arc::clone(&sink),
    );
    dispatcher.run(&directory).await.unwrap();

    let results = sink.take();
    assert_eq!(results.len(), 10);
    assert_eq!(successes(&results), 9);

    let failure = results.iter().find_map(|r| match r {
        ExecutionResult::Failure(f) => Some(f.clone()),
        ExecutionResult::Success(_) => None,
    });
    let failure = failure.unwrap();
    assert_eq!(failure.device, "10.0.0.7");
    assert_eq!(failure.kind, FailureKind::AuthRejected);
    assert!(failure.detail.contains("netops@10.0.0.7"));
}

#[tokio::test]
async fn failures_of_every_kind_stay_isolated() {
    let probe = Arc::new(Probe::default());
    let sink = Arc::new(CollectingSink::default());
    let directory = fleet(6);

    let connector = StubConnector::new(Arc::clone(&probe))
        .script("10.0.1.1", Script::Timeout)
        .script("10.0.2.1", Script::CommandFails)
        .script("10.0.3.1", Script::Panics);
    let dispatcher = Dispatcher::new(
        DispatchConfig::default().with_batch_size(4),
        connector,
        credentials(),
        Arc::clone(&sink),
    );
    dispatcher.run(&directory).await.unwrap();

    let results = sink.take();
    assert_eq!(results.len(), 6);
    assert_eq!(successes(&results), 3);

    let kind_of = |device: &str| {
        results
            .iter()
            .find_map(|r| match r {
                ExecutionResult::Failure(f) if f.device == device => Some(f.kind),
                _ => None,
            })
            .unwrap()
    };
    assert_eq!(kind_of("10.0.1.1"), FailureKind::Timeout);
    assert_eq!(kind_of("10.0.2.1"), FailureKind::SessionError);
    assert_eq!(kind_of("10.0.3.1"), FailureKind::SessionError);

    // Every opened session is closed, including the one that panicked.
    assert_eq!(probe.opened.load(Ordering::SeqCst), 5);
    assert_eq!(probe.closed.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn panicking_session_is_closed_and_reported() {
    let probe = Arc::new(Probe::default());
    let sink = Arc::new(CollectingSink::default());

    let connector = StubConnector::new(Arc::clone(&probe)).script("10.0.0.1", Script::Panics);
    let dispatcher = Dispatcher::new(
        DispatchConfig::default(),
        connector,
        credentials(),
        Arc::clone(&sink),
    );
    dispatcher.run(&fleet(1)).await.unwrap();

    assert_eq!(probe.opened.load(Ordering::SeqCst), 1);
    assert_eq!(probe.closed.load(Ordering::SeqCst), 1);

    let results = sink.take();
    let [ExecutionResult::Failure(failure)] = results.as_slice() else {
        panic!("expected one failure, got {results:?}");
    };
    assert_eq!(failure.kind, FailureKind::SessionError);
    assert!(failure.detail.contains("session panicked: stub exploded on 10.0.0.1"));
}

#[tokio::test]
async fn each_failed_device_logs_one_warning() {
    let dir = tempfile::tempdir().unwrap();
    let probe = Arc::new(Probe::default());
    let logs = CapturedLogs::default();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .with_writer(logs.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let directory: DeviceDirectory = ["10.0.0.8", "10.0.0.9", "10.0.0.10"]
        .into_iter()
        .map(|a| (a, ""))
        .collect();
    let connector = StubConnector::new(Arc::clone(&probe))
        .script("10.0.0.9", Script::AuthRejected)
        .script("10.0.0.10", Script::Panics);
    let dispatcher = Dispatcher::new(
        DispatchConfig::default(),
        connector,
        credentials(),
        FileSink::new(dir.path()),
    );
    dispatcher.run(&directory).await.unwrap();

    let text = logs.text();
    let warnings_for = |device: &str| {
        text.lines()
            .filter(|l| l.contains("WARN") && l.contains(&format!("device={device} ")))
            .count()
    };
    assert_eq!(warnings_for("10.0.0.9"), 1, "log was:\n{text}");
    assert_eq!(warnings_for("10.0.0.10"), 1, "log was:\n{text}");
    assert_eq!(warnings_for("10.0.0.8"), 0, "log was:\n{text}");
    assert_eq!(text.lines().filter(|l| l.contains("WARN")).count(), 2);
}

#[tokio::test(start_paused = true)]
async fn pool_scheduling_runs_everything_with_fixed_workers() {
    let probe = Arc::new(Probe::default());
    let sink = Arc::new(CollectingSink::default());
    let directory = fleet(25);

    let dispatcher = Dispatcher::new(
        DispatchConfig::default()
            .with_batch_size(4)
            .with_scheduling(Scheduling::Pool),
        StubConnector::new(Arc::clone(&probe)),
        credentials(),
        Arc::clone(&sink),
    );
    dispatcher.run(&directory).await.unwrap();

    let results = sink.take();
    assert_eq!(results.len(), 25);
    assert_eq!(successes(&results), 25);
    assert_eq!(probe.peak.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn payloads_for_one_device_share_an_artifact_without_interleaving() {
    let dir = tempfile::tempdir().unwrap();
    let probe = Arc::new(Probe::default());
    let input = b"10.0.0.1;show version\n10.0.0.1;show clock\n10.0.0.1;show users\n";
    let directory = DeviceDirectory::parse(input).unwrap();

    let dispatcher = Dispatcher::new(
        DispatchConfig::default(),
        StubConnector::new(Arc::clone(&probe)),
        credentials(),
        FileSink::new(dir.path()),
    );
    dispatcher.run(&directory).await.unwrap();

    let text = std::fs::read_to_string(dir.path().join("10.0.0.1_sw-10-0-0-1.txt")).unwrap();
    let records: Vec<&str> = text
        .split(&"=".repeat(72))
        .filter(|r| !r.is_empty())
        .collect();
    assert_eq!(records.len(), 3);
    for record in records {
        // Each record echoes exactly one command and carries its own output.
        let command = record
            .lines()
            .find_map(|l| l.strip_prefix("Command   : "))
            .unwrap();
        assert!(record.contains(&format!("{command} on 10.0.0.1")));
        assert_eq!(record.matches("Command   : ").count(), 1);
    }
}

#[tokio::test]
async fn invalid_configuration_contacts_no_device() {
    let probe = Arc::new(Probe::default());
    let sink = Arc::new(CollectingSink::default());

    let dispatcher = Dispatcher::new(
        DispatchConfig::default().with_batch_size(0),
        StubConnector::new(Arc::clone(&probe)),
        credentials(),
        Arc::clone(&sink),
    );
    let err = dispatcher.run(&fleet(3)).await.unwrap_err();

    assert!(matches!(err, fleetcmd_core::CoreError::InvalidConfiguration { .. }));
    assert_eq!(probe.clock.load(Ordering::SeqCst), 0);
    assert!(sink.take().is_empty());
}

#[tokio::test]
async fn empty_directory_completes_immediately() {
    let probe = Arc::new(Probe::default());
    let sink = Arc::new(CollectingSink::default());

    let dispatcher = Dispatcher::new(
        DispatchConfig::default(),
        StubConnector::new(Arc::clone(&probe)),
        credentials(),
        Arc::clone(&sink),
    );
    let summary = dispatcher.run(&DeviceDirectory::new()).await.unwrap();

    assert!(summary.elapsed < Duration::from_secs(1));
    assert!(sink.take().is_empty());
}
