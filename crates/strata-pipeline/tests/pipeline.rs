//! End-to-end pipeline tests: file source through the supervised stages to
//! a file sink, with a stub engine standing in for the nucleation core.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use strata_core::config::Config;
use strata_core::worker::WorkerState;
use strata_pipeline::engine::{AssocEngine, EngineMessage, EngineSink, OutputMessage};
use strata_pipeline::file_input::FileFetcher;
use strata_pipeline::file_output::FileWriter;
use strata_pipeline::input::RecordSource;
use strata_pipeline::{Associator, Input, Output};

const GPICK_LINE: &str = "228041013 22637648 1 BOZ BHZ US 00 20150303000044.175 P \
                          -1.0000 U  ? m 1.050 2.650 0.0 0.000000 3.49 0.000000 0.000000";

/// An engine that immediately re-emits every pick as a detection, so the
/// whole path from source file to sink file can be observed.
#[derive(Default)]
struct EchoEngine {
    sink: RwLock<Option<Arc<dyn EngineSink>>>,
    dispatched: AtomicUsize,
}

impl AssocEngine for EchoEngine {
    fn dispatch(&self, message: EngineMessage) {
        if let EngineMessage::Record(record) = message {
            let count = self.dispatched.fetch_add(1, Ordering::SeqCst);
            if let Some(sink) = self.sink.read().as_ref() {
                sink.send(OutputMessage::new(
                    "Detection",
                    &format!("event{count}"),
                    serde_json::to_string(&record).unwrap_or_default(),
                ));
            }
        }
    }

    fn status_check(&self) -> bool {
        true
    }

    fn pick_list_size(&self) -> usize {
        self.dispatched.load(Ordering::SeqCst)
    }

    fn hypo_list_size(&self) -> usize {
        0
    }

    fn set_send_sink(&self, sink: Arc<dyn EngineSink>) {
        *self.sink.write() = Some(sink);
    }

    fn set_log_sink(&self, _sink: Arc<dyn Fn(log::Level, String) + Send + Sync>) {}
}

fn wait_until(deadline: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    false
}

fn input_config(input_dir: &std::path::Path, extra: &str) -> Config {
    Config::from_str(&format!(
        r#"{{"Cmd":"GlassInput","InputDirectory":"{}","Format":"gpick",
            "DefaultAgencyID":"US","DefaultAuthor":"glasstest"{extra}}}"#,
        input_dir.display()
    ))
    .unwrap()
}

#[test]
fn picks_flow_from_file_to_detection_files() {
    let input_dir = tempfile::tempdir().unwrap();
    let archive_dir = tempfile::tempdir().unwrap();
    let output_dir = tempfile::tempdir().unwrap();

    // three picks with a leading gpick timestamp line
    std::fs::write(
        input_dir.path().join("picks.gpick"),
        format!("1425340828\n{GPICK_LINE}\n{GPICK_LINE}\n{GPICK_LINE}\n"),
    )
    .unwrap();

    let config = input_config(
        input_dir.path(),
        &format!(
            r#","ShutdownWhenNoData":false,"ArchiveDirectory":"{}""#,
            archive_dir.path().display()
        ),
    );
    let input = Arc::new(Input::new());
    input.setup(&config).unwrap();
    let fetcher = Arc::new(FileFetcher::from_config(&config).unwrap());

    let output = Arc::new(Output::new());
    let writer = Arc::new(FileWriter::new(output_dir.path(), false));

    let engine = Arc::new(EchoEngine::default());
    let associator = Associator::create(
        Arc::clone(&input) as Arc<dyn RecordSource>,
        Arc::clone(&output) as Arc<dyn strata_pipeline::output::OutputSend>,
        Arc::clone(&engine) as Arc<dyn AssocEngine>,
    );
    output.set_associator(Arc::clone(&associator) as _);

    // configuration precedes data: output and associator first, input last
    assert!(output.start(writer));
    assert!(associator.start());
    assert!(input.start(fetcher));

    assert!(
        wait_until(Duration::from_secs(10), || {
            std::fs::read_dir(output_dir.path()).map(|dir| dir.count()).unwrap_or(0) >= 3
        }),
        "detections did not reach the output directory"
    );

    // the processed file was archived
    assert!(wait_until(Duration::from_secs(5), || {
        archive_dir.path().join("picks.gpick").exists()
    }));

    assert!(input.health_check());
    assert!(associator.health_check());
    assert!(output.health_check());

    assert!(input.stop());
    assert!(associator.stop());
    assert!(output.stop());

    // every detection body is the canonical record JSON
    for entry in std::fs::read_dir(output_dir.path()).unwrap() {
        let path = entry.unwrap().path();
        assert_eq!(path.extension().unwrap(), "jsondetect");
        let body = std::fs::read_to_string(path).unwrap();
        assert!(body.contains("\"Type\":\"Pick\""));
    }
}

#[test]
fn file_input_stage_shuts_itself_down_when_dry() {
    let input_dir = tempfile::tempdir().unwrap();

    let config = input_config(
        input_dir.path(),
        r#","ShutdownWhenNoData":true,"ShutdownWait":1"#,
    );
    let input = Arc::new(Input::new());
    input.setup(&config).unwrap();
    let fetcher = Arc::new(FileFetcher::from_config(&config).unwrap());

    assert!(input.start(fetcher));
    assert!(wait_until(Duration::from_secs(10), || {
        input.worker().state() == WorkerState::Stopped
    }));
    assert!(!input.is_started());
}

#[test]
fn slow_engine_throttles_the_input_queue() {
    // back-pressure propagates: a bounded queue and a slow engine leave the
    // source unconsumed rather than dropping records
    let input_dir = tempfile::tempdir().unwrap();
    let mut lines = String::new();
    for _ in 0..20 {
        lines.push_str(GPICK_LINE);
        lines.push('\n');
    }
    std::fs::write(input_dir.path().join("picks.gpick"), lines).unwrap();

    let config = input_config(
        input_dir.path(),
        r#","ShutdownWhenNoData":false,"QueueMaxSize":2"#,
    );
    let input = Arc::new(Input::new());
    input.setup(&config).unwrap();
    let fetcher = Arc::new(FileFetcher::from_config(&config).unwrap());

    assert!(input.start(fetcher));

    // no consumer: the queue fills to its bound and stays there
    std::thread::sleep(Duration::from_millis(400));
    assert_eq!(input.pending_count(), 2);
    std::thread::sleep(Duration::from_millis(200));
    assert_eq!(input.pending_count(), 2);

    assert!(input.stop());
}
