//! Pipeline orchestrator: drives capture, generate and print for each press.
//!
//! [`PipelineOrchestrator`] owns the only writer to [`SharedState`] and
//! responds to [`ButtonEvent`]s received over a `tokio::sync::mpsc` channel.
//!
//! # Pipeline flow
//!
//! ```text
//! ButtonEvent (state Ready)
//!   └─▶ camera.capture()             [Capturing]   LED off
//!         └─▶ generator.generate()   [Generating]
//!               └─▶ printer.print()  [Printing]
//!                     └─▶            [Ready]       LED on
//!
//! any failure
//!   └─▶ [Error]  LED blinking, log stage + reason, error slip (best effort),
//!                hold, then [Ready]
//! ```
//!
//! Stages are never cancelled or repeated here.  Each one is bounded by its
//! own component (capture timeout, per-attempt generation timeout × attempts,
//! printer write timeout).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::button::{ButtonEvent, InputError};
use crate::camera::{Camera, CaptureError};
use crate::led::StatusIndicator;
use crate::poem::{GenerationError, Poem, PoemGenerator};
use crate::printer::{PrintError, Printer, ReceiptFormatter};

use super::runlog::{Outcome, RunLog, RunRecord};
use super::state::{PipelineState, SharedState};

// ---------------------------------------------------------------------------
// Stage / PipelineError
// ---------------------------------------------------------------------------

/// The part of the appliance a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Input,
    Capture,
    Generate,
    Print,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Input => "input",
            Stage::Capture => "capture",
            Stage::Generate => "generate",
            Stage::Print => "print",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A failed run, tagged with the stage that failed.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("input failed: {0}")]
    Input(#[from] InputError),

    #[error("capture failed: {0}")]
    Capture(#[from] CaptureError),

    #[error("poem generation failed: {0}")]
    Generate(#[from] GenerationError),

    #[error("printing failed: {0}")]
    Print(#[from] PrintError),
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Input(_) => Stage::Input,
            PipelineError::Capture(_) => Stage::Capture,
            PipelineError::Generate(_) => Stage::Generate,
            PipelineError::Print(_) => Stage::Print,
        }
    }

    /// The underlying cause without the stage prefix.
    pub fn reason(&self) -> String {
        match self {
            PipelineError::Input(e) => e.to_string(),
            PipelineError::Capture(e) => e.to_string(),
            PipelineError::Generate(e) => e.to_string(),
            PipelineError::Print(e) => e.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineOrchestrator
// ---------------------------------------------------------------------------

/// Drives the complete press-to-poem pipeline.
///
/// Create with [`PipelineOrchestrator::new`], adjust with the `with_*`
/// builders, then call [`run`](Self::run) inside a tokio task.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use poetry_printer::led::LogIndicator;
/// use poetry_printer::pipeline::{new_shared_state, PipelineOrchestrator};
/// use poetry_printer::printer::ConsolePrinter;
///
/// # async fn example() {
/// # use poetry_printer::camera::Camera;
/// # use poetry_printer::poem::PoemGenerator;
/// # fn make_camera() -> Arc<dyn Camera> { unimplemented!() }
/// # fn make_generator() -> Arc<dyn PoemGenerator> { unimplemented!() }
/// let (press_tx, press_rx) = tokio::sync::mpsc::channel(1);
/// let orchestrator = PipelineOrchestrator::new(
///     new_shared_state(),
///     make_camera(),
///     make_generator(),
///     Arc::new(ConsolePrinter::new()),
///     Arc::new(LogIndicator),
/// );
/// orchestrator.run(press_rx).await;
/// # }
/// ```
pub struct PipelineOrchestrator {
    state: SharedState,
    camera: Arc<dyn Camera>,
    generator: Arc<dyn PoemGenerator>,
    printer: Arc<dyn Printer>,
    indicator: Arc<dyn StatusIndicator>,
    formatter: ReceiptFormatter,
    run_log: Option<RunLog>,
    error_slip: bool,
    error_hold: Duration,
    /// When the last run returned to `Ready`.  Presses recognised before
    /// this belong to a finished run and are dropped.
    ready_since: Option<Instant>,
    runs: u64,
}

impl PipelineOrchestrator {
    /// Create a new orchestrator with the default receipt layout, no run
    /// log, no error slip and no error hold.
    pub fn new(
        state: SharedState,
        camera: Arc<dyn Camera>,
        generator: Arc<dyn PoemGenerator>,
        printer: Arc<dyn Printer>,
        indicator: Arc<dyn StatusIndicator>,
    ) -> Self {
        Self {
            state,
            camera,
            generator,
            printer,
            indicator,
            formatter: ReceiptFormatter::default(),
            run_log: None,
            error_slip: false,
            error_hold: Duration::ZERO,
            ready_since: None,
            runs: 0,
        }
    }

    pub fn with_formatter(mut self, formatter: ReceiptFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn with_run_log(mut self, run_log: RunLog) -> Self {
        self.run_log = Some(run_log);
        self
    }

    /// Print a short notice when a capture or generation fails.
    pub fn with_error_slip(mut self, enabled: bool) -> Self {
        self.error_slip = enabled;
        self
    }

    /// Keep the error pattern on the LED this long before returning to ready.
    pub fn with_error_hold(mut self, hold: Duration) -> Self {
        self.error_hold = hold;
        self
    }

    // -----------------------------------------------------------------------
    // Main async loop
    // -----------------------------------------------------------------------

    /// Run the orchestrator until `press_rx` is closed.
    pub async fn run(mut self, mut press_rx: mpsc::Receiver<ButtonEvent>) {
        self.transition(PipelineState::Ready);
        log::info!("pipeline: ready, waiting for a press");

        while let Some(event) = press_rx.recv().await {
            if !self.accepts(&event) {
                log::info!("pipeline: press #{} dropped, it arrived during a run", event.seq);
                continue;
            }
            // Failures are already logged and recorded.
            let _ = self.run_once(&event).await;
        }

        log::info!("pipeline: press channel closed, orchestrator shutting down");
    }

    fn accepts(&self, event: &ButtonEvent) -> bool {
        self.state.is_ready() && self.ready_since.map_or(true, |since| event.at >= since)
    }

    /// Execute one full run for `event` and return to `Ready`.
    ///
    /// Every failure is handled here (logged, optionally printed, shown on
    /// the LED) before being returned for inspection.
    pub async fn run_once(&mut self, event: &ButtonEvent) -> Result<Poem, PipelineError> {
        self.runs += 1;
        let run = self.runs;
        let started = Instant::now();
        let started_at = Local::now();
        log::info!("pipeline: run #{run} started by press #{}", event.seq);

        let mut image = None;
        let result = self.execute(&mut image).await;

        match &result {
            Ok(poem) => log::info!(
                "pipeline: run #{run} printed {} lines in {:.1}s",
                poem.lines().count(),
                started.elapsed().as_secs_f32()
            ),
            Err(e) => self.handle_error(run, e).await,
        }

        self.record(RunRecord {
            run,
            press: event.seq,
            started_at,
            duration_ms: started.elapsed().as_millis() as u64,
            outcome: if result.is_ok() {
                Outcome::Printed
            } else {
                Outcome::Failed
            },
            stage: result.as_ref().err().map(PipelineError::stage),
            reason: result.as_ref().err().map(PipelineError::reason),
            image,
            title: result.as_ref().ok().and_then(|p| p.title.clone()),
        });

        // Stamp first: a press seen as soon as READY is visible must count.
        self.ready_since = Some(Instant::now());
        self.transition(PipelineState::Ready);
        result
    }

    /// The happy path.  The picture is dropped as soon as generation ends.
    async fn execute(&self, image_path: &mut Option<PathBuf>) -> Result<Poem, PipelineError> {
        self.transition(PipelineState::Capturing);
        let image = self.camera.capture().await?;
        log::debug!("pipeline: captured {} bytes", image.bytes.len());
        image_path.clone_from(&image.saved_to);

        self.transition(PipelineState::Generating);
        let poem = self.generator.generate(&image).await?;
        drop(image);

        self.transition(PipelineState::Printing);
        let job = self.formatter.poem_job(&poem);
        self.printer.print(&job).await?;

        Ok(poem)
    }

    /// Error branch: show it, log it, try to print a notice, hold, done.
    async fn handle_error(&self, run: u64, err: &PipelineError) {
        self.transition(PipelineState::Error);
        log::error!(
            "pipeline: run #{run} failed at {} stage: {}",
            err.stage(),
            err.reason()
        );

        // A printer that just failed is not asked again for the same press.
        if self.error_slip && err.stage() != Stage::Print {
            let slip = self.formatter.error_slip(err.stage(), &err.reason());
            if let Err(e) = self.printer.print(&slip).await {
                log::warn!("pipeline: error slip not printed: {e}");
            }
        }

        if !self.error_hold.is_zero() {
            tokio::time::sleep(self.error_hold).await;
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn transition(&self, next: PipelineState) {
        let prev = self.state.get();
        if prev != next {
            log::debug!("pipeline: {prev} → {next}");
        }
        self.state.set(next);
        self.indicator.set_state(next);
    }

    fn record(&self, record: RunRecord) {
        if let Some(run_log) = &self.run_log {
            if let Err(e) = run_log.append(&record) {
                log::warn!(
                    "pipeline: cannot write run log {}: {e}",
                    run_log.path().display()
                );
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CapturedImage;
    use crate::pipeline::state::new_shared_state;
    use crate::poem::{RetryPolicy, RetryingGenerator};
    use crate::printer::PrintJob;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    /// Camera that always succeeds or always times out.
    struct MockCamera {
        fail: bool,
        calls: AtomicU32,
    }

    impl MockCamera {
        fn ok() -> Arc<Self> {
            Arc::new(Self {
                fail: false,
                calls: AtomicU32::new(0),
            })
        }

        fn timing_out() -> Arc<Self> {
            Arc::new(Self {
                fail: true,
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl Camera for MockCamera {
        async fn capture(&self) -> Result<CapturedImage, CaptureError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(CaptureError::Timeout(Duration::from_secs(10)));
            }
            let mut image = CapturedImage::jpeg(vec![0xff, 0xd8, 0xff]);
            image.saved_to = Some(PathBuf::from("/tmp/poetry_picture_test.jpg"));
            Ok(image)
        }
    }

    /// Generator whose outcome depends on the call number (1-indexed).
    struct MockGenerator {
        outcome: fn(u32) -> Result<Poem, GenerationError>,
        calls: AtomicU32,
    }

    impl MockGenerator {
        fn new(outcome: fn(u32) -> Result<Poem, GenerationError>) -> Self {
            Self {
                outcome,
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PoemGenerator for MockGenerator {
        async fn generate(&self, _image: &CapturedImage) -> Result<Poem, GenerationError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            (self.outcome)(n)
        }
    }

    fn haiku(_: u32) -> Result<Poem, GenerationError> {
        Ok(Poem::new(
            Some("Desk".into()),
            "A cold cup of tea\nsticky notes curl at the edge\nthe cursor blinks on",
        ))
    }

    fn rejected(_: u32) -> Result<Poem, GenerationError> {
        Err(GenerationError::from_status(400, "API key not valid"))
    }

    /// Printer that records jobs and optionally fails every call.
    #[derive(Default)]
    struct MockPrinter {
        fail: bool,
        jobs: Mutex<Vec<PrintJob>>,
    }

    impl MockPrinter {
        fn failing() -> Arc<Self> {
            Arc::new(Self {
                fail: true,
                ..Self::default()
            })
        }

        fn count(&self) -> usize {
            self.jobs.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Printer for MockPrinter {
        async fn print(&self, job: &PrintJob) -> Result<(), PrintError> {
            self.jobs.lock().unwrap().push(job.clone());
            if self.fail {
                Err(PrintError::Timeout(Duration::from_secs(5)))
            } else {
                Ok(())
            }
        }
    }

    /// Indicator that remembers every state it was shown.
    #[derive(Default)]
    struct RecordingIndicator(Mutex<Vec<PipelineState>>);

    impl RecordingIndicator {
        fn states(&self) -> Vec<PipelineState> {
            self.0.lock().unwrap().clone()
        }
    }

    impl StatusIndicator for RecordingIndicator {
        fn set_state(&self, state: PipelineState) {
            self.0.lock().unwrap().push(state);
        }
    }

    /// Indicator that notes when `Ready` was last shown.
    #[derive(Default)]
    struct ReadyStamp(Mutex<Option<Instant>>);

    impl StatusIndicator for ReadyStamp {
        fn set_state(&self, state: PipelineState) {
            if state == PipelineState::Ready {
                *self.0.lock().unwrap() = Some(Instant::now());
            }
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    struct Rig {
        state: SharedState,
        camera: Arc<MockCamera>,
        printer: Arc<MockPrinter>,
        indicator: Arc<RecordingIndicator>,
    }

    fn rig(
        camera: Arc<MockCamera>,
        generator: Arc<dyn PoemGenerator>,
        printer: Arc<MockPrinter>,
    ) -> (PipelineOrchestrator, Rig) {
        let state = new_shared_state();
        let indicator = Arc::new(RecordingIndicator::default());
        let orc = PipelineOrchestrator::new(
            Arc::clone(&state),
            camera.clone(),
            generator,
            printer.clone(),
            indicator.clone(),
        );
        (
            orc,
            Rig {
                state,
                camera,
                printer,
                indicator,
            },
        )
    }

    /// Feed `presses` to a fresh orchestrator and run it to completion.
    async fn run_presses(orc: PipelineOrchestrator, presses: Vec<ButtonEvent>) {
        let (tx, rx) = mpsc::channel(8);
        for press in presses {
            tx.send(press).await.unwrap();
        }
        drop(tx);
        orc.run(rx).await;
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn successful_run_prints_and_returns_to_ready() {
        let generator = Arc::new(MockGenerator::new(haiku));
        let (orc, rig) = rig(MockCamera::ok(), generator.clone(), Arc::new(MockPrinter::default()));

        run_presses(orc, vec![ButtonEvent::now(1)]).await;

        assert_eq!(rig.state.get(), PipelineState::Ready);
        assert_eq!(generator.calls(), 1);

        let jobs = rig.printer.jobs.lock().unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].title, vec!["Desk"]);
        assert_eq!(jobs[0].lines[0], "A cold cup of tea");

        // LED: ready, off for every busy stage, on again.
        assert_eq!(
            rig.indicator.states(),
            vec![
                PipelineState::Ready,
                PipelineState::Capturing,
                PipelineState::Generating,
                PipelineState::Printing,
                PipelineState::Ready,
            ]
        );
    }

    #[tokio::test]
    async fn capture_timeout_skips_generator_and_printer() {
        let generator = Arc::new(MockGenerator::new(haiku));
        let (orc, rig) = rig(
            MockCamera::timing_out(),
            generator.clone(),
            Arc::new(MockPrinter::default()),
        );
        let mut orc = orc.with_error_slip(false);

        let err = orc.run_once(&ButtonEvent::now(1)).await.unwrap_err();

        assert_eq!(err.stage(), Stage::Capture);
        assert_eq!(rig.state.get(), PipelineState::Ready);
        assert_eq!(generator.calls(), 0);
        assert_eq!(rig.printer.count(), 0);
        assert_eq!(rig.indicator.states().last(), Some(&PipelineState::Ready));
        assert!(rig.indicator.states().contains(&PipelineState::Error));
    }

    #[tokio::test]
    async fn error_slip_is_the_only_print_after_a_capture_failure() {
        let generator = Arc::new(MockGenerator::new(haiku));
        let (orc, rig) = rig(
            MockCamera::timing_out(),
            generator.clone(),
            Arc::new(MockPrinter::default()),
        );
        let mut orc = orc.with_error_slip(true);

        orc.run_once(&ButtonEvent::now(1)).await.unwrap_err();

        let jobs = rig.printer.jobs.lock().unwrap();
        assert_eq!(jobs.len(), 1);
        assert!(jobs[0].lines.iter().any(|l| l.contains("capture step failed")));
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn presses_from_a_finished_run_are_dropped() {
        let generator = Arc::new(MockGenerator::new(haiku));
        let (orc, rig) = rig(MockCamera::ok(), generator.clone(), Arc::new(MockPrinter::default()));

        // Both presses are recognised before the first run ends, so the
        // second one was made while the pipeline was busy.
        run_presses(orc, vec![ButtonEvent::now(1), ButtonEvent::now(2)]).await;

        assert_eq!(rig.camera.calls.load(Ordering::SeqCst), 1);
        assert_eq!(generator.calls(), 1);
        assert_eq!(rig.printer.count(), 1);
        assert_eq!(rig.state.get(), PipelineState::Ready);
    }

    #[tokio::test]
    async fn later_presses_start_new_runs() {
        let generator = Arc::new(MockGenerator::new(haiku));
        let (mut orc, rig) = rig(MockCamera::ok(), generator.clone(), Arc::new(MockPrinter::default()));

        orc.run_once(&ButtonEvent::now(1)).await.unwrap();
        let next = ButtonEvent::now(2);
        assert!(orc.accepts(&next));
        orc.run_once(&next).await.unwrap();

        assert_eq!(generator.calls(), 2);
        assert_eq!(rig.printer.count(), 2);
    }

    #[tokio::test]
    async fn press_made_as_ready_is_shown_is_accepted() {
        let stamp = Arc::new(ReadyStamp::default());
        let mut orc = PipelineOrchestrator::new(
            new_shared_state(),
            MockCamera::ok(),
            Arc::new(MockGenerator::new(haiku)),
            Arc::new(MockPrinter::default()),
            stamp.clone(),
        );

        orc.run_once(&ButtonEvent::now(1)).await.unwrap();

        let shown = stamp.0.lock().unwrap().expect("ready was shown");
        assert!(orc.accepts(&ButtonEvent::at(2, shown)));
    }

    #[tokio::test]
    async fn transient_failures_are_retried_until_success() {
        fn flaky(n: u32) -> Result<Poem, GenerationError> {
            match n {
                1 => Err(GenerationError::Timeout),
                2 => Err(GenerationError::from_status(503, "overloaded")),
                _ => haiku(n),
            }
        }
        let policy = RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
            ..RetryPolicy::default()
        };
        let generator = Arc::new(RetryingGenerator::new(MockGenerator::new(flaky), policy));
        let (mut orc, rig) = rig(MockCamera::ok(), generator.clone(), Arc::new(MockPrinter::default()));

        let poem = orc.run_once(&ButtonEvent::now(1)).await.unwrap();

        assert_eq!(poem.title.as_deref(), Some("Desk"));
        assert_eq!(generator.inner().calls(), 3);
        assert_eq!(rig.printer.count(), 1);
        assert!(!rig.indicator.states().contains(&PipelineState::Error));
    }

    #[tokio::test]
    async fn print_failure_returns_to_ready_without_a_slip() {
        let generator = Arc::new(MockGenerator::new(haiku));
        let (orc, rig) = rig(MockCamera::ok(), generator, MockPrinter::failing());
        let mut orc = orc.with_error_slip(true);

        let err = orc.run_once(&ButtonEvent::now(1)).await.unwrap_err();

        assert_eq!(err.stage(), Stage::Print);
        assert_eq!(rig.printer.count(), 1);
        assert_eq!(rig.state.get(), PipelineState::Ready);
    }

    #[tokio::test]
    async fn failing_error_slip_is_only_logged() {
        let generator = Arc::new(MockGenerator::new(rejected));
        let (orc, rig) = rig(MockCamera::ok(), generator.clone(), MockPrinter::failing());
        let mut orc = orc.with_error_slip(true);

        let err = orc.run_once(&ButtonEvent::now(1)).await.unwrap_err();

        assert_eq!(err.stage(), Stage::Generate);
        assert_eq!(generator.calls(), 1);
        // One slip attempt, no second-level retry.
        assert_eq!(rig.printer.count(), 1);
        assert_eq!(rig.state.get(), PipelineState::Ready);
    }

    #[tokio::test]
    async fn error_is_held_before_ready() {
        let generator = Arc::new(MockGenerator::new(rejected));
        let (orc, rig) = rig(MockCamera::ok(), generator, Arc::new(MockPrinter::default()));
        let mut orc = orc.with_error_hold(Duration::from_millis(60));

        let started = Instant::now();
        orc.run_once(&ButtonEvent::now(1)).await.unwrap_err();

        assert!(started.elapsed() >= Duration::from_millis(60));
        assert_eq!(rig.state.get(), PipelineState::Ready);
    }

    #[tokio::test]
    async fn every_run_is_recorded() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("runs.jsonl");

        let generator = Arc::new(MockGenerator::new(|n| {
            if n == 1 {
                haiku(n)
            } else {
                Err(GenerationError::EmptyPoem)
            }
        }));
        let (orc, _rig) = rig(MockCamera::ok(), generator, Arc::new(MockPrinter::default()));
        let mut orc = orc.with_run_log(RunLog::new(&path));

        orc.run_once(&ButtonEvent::now(1)).await.unwrap();
        orc.run_once(&ButtonEvent::now(2)).await.unwrap_err();

        let text = std::fs::read_to_string(&path).unwrap();
        let records: Vec<RunRecord> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].outcome, Outcome::Printed);
        assert_eq!(records[0].title.as_deref(), Some("Desk"));
        assert_eq!(
            records[0].image,
            Some(PathBuf::from("/tmp/poetry_picture_test.jpg"))
        );
        assert_eq!(records[1].outcome, Outcome::Failed);
        assert_eq!(records[1].stage, Some(Stage::Generate));
        assert_eq!(records[1].press, 2);
    }

    #[test]
    fn error_stage_and_reason() {
        let err = PipelineError::from(CaptureError::Empty);
        assert_eq!(err.stage(), Stage::Capture);
        assert_eq!(err.reason(), "camera returned an empty image");
        assert_eq!(err.to_string(), "capture failed: camera returned an empty image");
    }
}
