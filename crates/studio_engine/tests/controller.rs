use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::thread;
use std::time::{Duration, Instant};

use studio_core::{GenerationRequest, JobOutcome, JobState, JobStatus, StartError, ValidationError};
use studio_engine::{
    EngineSettings, GenerationParams, Generator, GeneratorError, JobController, StepObserver,
    VideoTensor,
};
use tempfile::TempDir;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(studio_logging::initialize_for_tests);
}

/// Holds every job at its first step until released.
#[derive(Default)]
struct GatedGenerator {
    release: AtomicBool,
    fail: bool,
    stopped: AtomicBool,
    seen: Mutex<Vec<GenerationParams>>,
}

impl GatedGenerator {
    fn open(&self) {
        self.release.store(true, Ordering::SeqCst);
    }

    fn wait_entered(&self) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while self.seen.lock().unwrap().is_empty() {
            assert!(Instant::now() < deadline, "generator never started");
            thread::sleep(Duration::from_millis(2));
        }
    }
}

impl Generator for GatedGenerator {
    fn generate(
        &self,
        params: &GenerationParams,
        observer: &dyn StepObserver,
    ) -> Result<VideoTensor, GeneratorError> {
        self.seen.lock().unwrap().push(params.clone());
        let deadline = Instant::now() + Duration::from_secs(10);
        while !self.release.load(Ordering::SeqCst) && Instant::now() < deadline {
            if observer.should_stop() {
                self.stopped.store(true, Ordering::SeqCst);
                return Err(GeneratorError::Interrupted);
            }
            thread::sleep(Duration::from_millis(2));
        }
        if self.fail {
            return Err(GeneratorError::Model("weights missing".into()));
        }
        let total = params.request.steps;
        for step in 0..total {
            observer.on_step(step, total, 1000.0 * (1.0 - step as f32 / total as f32));
        }
        Ok(VideoTensor::new([3, 1, 2, 2], vec![0.5; 12]).unwrap())
    }
}

fn controller(generator: Arc<GatedGenerator>, temp: &TempDir) -> JobController {
    init_logging();
    let mut settings = EngineSettings::default_with_output(temp.path().join("out"));
    settings.output.created_utc = Arc::new(|| "2024-01-01T00:00:00Z".to_string());
    JobController::new(generator, settings)
}

fn cat_request() -> GenerationRequest {
    let mut request = GenerationRequest::new("cat");
    request.steps = 5;
    request.seed = 1234;
    request
}

fn wait_for_terminal(controller: &mut JobController) -> JobStatus {
    for _ in 0..1000 {
        let status = controller.poll_status();
        if status.state.is_terminal() {
            return status;
        }
        thread::sleep(Duration::from_millis(5));
    }
    panic!("job never reached a terminal state");
}

#[test]
fn start_reports_running_before_worker_finishes() {
    let temp = TempDir::new().unwrap();
    let generator = Arc::new(GatedGenerator::default());
    let mut controller = controller(generator.clone(), &temp);

    let ticket = controller.start(cat_request()).unwrap();
    assert_eq!(ticket.job_id, 1);
    let status = controller.poll_status();
    assert_eq!(status.state, JobState::Running);
    assert_eq!(status.job_id, Some(1));
    assert!(!controller.controls().generate_enabled);
    assert!(controller.controls().cancel_enabled);

    generator.open();
    let status = wait_for_terminal(&mut controller);
    assert_eq!(status.state, JobState::Completed);
    assert_eq!(status.fraction, 1.0);
    let path = status.outcome.as_ref().and_then(|o| o.result_path()).unwrap();
    assert!(path.exists());
    assert!(fs::read(path).unwrap().starts_with(b"YUV4MPEG2 W2 H2 F16:1"));
    assert!(controller.controls().generate_enabled);
}

#[test]
fn second_start_while_running_is_rejected() {
    let temp = TempDir::new().unwrap();
    let generator = Arc::new(GatedGenerator::default());
    let mut controller = controller(generator.clone(), &temp);

    controller.start(cat_request()).unwrap();
    let err = controller.start(cat_request()).unwrap_err();
    assert_eq!(err, StartError::AlreadyRunning { job_id: 1 });
    assert_eq!(controller.poll_status().job_id, Some(1));
    assert!(generator.seen.lock().unwrap().len() <= 1);

    generator.open();
    wait_for_terminal(&mut controller);
    assert_eq!(generator.seen.lock().unwrap().len(), 1);
}

#[test]
fn invalid_request_leaves_controller_idle() {
    let temp = TempDir::new().unwrap();
    let mut controller = controller(Arc::new(GatedGenerator::default()), &temp);

    let err = controller.start(GenerationRequest::new("   ")).unwrap_err();
    assert_eq!(err, StartError::Validation(ValidationError::EmptyPrompt));
    assert_eq!(controller.state(), JobState::Idle);
    assert!(!controller.cancel());
}

#[test]
fn cancel_is_idempotent_and_ends_cancelled() {
    let temp = TempDir::new().unwrap();
    let generator = Arc::new(GatedGenerator::default());
    let mut controller = controller(generator.clone(), &temp);

    controller.start(cat_request()).unwrap();
    generator.wait_entered();
    assert!(controller.cancel());
    assert!(!controller.cancel());
    assert_eq!(controller.state(), JobState::Cancelling);
    assert!(controller.controls().cancel_visible);
    assert!(!controller.controls().cancel_enabled);

    let status = wait_for_terminal(&mut controller);
    assert_eq!(status.state, JobState::Cancelled);
    assert_eq!(status.outcome, Some(JobOutcome::Cancelled));
    assert!(generator.stopped.load(Ordering::SeqCst));
    assert!(!controller.cancel());
}

#[test]
fn cancel_after_worker_finished_still_wins() {
    let temp = TempDir::new().unwrap();
    let generator = Arc::new(GatedGenerator::default());
    let mut controller = controller(generator.clone(), &temp);

    let ticket = controller.start(cat_request()).unwrap();
    generator.open();
    // The worker closes the channel right before returning; do not poll in between.
    let deadline = Instant::now() + Duration::from_secs(10);
    while !ticket.progress.drain_latest().closed {
        assert!(Instant::now() < deadline, "worker never closed its channel");
        thread::sleep(Duration::from_millis(2));
    }

    assert!(controller.cancel());
    let status = wait_for_terminal(&mut controller);
    assert_eq!(status.state, JobState::Cancelled);
}

#[test]
fn generator_failure_surfaces_message_and_closes_channel() {
    let temp = TempDir::new().unwrap();
    let generator = Arc::new(GatedGenerator {
        fail: true,
        ..GatedGenerator::default()
    });
    let mut controller = controller(generator.clone(), &temp);

    let ticket = controller.start(cat_request()).unwrap();
    generator.open();
    let status = wait_for_terminal(&mut controller);
    assert_eq!(status.state, JobState::Failed);
    assert!(status.description.contains("weights missing"));
    assert!(ticket.progress.drain_latest().closed);
}

#[test]
fn acknowledge_returns_to_idle_and_ids_keep_increasing() {
    let temp = TempDir::new().unwrap();
    let generator = Arc::new(GatedGenerator::default());
    generator.open();
    let mut controller = controller(generator, &temp);

    assert!(!controller.acknowledge());
    let first = controller.start(cat_request()).unwrap();
    wait_for_terminal(&mut controller);
    assert!(controller.acknowledge());
    assert_eq!(controller.state(), JobState::Idle);
    assert_eq!(controller.poll_status().job_id, None);

    let second = controller.start(cat_request()).unwrap();
    assert!(second.job_id > first.job_id);
    wait_for_terminal(&mut controller);
}

#[test]
fn launch_overrides_replace_request_values() {
    let temp = TempDir::new().unwrap();
    let generator = Arc::new(GatedGenerator::default());
    generator.open();
    init_logging();
    let mut settings = EngineSettings::default_with_output(temp.path().to_path_buf());
    settings.overrides.sample_shift = Some(3.0);
    settings.overrides.sample_guide_scale = Some(5.0);
    let mut controller = JobController::new(generator.clone(), settings);

    controller.start(cat_request()).unwrap();
    wait_for_terminal(&mut controller);

    let seen = generator.seen.lock().unwrap();
    assert_eq!(seen[0].request.shift_scale, 3.0);
    assert_eq!(seen[0].request.guide_scale, 5.0);
    assert_eq!(seen[0].seed, 1234);
}

#[test]
fn dropping_controller_signals_running_worker() {
    let temp = TempDir::new().unwrap();
    let generator = Arc::new(GatedGenerator::default());
    let mut controller = controller(generator.clone(), &temp);
    controller.start(cat_request()).unwrap();
    generator.wait_entered();

    let started = Instant::now();
    drop(controller);
    assert!(started.elapsed() < Duration::from_secs(1));

    let deadline = Instant::now() + Duration::from_secs(10);
    while !generator.stopped.load(Ordering::SeqCst) {
        assert!(Instant::now() < deadline, "worker ignored the cancel flag");
        thread::sleep(Duration::from_millis(2));
    }
}
