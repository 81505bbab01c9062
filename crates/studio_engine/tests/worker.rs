use std::path::PathBuf;
use std::sync::{Arc, Mutex, Once};

use studio_core::{GenerationRequest, Phase, ProgressEvent};
use studio_engine::{
    CancelFlag, ChannelRecv, GenerationParams, GenerationWorker, Generator, GeneratorError,
    PersistError, ProgressChannel, ProgressReceiver, StepObserver, VideoSink, VideoTensor,
    WorkerOutcome,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(studio_logging::initialize_for_tests);
}

enum Script {
    Steps,
    Fail,
    Panic,
    NoFrames,
    Overrun,
    CancelAt(u32, CancelFlag),
}

struct ScriptedGenerator(Script);

impl Generator for ScriptedGenerator {
    fn generate(
        &self,
        params: &GenerationParams,
        observer: &dyn StepObserver,
    ) -> Result<VideoTensor, GeneratorError> {
        let total = params.request.steps;
        match &self.0 {
            Script::Fail => return Err(GeneratorError::Model("CUDA out of memory".into())),
            Script::Panic => panic!("kernel exploded"),
            Script::NoFrames => return Ok(VideoTensor::new([3, 0, 4, 4], Vec::new()).unwrap()),
            Script::Overrun => {
                for step in 0..total + 2 {
                    observer.on_step(step, total + 10, 500.0);
                }
                return Ok(VideoTensor::new([3, 1, 2, 2], vec![0.0; 12]).unwrap());
            }
            _ => {}
        }
        for step in 0..total {
            if let Script::CancelAt(at, flag) = &self.0 {
                if step == *at {
                    flag.raise();
                }
            }
            if observer.should_stop() {
                return Err(GeneratorError::Interrupted);
            }
            observer.on_step(step, total, 1000.0 - step as f32);
        }
        Ok(VideoTensor::new([3, 2, 2, 2], vec![0.0; 24]).unwrap())
    }
}

#[derive(Default)]
struct MemorySink {
    persisted: Mutex<Vec<u64>>,
    fail: bool,
}

impl VideoSink for MemorySink {
    fn persist(
        &self,
        _video: &VideoTensor,
        params: &GenerationParams,
    ) -> Result<PathBuf, PersistError> {
        if self.fail {
            return Err(PersistError::OutputDir("read-only volume".into()));
        }
        self.persisted.lock().unwrap().push(params.seed);
        Ok(PathBuf::from(format!("/videos/{}.y4m", params.seed)))
    }
}

fn request(steps: u32) -> GenerationRequest {
    let mut request = GenerationRequest::new("a cat walking on grass");
    request.steps = steps;
    request.seed = 42;
    request
}

fn run_worker(
    script: Script,
    sink: Arc<MemorySink>,
    cancel: CancelFlag,
    steps: u32,
) -> (WorkerOutcome, ProgressReceiver) {
    init_logging();
    // Large enough to keep every event for inspection.
    let (tx, rx) = ProgressChannel::bounded(steps as usize + 8);
    let worker = GenerationWorker::new(
        7,
        request(steps),
        Arc::new(ScriptedGenerator(script)),
        sink,
        tx,
        cancel,
    );
    let outcome = worker.spawn().unwrap().join().unwrap();
    (outcome, rx)
}

fn collect(rx: &ProgressReceiver) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_pop() {
            ChannelRecv::Event(event) => events.push(event),
            ChannelRecv::Closed => return events,
            ChannelRecv::Empty => panic!("worker exited without closing the channel"),
        }
    }
}

#[test]
fn successful_run_emits_every_phase_in_order() {
    let sink = Arc::new(MemorySink::default());
    let (outcome, rx) = run_worker(Script::Steps, sink.clone(), CancelFlag::new(), 5);

    assert_eq!(outcome, WorkerOutcome::Completed(PathBuf::from("/videos/42.y4m")));
    assert_eq!(*sink.persisted.lock().unwrap(), vec![42]);

    let events = collect(&rx);
    let phases: Vec<_> = events.iter().map(|e| e.phase).collect();
    assert_eq!(phases.first(), Some(&Phase::Init));
    assert_eq!(&phases[phases.len() - 2..], &[Phase::Saving, Phase::Done]);
    let steps: Vec<_> = events
        .iter()
        .filter(|e| e.phase == Phase::Diffusing)
        .map(|e| e.step_index)
        .collect();
    assert_eq!(steps, vec![0, 1, 2, 3, 4]);
    assert!(events.windows(2).all(|w| w[1].supersedes(&w[0])));
    assert!(events.iter().all(|e| e.total_steps == 5));
}

#[test]
fn step_events_keep_the_job_total() {
    let (outcome, rx) = run_worker(
        Script::Overrun,
        Arc::new(MemorySink::default()),
        CancelFlag::new(),
        4,
    );
    assert!(matches!(outcome, WorkerOutcome::Completed(_)));

    let events = collect(&rx);
    assert!(events.iter().all(|e| e.total_steps == 4));
    assert!(events.iter().all(|e| e.step_index < 4));
    let last_step = events
        .iter()
        .filter(|e| e.phase == Phase::Diffusing)
        .map(|e| e.step_index)
        .max();
    assert_eq!(last_step, Some(3));
}

#[test]
fn model_error_becomes_failure_and_closes_channel() {
    let (outcome, rx) = run_worker(
        Script::Fail,
        Arc::new(MemorySink::default()),
        CancelFlag::new(),
        3,
    );
    match outcome {
        WorkerOutcome::Failed(err) => assert!(err.message().contains("CUDA out of memory")),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(collect(&rx).iter().all(|e| e.phase == Phase::Init));
}

#[test]
fn panicking_generator_is_contained() {
    let (outcome, rx) = run_worker(
        Script::Panic,
        Arc::new(MemorySink::default()),
        CancelFlag::new(),
        3,
    );
    match outcome {
        WorkerOutcome::Failed(err) => assert!(err.message().contains("kernel exploded")),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(collect(&rx), vec![ProgressEvent::init(3)]);
}

#[test]
fn empty_tensor_is_a_failure() {
    let sink = Arc::new(MemorySink::default());
    let (outcome, _rx) = run_worker(Script::NoFrames, sink.clone(), CancelFlag::new(), 3);
    assert_eq!(
        outcome,
        WorkerOutcome::Failed(studio_engine::GenerationError::new(
            "generator returned no frames"
        ))
    );
    assert!(sink.persisted.lock().unwrap().is_empty());
}

#[test]
fn persist_error_becomes_failure_without_done_event() {
    let sink = Arc::new(MemorySink {
        fail: true,
        ..MemorySink::default()
    });
    let (outcome, rx) = run_worker(Script::Steps, sink, CancelFlag::new(), 2);
    match outcome {
        WorkerOutcome::Failed(err) => assert!(err.message().contains("read-only volume")),
        other => panic!("unexpected outcome {other:?}"),
    }
    let events = collect(&rx);
    assert_eq!(events.last().map(|e| e.phase), Some(Phase::Saving));
}

#[test]
fn cancel_mid_run_stops_without_saving() {
    let cancel = CancelFlag::new();
    let sink = Arc::new(MemorySink::default());
    let (outcome, rx) = run_worker(
        Script::CancelAt(3, cancel.clone()),
        sink.clone(),
        cancel,
        10,
    );

    assert_eq!(outcome, WorkerOutcome::Cancelled);
    assert!(sink.persisted.lock().unwrap().is_empty());
    let events = collect(&rx);
    assert!(events
        .iter()
        .all(|e| e.phase <= Phase::Diffusing && e.step_index < 3));
}

#[test]
fn cancel_before_start_skips_the_generator() {
    let cancel = CancelFlag::new();
    cancel.raise();
    let (outcome, rx) = run_worker(
        Script::Panic,
        Arc::new(MemorySink::default()),
        cancel,
        4,
    );
    assert_eq!(outcome, WorkerOutcome::Cancelled);
    assert_eq!(collect(&rx), vec![ProgressEvent::init(4)]);
}
