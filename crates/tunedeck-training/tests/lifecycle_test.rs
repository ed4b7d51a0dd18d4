//! Lifecycle tests for the training controller, run on tokio's paused clock so every
//! timer fires deterministically.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tunedeck_data::{DatasetId, DatasetStore};
use tunedeck_training::{
    ChannelProgressSink, JobStatus, NullProgressSink, ProgressEvent, SimulatorConfig, TrainingController,
    TrainingError, TrainingJobId, TrainingParameters,
};

async fn dataset_with(store: &DatasetStore, records: usize) -> DatasetId {
    let body: Vec<_> = (0..records).map(|i| json!({"prompt": format!("q{i}"), "response": format!("a{i}")})).collect();
    store.process_file("train.json", &serde_json::to_string(&body).unwrap()).await.id
}

fn controller(store: &DatasetStore, seed: u64) -> TrainingController {
    TrainingController::with_sink(
        Arc::new(store.clone()),
        SimulatorConfig::default().with_seed(seed),
        Arc::new(NullProgressSink),
    )
    .unwrap()
}

fn params(dataset_id: DatasetId, batch_size: u32, epochs: u32) -> TrainingParameters {
    TrainingParameters { batch_size, epochs, ..TrainingParameters::for_dataset(dataset_id) }
}

async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn test_small_job_runs_to_completion() {
    let store = DatasetStore::new();
    let dataset = dataset_with(&store, 20).await;
    let controller = controller(&store, 1);

    let job = controller.start(params(dataset, 8, 3)).await.unwrap();
    assert_eq!(job.status, JobStatus::Preparing);
    assert_eq!(job.total_steps, 9);

    sleep_ms(1_500).await;
    assert_eq!(controller.get(&job.id).await.unwrap().status, JobStatus::Preparing);

    sleep_ms(30_000).await;
    let done = controller.get(&job.id).await.unwrap();
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.current_step, 9);
    assert_eq!(done.elapsed_time, 18);
    assert_eq!(done.progress, 100.0);
    assert_eq!(done.estimated_time_remaining, 0);
    assert_eq!(done.logs[done.logs.len() - 2], "INFO: Training completed successfully");
}

#[tokio::test(start_paused = true)]
async fn test_start_requires_validated_dataset() {
    let store = DatasetStore::new();
    let broken = store.process_file("broken.jsonl", "{\"a\": 1}\n{oops\n").await;
    let controller = controller(&store, 1);

    for dataset_id in [broken.id, DatasetId::from("missing")] {
        let err = controller.start(params(dataset_id, 8, 1)).await.unwrap_err();
        assert!(matches!(err, TrainingError::DatasetNotReady { .. }), "{err}");
    }
    assert!(controller.list().await.is_empty());
    assert!(controller.latest_active().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_pause_while_preparing_is_a_noop() {
    let store = DatasetStore::new();
    let dataset = dataset_with(&store, 20).await;
    let controller = controller(&store, 1);

    let job = controller.start(params(dataset, 8, 3)).await.unwrap();
    let paused = controller.pause(&job.id).await.unwrap();
    assert_eq!(paused.status, JobStatus::Preparing);
    assert_eq!(controller.stop(&job.id).await.unwrap().status, JobStatus::Preparing);
    assert_eq!(controller.resume(&job.id).await.unwrap().status, JobStatus::Preparing);

    // dispatch still happens on schedule
    sleep_ms(2_500).await;
    assert_eq!(controller.get(&job.id).await.unwrap().status, JobStatus::Training);
}

#[tokio::test(start_paused = true)]
async fn test_pause_and_resume_keep_counters() {
    let store = DatasetStore::new();
    let dataset = dataset_with(&store, 200).await;
    let controller = controller(&store, 1);
    let job = controller.start(params(dataset, 8, 3)).await.unwrap();
    assert_eq!(job.total_steps, 75);

    // dispatch at 2s, ticks at 3s..=9s
    sleep_ms(9_500).await;
    let paused = controller.pause(&job.id).await.unwrap();
    assert_eq!(paused.status, JobStatus::Paused);
    assert_eq!((paused.elapsed_time, paused.current_step), (7, 3));

    sleep_ms(60_000).await;
    let frozen = controller.get(&job.id).await.unwrap();
    assert_eq!((frozen.elapsed_time, frozen.current_step), (7, 3));
    assert_eq!(frozen.progress, paused.progress);

    let resumed = controller.resume(&job.id).await.unwrap();
    assert_eq!(resumed.status, JobStatus::Training);
    assert_eq!((resumed.elapsed_time, resumed.current_step), (7, 3));

    sleep_ms(9_500).await;
    let later = controller.get(&job.id).await.unwrap();
    assert_eq!((later.elapsed_time, later.current_step), (16, 8));
}

#[tokio::test(start_paused = true)]
async fn test_paused_run_matches_uninterrupted_run() {
    let store = DatasetStore::new();
    let dataset = dataset_with(&store, 40).await;

    let straight = controller(&store, 99);
    let a = straight.start(params(dataset.clone(), 1, 3)).await.unwrap();
    let a = straight.wait_for_terminal(&a.id).await.unwrap();

    let interrupted = controller(&store, 99);
    let b = interrupted.start(params(dataset, 1, 3)).await.unwrap();
    for _ in 0..3 {
        sleep_ms(50_500).await;
        interrupted.pause(&b.id).await.unwrap();
        sleep_ms(17_000).await;
        interrupted.resume(&b.id).await.unwrap();
    }
    let b = interrupted.wait_for_terminal(&b.id).await.unwrap();

    assert_eq!(a.total_steps, 120);
    assert_eq!(b.status, JobStatus::Completed);
    assert_eq!((a.elapsed_time, a.current_step), (b.elapsed_time, b.current_step));
    assert_eq!(a.metrics, b.metrics);
    assert_eq!(a.evaluation_metrics, b.evaluation_metrics);
    assert_eq!(a.logs, b.logs);
}

#[tokio::test(start_paused = true)]
async fn test_metric_steps_are_increasing_multiples_of_ten() {
    let store = DatasetStore::new();
    let dataset = dataset_with(&store, 57).await;
    let controller = controller(&store, 5);
    let job = controller.start(params(dataset, 2, 5)).await.unwrap();
    assert_eq!(job.total_steps, 145);

    let mut last_progress = 0.0;
    loop {
        sleep_ms(1_000).await;
        let current = controller.get(&job.id).await.unwrap();
        assert!(current.progress >= last_progress);
        assert!(current.progress < 100.0 || current.status == JobStatus::Completed);
        last_progress = current.progress;
        if current.status == JobStatus::Completed {
            break;
        }
    }

    let done = controller.get(&job.id).await.unwrap();
    let steps: Vec<u64> = done.metrics.iter().map(|m| m.step).collect();
    assert_eq!(steps, (1..=14).map(|i| i * 10).collect::<Vec<_>>());
    assert!(steps.windows(2).all(|w| w[0] < w[1]));
    assert!(steps.iter().all(|s| *s <= done.total_steps));
    assert_eq!(done.evaluation("Accuracy").unwrap().previous, 0.0);
    assert!(done.evaluation("Accuracy").unwrap().value >= 0.6);
}

#[tokio::test(start_paused = true)]
async fn test_stop_completes_without_full_progress() {
    let store = DatasetStore::new();
    let dataset = dataset_with(&store, 200).await;
    let controller = controller(&store, 1);
    let job = controller.start(params(dataset, 8, 3)).await.unwrap();

    sleep_ms(12_500).await;
    let stopped = controller.stop(&job.id).await.unwrap();
    assert_eq!(stopped.status, JobStatus::Completed);
    assert_eq!(stopped.current_step, 5);
    assert!(stopped.progress < 100.0);
    assert_eq!(stopped.logs.last().unwrap(), "INFO: Training stopped by user at step 5");

    for _ in 0..2 {
        assert_eq!(controller.pause(&job.id).await.unwrap().status, JobStatus::Completed);
        assert_eq!(controller.resume(&job.id).await.unwrap().status, JobStatus::Completed);
        assert_eq!(controller.stop(&job.id).await.unwrap().status, JobStatus::Completed);
    }

    sleep_ms(30_000).await;
    let after = controller.get(&job.id).await.unwrap();
    assert_eq!(after.current_step, 5);
    assert_eq!(after.elapsed_time, stopped.elapsed_time);
    assert_eq!(after.logs.len(), stopped.logs.len());
}

#[tokio::test(start_paused = true)]
async fn test_stop_from_paused() {
    let store = DatasetStore::new();
    let dataset = dataset_with(&store, 200).await;
    let controller = controller(&store, 1);
    let job = controller.start(params(dataset, 8, 3)).await.unwrap();

    sleep_ms(6_500).await;
    controller.pause(&job.id).await.unwrap();
    let stopped = controller.stop(&job.id).await.unwrap();
    assert_eq!(stopped.status, JobStatus::Completed);
    assert_eq!(controller.wait_for_terminal(&job.id).await.unwrap().current_step, 2);
}

#[tokio::test(start_paused = true)]
async fn test_completed_job_ignores_control_calls() {
    let store = DatasetStore::new();
    let dataset = dataset_with(&store, 20).await;
    let controller = controller(&store, 1);
    let job = controller.start(params(dataset, 8, 3)).await.unwrap();
    let done = controller.wait_for_terminal(&job.id).await.unwrap();

    assert_eq!(controller.pause(&job.id).await.unwrap().status, JobStatus::Completed);
    assert_eq!(controller.resume(&job.id).await.unwrap().status, JobStatus::Completed);
    let stopped = controller.stop(&job.id).await.unwrap();
    assert_eq!(stopped.status, JobStatus::Completed);
    assert_eq!(stopped.logs, done.logs);
    assert_eq!(stopped.progress, 100.0);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_job_ids_return_none() {
    let store = DatasetStore::new();
    let controller = controller(&store, 1);
    let id = TrainingJobId::from("ghost");

    assert!(controller.pause(&id).await.is_none());
    assert!(controller.resume(&id).await.is_none());
    assert!(controller.stop(&id).await.is_none());
    assert!(controller.wait_for_terminal(&id).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_jobs_run_independently() {
    let store = DatasetStore::new();
    let small = dataset_with(&store, 20).await;
    let large = dataset_with(&store, 200).await;
    let controller = controller(&store, 1);

    let a = controller.start(params(small, 8, 3)).await.unwrap();
    let b = controller.start(params(large, 8, 3)).await.unwrap();

    sleep_ms(10_500).await;
    controller.pause(&b.id).await.unwrap();
    assert_eq!(controller.latest_active().await.unwrap().id, b.id);

    controller.wait_for_terminal(&a.id).await.unwrap();
    let b_now = controller.get(&b.id).await.unwrap();
    assert_eq!(b_now.status, JobStatus::Paused);
    assert_eq!(b_now.current_step, 4);
    assert_eq!(controller.latest_active().await.unwrap().id, b.id);

    controller.stop(&b.id).await.unwrap();
    assert_eq!(controller.latest_active().await.unwrap().id, b.id);
    assert_eq!(controller.list().await.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_progress_events_bracket_the_run() {
    let store = DatasetStore::new();
    let dataset = dataset_with(&store, 20).await;
    let (sink, mut rx) = ChannelProgressSink::new();
    let controller = TrainingController::with_sink(
        Arc::new(store.clone()),
        SimulatorConfig::default().with_seed(3),
        Arc::new(sink),
    )
    .unwrap();

    let job = controller.start(params(dataset, 8, 3)).await.unwrap();
    controller.wait_for_terminal(&job.id).await.unwrap();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }

    assert!(matches!(events.first(), Some(ProgressEvent::Created { total_steps: 9, .. })));
    assert!(events.iter().any(|e| matches!(
        e,
        ProgressEvent::StatusChanged { from: JobStatus::Preparing, to: JobStatus::Training, .. }
    )));
    let steps = events.iter().filter(|e| matches!(e, ProgressEvent::Step { .. })).count();
    assert_eq!(steps, 18);
    assert!(matches!(events.last(), Some(ProgressEvent::Finished { step: 9, .. })));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_freezes_jobs() {
    let store = DatasetStore::new();
    let dataset = dataset_with(&store, 200).await;
    let controller = controller(&store, 1);
    let running = controller.start(params(dataset.clone(), 8, 3)).await.unwrap();

    sleep_ms(4_500).await;
    let pending = controller.start(params(dataset, 8, 3)).await.unwrap();
    controller.shutdown();

    let frozen = controller.wait_for_terminal(&running.id).await.unwrap();
    sleep_ms(30_000).await;
    let later = controller.get(&running.id).await.unwrap();
    assert_eq!(later.status, JobStatus::Training);
    assert_eq!(later.elapsed_time, frozen.elapsed_time);
    assert_eq!(controller.get(&pending.id).await.unwrap().status, JobStatus::Preparing);
}
