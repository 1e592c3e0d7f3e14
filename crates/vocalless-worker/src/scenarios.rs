//! End-to-end runs of the dispatcher against fake collaborators.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use vocalless_jobs::JobRegistry;
use vocalless_models::{ItemOutcome, Job, JobId, JobOptions, JobStatus};

use crate::testing::{
    title_for, wait_for_terminal, FakeAcquirer, FakeEnhancer, FakePublisher, FakeRenderer,
    FakeStack,
};
use crate::{Collaborators, JobDispatcher, WorkerConfig};

fn urls(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("https://example.com/track{i}")).collect()
}

fn dispatcher(collaborators: Collaborators, config: WorkerConfig) -> JobDispatcher {
    JobDispatcher::new(Arc::new(JobRegistry::new()), collaborators, &config)
}

async fn run(collaborators: Collaborators, inputs: Vec<String>, options: JobOptions) -> Job {
    let dispatcher = dispatcher(collaborators, WorkerConfig::default());
    let id = dispatcher.submit(Job::new(inputs, options)).await.unwrap();
    wait_for_terminal(dispatcher.registry(), &id).await
}

async fn wait_until(registry: &JobRegistry, id: &JobId, pred: impl Fn(&Job) -> bool) -> Job {
    for _ in 0..2000 {
        let job = registry.get(id).await.unwrap();
        if pred(&job) {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition never held for job {}", id);
}

#[tokio::test]
async fn scenario_a_all_items_succeed() {
    let dir = TempDir::new().unwrap();
    let stack = FakeStack::new(dir.path());
    let inputs = urls(3);

    let job = run(stack.collaborators(), inputs.clone(), JobOptions::default()).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.progress, 100);
    assert_eq!(job.current_index, 3);
    assert_eq!(job.message, "Completed 3/3 items");
    assert_eq!(job.results.len(), 3);
    for (result, input) in job.results.iter().zip(&inputs) {
        assert_eq!(&result.source, input);
        assert_eq!(result.outcome, ItemOutcome::Succeeded);
        assert!(!result.cleanup_attempted);
        let artifact = result.artifact_ref.as_deref().unwrap();
        assert!(std::path::Path::new(artifact).exists());
    }
    // No publishing requested, so credentials are never resolved.
    assert_eq!(stack.factory.connects(), 0);
}

#[tokio::test]
async fn scenario_b_failed_item_is_isolated() {
    let dir = TempDir::new().unwrap();
    let inputs = urls(3);
    let stack = FakeStack::new(dir.path())
        .with_acquirer(FakeAcquirer::default().fail_on(&inputs[1]));

    let job = run(stack.collaborators(), inputs.clone(), JobOptions::default()).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.error.is_none());
    let outcomes: Vec<_> = job.results.iter().map(|r| r.outcome).collect();
    assert_eq!(
        outcomes,
        vec![ItemOutcome::Succeeded, ItemOutcome::Failed, ItemOutcome::Succeeded]
    );

    let failed = &job.results[1];
    assert_eq!(failed.source, inputs[1]);
    let detail = failed.failure_detail.as_deref().unwrap();
    assert!(detail.starts_with("Download failed:"), "{detail}");
    assert!(detail.contains("Video unavailable"));
    assert!(failed.title.is_none());
    assert_eq!(job.message, "Completed 2/3 items");
    assert_eq!(stack.acquirer.calls(), inputs);
}

#[tokio::test]
async fn scenario_c_collection_failure_fails_job() {
    let dir = TempDir::new().unwrap();
    let stack = FakeStack::new(dir.path())
        .with_publisher(FakePublisher::default().fail_create_collection());
    let options = JobOptions {
        publish: true,
        create_collection: true,
        add_to_collection: true,
        collection_name: "Late Night".into(),
        ..Default::default()
    };

    let job = run(stack.collaborators(), urls(2), options).await;

    assert_eq!(job.status, JobStatus::Failed);
    let error = job.error.as_deref().unwrap();
    assert!(error.starts_with("Failed to create collection:"), "{error}");
    assert_eq!(job.message, format!("Failed: {}", error));
    assert!(job.results.is_empty());
    assert!(job.progress < 100);
    assert!(stack.acquirer.calls().is_empty());
}

#[tokio::test]
async fn scenario_d_existing_collection_is_fed() {
    let dir = TempDir::new().unwrap();
    let stack = FakeStack::new(dir.path());
    let options = JobOptions {
        publish: true,
        add_to_collection: true,
        create_collection: true,
        collection_name: "Ignored".into(),
        existing_collection_id: Some("PLexisting".into()),
        ..Default::default()
    };

    let job = run(stack.collaborators(), urls(2), options).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.collection_id.as_deref(), Some("PLexisting"));
    assert_eq!(
        job.collection_url.as_deref(),
        Some("https://fake.test/collections/PLexisting")
    );
    assert!(stack.publisher.created_collections().is_empty());

    for result in &job.results {
        assert!(result.added_to_collection);
        let publish_ref = result.publish_ref.as_ref().unwrap();
        assert!(publish_ref.url.starts_with("https://fake.test/videos/"));
    }
    let added = stack.publisher.added();
    assert_eq!(added.len(), 2);
    assert!(added.iter().all(|(collection, _)| collection == "PLexisting"));
}

#[tokio::test]
async fn scenario_e_cleanup_without_persistence() {
    let dir = TempDir::new().unwrap();
    let stack = FakeStack::new(dir.path());
    let options = JobOptions {
        persist_locally: false,
        ..Default::default()
    };
    let inputs = urls(2);

    let job = run(stack.collaborators(), inputs.clone(), options).await;

    assert_eq!(job.status, JobStatus::Completed);
    for (result, input) in job.results.iter().zip(&inputs) {
        assert!(result.cleanup_attempted);
        assert!(result.files_deleted);
        let title = title_for(input);
        assert!(stack.layout.item_artifacts(&title).iter().all(|p| !p.exists()));
    }
}

#[tokio::test]
async fn scenario_e_cleanup_after_publishing() {
    let dir = TempDir::new().unwrap();
    let stack = FakeStack::new(dir.path());
    let options = JobOptions {
        publish: true,
        persist_locally: false,
        ..Default::default()
    };
    let inputs = urls(2);

    let job = run(stack.collaborators(), inputs.clone(), options).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(stack.publisher.uploads().len(), 2);
    for (result, input) in job.results.iter().zip(&inputs) {
        assert_eq!(result.outcome, ItemOutcome::Succeeded);
        assert!(result.publish_ref.is_some());
        assert!(result.cleanup_attempted);
        assert!(result.files_deleted);
        let title = title_for(input);
        assert!(!stack.layout.metadata_path(&title).exists());
        assert!(stack.layout.item_artifacts(&title).iter().all(|p| !p.exists()));
    }
}

#[tokio::test]
async fn test_supplied_collection_gets_url_without_credentials() {
    let dir = TempDir::new().unwrap();
    let stack = FakeStack::new(dir.path());
    let options = JobOptions {
        add_to_collection: true,
        existing_collection_id: Some("PLsupplied".into()),
        ..Default::default()
    };

    let job = run(stack.collaborators(), urls(1), options).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.collection_id.as_deref(), Some("PLsupplied"));
    assert_eq!(
        job.collection_url.as_deref(),
        Some("https://fake.test/collections/PLsupplied")
    );
    // Nothing to publish, so credentials are never resolved.
    assert_eq!(stack.factory.connects(), 0);
    assert!(!job.results[0].added_to_collection);
}

#[tokio::test]
async fn test_created_collection_recorded_and_published_metadata() {
    let dir = TempDir::new().unwrap();
    let stack = FakeStack::new(dir.path());
    let options = JobOptions {
        publish: true,
        create_collection: true,
        add_to_collection: true,
        collection_name: "Focus".into(),
        ..Default::default()
    };

    let job = run(stack.collaborators(), urls(1), options).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.collection_id.as_deref(), Some("PLfake1"));
    assert_eq!(stack.publisher.created_collections()[0].0, "Focus");

    let uploads = stack.publisher.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].1.title, "Artist - track1 (Instrumental Remaster)");

    // Sidecar written next to the video when outputs are kept.
    let sidecar = stack.layout.metadata_path("Artist - track1");
    let written = std::fs::read_to_string(sidecar).unwrap();
    assert!(written.contains("Instrumental Remaster"));
    assert!(job.results[0].added_to_collection);
}

#[tokio::test]
async fn test_rejected_credentials_fail_job() {
    let dir = TempDir::new().unwrap();
    let stack = FakeStack::new(dir.path()).with_rejecting_credentials();
    let options = JobOptions {
        publish: true,
        ..Default::default()
    };

    let job = run(stack.collaborators(), urls(2), options).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job
        .error
        .as_deref()
        .unwrap()
        .starts_with("Publishing auth failed:"));
    assert!(job.results.is_empty());
}

#[tokio::test]
async fn test_missing_credentials_fail_job() {
    let dir = TempDir::new().unwrap();
    let stack = FakeStack::new(dir.path());
    let mut collaborators = stack.collaborators();
    collaborators.publisher = None;
    let options = JobOptions {
        publish: true,
        ..Default::default()
    };

    let job = run(collaborators, urls(1), options).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(
        job.error.as_deref(),
        Some("Publishing auth failed: no publishing credentials configured")
    );
}

#[tokio::test]
async fn test_secondary_failures_keep_item_successful() {
    let dir = TempDir::new().unwrap();

    let stack = FakeStack::new(dir.path()).with_publisher(FakePublisher::default().fail_upload());
    let options = JobOptions {
        publish: true,
        ..Default::default()
    };
    let job = run(stack.collaborators(), urls(1), options).await;
    let result = &job.results[0];
    assert_eq!(result.outcome, ItemOutcome::Succeeded);
    assert!(result.publish_ref.is_none());
    assert!(result
        .publish_error
        .as_deref()
        .unwrap()
        .starts_with("Upload failed:"));

    let stack = FakeStack::new(dir.path())
        .with_publisher(FakePublisher::default().fail_add_to_collection());
    let options = JobOptions {
        publish: true,
        add_to_collection: true,
        existing_collection_id: Some("PLx".into()),
        ..Default::default()
    };
    let job = run(stack.collaborators(), urls(1), options).await;
    let result = &job.results[0];
    assert_eq!(result.outcome, ItemOutcome::Succeeded);
    assert!(result.publish_ref.is_some());
    assert!(!result.added_to_collection);
    assert!(result
        .collection_error
        .as_deref()
        .unwrap()
        .starts_with("Failed to add to collection:"));
}

#[tokio::test]
async fn test_enhance_failure_fails_item_with_title() {
    let dir = TempDir::new().unwrap();
    let stack = FakeStack::new(dir.path()).with_enhancer(FakeEnhancer::failing());

    let job = run(stack.collaborators(), urls(2), JobOptions::default()).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.message, "Completed 0/2 items");
    for result in &job.results {
        assert_eq!(result.outcome, ItemOutcome::Failed);
        assert!(result
            .failure_detail
            .as_deref()
            .unwrap()
            .starts_with("Mastering failed:"));
        assert!(result.title.is_some());
    }
    assert_eq!(stack.enhancer.calls(), 2);
}

#[tokio::test]
async fn test_cancel_interrupts_in_flight_item() {
    let dir = TempDir::new().unwrap();
    let stack =
        FakeStack::new(dir.path()).with_renderer(FakeRenderer::slow(Duration::from_secs(30)));
    let dispatcher = dispatcher(stack.collaborators(), WorkerConfig::default());
    let registry = dispatcher.registry().clone();

    let id = dispatcher
        .submit(Job::new(urls(3), JobOptions::default()))
        .await
        .unwrap();
    wait_until(&registry, &id, |job| job.message == "Rendering video (1/3)").await;

    assert_eq!(registry.cancel(&id).await.unwrap(), JobStatus::Cancelled);
    let job = wait_for_terminal(&registry, &id).await;
    assert_eq!(job.status, JobStatus::Cancelled);

    // Give the task time to observe the signal; nothing overwrites the state.
    for _ in 0..200 {
        if stack.renderer.cancelled() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
    let job = registry.get(&id).await.unwrap();
    assert_eq!(stack.renderer.cancelled(), 1);
    assert_eq!(job.status, JobStatus::Cancelled);
    assert_eq!(job.message, "Job cancelled by user");
    assert!(job.results.is_empty());
    assert_eq!(stack.acquirer.calls().len(), 1);
}

#[tokio::test]
async fn test_progress_is_monotonic_and_bounded() {
    let dir = TempDir::new().unwrap();
    let stack =
        FakeStack::new(dir.path()).with_renderer(FakeRenderer::slow(Duration::from_millis(15)));
    let dispatcher = dispatcher(stack.collaborators(), WorkerConfig::default());
    let registry = dispatcher.registry().clone();
    let inputs = urls(4);

    let id = dispatcher
        .submit(Job::new(inputs.clone(), JobOptions::default()))
        .await
        .unwrap();

    let mut last = 0;
    let job = loop {
        let job = registry.get(&id).await.unwrap();
        assert!(job.progress >= last);
        assert!(job.results.len() <= job.total_items);
        if !job.is_terminal() {
            assert!(job.progress <= 80);
        }
        for (result, input) in job.results.iter().zip(&inputs) {
            assert_eq!(&result.source, input);
        }
        last = job.progress;
        if job.is_terminal() {
            break job;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    };

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.progress, 100);
}

#[tokio::test]
async fn test_bounded_dispatcher_keeps_waiting_jobs_queued() {
    let dir = TempDir::new().unwrap();
    let stack =
        FakeStack::new(dir.path()).with_renderer(FakeRenderer::slow(Duration::from_millis(200)));
    let config = WorkerConfig {
        max_concurrent_jobs: 1,
        ..Default::default()
    };
    let dispatcher = dispatcher(stack.collaborators(), config);
    let registry = dispatcher.registry().clone();

    let first = dispatcher
        .submit(Job::new(urls(1), JobOptions::default()))
        .await
        .unwrap();
    wait_until(&registry, &first, |job| job.status == JobStatus::Processing).await;

    let second = dispatcher
        .submit(Job::new(vec!["https://example.com/other".into()], JobOptions::default()))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(registry.get(&second).await.unwrap().status, JobStatus::Queued);

    // Cancelling a queued job means its pipeline never starts.
    registry.cancel(&second).await.unwrap();
    let done = wait_for_terminal(&registry, &first).await;
    assert_eq!(done.status, JobStatus::Completed);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(registry.get(&second).await.unwrap().status, JobStatus::Cancelled);
    assert!(!stack
        .acquirer
        .calls()
        .contains(&"https://example.com/other".to_string()));
}
