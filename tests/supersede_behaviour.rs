// tests/supersede_behaviour.rs

use checkrun_test_utils::builders::RegistryBuilder;
use checkrun_test_utils::fake_executor::{Script, ScriptedExecutor};
use checkrun_test_utils::fake_provisioner::FakeProvisioner;
use checkrun_test_utils::{init_tracing, with_timeout};

use std::sync::Arc;
use std::time::Duration;

use checkrun::cancel::CancelSignal;
use checkrun::engine::{Dispatcher, Orchestrator, Run, RunId, RunStatus, RuntimeOptions, Supervisor};
use checkrun::event::Event;
use checkrun::job::{FailureCause, JobStatus};
use checkrun::trigger::TriggerListener;
use checkrun::types::SupersedeBehaviour;

fn dispatcher(
    behaviour: SupersedeBehaviour,
    provisioner: Arc<FakeProvisioner>,
    executor: Arc<ScriptedExecutor>,
) -> Dispatcher<FakeProvisioner, ScriptedExecutor> {
    let registry = RegistryBuilder::project_checks().build();
    let trigger = TriggerListener::new(&["master".to_string()], registry).unwrap();
    let orchestrator = Orchestrator::new(provisioner, executor, RuntimeOptions::default());
    Dispatcher::new(trigger, Supervisor::new(behaviour), orchestrator)
}

fn assert_all_cancelled(run: &Run) {
    assert!(run.is_terminal());
    for result in run.results() {
        assert_eq!(result.status, JobStatus::Errored, "{}", result.job);
        assert_eq!(result.cause, Some(FailureCause::Cancelled), "{}", result.job);
    }
    assert_eq!(run.status(), RunStatus::Failure);
}

#[tokio::test]
async fn newer_push_cancels_in_flight_run() {
    init_tracing();
    let provisioner = Arc::new(FakeProvisioner::new());
    let mut executor = ScriptedExecutor::new();
    for job in ["license-year", "black", "pyflakes", "pytest"] {
        executor = executor.script(job, Script::WaitForCancel);
    }
    let mut dispatcher = dispatcher(
        SupersedeBehaviour::Cancel,
        Arc::clone(&provisioner),
        Arc::new(executor),
    );

    let first = dispatcher.submit(Event::push("master", "aaa")).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    let second = dispatcher.submit(Event::push("master", "bbb")).unwrap();
    assert_eq!(first.run_id(), RunId(1));
    assert_eq!(second.run_id(), RunId(2));

    let first = with_timeout(first.wait()).await.unwrap();
    assert_all_cancelled(&first);

    // The second run is still in flight until it is cancelled as well.
    assert_eq!(dispatcher.active_runs(), 1);
    dispatcher.cancel_all();
    let second = with_timeout(second.wait()).await.unwrap();
    assert_all_cancelled(&second);
    assert_eq!(dispatcher.active_runs(), 0);

    // Cancelled jobs released their environments.
    for (job, path) in provisioner.workspaces() {
        assert!(!path.exists(), "workspace of {job} left behind");
    }
}

#[tokio::test]
async fn independent_runs_both_complete() {
    init_tracing();
    let executor = Arc::new(ScriptedExecutor::new().delay(Duration::from_millis(200)));
    let mut dispatcher = dispatcher(
        SupersedeBehaviour::Independent,
        Arc::new(FakeProvisioner::new()),
        Arc::clone(&executor),
    );

    let first = dispatcher.submit(Event::push("master", "aaa")).unwrap();
    let second = dispatcher.submit(Event::push("master", "bbb")).unwrap();

    let first = with_timeout(first.wait()).await.unwrap();
    let second = with_timeout(second.wait()).await.unwrap();
    assert_eq!(first.status(), RunStatus::Success);
    assert_eq!(second.status(), RunStatus::Success);
    assert_eq!(executor.executed().len(), 8);
}

#[tokio::test]
async fn pull_request_does_not_supersede_branch_push() {
    init_tracing();
    let executor = Arc::new(ScriptedExecutor::new().delay(Duration::from_millis(200)));
    let mut dispatcher = dispatcher(
        SupersedeBehaviour::Cancel,
        Arc::new(FakeProvisioner::new()),
        executor,
    );

    let push = dispatcher.submit(Event::push("master", "aaa")).unwrap();
    let pr = dispatcher
        .submit(Event::pull_request("master", "bbb", Some(12)))
        .unwrap();

    assert_eq!(with_timeout(push.wait()).await.unwrap().status(), RunStatus::Success);
    assert_eq!(with_timeout(pr.wait()).await.unwrap().status(), RunStatus::Success);
}

#[tokio::test]
async fn untracked_branch_is_not_admitted() {
    init_tracing();
    let executor = Arc::new(ScriptedExecutor::new());
    let mut dispatcher = dispatcher(
        SupersedeBehaviour::Independent,
        Arc::new(FakeProvisioner::new()),
        Arc::clone(&executor),
    );

    assert!(dispatcher.submit(Event::push("feature/x", "aaa")).is_none());
    assert_eq!(dispatcher.active_runs(), 0);
    assert!(executor.executed().is_empty());
}

#[tokio::test]
async fn run_timeout_marks_run_stalled() {
    init_tracing();
    let registry = RegistryBuilder::project_checks().build();
    let provisioner = Arc::new(FakeProvisioner::new());
    let executor = Arc::new(ScriptedExecutor::new().script("pytest", Script::WaitForCancel));
    let orchestrator = Orchestrator::new(
        Arc::clone(&provisioner),
        executor,
        RuntimeOptions {
            run_timeout: Some(Duration::from_millis(300)),
        },
    );

    let run = Run::new(RunId(1), Event::push("master", "abc"), registry);
    let run = with_timeout(orchestrator.execute(run, CancelSignal::never()))
        .await
        .unwrap();

    assert_eq!(run.status(), RunStatus::Stalled);
    assert_eq!(run.missing_jobs(), vec!["pytest"]);
    assert_eq!(run.results().len(), 3);

    // Aborted jobs drop their environment.
    tokio::time::sleep(Duration::from_millis(100)).await;
    for (job, path) in provisioner.workspaces() {
        assert!(!path.exists(), "workspace of {job} left behind");
    }
}

#[tokio::test]
async fn executing_a_run_twice_is_an_error() {
    init_tracing();
    let registry = RegistryBuilder::project_checks().build();
    let orchestrator = Orchestrator::new(
        Arc::new(FakeProvisioner::new()),
        Arc::new(ScriptedExecutor::new()),
        RuntimeOptions::default(),
    );
    let mut run = Run::new(RunId(1), Event::push("master", "abc"), registry);
    let _ = run.take_executions();

    assert!(orchestrator.execute(run, CancelSignal::never()).await.is_err());
}
