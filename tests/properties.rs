// tests/properties.rs

mod common;
use checkrun_test_utils::builders::{JobDefinitionBuilder, RegistryBuilder};
use checkrun_test_utils::fake_executor::{Script, ScriptedExecutor};
use checkrun_test_utils::fake_provisioner::FakeProvisioner;
use crate::common::{run_once, statuses};

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;

use checkrun::engine::{RunStatus, verdict};
use checkrun::errors::ProvisioningError;
use checkrun::event::Event;
use checkrun::job::{JobResult, JobStatus};

fn block_on<F: std::future::Future>(f: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(f)
}

fn result_strategy() -> impl Strategy<Value = JobResult> {
    (0..4u8, "[a-z]{1,8}").prop_map(|(kind, name)| match kind {
        0 => JobResult::from_exit(name, 0, String::new(), Duration::ZERO),
        1 => JobResult::from_exit(name, 2, String::new(), Duration::ZERO),
        2 => JobResult::provisioning_failed(
            ProvisioningError::new(name, "checkout", "unreachable"),
            Duration::ZERO,
        ),
        _ => JobResult::timed_out(name, Duration::from_secs(1), String::new(), Duration::ZERO),
    })
}

const STEPS: [&str; 3] = ["checkout", "install_runtime", "install_manifest"];

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn success_iff_every_job_succeeded(results in proptest::collection::vec(result_strategy(), 1..8)) {
        let all_ok = results.iter().all(|r| r.status == JobStatus::Succeeded);
        prop_assert_eq!(verdict(&results) == RunStatus::Success, all_ok);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    // A provisioning fault in one job never changes another job's status.
    #[test]
    fn provisioning_faults_stay_local(
        faulty in proptest::collection::btree_set(0..5usize, 0..5),
        failing in proptest::collection::btree_set(0..5usize, 0..3),
        step in 0..3usize,
    ) {
        let names: Vec<String> = (0..5).map(|i| format!("job{i}")).collect();
        let mut builder = RegistryBuilder::new();
        for name in names.iter() {
            builder = builder.job(JobDefinitionBuilder::new(name).manifest("requirements.txt").build());
        }
        let registry = builder.build();

        let mut executor = ScriptedExecutor::new();
        for i in failing.iter() {
            executor = executor.script(&names[*i], Script::Fail(1));
        }
        let executor = Arc::new(executor);

        let baseline = block_on(run_once(
            Arc::clone(&registry),
            Arc::new(FakeProvisioner::new()),
            Arc::clone(&executor),
            Event::push("master", "abc"),
        ));

        let mut provisioner = FakeProvisioner::new();
        for i in faulty.iter() {
            provisioner = provisioner.fail(&names[*i], STEPS[step]);
        }
        let faulted = block_on(run_once(
            Arc::clone(&registry),
            Arc::new(provisioner),
            executor,
            Event::push("master", "abc"),
        ));

        let faulty_names: BTreeSet<&str> = faulty.iter().map(|i| names[*i].as_str()).collect();
        for ((name, before), (_, after)) in statuses(&baseline).into_iter().zip(statuses(&faulted)) {
            if faulty_names.contains(name.as_str()) {
                prop_assert_eq!(after, JobStatus::Errored);
            } else {
                prop_assert_eq!(after, before, "job {} changed status", name);
            }
        }
    }
}
