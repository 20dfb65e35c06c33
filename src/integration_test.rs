use std::{sync::Arc, time::Duration};

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::config::RunnerConfig;
use crate::core::domain::{Submission, SubmissionState, TestCase, TestState, VerdictStatus};
use crate::core::pipeline::judging::handle_judging;
use crate::core::traits::executor::Executor;
use crate::native::executor::NativeExecutor;

fn native_executor() -> (Arc<dyn Executor>, std::path::PathBuf) {
    let scratch_root =
        std::env::temp_dir().join(format!("codethinker_integration_{}", Uuid::new_v4()));
    let config = RunnerConfig::from_env()
        .expect("Invalid runner config in env")
        .with_scratch_root(&scratch_root);
    (Arc::new(NativeExecutor::new(config)), scratch_root)
}

async fn judge(submission: Submission) -> Submission {
    let (executor, scratch_root) = native_executor();
    let (res_tx, mut res_rx) = mpsc::channel(64);
    let (judge_tx, judge_rx) = mpsc::channel(1);
    handle_judging(res_tx, judge_rx, executor);

    judge_tx.send(submission).await.unwrap();

    let judged = loop {
        let submission = tokio::time::timeout(Duration::from_secs(30), res_rx.recv())
            .await
            .expect("Judging should finish")
            .unwrap();
        match submission.state {
            SubmissionState::Running { .. } => continue,
            _ => break submission,
        }
    };

    if scratch_root.exists() {
        let leftovers = std::fs::read_dir(&scratch_root).unwrap().count();
        assert_eq!(leftovers, 0, "Workspaces left in {}", scratch_root.display());
        std::fs::remove_dir(&scratch_root).unwrap();
    }
    judged
}

fn sum_test_cases() -> Vec<TestCase> {
    vec![
        TestCase::new(1, "5 3", "8"),
        TestCase::new(2, "10 -2", "8"),
        TestCase {
            is_hidden: true,
            points: 30,
            ..TestCase::new(3, "0 0", "0")
        },
    ]
}

#[tokio::test]
async fn test_correct_solution_passes() {
    let code = r#"
a, b = map(int, input().split())
print(a + b)
"#;
    let submission = Submission::new(
        Uuid::new_v4(),
        "python",
        code,
        Duration::from_secs(5),
        sum_test_cases(),
    );

    let judged = judge(submission).await;

    let SubmissionState::Judged { verdict, tests } = &judged.state else {
        panic!("Expected Judged state, actual state: {:#?}", judged.state);
    };
    assert_eq!(verdict.status, VerdictStatus::Passed);
    assert_eq!(verdict.points_awarded, 50);
    assert!(verdict.error.is_empty());
    assert!(
        tests
            .iter()
            .all(|test| matches!(test.state, TestState::Passed { .. }))
    );
}

#[tokio::test]
async fn test_wrong_solution_short_circuits() {
    // Correct only when b is positive
    let code = r#"
a, b = map(int, input().split())
print(a + abs(b))
"#;
    let submission = Submission::new(
        Uuid::new_v4(),
        "python",
        code,
        Duration::from_secs(5),
        sum_test_cases(),
    );

    let judged = judge(submission).await;

    let SubmissionState::Judged { verdict, tests } = &judged.state else {
        panic!("Expected Judged state, actual state: {:#?}", judged.state);
    };
    assert_eq!(verdict.status, VerdictStatus::Failed);
    assert_eq!(verdict.points_awarded, 10);
    assert_eq!(verdict.output, "Test case 1: Passed");
    assert_eq!(verdict.error, "Test case 2: Expected '8', got '12'");
    assert_eq!(tests[2].state, TestState::Skipped);
}

#[tokio::test]
async fn test_infinite_loop_times_out() {
    let submission = Submission::new(
        Uuid::new_v4(),
        "python",
        "while True: pass",
        Duration::from_millis(500),
        sum_test_cases(),
    );

    let judged = judge(submission).await;

    let SubmissionState::Judged { verdict, tests } = &judged.state else {
        panic!("Expected Judged state, actual state: {:#?}", judged.state);
    };
    assert_eq!(verdict.status, VerdictStatus::Failed);
    assert_eq!(verdict.points_awarded, 0);
    assert_eq!(verdict.error, "Test case 1: Execution timed out");
    assert_eq!(tests[0].state, TestState::TimedOut);
    assert_eq!(tests[1].state, TestState::Skipped);
    assert_eq!(tests[2].state, TestState::Skipped);
}

#[tokio::test]
async fn test_unsupported_language_rejected() {
    let submission = Submission::new(
        Uuid::new_v4(),
        "cobol",
        "DISPLAY 'HELLO'.",
        Duration::from_secs(5),
        sum_test_cases(),
    );

    let judged = judge(submission).await;

    assert!(matches!(
        judged.state,
        SubmissionState::InvalidRequest { ref msg } if msg.contains("cobol")
    ));
}
