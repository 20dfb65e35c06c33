use std::sync::Arc;

use tokio::sync::mpsc::{Receiver, Sender};

use crate::{
    constants::SUBMISSION_TX_ERR,
    core::{
        domain::{
            ExecutionRequest, ExecutionResult, Language, Submission, SubmissionState, Test,
            TestCase, TestState, Verdict, VerdictStatus,
        },
        traits::executor::{ExecuteError, Executor},
    },
};

#[tracing::instrument(skip_all)]
pub fn handle_judging(
    res_tx: Sender<Submission>,
    mut judge_rx: Receiver<Submission>,
    executor: Arc<dyn Executor>,
) {
    tokio::spawn(async move {
        while let Some(submission) = judge_rx.recv().await {
            let executor = executor.clone();
            let res_tx = res_tx.clone();

            tokio::spawn(async move {
                judge_submission(submission, &res_tx, &executor).await;
            });
        }
    });
}

/// Runs the submission's test cases one at a time in ascending order and
/// stops at the first one that does not pass.
///
/// Every state change is published on `res_tx`; the final state is also
/// returned.
pub async fn judge_submission(
    submission: Submission,
    res_tx: &Sender<Submission>,
    executor: &Arc<dyn Executor>,
) -> Submission {
    tracing::debug!("Judging submission: {:?}", submission.id);

    let language = match submission.language.parse::<Language>() {
        Ok(language) => language,
        Err(e) => return publish(res_tx, invalid_request(&submission, e.to_string())).await,
    };

    if submission.test_cases.is_empty() {
        let msg = "No test cases found for this challenge".to_string();
        return publish(res_tx, invalid_request(&submission, msg)).await;
    }

    let mut test_cases = submission.test_cases.clone();
    test_cases.sort_by_key(|test_case| test_case.order);

    let mut tests: Vec<Test> = test_cases
        .iter()
        .map(|test_case| Test {
            order: test_case.order,
            state: TestState::Pending,
        })
        .collect();
    let submission = publish(
        res_tx,
        submission.change_state(SubmissionState::Running {
            tests: tests.clone(),
        }),
    )
    .await;

    let mut tally = Tally::default();

    for (test_idx, test_case) in test_cases.iter().enumerate() {
        tests[test_idx].state = TestState::Running;
        publish_running(res_tx, &submission, &tests).await;

        let request = ExecutionRequest::new(
            language,
            &submission.code,
            &test_case.input,
            submission.timeout,
        );
        let result = match executor.execute(&request).await {
            Ok(result) => result,
            Err(e) => return publish(res_tx, internal_error(&submission, e)).await,
        };

        tests[test_idx].state = check(test_case, &result);
        tally.record(test_case, &tests[test_idx].state, &result);
        publish_running(res_tx, &submission, &tests).await;

        if tally.failed() {
            for test in tests.iter_mut().skip(test_idx + 1) {
                test.state = TestState::Skipped;
            }
            break;
        }
    }

    let verdict = tally.into_verdict();
    tracing::info!(
        "Submission {} judged: {:?} with {} points",
        submission.id,
        verdict.status,
        verdict.points_awarded
    );
    publish(
        res_tx,
        submission.change_state(SubmissionState::Judged { verdict, tests }),
    )
    .await
}

/// Compares trimmed output case-insensitively.
pub fn outputs_match(actual: &str, expected: &str) -> bool {
    actual.trim().to_lowercase() == expected.trim().to_lowercase()
}

fn check(test_case: &TestCase, result: &ExecutionResult) -> TestState {
    if result.timed_out {
        TestState::TimedOut
    } else if !result.success {
        TestState::RuntimeError {
            exit_code: result.exit_code,
            stderr: result.stderr.clone(),
        }
    } else if !outputs_match(&result.stdout, &test_case.expected_output) {
        TestState::WrongAnswer {
            expected: test_case.expected_output.clone(),
            actual: result.stdout.trim().to_string(),
        }
    } else {
        TestState::Passed {
            points: test_case.points,
            execution_time_ms: result.execution_time_ms,
        }
    }
}

#[derive(Debug, Default)]
struct Tally {
    points: u32,
    execution_time_ms: u64,
    passed: Vec<String>,
    failure: Option<String>,
}

impl Tally {
    fn record(&mut self, test_case: &TestCase, state: &TestState, result: &ExecutionResult) {
        self.execution_time_ms = self
            .execution_time_ms
            .saturating_add(result.execution_time_ms);

        match state {
            TestState::Passed { points, .. } => {
                self.points = self.points.saturating_add(*points);
                self.passed
                    .push(format!("Test case {}: Passed", test_case.order));
            }
            TestState::TimedOut => {
                self.failure = Some(format!(
                    "Test case {}: Execution timed out",
                    test_case.order
                ));
            }
            _ => {
                self.failure = Some(format!(
                    "Test case {}: Expected '{}', got '{}'",
                    test_case.order,
                    test_case.expected_output,
                    result.stdout.trim()
                ));
            }
        }
    }

    fn failed(&self) -> bool {
        self.failure.is_some()
    }

    fn into_verdict(self) -> Verdict {
        let status = if self.failed() {
            VerdictStatus::Failed
        } else {
            VerdictStatus::Passed
        };

        Verdict {
            status,
            points_awarded: self.points,
            execution_time_ms: self.execution_time_ms,
            output: self.passed.join("\n"),
            error: self.failure.unwrap_or_default(),
        }
    }
}

fn invalid_request(submission: &Submission, msg: String) -> Submission {
    tracing::debug!("Invalid submission {}: {}", submission.id, msg);
    submission.change_state(SubmissionState::InvalidRequest { msg })
}

fn internal_error(submission: &Submission, error: ExecuteError) -> Submission {
    tracing::error!("Internal error while judging {}: {}", submission.id, error);
    submission.change_state(SubmissionState::InternalError {
        msg: error.to_string(),
    })
}

async fn publish_running(res_tx: &Sender<Submission>, submission: &Submission, tests: &[Test]) {
    publish(
        res_tx,
        submission.change_state(SubmissionState::Running {
            tests: tests.to_vec(),
        }),
    )
    .await;
}

async fn publish(res_tx: &Sender<Submission>, submission: Submission) -> Submission {
    res_tx
        .send(submission.clone())
        .await
        .expect(SUBMISSION_TX_ERR);
    submission
}
