use std::{fmt, str::FromStr, time::Duration};

use uuid::Uuid;

use crate::{
    constants::{DEFAULT_MAX_MEMORY_KB, DEFAULT_TEST_CASE_POINTS},
    core::traits::executor::ExecuteError,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Language {
    Python,
    CSharp,
}

impl Language {
    pub fn tag(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::CSharp => "csharp",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Language {
    type Err = ExecuteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "python" => Ok(Language::Python),
            "csharp" | "c#" | "cs" => Ok(Language::CSharp),
            _ => Err(ExecuteError::UnsupportedLanguage(s.to_string())),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ExecutionRequest {
    pub language: Language,
    pub source_code: String,
    pub stdin: String,
    pub timeout: Duration,
    /// Accepted for compatibility, never enforced.
    pub max_memory_kb: u64,
}

impl ExecutionRequest {
    pub fn new(language: Language, source_code: &str, stdin: &str, timeout: Duration) -> Self {
        Self {
            language,
            source_code: source_code.to_string(),
            stdin: stdin.to_string(),
            timeout,
            max_memory_kb: DEFAULT_MAX_MEMORY_KB,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process timed out or never started.
    pub exit_code: Option<i32>,
    pub execution_time_ms: u64,
    pub memory_used_kb: u64,
    pub timed_out: bool,
}

impl ExecutionResult {
    pub fn output(&self) -> &str {
        &self.stdout
    }

    pub fn error(&self) -> &str {
        &self.stderr
    }

    pub fn timed_out(timeout: Duration, execution_time_ms: u64) -> Self {
        Self {
            stderr: format!("Execution timed out after {}ms", timeout.as_millis()),
            execution_time_ms,
            timed_out: true,
            ..Default::default()
        }
    }

    pub fn infrastructure_failure(msg: String, execution_time_ms: u64) -> Self {
        Self {
            stderr: msg,
            execution_time_ms,
            ..Default::default()
        }
    }

    /// Any stderr output fails the run, even with a zero exit code.
    pub fn exited(exit_code: i32, stdout: String, stderr: String, execution_time_ms: u64) -> Self {
        Self {
            success: exit_code == 0 && stderr.is_empty(),
            stdout,
            stderr,
            exit_code: Some(exit_code),
            execution_time_ms,
            memory_used_kb: 0,
            timed_out: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestCase {
    pub order: u32,
    pub input: String,
    pub expected_output: String,
    pub is_hidden: bool,
    pub points: u32,
}

impl TestCase {
    pub fn new(order: u32, input: &str, expected_output: &str) -> Self {
        Self {
            order,
            input: input.to_string(),
            expected_output: expected_output.to_string(),
            is_hidden: false,
            points: DEFAULT_TEST_CASE_POINTS,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Submission {
    pub id: Uuid,
    pub challenge_id: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    /// Raw tag as received, parsed when judging starts.
    pub language: String,
    pub code: String,
    pub timeout: Duration,
    pub test_cases: Vec<TestCase>,
    pub state: SubmissionState,
}

impl Submission {
    pub fn new(
        challenge_id: Uuid,
        language: &str,
        code: &str,
        timeout: Duration,
        test_cases: Vec<TestCase>,
    ) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: Uuid::new_v4(),
            challenge_id,
            created_at: now,
            updated_at: now,
            language: language.to_string(),
            code: code.to_string(),
            timeout,
            test_cases,
            state: SubmissionState::default(),
        }
    }

    pub fn change_state(&self, new_state: SubmissionState) -> Self {
        Self {
            state: new_state,
            updated_at: chrono::Utc::now(),
            ..self.clone()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SubmissionState {
    #[default]
    Pending,
    InvalidRequest {
        msg: String,
    },
    Running {
        tests: Vec<Test>,
    },
    Judged {
        verdict: Verdict,
        tests: Vec<Test>,
    },
    InternalError {
        msg: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Test {
    pub order: u32,
    pub state: TestState,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TestState {
    Pending,
    Running,
    Passed {
        points: u32,
        execution_time_ms: u64,
    },
    WrongAnswer {
        expected: String,
        actual: String,
    },
    RuntimeError {
        exit_code: Option<i32>,
        stderr: String,
    },
    TimedOut,
    /// Not run because an earlier test failed.
    Skipped,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerdictStatus {
    Passed,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verdict {
    pub status: VerdictStatus,
    pub points_awarded: u32,
    pub execution_time_ms: u64,
    pub output: String,
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_from_str() {
        assert_eq!("python".parse::<Language>().unwrap(), Language::Python);
        assert_eq!("Python".parse::<Language>().unwrap(), Language::Python);
        assert_eq!("CSHARP".parse::<Language>().unwrap(), Language::CSharp);
        assert_eq!("c#".parse::<Language>().unwrap(), Language::CSharp);
        assert_eq!(" python\n".parse::<Language>().unwrap(), Language::Python);

        let err = "cobol".parse::<Language>().unwrap_err();
        assert!(matches!(err, ExecuteError::UnsupportedLanguage(ref tag) if tag == "cobol"));
    }

    #[test]
    fn test_stderr_fails_clean_exit() {
        let result = ExecutionResult::exited(0, "ok\n".to_string(), "warning\n".to_string(), 5);

        assert!(!result.success);
        assert_eq!(result.exit_code, Some(0));
        assert_eq!(result.output(), "ok\n");
        assert_eq!(result.error(), "warning\n");
    }

    #[test]
    fn test_clean_exit_succeeds() {
        let result = ExecutionResult::exited(0, "ok\n".to_string(), String::new(), 5);
        assert!(result.success);
        assert!(!result.timed_out);
    }

    #[test]
    fn test_timed_out_result() {
        let result = ExecutionResult::timed_out(Duration::from_millis(1500), 1503);

        assert!(result.timed_out);
        assert!(!result.success);
        assert_eq!(result.exit_code, None);
        assert!(result.stdout.is_empty());
        assert_eq!(result.stderr, "Execution timed out after 1500ms");
        assert_eq!(result.memory_used_kb, 0);
    }
}
