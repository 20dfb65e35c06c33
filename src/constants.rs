use std::time::Duration;

pub const SUBMISSION_TX_ERR: &str = "Failed to send submission to res_tx";

pub const SCRATCH_DIR_NAME: &str = "codethinker";
pub const INPUT_FILE_NAME: &str = "input.txt";

pub const DEFAULT_PYTHON_PATH: &str = "python3";
pub const DEFAULT_DOTNET_PATH: &str = "dotnet";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_KILL_GRACE_PERIOD: Duration = Duration::from_millis(100);
pub const DEFAULT_OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Advisory only, nothing measures or caps memory.
pub const DEFAULT_MAX_MEMORY_KB: u64 = 128_000;

pub const DEFAULT_TEST_CASE_POINTS: u32 = 10;
