/// Native module contains implementations of core traits
/// that launch interpreters directly as child processes,
/// without Docker, Runc or any other isolation layer.
pub mod executor;
pub mod process;
pub mod toolchain;
pub mod workspace;
