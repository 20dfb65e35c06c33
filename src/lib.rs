//! Supervised execution of untrusted submissions: stage source into a
//! private workspace, run the interpreter with a wall-clock timeout, kill the
//! whole process tree on expiry and always clean up.

pub mod config;
pub mod constants;
pub mod core;
pub mod native;

#[cfg(test)]
mod integration_test;
