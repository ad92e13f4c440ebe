//! Configuration and profile management core for the fuzzy-control panel
//!
//! The controller edits profiles through a [`context::ControllerContext`];
//! the automation worker reads them through a [`worker::WorkerView`]. The two
//! share only the data directory and the run-state word.

#![forbid(unsafe_code)]

pub mod catalog;
pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod persistence;
pub mod run_state;
pub mod validation;
pub mod worker;
