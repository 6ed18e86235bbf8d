//! Polls a translation service until a job finishes.
//!
//! [`client::TranslationClient`] is the entry point. It drives a
//! [`poller::StatusPoller`] that re-queries `GET /status/{job_id}` with
//! jittered exponential backoff until the job completes, fails, or the
//! caller's timeout elapses.

pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod domain;
pub mod error;
pub mod infra;
pub mod mock_server;
pub mod poller;
pub mod term;
