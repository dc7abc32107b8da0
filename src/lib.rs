//! roughbanner: turn a rough banner layout sketch into an AI generated banner draft.

#![allow(clippy::multiple_crate_versions)]
#![deny(clippy::all)]
#![deny(clippy::await_holding_lock)]
#![deny(clippy::complexity)]
#![deny(clippy::correctness)]
#![deny(clippy::disallowed_methods)]
#![deny(clippy::expect_used)]
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::panic)]
#![deny(clippy::perf)]
#![deny(clippy::trivially_copy_pass_by_ref)]
#![deny(clippy::unreachable)]
#![deny(clippy::unwrap_used)]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod banner;
pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod layout;
pub mod overlay;
pub mod pipeline;
pub mod prompts;
pub mod providers;
pub mod synth;
pub mod web;
