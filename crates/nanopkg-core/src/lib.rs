//! Shared primitives for the nanopkg transaction engine.
//!
//! This crate provides foundations used throughout the workspace:
//! - the error taxonomy (`Error`/`ErrorCode`) described in the error handling design
//! - control-stanza parsing/rendering shared by the repository loader and status store

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod control;
pub mod error;

pub use control::{parse_many, render_many, Stanza};
pub use error::{Error, ErrorCode, Result};

/// Global allocator using mimalloc for high performance.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;
