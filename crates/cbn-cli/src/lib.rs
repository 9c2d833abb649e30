//! CBN CLI - terminal front end for the CBN builder
//!
//! Subcommands:
//! - `chat`: interactive session against the configured agent
//! - `seed`: print the seed network
//! - `ingest`: run a saved agent reply through the ingestion pipeline
//! - `diff`: compare two network files

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod commands;
pub mod logging;
pub mod repl;

pub use commands::{diff_command, ingest_command, read_network, seed_command};
pub use logging::{init_tracing, LogFormat};
pub use repl::{run_chat, ReplCommand};
