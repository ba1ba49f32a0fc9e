#![deny(unsafe_code)]

//! Shared test utilities for the ndg workspace.
//!
//! In-memory pipes, a recording [`screen::FakeScreen`], scriptable
//! collaborator fakes and config builders, so crate tests
//! exercise the daemon and UI runtime without processes or hardware.
//!
//! Add this crate as a `[dev-dependency]` in any workspace member:
//!
//! ```toml
//! [dev-dependencies]
//! ndg-test-utils = { workspace = true }
//! ```

pub mod collab;
pub mod config;
pub mod daemon;
pub mod pipe;
pub mod screen;
