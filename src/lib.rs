//! relup: a client-side application update manager core.

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Config
pub mod config;

// Commands and args
pub mod command;

// SHA1 artifact hashing, used throughout C3/C7/C10
pub mod hash;

// The Release Manifest Codec (C1)
pub mod manifest;

// The on-disk artifact store (C3) and self-rewriting manifest (C10)
pub mod store;

// The Global Install Lock (C4)
pub mod lock;

// Remote/local artifact and manifest retrieval (C5)
pub mod fetch;

// The generic bounded-fan-out worker pool used by fetch/hashcheck
pub mod pool;

// Reconciliation and update planning (C6)
pub mod planner;

// Delta/full package composition (C7)
pub mod compose;

// The Installer state machine (C8)
pub mod install;

// AppSetup capability discovery and the isolated POST_INSTALL runtime
pub mod postinstall;

// The Update Pipeline (C9)
pub mod pipeline;


// Small util bits
mod util;


// CLI Commands
mod cmd;
