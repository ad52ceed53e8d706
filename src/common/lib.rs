// Copyright (c) 2016-2020 Fabian Schuiki

//! This crate contains the fundamental utilities used by the rest of the mead
//! compiler framework.

pub mod arenas;
pub mod errors;
pub mod name;
pub mod source;
pub mod util;

pub use self::name::Name;

/// A result type whose error side carries no payload. The actual error is
/// reported through a [`DiagEmitter`](errors::DiagEmitter); the `Err` variant
/// merely aborts the computation that produced it.
pub type Result<T> = std::result::Result<T, ()>;

/// A global compilation session.
pub struct Session {
    pub opts: SessionOptions,
}

impl Session {
    /// Create a new session with default options.
    pub fn new() -> Session {
        Session {
            opts: SessionOptions {
                verbosity: Verbosity::empty(),
            },
        }
    }

    /// Emit a diagnostic to the standard error stream.
    pub fn emit(&self, diag: errors::DiagBuilder2) {
        eprintln!("{}", diag);
    }
}

impl Default for Session {
    fn default() -> Session {
        Session::new()
    }
}

/// Session options controlling what additional information the compiler
/// prints as it runs.
#[derive(Debug)]
pub struct SessionOptions {
    pub verbosity: Verbosity,
}

bitflags::bitflags! {
    /// The verbosity of the session.
    pub struct Verbosity: u8 {
        const TYPES      = 1 << 0;
        const EXPR_TYPES = 1 << 1;
        const NAMES      = 1 << 2;
    }
}
