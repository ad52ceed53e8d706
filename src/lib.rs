// Copyright (c) 2016-2020 Fabian Schuiki

//! A compiler framework for hardware description languages.
//!
//! This crate ties the mead member crates together. The common crate
//! provides diagnostics, source management, and name interning; the svlog
//! crate implements the SystemVerilog width and type inference pass.

pub use mead_common as common;
pub use mead_svlog as svlog;

pub use crate::common::Session;
