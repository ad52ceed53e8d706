// Copyright (c) 2016-2020 Fabian Schuiki

//! This crate implements the SystemVerilog width and type inference pass of
//! the mead compiler framework.
//!
//! The pass operates on an [`ast::Ast`] that parsing, name resolution, and
//! elaboration have already produced. It computes a concrete
//! [`ty::Type`] for every expression node, rewrites the tree in place to
//! insert explicit widening, narrowing, and domain conversion nodes where
//! an operand's natural type disagrees with the type its context requires,
//! and reports diagnostics through the [`GlobalContext`] when a mismatch
//! cannot be resolved safely. See [`typeck::run`] for the entry point.

/// Raise an internal consistency failure: emit a bug diagnostic at the given
/// span and abort the compilation.
macro_rules! bug_span {
    ($span:expr, $cx:expr, $($fmt:tt)*) => {{
        let d = DiagBuilder2::bug(format!($($fmt)*)).span($span);
        $cx.emit(d.clone());
        panic!("{}", d);
    }};
}

pub mod ast;
pub mod context;
pub mod ty;
pub mod typeck;

pub use crate::context::{GlobalArenas, GlobalContext, WarnCode, WarnMask};
pub use crate::ty::{Type, TypeKind};
pub use crate::typeck::{Determ, Stage, TypeContext, Typeck};

/// Items commonly used within the crate.
#[allow(unused_imports)]
mod crate_prelude {
    pub(crate) use crate::{
        ast,
        context::{GlobalArenas, GlobalContext, WarnCode, WarnMask},
        ty, typeck,
    };
    pub use log::{debug, error, trace, warn};
    pub use mead_common::{
        errors::{DiagBuilder2, DiagEmitter, Severity},
        name::{get_name_table, Name, RcStr},
        source::{Span, Spanned, INVALID_SPAN},
        util::{levenshtein_distance, SpellCheck},
        Result, Session, Verbosity,
    };
}
