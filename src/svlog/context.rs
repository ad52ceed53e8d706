// Copyright (c) 2016-2020 Fabian Schuiki

//! The central data structure of the pass.
//!
//! The main piece of infrastructure provided by this module is the
//! [`GlobalContext`]. It owns the type descriptor registry — every
//! descriptor handed out by the `mkty_*` factory functions is interned, so
//! identical requests return the same descriptor — and the diagnostic sink
//! the inference engine reports through. The complementary
//! [`GlobalArenas`] owns everything that is allocated or interned while the
//! pass runs.
//!
//! # Example
//!
//! ```
//! # use mead_common::Session;
//! # use mead_svlog::{GlobalContext, GlobalArenas};
//! let sess = Session::new();
//! let arena = GlobalArenas::default();
//! let gcx = GlobalContext::new(&sess, &arena);
//! ```

use crate::ast::NodeId;
use crate::crate_prelude::*;
use crate::ty::{self, Domain, Sign, Type, TypeKind};
use mead_common::arenas::{Alloc, TypedArena};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;

/// The categories of width warnings the pass can raise.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WarnCode {
    /// A generic width mismatch.
    Width,
    /// The value loses bits in the coercion.
    WidthTrunc,
    /// The value gains bits in the coercion.
    WidthExpand,
}

impl std::fmt::Display for WarnCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            WarnCode::Width => write!(f, "WIDTH"),
            WarnCode::WidthTrunc => write!(f, "WIDTHTRUNC"),
            WarnCode::WidthExpand => write!(f, "WIDTHEXPAND"),
        }
    }
}

bitflags::bitflags! {
    /// A set of width warnings, used to suppress categories per location.
    pub struct WarnMask: u8 {
        const WIDTH       = 1 << 0;
        const WIDTHTRUNC  = 1 << 1;
        const WIDTHEXPAND = 1 << 2;
    }
}

impl WarnCode {
    /// The suppression mask bit corresponding to this warning.
    pub fn mask(self) -> WarnMask {
        match self {
            WarnCode::Width => WarnMask::WIDTH,
            WarnCode::WidthTrunc => WarnMask::WIDTHTRUNC,
            WarnCode::WidthExpand => WarnMask::WIDTHEXPAND,
        }
    }
}

/// The arenas that allocate things in the global context.
///
/// Use this struct whenever you want to allocate or internalize something
/// during the compilation procedure.
#[derive(Default)]
pub struct GlobalArenas<'t> {
    types: TypedArena<TypeKind<'t>>,
}

/// The lookup tables for a global context.
#[derive(Default)]
struct GlobalTables<'t> {
    interned_types: RefCell<HashSet<Type<'t>>>,
}

/// The central data structure of the pass. It owns the type registry and
/// collects the diagnostics the inference engine emits.
pub struct GlobalContext<'gcx> {
    /// The global compiler session.
    pub sess: &'gcx Session,
    /// The arena that owns all references.
    pub arena: &'gcx GlobalArenas<'gcx>,
    /// The tables.
    tables: GlobalTables<'gcx>,
    /// Every diagnostic emitted so far, in emission order.
    diags: RefCell<Vec<DiagBuilder2>>,
    /// The width warnings emitted so far, with their classification.
    width_warnings: RefCell<Vec<(WarnCode, Span)>>,
    /// The number of error-or-worse diagnostics emitted so far.
    errors: Cell<usize>,
}

impl<'gcx> GlobalContext<'gcx> {
    /// Create a new global context.
    pub fn new(sess: &'gcx Session, arena: &'gcx GlobalArenas<'gcx>) -> Self {
        GlobalContext {
            sess,
            arena,
            tables: Default::default(),
            diags: Default::default(),
            width_warnings: Default::default(),
            errors: Cell::new(0),
        }
    }

    /// Internalize a type.
    pub fn intern_type(&self, ty: TypeKind<'gcx>) -> Type<'gcx> {
        if let Some(&x) = self.tables.interned_types.borrow().get(&ty) {
            return x;
        }
        let ty = self.arena.types.alloc(ty);
        self.tables.interned_types.borrow_mut().insert(ty);
        ty
    }

    /// The diagnostics emitted so far.
    pub fn diagnostics(&self) -> Vec<DiagBuilder2> {
        self.diags.borrow().clone()
    }

    /// The width warnings emitted so far, with their classification.
    pub fn width_warnings(&self) -> Vec<(WarnCode, Span)> {
        self.width_warnings.borrow().clone()
    }

    /// The number of errors emitted so far.
    pub fn error_count(&self) -> usize {
        self.errors.get()
    }

    /// Check whether any error has been emitted.
    pub fn has_errors(&self) -> bool {
        self.errors.get() > 0
    }

    /// Emit a width warning, unless the location it points at suppresses
    /// the warning's category.
    ///
    /// This is the only entry point through which width warnings reach the
    /// diagnostic sink; the classification is retained alongside the
    /// rendered diagnostic.
    pub fn emit_width_warning(
        &self,
        code: WarnCode,
        span: Span,
        suppress: WarnMask,
        message: String,
    ) {
        if suppress.contains(code.mask()) {
            trace!("suppressed {} warning: {}", code, message);
            return;
        }
        self.width_warnings.borrow_mut().push((code, span));
        self.emit(DiagBuilder2::warning(message).span(span));
    }

    // ===== Descriptor factory surface =====
    //
    // These are the only ways the pass obtains descriptors. All of them are
    // idempotent: identical parameters yield the same interned descriptor.

    /// Find or create a four-valued bit vector type.
    pub fn mkty_logic(&self, width: usize, width_min: usize, sign: Sign) -> Type<'gcx> {
        self.mkty_bit_vector(Domain::FourValued, sign, width, width_min)
    }

    /// Find or create a bit vector type.
    pub fn mkty_bit_vector(
        &self,
        domain: Domain,
        sign: Sign,
        width: usize,
        width_min: usize,
    ) -> Type<'gcx> {
        assert!(
            width >= width_min && width_min >= 1,
            "malformed bit vector request: width {} < width_min {}",
            width,
            width_min
        );
        self.intern_type(TypeKind::BitVector {
            domain,
            sign,
            width,
            width_min,
            dubbed: false,
        })
    }

    /// Get the single-bit unsigned type.
    pub fn mkty_bit(&self) -> Type<'gcx> {
        &ty::BIT_TYPE
    }

    /// Get the real type.
    pub fn mkty_double(&self) -> Type<'gcx> {
        &ty::REAL_TYPE
    }

    /// Get the string type.
    pub fn mkty_string(&self) -> Type<'gcx> {
        &ty::STRING_TYPE
    }

    /// Get the void type.
    pub fn mkty_void(&self) -> Type<'gcx> {
        &ty::VOID_TYPE
    }

    /// Get the 8 bit signed type.
    pub fn mkty_signed8(&self) -> Type<'gcx> {
        &ty::BYTE_TYPE
    }

    /// Get the 32 bit signed type.
    pub fn mkty_signed32(&self) -> Type<'gcx> {
        &ty::INT_TYPE
    }

    /// Get the 32 bit unsigned type.
    pub fn mkty_unsigned32(&self) -> Type<'gcx> {
        &ty::UINT32_TYPE
    }

    /// Get the 64 bit unsigned type.
    pub fn mkty_uint64(&self) -> Type<'gcx> {
        &ty::UINT64_TYPE
    }

    /// Find or create a queue type.
    pub fn mkty_queue(&self, elem: Type<'gcx>) -> Type<'gcx> {
        self.intern_type(TypeKind::Queue(elem))
    }

    /// Find or create a fixed-size unpacked array type.
    pub fn mkty_fixed_array(&self, size: usize, elem: Type<'gcx>) -> Type<'gcx> {
        self.intern_type(TypeKind::FixedArray(size, elem))
    }

    /// Find or create an open array type.
    pub fn mkty_unsized_array(&self, elem: Type<'gcx>) -> Type<'gcx> {
        self.intern_type(TypeKind::UnsizedArray(elem))
    }

    /// Find or create a dynamic array type.
    pub fn mkty_dyn_array(&self, elem: Type<'gcx>) -> Type<'gcx> {
        self.intern_type(TypeKind::DynArray(elem))
    }

    /// Find or create an associative array type.
    pub fn mkty_assoc_array(&self, elem: Type<'gcx>, index: Type<'gcx>) -> Type<'gcx> {
        self.intern_type(TypeKind::AssocArray { elem, index })
    }

    /// Find or create an enum type.
    pub fn mkty_enum(&self, base: Type<'gcx>, def: NodeId) -> Type<'gcx> {
        self.intern_type(TypeKind::Enum { base, def })
    }

    /// Find or create a class handle type.
    pub fn mkty_class(&self, def: NodeId) -> Type<'gcx> {
        self.intern_type(TypeKind::Class(def))
    }

    /// Find or create a named alias of a type.
    pub fn mkty_named(&self, name: Spanned<Name>, ty: Type<'gcx>) -> Type<'gcx> {
        self.intern_type(TypeKind::Named(name, ty))
    }
}

impl DiagEmitter for GlobalContext<'_> {
    fn emit(&self, diag: DiagBuilder2) {
        let sev = diag.get_severity();
        if sev >= Severity::Error {
            self.errors.set(self.errors.get() + 1);
        }
        self.diags.borrow_mut().push(diag.clone());
        self.sess.emit(diag);

        // If this is anything more than a warning, emit a backtrace in debug
        // builds.
        if sev >= Severity::Warning {
            trace!(
                "Diagnostic triggered here:\n{:?}",
                backtrace::Backtrace::new()
            );
        }
    }
}
