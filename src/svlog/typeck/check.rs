// Copyright (c) 2016-2020 Fabian Schuiki

//! The check-and-coerce family.
//!
//! Every type decision of the inference pass funnels through
//! [`Typeck::iterate_check`]: operator rules hand it a child together with
//! the type the context requires, and it either accepts the child, splices
//! an explicit conversion between child and parent, or reports a
//! diagnostic. There is exactly one mismatch-resolution algorithm; the
//! wrappers in [`super::helpers`] merely fix common parameter
//! combinations.

use super::{Determ, Stage, TypeContext, Typeck};
use crate::ast::{BinaryOp, NodeId, NodeKind};
use crate::crate_prelude::*;
use crate::ty::{self, Type};
use num::Signed as _;

/// How a too-narrow operand is widened to its expected width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtendRule {
    /// Sign-extend if both the expected type and the operand are signed.
    Expected,
    /// Always extend with zeros.
    Zero,
    /// Sign-extend if the operand itself is signed.
    Lhs,
    /// Do not extend.
    Off,
}

impl<'a, 'gcx> Typeck<'a, 'gcx> {
    /// Check a child against the type its context expects and coerce it if
    /// necessary.
    ///
    /// If the prelim stage is requested the child is first resolved
    /// self-determined. If the final stage is requested the child's
    /// resolved type is compared against `exp`: width disagreements between
    /// integral types are repaired by splicing an extension or truncation
    /// between child and parent (warning per [`ExtendRule`] and `warn_on`),
    /// domain disagreements by splicing the domain conversion, and
    /// irreparable mismatches are reported naming both types. Returns the
    /// node now occupying the child's operand slot.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn iterate_check(
        &mut self,
        parent: NodeId,
        side: &str,
        under: NodeId,
        determ: Determ,
        stage: Stage,
        exp: Type<'gcx>,
        extend: ExtendRule,
        warn_on: bool,
    ) -> NodeId {
        if determ == Determ::ContextDet && stage.contains(Stage::PRELIM) {
            bug_span!(
                self.span(parent),
                self.cx,
                "context-determined check request only allowed as a final step"
            );
        }
        let mut under = under;
        if stage.contains(Stage::PRELIM) {
            self.iterate(under, TypeContext::self_det(Stage::PRELIM));
        }
        if stage.contains(Stage::FINAL) {
            let uty = self.node_ty(under);
            let exp_r = exp.resolve();
            let uty_r = uty.resolve();
            if exp_r.is_error() || uty_r.is_error() {
                return under;
            }
            if exp_r.is_double() {
                if !uty_r.is_double() {
                    if uty_r.is_integral() {
                        // Let the child finish at its natural type before
                        // the conversion reinterprets it.
                        self.iterate(under, TypeContext::with_type(uty, Stage::FINAL));
                        under = self.splice_cvt_real(parent, under);
                    } else {
                        self.type_error(parent, side, under, exp);
                    }
                }
            } else if uty_r.is_double() {
                if exp_r.is_integral() {
                    under = self.splice_cvt_int(parent, under);
                    under = self.width_check_sized(parent, side, under, exp, extend, warn_on);
                } else {
                    self.type_error(parent, side, under, exp);
                }
            } else if exp_r.is_string() {
                if !uty_r.is_string() {
                    if uty_r.is_integral() {
                        self.iterate(under, TypeContext::with_type(uty, Stage::FINAL));
                    }
                    under = self.splice_cvt_string(parent, under);
                }
            } else if uty_r.is_string() {
                // There is no implicit conversion out of a string.
                self.type_error(parent, side, under, exp);
            } else if exp_r.is_class() {
                self.check_class_assign(parent, side, under, exp);
            } else if exp_r.is_integral() {
                if uty_r.is_integral() {
                    // Re-finalize the child against the expected type so
                    // context-determined subtrees adopt it, then fix up the
                    // widths.
                    self.iterate(under, TypeContext::with_type(exp, Stage::FINAL));
                    under = self.width_check_sized(parent, side, under, exp, extend, warn_on);
                } else if uty_r.packed_bits().is_some() {
                    under = self.splice_pack_array(parent, under);
                    under = self.width_check_sized(parent, side, under, exp, extend, warn_on);
                } else {
                    self.type_error(parent, side, under, exp);
                }
            } else if !ty::identical(exp, uty) {
                // Aggregates must match structurally; nothing can be
                // spliced to reconcile them.
                self.type_error(parent, side, under, exp);
            }
        }
        under
    }

    /// Check whether a width mismatch between an operand and its expected
    /// type warrants a warning. Operands whose minimum width matches the
    /// expectation (unsized values that fit) are fine.
    pub(crate) fn width_bad(
        &self,
        u_width: usize,
        u_width_min: usize,
        exp_width: usize,
        exp_width_min: usize,
    ) -> bool {
        if u_width == exp_width {
            return false;
        }
        if u_width_min == exp_width_min {
            return false;
        }
        true
    }

    /// Compare an integral child against an expected vector type, warn on
    /// suspicious mismatches, and splice the width fix. Returns the node
    /// now occupying the child's slot.
    pub(crate) fn width_check_sized(
        &mut self,
        parent: NodeId,
        side: &str,
        under: NodeId,
        exp: Type<'gcx>,
        extend: ExtendRule,
        warn_on: bool,
    ) -> NodeId {
        let exp_bv = match exp.resolve().coercible_bit_vector() {
            Some(bv) => bv,
            None => {
                self.type_error(parent, side, under, exp);
                return under;
            }
        };
        let u_bv = match self.bit_vector_ty(under) {
            Some(bv) => bv,
            None => {
                self.type_error(parent, side, under, exp);
                return under;
            }
        };
        let (exp_w, exp_wmin) = (exp_bv.width(), exp_bv.width_min());
        let (u_w, u_wmin) = (u_bv.width(), u_bv.width_min());

        let mut warn = warn_on && self.width_bad(u_w, u_wmin, exp_w, exp_wmin);
        if warn && self.constant_fits(under, exp_w) {
            warn = false;
        }
        if warn {
            let code = if exp_w < u_w {
                WarnCode::WidthTrunc
            } else if exp_w > u_w {
                WarnCode::WidthExpand
            } else {
                WarnCode::Width
            };
            let message = format!(
                "{} expects {} bits on the {}, but the {} generates {} bits",
                self.ast[parent].kind.desc(),
                exp_w,
                side,
                side,
                u_w
            );
            self.cx.emit_width_warning(
                code,
                self.span(under),
                self.ast[under].suppress,
                message,
            );
        }

        if u_w < exp_w {
            self.fix_width_extend(parent, under, exp, extend)
        } else if u_w > exp_w {
            self.fix_width_reduce(parent, under, exp)
        } else {
            under
        }
    }

    /// Check whether a node is an unsized constant whose value fits into
    /// the given number of bits.
    fn constant_fits(&self, under: NodeId, width: usize) -> bool {
        match &self.ast[under].kind {
            NodeKind::IntConst { value, is_unsized, .. } => {
                *is_unsized && !value.is_negative() && (value.bits() as usize) <= width
            }
            _ => false,
        }
    }

    /// Widen a too-narrow operand to its expected type by splicing an
    /// extension between it and its parent. Constants that fit are resized
    /// in place instead.
    pub(crate) fn fix_width_extend(
        &mut self,
        parent: NodeId,
        under: NodeId,
        exp: Type<'gcx>,
        extend: ExtendRule,
    ) -> NodeId {
        let uty = self.node_ty(under);
        let signed_extend = match extend {
            ExtendRule::Expected => exp.is_signed() && uty.is_signed(),
            ExtendRule::Zero => false,
            ExtendRule::Lhs => uty.is_signed(),
            ExtendRule::Off => return under,
        };
        if self.resize_const_in_place(under, exp) {
            return under;
        }
        trace!(
            "extending {} from {} to {} bits",
            self.ast[under].kind.desc(),
            uty.width(),
            exp.width()
        );
        let span = self.span(under);
        let new = self.ast.add(
            NodeKind::Extend {
                signed: signed_extend,
                arg: under,
            },
            span,
        );
        self.ast.set_ty(new, exp);
        self.ast.relink(parent, under, new);
        new
    }

    /// Narrow a too-wide operand to its expected type by splicing a
    /// truncation between it and its parent. Constants that fit are resized
    /// in place instead.
    pub(crate) fn fix_width_reduce(
        &mut self,
        parent: NodeId,
        under: NodeId,
        exp: Type<'gcx>,
    ) -> NodeId {
        if self.resize_const_in_place(under, exp) {
            return under;
        }
        trace!(
            "truncating {} from {} to {} bits",
            self.ast[under].kind.desc(),
            self.node_ty(under).width(),
            exp.width()
        );
        let span = self.span(under);
        let new = self.ast.add(NodeKind::Trunc { arg: under }, span);
        self.ast.set_ty(new, exp);
        self.ast.relink(parent, under, new);
        new
    }

    /// Resize an unsized constant whose value is representable at the
    /// expected width without a conversion node. Sized constants keep their
    /// written width and receive an explicit conversion like any other
    /// operand. Returns true if the constant was resized.
    fn resize_const_in_place(&mut self, under: NodeId, exp: Type<'gcx>) -> bool {
        let exp_w = exp.width();
        let fits = match &self.ast[under].kind {
            NodeKind::IntConst { value, is_unsized, .. } => {
                *is_unsized && !value.is_negative() && (value.bits() as usize) <= exp_w
            }
            _ => return false,
        };
        if !fits {
            return false;
        }
        if let NodeKind::IntConst { width, .. } = &mut self.ast[under].kind {
            *width = exp_w;
        }
        self.ast.set_ty(under, exp);
        true
    }

    /// Splice a conversion to real between a child and its parent. The
    /// canonical form distinguishes signed from unsigned sources, so a
    /// signed child receives the signed-source conversion directly.
    pub(crate) fn splice_cvt_real(&mut self, parent: NodeId, under: NodeId) -> NodeId {
        let span = self.span(under);
        let kind = if self.node_ty(under).is_signed() {
            NodeKind::SignedToReal { arg: under }
        } else {
            NodeKind::IntToReal { arg: under }
        };
        let new = self.ast.add(kind, span);
        self.ast.set_ty(new, &ty::REAL_TYPE);
        self.ast.relink(parent, under, new);
        new
    }

    /// Splice a real-to-integer conversion between a child and its parent.
    /// The conversion itself is 32 bit signed; the caller widens or narrows
    /// the result further as its context requires.
    pub(crate) fn splice_cvt_int(&mut self, parent: NodeId, under: NodeId) -> NodeId {
        let span = self.span(under);
        let new = self.ast.add(NodeKind::RealToInt { arg: under }, span);
        self.ast.set_ty(new, self.cx.mkty_signed32());
        self.ast.relink(parent, under, new);
        new
    }

    /// Splice a conversion to string between a child and its parent.
    pub(crate) fn splice_cvt_string(&mut self, parent: NodeId, under: NodeId) -> NodeId {
        let span = self.span(under);
        let new = self.ast.add(NodeKind::PackString { arg: under }, span);
        self.ast.set_ty(new, &ty::STRING_TYPE);
        self.ast.relink(parent, under, new);
        new
    }

    /// Splice a conversion that packs a fixed-size unpacked array into a
    /// plain bit vector between a child and its parent.
    pub(crate) fn splice_pack_array(&mut self, parent: NodeId, under: NodeId) -> NodeId {
        let uty = self.node_ty(under).resolve();
        let bits = match uty.packed_bits() {
            Some(b) => b,
            None => bug_span!(
                self.span(under),
                self.cx,
                "array packing requested for a type with no packed form"
            ),
        };
        let bits_min = match *uty {
            ty::TypeKind::FixedArray(n, elem) if elem.coercible_bit_vector().is_some() => {
                n * elem.width_min()
            }
            _ => bits,
        };
        let span = self.span(under);
        let new = self.ast.add(NodeKind::PackArray { arg: under }, span);
        self.ast
            .set_ty(new, self.cx.mkty_logic(bits, bits_min, ty::Sign::Unsigned));
        self.ast.relink(parent, under, new);
        new
    }

    /// Check that a value assigned to a class handle is of the same class
    /// or one derived from it.
    pub(crate) fn check_class_assign(
        &mut self,
        parent: NodeId,
        side: &str,
        under: NodeId,
        exp: Type<'gcx>,
    ) {
        let uty = self.node_ty(under);
        let base = match exp.get_class_def() {
            Some(d) => d,
            None => return,
        };
        match uty.get_class_def() {
            Some(derived) => {
                if !self.is_base_class_recurse(base, derived) {
                    self.cx.emit(
                        DiagBuilder2::error(format!(
                            "cannot assign a `{}` handle to the {}: `{}` does not extend `{}`",
                            self.class_name(derived),
                            side,
                            self.class_name(derived),
                            self.class_name(base),
                        ))
                        .span(self.span(under)),
                    );
                }
            }
            None if uty.resolve().is_error() => (),
            None => self.type_error(parent, side, under, exp),
        }
    }

    /// Check whether `derived` is `base` or transitively extends it.
    pub(crate) fn is_base_class_recurse(&self, base: NodeId, derived: NodeId) -> bool {
        if base == derived {
            return true;
        }
        match self.ast[derived].kind {
            NodeKind::Class {
                extends: Some(e), ..
            } => self.is_base_class_recurse(base, e),
            _ => false,
        }
    }

    fn class_name(&self, def: NodeId) -> String {
        match &self.ast[def].kind {
            NodeKind::Class { name, .. } => name.value.to_string(),
            _ => "<class>".to_string(),
        }
    }

    /// Report an irreparable type mismatch, naming both the actual and the
    /// expected type.
    pub(crate) fn type_error(&mut self, parent: NodeId, side: &str, under: NodeId, exp: Type<'gcx>) {
        let got = self.ast.ty(under).unwrap_or(&ty::ERROR_TYPE);
        if got.resolve().is_error() || exp.resolve().is_error() {
            return;
        }
        self.cx.emit(
            DiagBuilder2::error(format!(
                "{} requires `{}` on the {}, but the expression has type `{}`",
                self.ast[parent].kind.desc(),
                exp,
                side,
                got
            ))
            .span(self.span(under)),
        );
    }

    /// Check a child used as a truth value. Reals and strings are converted
    /// by comparison against zero and the empty string respectively; any
    /// integral width is acceptable; aggregates are a type error.
    pub(crate) fn iterate_check_bool(
        &mut self,
        parent: NodeId,
        side: &str,
        under: NodeId,
        stage: Stage,
    ) {
        if stage != Stage::BOTH {
            bug_span!(
                self.span(parent),
                self.cx,
                "truth-value check must run both stages"
            );
        }
        self.iterate(under, TypeContext::self_det(Stage::BOTH));
        let uty = self.node_ty(under);
        let r = uty.resolve();
        let span = self.span(under);
        if r.is_error() {
            return;
        }
        if r.is_double() {
            let zero = self.ast.add(NodeKind::RealConst(0.0), span);
            self.ast.set_ty(zero, &ty::REAL_TYPE);
            let neq = self
                .ast
                .add(NodeKind::Binary(BinaryOp::NeqReal, under, zero), span);
            self.ast.set_ty(neq, &ty::BIT_TYPE);
            self.ast.relink(parent, under, neq);
        } else if r.is_string() {
            let empty = self
                .ast
                .add(NodeKind::StringConst(get_name_table().intern("")), span);
            self.ast.set_ty(empty, &ty::STRING_TYPE);
            let neq = self
                .ast
                .add(NodeKind::Binary(BinaryOp::NeqString, under, empty), span);
            self.ast.set_ty(neq, &ty::BIT_TYPE);
            self.ast.relink(parent, under, neq);
        } else if !r.is_integral() {
            self.cx.emit(
                DiagBuilder2::error(format!(
                    "{} expects a simple value on the {}, but the expression has type `{}`",
                    self.ast[parent].kind.desc(),
                    side,
                    uty
                ))
                .span(span),
            );
        }
    }

    /// Check a child against an explicit expected type; the child is
    /// self-determined.
    pub(crate) fn iterate_check_typed(
        &mut self,
        parent: NodeId,
        side: &str,
        under: NodeId,
        exp: Type<'gcx>,
        stage: Stage,
    ) -> NodeId {
        self.iterate_check(
            parent,
            side,
            under,
            Determ::SelfDet,
            stage,
            exp,
            ExtendRule::Expected,
            true,
        )
    }

    /// Check the right-hand side of an assignment-like construct against
    /// the target's type. Only the operand's own signedness decides how it
    /// is extended.
    pub(crate) fn iterate_check_assign(
        &mut self,
        parent: NodeId,
        side: &str,
        rhs: NodeId,
        stage: Stage,
        lhs_ty: Type<'gcx>,
    ) -> NodeId {
        self.iterate_check(
            parent,
            side,
            rhs,
            Determ::Assign,
            stage,
            lhs_ty,
            ExtendRule::Lhs,
            true,
        )
    }
}
