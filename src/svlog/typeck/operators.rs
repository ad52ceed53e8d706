// Copyright (c) 2016-2020 Fabian Schuiki

//! The operator rule set.
//!
//! One rule per operator category. Each rule establishes which of its
//! children are self- and which are context-determined, computes the
//! node's own type, and routes every child requirement through the
//! check-and-coerce family. Category membership follows the value
//! propagation rules of IEEE 1800 §11.6 and §11.8: the result of a
//! comparison or reduction is a self-determined single bit, arithmetic and
//! bitwise results take the larger operand width and may grow further to
//! the width their own context requires, and shifts follow the left
//! operand alone.

use super::{Determ, ExtendRule, Stage, TypeContext, Typeck};
use crate::ast::{BinaryOp, NodeId, NodeKind};
use crate::crate_prelude::*;
use crate::ty::{self, Sign};

impl<'a, 'gcx> Typeck<'a, 'gcx> {
    /// Replace a binary node's operator in place. The node's identity is
    /// stable, so no relinking is required.
    pub(crate) fn set_binary_op(&mut self, node: NodeId, op: BinaryOp) {
        match &mut self.ast[node].kind {
            NodeKind::Binary(slot, ..) => *slot = op,
            _ => bug_span!(
                self.span(node),
                self.cx,
                "operator replacement on a non-operator node"
            ),
        }
    }

    fn set_vector_ty(&mut self, node: NodeId, width: usize, width_min: usize, signed: bool) {
        let ty = self
            .cx
            .mkty_logic(width, width_min, Sign::from_bool(signed));
        self.ast.set_ty(node, ty);
    }

    /// The common `max(lhs, rhs)` width rule. Returns `None` if either
    /// operand has no vector form, after reporting the mismatch.
    fn binary_vector_shape(
        &mut self,
        node: NodeId,
        lhs: NodeId,
        rhs: NodeId,
    ) -> Option<(usize, usize, bool)> {
        let lbv = self.bit_vector_ty(lhs);
        let rbv = self.bit_vector_ty(rhs);
        match (lbv, rbv) {
            (Some(l), Some(r)) => Some((
                l.width().max(r.width()),
                l.width_min().max(r.width_min()),
                l.is_signed() && r.is_signed(),
            )),
            _ => {
                let (side, bad) = if lbv.is_none() {
                    ("LHS", lhs)
                } else {
                    ("RHS", rhs)
                };
                self.cx.emit(
                    DiagBuilder2::error(format!(
                        "{} expects an integral value on the {}, but the expression has type `{}`",
                        self.ast[node].kind.desc(),
                        side,
                        self.node_ty(bad)
                    ))
                    .span(self.span(bad)),
                );
                None
            }
        }
    }

    // ===== Logical operators: 1 bit out, operands tested for truth =====

    pub(crate) fn visit_log_not(&mut self, node: NodeId, arg: NodeId, vup: TypeContext<'gcx>) {
        if vup.prelim() {
            self.iterate_check_bool(node, "operand", arg, Stage::BOTH);
            self.ast.set_ty(node, &ty::BIT_TYPE);
        }
    }

    pub(crate) fn visit_log_and_or(
        &mut self,
        node: NodeId,
        lhs: NodeId,
        rhs: NodeId,
        vup: TypeContext<'gcx>,
    ) {
        if vup.prelim() {
            self.iterate_check_bool(node, "LHS", lhs, Stage::BOTH);
            self.iterate_check_bool(node, "RHS", rhs, Stage::BOTH);
            self.ast.set_ty(node, &ty::BIT_TYPE);
        }
    }

    // ===== Reductions: 1 bit out, operand self-determined at any width =====

    pub(crate) fn visit_red(&mut self, node: NodeId, arg: NodeId, vup: TypeContext<'gcx>) {
        if vup.prelim() {
            self.iterate_check_sized_self(node, "operand", arg, Determ::SelfDet, Stage::BOTH);
            self.ast.set_ty(node, &ty::BIT_TYPE);
        }
    }

    // ===== Comparisons =====

    /// Equality and relational operators on vectors. The result is a
    /// self-determined single bit, so all the work happens in the prelim
    /// stage: operands are mutually widened to the larger width, compared
    /// signed only if both are signed, and the operator is rewritten in
    /// place to the flavor matching the operands' domain and signedness.
    pub(crate) fn visit_cmp_eq_gt(
        &mut self,
        node: NodeId,
        op: BinaryOp,
        lhs: NodeId,
        rhs: NodeId,
        realok: bool,
        vup: TypeContext<'gcx>,
    ) {
        if vup.prelim() {
            self.iterate(lhs, TypeContext::context_det());
            self.iterate(rhs, TypeContext::context_det());
            let lt = self.node_ty(lhs).resolve();
            let rt = self.node_ty(rhs).resolve();
            self.ast.set_ty(node, &ty::BIT_TYPE);
            if lt.is_error() || rt.is_error() {
                return;
            }
            if lt.is_double() || rt.is_double() {
                if !realok {
                    self.cx.emit(
                        DiagBuilder2::error(format!(
                            "operator `{}` is not defined for real operands",
                            op
                        ))
                        .span(self.span(node)),
                    );
                    return;
                }
                let newop = match op.real_flavor() {
                    Some(op) => op,
                    None => bug_span!(
                        self.span(node),
                        self.cx,
                        "comparison `{}` has no real flavor",
                        op
                    ),
                };
                self.set_binary_op(node, newop);
                self.iterate_check_real(node, "LHS", lhs, Stage::FINAL);
                self.iterate_check_real(node, "RHS", rhs, Stage::FINAL);
            } else if lt.is_string() || rt.is_string() {
                let newop = match op.string_flavor() {
                    Some(op) => op,
                    None => {
                        self.cx.emit(
                            DiagBuilder2::error(format!(
                                "operator `{}` is not defined for string operands",
                                op
                            ))
                            .span(self.span(node)),
                        );
                        return;
                    }
                };
                self.set_binary_op(node, newop);
                let string_ty = self.cx.mkty_string();
                self.iterate_check_typed(node, "LHS", lhs, string_ty, Stage::FINAL);
                self.iterate_check_typed(node, "RHS", rhs, string_ty, Stage::FINAL);
            } else {
                let (width, width_min, signed) =
                    match self.binary_vector_shape(node, lhs, rhs) {
                        Some(shape) => shape,
                        None => return,
                    };
                let sub = self
                    .cx
                    .mkty_logic(width, width_min, Sign::from_bool(signed));
                self.iterate_check(
                    node,
                    "LHS",
                    lhs,
                    Determ::ContextDet,
                    Stage::FINAL,
                    sub,
                    ExtendRule::Lhs,
                    true,
                );
                self.iterate_check(
                    node,
                    "RHS",
                    rhs,
                    Determ::ContextDet,
                    Stage::FINAL,
                    sub,
                    ExtendRule::Lhs,
                    true,
                );
                self.set_binary_op(node, op.with_signedness(signed));
            }
        }
    }

    pub(crate) fn visit_cmp_real(
        &mut self,
        node: NodeId,
        lhs: NodeId,
        rhs: NodeId,
        vup: TypeContext<'gcx>,
    ) {
        if vup.prelim() {
            self.iterate_check_real(node, "LHS", lhs, Stage::BOTH);
            self.iterate_check_real(node, "RHS", rhs, Stage::BOTH);
            self.ast.set_ty(node, &ty::BIT_TYPE);
        }
    }

    pub(crate) fn visit_cmp_string(
        &mut self,
        node: NodeId,
        lhs: NodeId,
        rhs: NodeId,
        vup: TypeContext<'gcx>,
    ) {
        if vup.prelim() {
            let string_ty = self.cx.mkty_string();
            self.iterate_check_typed(node, "LHS", lhs, string_ty, Stage::BOTH);
            self.iterate_check_typed(node, "RHS", rhs, string_ty, Stage::BOTH);
            self.ast.set_ty(node, &ty::BIT_TYPE);
        }
    }

    // ===== Bitwise operators: context-determined, no real flavor =====

    pub(crate) fn visit_bitwise(
        &mut self,
        node: NodeId,
        op: BinaryOp,
        lhs: NodeId,
        rhs: NodeId,
        vup: TypeContext<'gcx>,
    ) {
        if vup.prelim() {
            self.iterate(lhs, TypeContext::context_det());
            self.iterate(rhs, TypeContext::context_det());
            let lt = self.node_ty(lhs).resolve();
            let rt = self.node_ty(rhs).resolve();
            if lt.is_error() || rt.is_error() {
                self.ast.set_ty(node, &ty::ERROR_TYPE);
                return;
            }
            if lt.is_double() || rt.is_double() {
                self.cx.emit(
                    DiagBuilder2::error(format!(
                        "operator `{}` expects integral operands and is not defined for reals",
                        op
                    ))
                    .span(self.span(node)),
                );
                self.ast.set_ty(node, &ty::ERROR_TYPE);
                return;
            }
            match self.binary_vector_shape(node, lhs, rhs) {
                Some((w, wmin, signed)) => self.set_vector_ty(node, w, wmin, signed),
                None => self.ast.set_ty(node, &ty::ERROR_TYPE),
            }
        }
        if vup.is_final() {
            let own = self.node_ty(node);
            if own.resolve().is_error() {
                return;
            }
            let exp = vup.dtype_or(own);
            self.ast.set_ty(node, exp);
            self.iterate_check(
                node,
                "LHS",
                lhs,
                Determ::ContextDet,
                Stage::FINAL,
                exp,
                ExtendRule::Expected,
                true,
            );
            self.iterate_check(
                node,
                "RHS",
                rhs,
                Determ::ContextDet,
                Stage::FINAL,
                exp,
                ExtendRule::Expected,
                true,
            );
        }
    }

    // ===== Arithmetic: max-width, context-determined, real promotion =====

    pub(crate) fn visit_arith(
        &mut self,
        node: NodeId,
        op: BinaryOp,
        lhs: NodeId,
        rhs: NodeId,
        real_ok: bool,
        vup: TypeContext<'gcx>,
    ) {
        if vup.prelim() {
            self.iterate(lhs, TypeContext::context_det());
            self.iterate(rhs, TypeContext::context_det());
            let lt = self.node_ty(lhs).resolve();
            let rt = self.node_ty(rhs).resolve();
            if lt.is_error() || rt.is_error() {
                self.ast.set_ty(node, &ty::ERROR_TYPE);
                return;
            }
            if lt.is_double() || rt.is_double() {
                if !real_ok {
                    self.cx.emit(
                        DiagBuilder2::error(format!(
                            "operator `{}` is not defined for real operands",
                            op
                        ))
                        .span(self.span(node)),
                    );
                    self.ast.set_ty(node, &ty::ERROR_TYPE);
                    return;
                }
                let newop = match op.real_flavor() {
                    Some(op) => op,
                    None => bug_span!(
                        self.span(node),
                        self.cx,
                        "arithmetic operator `{}` has no real flavor",
                        op
                    ),
                };
                self.set_binary_op(node, newop);
                self.ast.set_ty(node, &ty::REAL_TYPE);
                self.iterate_check_real(node, "LHS", lhs, Stage::FINAL);
                self.iterate_check_real(node, "RHS", rhs, Stage::FINAL);
                return;
            }
            match self.binary_vector_shape(node, lhs, rhs) {
                Some((w, wmin, signed)) => self.set_vector_ty(node, w, wmin, signed),
                None => self.ast.set_ty(node, &ty::ERROR_TYPE),
            }
        }
        if vup.is_final() {
            let own = self.node_ty(node);
            if own.resolve().is_error() || own.is_double() {
                return;
            }
            let exp = vup.dtype_or(own);
            self.ast.set_ty(node, exp);
            // Division and multiplication behave differently once signed;
            // pick the flavor matching the finalized operation type.
            self.set_binary_op(node, op.with_signedness(exp.is_signed()));
            self.iterate_check(
                node,
                "LHS",
                lhs,
                Determ::ContextDet,
                Stage::FINAL,
                exp,
                ExtendRule::Expected,
                true,
            );
            self.iterate_check(
                node,
                "RHS",
                rhs,
                Determ::ContextDet,
                Stage::FINAL,
                exp,
                ExtendRule::Expected,
                true,
            );
        }
    }

    // ===== Real arithmetic =====

    pub(crate) fn visit_real_binop(
        &mut self,
        node: NodeId,
        lhs: NodeId,
        rhs: NodeId,
        vup: TypeContext<'gcx>,
    ) {
        if vup.prelim() {
            self.iterate_check_real(node, "LHS", lhs, Stage::BOTH);
            self.iterate_check_real(node, "RHS", rhs, Stage::BOTH);
            self.ast.set_ty(node, &ty::REAL_TYPE);
        }
    }

    pub(crate) fn visit_real_unop(&mut self, node: NodeId, arg: NodeId, vup: TypeContext<'gcx>) {
        if vup.prelim() {
            self.iterate_check_real(node, "operand", arg, Stage::BOTH);
            self.ast.set_ty(node, &ty::REAL_TYPE);
        }
    }

    // ===== Unary negate / bitwise not =====

    pub(crate) fn visit_negate_not(
        &mut self,
        node: NodeId,
        arg: NodeId,
        real_ok: bool,
        vup: TypeContext<'gcx>,
    ) {
        if vup.prelim() {
            // The operand's natural type is computed in isolation.
            self.iterate(arg, TypeContext::self_det(Stage::PRELIM));
            let at = self.node_ty(arg).resolve();
            if at.is_error() {
                self.ast.set_ty(node, &ty::ERROR_TYPE);
                return;
            }
            if at.is_double() {
                if real_ok {
                    match &mut self.ast[node].kind {
                        NodeKind::Unary(op, ..) => *op = crate::ast::UnaryOp::NegateReal,
                        _ => unreachable!(),
                    }
                    self.ast.set_ty(node, &ty::REAL_TYPE);
                    self.iterate_check_real(node, "operand", arg, Stage::FINAL);
                } else {
                    self.cx.emit(
                        DiagBuilder2::error(
                            "operator `~` expects an integral operand, not a real".to_string(),
                        )
                        .span(self.span(node)),
                    );
                    self.ast.set_ty(node, &ty::ERROR_TYPE);
                }
                return;
            }
            match at.coercible_bit_vector() {
                Some(bv) => {
                    self.set_vector_ty(node, bv.width(), bv.width_min(), bv.is_signed())
                }
                None => {
                    self.cx.emit(
                        DiagBuilder2::error(format!(
                            "unary operator expects an integral operand, but the expression has \
                             type `{}`",
                            self.node_ty(arg)
                        ))
                        .span(self.span(arg)),
                    );
                    self.ast.set_ty(node, &ty::ERROR_TYPE);
                }
            }
        }
        if vup.is_final() {
            let own = self.node_ty(node);
            if own.resolve().is_error() || own.is_double() {
                return;
            }
            let exp = vup.dtype_or(own);
            self.ast.set_ty(node, exp);
            self.iterate_check(
                node,
                "operand",
                arg,
                Determ::ContextDet,
                Stage::FINAL,
                exp,
                ExtendRule::Expected,
                true,
            );
        }
    }

    // ===== Sign casts =====

    /// `$signed` and `$unsigned` reinterpret the operand's width with the
    /// requested signedness. The operand is self-determined; warnings are
    /// off for the final re-check, as changing the interpretation is the
    /// point of the cast.
    pub(crate) fn visit_cast_sign(
        &mut self,
        node: NodeId,
        sign: Sign,
        arg: NodeId,
        vup: TypeContext<'gcx>,
    ) {
        if vup.prelim() {
            self.iterate(arg, TypeContext::self_det(Stage::PRELIM));
            let at = self.node_ty(arg).resolve();
            if at.is_error() {
                self.ast.set_ty(node, &ty::ERROR_TYPE);
                return;
            }
            match at.coercible_bit_vector() {
                Some(bv) => {
                    let ty = self.cx.mkty_bit_vector(
                        bv.get_value_domain().unwrap_or(ty::Domain::FourValued),
                        sign,
                        bv.width(),
                        bv.width(),
                    );
                    self.ast.set_ty(node, ty);
                }
                None => {
                    self.cx.emit(
                        DiagBuilder2::error(format!(
                            "{} expects an integral operand, but the expression has type `{}`",
                            self.ast[node].kind.desc(),
                            self.node_ty(arg)
                        ))
                        .span(self.span(arg)),
                    );
                    self.ast.set_ty(node, &ty::ERROR_TYPE);
                }
            }
        }
        if vup.is_final() {
            let own = self.node_ty(node);
            if own.resolve().is_error() {
                return;
            }
            let exp = vup.dtype_or(own);
            self.ast.set_ty(node, exp);
            self.iterate_check(
                node,
                "operand",
                arg,
                Determ::ContextDet,
                Stage::FINAL,
                exp,
                ExtendRule::Expected,
                false,
            );
        }
    }

    // ===== Shifts =====

    /// The result width follows the left operand; the shift amount is an
    /// independent self-determined operand and never participates in the
    /// width of the shifted value.
    pub(crate) fn visit_shift(
        &mut self,
        node: NodeId,
        lhs: NodeId,
        rhs: NodeId,
        vup: TypeContext<'gcx>,
    ) {
        if vup.prelim() {
            self.iterate(lhs, TypeContext::context_det());
            self.iterate_check_sized_self(node, "shift amount", rhs, Determ::SelfDet, Stage::BOTH);
            let lt = self.node_ty(lhs).resolve();
            if lt.is_error() {
                self.ast.set_ty(node, &ty::ERROR_TYPE);
                return;
            }
            match lt.coercible_bit_vector() {
                Some(bv) => {
                    self.set_vector_ty(node, bv.width(), bv.width_min(), bv.is_signed())
                }
                None => {
                    self.cx.emit(
                        DiagBuilder2::error(format!(
                            "{} expects an integral value on the LHS, but the expression has \
                             type `{}`",
                            self.ast[node].kind.desc(),
                            self.node_ty(lhs)
                        ))
                        .span(self.span(lhs)),
                    );
                    self.ast.set_ty(node, &ty::ERROR_TYPE);
                }
            }
        }
        if vup.is_final() {
            let own = self.node_ty(node);
            if own.resolve().is_error() {
                return;
            }
            let exp = vup.dtype_or(own);
            self.ast.set_ty(node, exp);
            self.iterate_check(
                node,
                "LHS",
                lhs,
                Determ::ContextDet,
                Stage::FINAL,
                exp,
                ExtendRule::Expected,
                true,
            );
        }
    }

    // ===== Conditional and concatenation =====

    pub(crate) fn visit_cond(
        &mut self,
        node: NodeId,
        cond: NodeId,
        then_expr: NodeId,
        else_expr: NodeId,
        vup: TypeContext<'gcx>,
    ) {
        if vup.prelim() {
            self.iterate_check_bool(node, "condition", cond, Stage::BOTH);
            self.iterate(then_expr, TypeContext::context_det());
            self.iterate(else_expr, TypeContext::context_det());
            let tt = self.node_ty(then_expr);
            let et = self.node_ty(else_expr);
            if tt.resolve().is_error() || et.resolve().is_error() {
                self.ast.set_ty(node, &ty::ERROR_TYPE);
                return;
            }
            if tt.is_double() || et.is_double() {
                self.ast.set_ty(node, &ty::REAL_TYPE);
                self.iterate_check_real(node, "true branch", then_expr, Stage::FINAL);
                self.iterate_check_real(node, "false branch", else_expr, Stage::FINAL);
                return;
            }
            if tt.is_integral() && et.is_integral() {
                match self.binary_vector_shape(node, then_expr, else_expr) {
                    Some((w, wmin, signed)) => self.set_vector_ty(node, w, wmin, signed),
                    None => self.ast.set_ty(node, &ty::ERROR_TYPE),
                }
            } else if ty::identical(tt, et) {
                self.ast.set_ty(node, tt);
            } else {
                self.cx.emit(
                    DiagBuilder2::error(format!(
                        "conditional branches have incompatible types `{}` and `{}`",
                        tt, et
                    ))
                    .span(self.span(node)),
                );
                self.ast.set_ty(node, &ty::ERROR_TYPE);
            }
        }
        if vup.is_final() {
            let own = self.node_ty(node);
            if own.resolve().is_error() || own.is_double() || !own.is_integral() {
                return;
            }
            let exp = vup.dtype_or(own);
            self.ast.set_ty(node, exp);
            self.iterate_check(
                node,
                "true branch",
                then_expr,
                Determ::ContextDet,
                Stage::FINAL,
                exp,
                ExtendRule::Expected,
                true,
            );
            self.iterate_check(
                node,
                "false branch",
                else_expr,
                Determ::ContextDet,
                Stage::FINAL,
                exp,
                ExtendRule::Expected,
                true,
            );
        }
    }

    /// Concatenation is fully self-determined: the result is the unsigned
    /// sum of the operand widths, and a wider context extends the
    /// concatenation as a whole rather than its parts.
    pub(crate) fn visit_concat(
        &mut self,
        node: NodeId,
        lhs: NodeId,
        rhs: NodeId,
        vup: TypeContext<'gcx>,
    ) {
        if vup.prelim() {
            let lhs = self.iterate_check_sized_self(node, "LHS", lhs, Determ::SelfDet, Stage::BOTH);
            let rhs = self.iterate_check_sized_self(node, "RHS", rhs, Determ::SelfDet, Stage::BOTH);
            let lbv = self.bit_vector_ty(lhs);
            let rbv = self.bit_vector_ty(rhs);
            match (lbv, rbv) {
                (Some(l), Some(r)) => {
                    let ty = self.cx.mkty_logic(
                        l.width() + r.width(),
                        l.width_min() + r.width_min(),
                        Sign::Unsigned,
                    );
                    self.ast.set_ty(node, ty);
                }
                _ => self.ast.set_ty(node, &ty::ERROR_TYPE),
            }
        }
    }
}
