// Copyright (c) 2016-2020 Fabian Schuiki

//! Width and type inference.
//!
//! This module computes a concrete type for every expression in an
//! elaborated tree and inserts the conversions needed to reconcile each
//! operand with the type its context requires.
//!
//! Every context-bearing node is visited in up to two stages:
//!
//! - **prelim** resolves the node's natural type bottom-up from its
//!   already-resolved children, without inserting any conversions. This is
//!   the only stage in which a context-determined child may tentatively
//!   adopt a parent-suggested width.
//! - **final** compares the node's natural type against the type its parent
//!   requires top-down, and routes any disagreement through the
//!   check-and-coerce family in [`check`], which either inserts an explicit
//!   conversion node or reports a diagnostic.
//!
//! For most nodes both stages run back-to-back during the same descent; the
//! downward [`TypeContext`] tells a rule which stages are requested and
//! which type, if any, the parent expects. The context is a plain call
//! parameter: it lives for exactly one [`Typeck::iterate`] call and is
//! restored to the caller's view by ordinary function return, on every exit
//! path.

use crate::ast::{Ast, EnumAttrKind, NodeId, NodeKind, UnaryOp};
use crate::crate_prelude::*;
use crate::ty::{self, Type};
use std::collections::{HashMap, HashSet};

mod check;
mod helpers;
mod operators;
#[cfg(test)]
mod tests;

pub use check::ExtendRule;

bitflags::bitflags! {
    /// The stages of the two-stage visiting protocol, as a bitmask so a
    /// single request can ask for both back-to-back.
    pub struct Stage: u8 {
        const PRELIM = 0b01;
        const FINAL = 0b10;
        const BOTH = 0b11;
    }
}

/// How a child's type is determined relative to its context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Determ {
    /// The child's type is computed independently of the surrounding
    /// context, then coerced to fit.
    SelfDet,
    /// The child's type is driven top-down by the parent's required type.
    /// Only legal as a prelim-stage request.
    ContextDet,
    /// Assignment-like: only the right-hand operand's signedness is
    /// considered authoritative.
    Assign,
}

/// The parameters passed down the tree with each visit.
///
/// A context is either self-determined (no target type) or carries the
/// concrete type the child must resolve to. Target-determined contexts are
/// only constructible together with a final-containing stage;
/// context-determined requests are only constructible as prelim.
#[derive(Clone, Copy)]
pub struct TypeContext<'gcx> {
    dtype: Option<Type<'gcx>>,
    stage: Stage,
}

impl<'gcx> TypeContext<'gcx> {
    /// A self-determined context for the given stages.
    pub fn self_det(stage: Stage) -> TypeContext<'gcx> {
        TypeContext { dtype: None, stage }
    }

    /// A context-determined request. Only the prelim stage may be driven
    /// this way; the final decision is made through the check family.
    pub fn context_det() -> TypeContext<'gcx> {
        TypeContext {
            dtype: None,
            stage: Stage::PRELIM,
        }
    }

    /// A target-determined context carrying the type the child must resolve
    /// to.
    pub fn with_type(dtype: Type<'gcx>, stage: Stage) -> TypeContext<'gcx> {
        assert!(
            stage.contains(Stage::FINAL),
            "target-determined context request only allowed in the final stage"
        );
        TypeContext {
            dtype: Some(dtype),
            stage,
        }
    }

    /// Check whether the prelim stage is requested.
    pub fn prelim(&self) -> bool {
        self.stage.contains(Stage::PRELIM)
    }

    /// Check whether the final stage is requested.
    pub fn is_final(&self) -> bool {
        self.stage.contains(Stage::FINAL)
    }

    /// Check whether this context carries no target type.
    pub fn self_determined(&self) -> bool {
        self.dtype.is_none()
    }

    /// The stages requested by this context.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// The type the parent expects, or `default` for self-determined uses.
    pub fn dtype_or(&self, default: Type<'gcx>) -> Type<'gcx> {
        debug_assert!(
            self.stage.contains(Stage::FINAL),
            "parent dtype is a final-stage decision"
        );
        self.dtype.unwrap_or(default)
    }
}

/// Run the width and type inference pass over the subtree rooted at `root`.
///
/// On return every expression node reachable from `root` carries a resolved
/// type descriptor, and explicit conversion nodes have been inserted
/// wherever a natural type disagreed with a required type. The pass is
/// idempotent with respect to re-invocation: nodes marked as processed are
/// not re-entered.
pub fn run<'gcx>(cx: &GlobalContext<'gcx>, ast: &mut Ast<'gcx>, root: NodeId) -> NodeId {
    debug!("width inference pass on {:?}", root);
    let mut v = Typeck::new(cx, ast);
    v.iterate(root, TypeContext::self_det(Stage::BOTH))
}

/// Clear the processed markers of all nodes in the subtree rooted at
/// `root`, so a tree can be handed to [`run`] again after an earlier pass
/// touched parts of it.
pub fn clear_width(ast: &mut Ast, root: NodeId) {
    let children = ast[root].kind.children();
    ast[root].did_width = false;
    for child in children {
        clear_width(ast, child);
    }
}

/// The width and type inference visitor.
///
/// Holds the per-pass memoization caches; all of them exist purely to avoid
/// recomputation and are discarded when the pass ends.
pub struct Typeck<'a, 'gcx> {
    pub(crate) cx: &'a GlobalContext<'gcx>,
    pub(crate) ast: &'a mut Ast<'gcx>,
    /// Enclosing class per node, memoized.
    pub(crate) containing_class: HashMap<NodeId, Option<NodeId>>,
    /// Generated enum lookup tables, deduplicated per (type, attribute).
    pub(crate) table_map: HashMap<(Type<'gcx>, EnumAttrKind), NodeId>,
    /// Queue descriptors deduplicated by index type.
    pub(crate) queue_indexed: HashMap<Type<'gcx>, Type<'gcx>>,
    /// The module currently being visited, for generated declarations.
    pub(crate) module: Option<NodeId>,
    /// Declarations whose resolution is in progress, to detect cycles.
    in_flight: HashSet<NodeId>,
}

impl<'a, 'gcx> Typeck<'a, 'gcx> {
    /// Create a new visitor over the given tree.
    pub fn new(cx: &'a GlobalContext<'gcx>, ast: &'a mut Ast<'gcx>) -> Self {
        Typeck {
            cx,
            ast,
            containing_class: Default::default(),
            table_map: Default::default(),
            queue_indexed: Default::default(),
            module: None,
            in_flight: Default::default(),
        }
    }

    /// Visit a node with the given downward context and return it.
    ///
    /// In-place rewrites keep the node's identity stable; conversions
    /// wrapped around a *child* are spliced into the parent's operand slot
    /// by the check family, so the caller's own slot never goes stale.
    /// Nodes already marked as processed are not re-entered.
    pub fn iterate(&mut self, node: NodeId, vup: TypeContext<'gcx>) -> NodeId {
        if self.ast[node].did_width {
            return node;
        }
        self.visit_node(node, vup);
        node
    }

    /// The resolved type of a node that must already have one.
    pub(crate) fn node_ty(&self, node: NodeId) -> Type<'gcx> {
        match self.ast[node].ty {
            Some(t) => t,
            None => bug_span!(
                self.ast[node].span,
                self.cx,
                "{} reached a width decision without a resolved type",
                self.ast[node].kind.desc()
            ),
        }
    }

    pub(crate) fn span(&self, node: NodeId) -> Span {
        self.ast[node].span
    }

    /// Resolve a node's type into a plain vector, signaling the caller with
    /// `None` after reporting nothing; error types also yield `None`.
    pub(crate) fn bit_vector_ty(&self, node: NodeId) -> Option<Type<'gcx>> {
        self.node_ty(node).coercible_bit_vector()
    }

    fn assert_at_statement(&self, node: NodeId, vup: TypeContext<'gcx>) {
        if !(vup.self_determined() && vup.stage() == Stage::BOTH) {
            bug_span!(
                self.span(node),
                self.cx,
                "{} visited with an expression context",
                self.ast[node].kind.desc()
            );
        }
    }

    fn visit_node(&mut self, node: NodeId, vup: TypeContext<'gcx>) {
        let kind = self.ast[node].kind.clone();
        match kind {
            NodeKind::Module { items, .. } => self.visit_module(node, items, vup),
            NodeKind::Var { declared, init, .. } => self.visit_var(node, declared, init, vup),
            NodeKind::Task {
                ports, stmts, ret, ..
            } => self.visit_task(node, ports, stmts, ret, vup),
            NodeKind::Class { items, .. } => self.visit_class(node, items, vup),
            NodeKind::Clocking { items, .. } => self.visit_clocking(node, items, vup),
            NodeKind::EnumDef { base, items, .. } => self.visit_enum_def(node, base, items, vup),
            NodeKind::EnumItem { .. } => bug_span!(
                self.span(node),
                self.cx,
                "enum value visited outside of its enum declaration"
            ),
            NodeKind::StructDef { .. } => {
                self.assert_at_statement(node, vup);
                self.ast[node].did_width = true;
            }
            NodeKind::Assign { lhs, rhs } => self.visit_assign(node, lhs, rhs, vup),
            NodeKind::If {
                cond,
                then_stmts,
                else_stmts,
            } => self.visit_if(node, cond, then_stmts, else_stmts, vup),
            NodeKind::Delay { value, stmt } => self.visit_delay(node, value, stmt, vup),
            NodeKind::Repeat { .. } => bug_span!(
                self.span(node),
                self.cx,
                "found a `repeat` loop during width inference; loop controls are lowered by an \
                 earlier pass"
            ),

            NodeKind::IntConst {
                value,
                width,
                signed,
                is_unsized,
            } => self.visit_int_const(node, &value, width, signed, is_unsized, vup),
            NodeKind::RealConst(..) => {
                if vup.prelim() {
                    self.ast.set_ty(node, &ty::REAL_TYPE);
                }
            }
            NodeKind::StringConst(..) => {
                if vup.prelim() {
                    self.ast.set_ty(node, &ty::STRING_TYPE);
                }
            }
            NodeKind::VarRef { target } => self.visit_var_ref(node, target, vup),
            NodeKind::Unary(op, arg) => self.visit_unary(node, op, arg, vup),
            NodeKind::Binary(op, lhs, rhs) => self.visit_binary(node, op, lhs, rhs, vup),
            NodeKind::Cond {
                cond,
                then_expr,
                else_expr,
            } => self.visit_cond(node, cond, then_expr, else_expr, vup),
            NodeKind::Concat { lhs, rhs } => self.visit_concat(node, lhs, rhs, vup),
            NodeKind::CastSign { sign, arg } => self.visit_cast_sign(node, sign, arg, vup),
            NodeKind::CallRef { target, args, .. } => self.visit_call(node, target, args, vup),
            NodeKind::MemberRef { scope, name, .. } => {
                self.visit_member_ref(node, scope, name, vup)
            }
            NodeKind::ThisRef => self.visit_this_ref(node, vup),
            NodeKind::EnumAttr { attr, arg, .. } => self.visit_enum_attr(node, attr, arg, vup),
            NodeKind::UniqueIndex { arg } => self.visit_unique_index(node, arg, vup),

            NodeKind::IntToReal { arg } => self.visit_int_to_real(node, arg, vup),
            NodeKind::SignedToReal { arg } => self.visit_signed_to_real(node, arg, vup),
            NodeKind::RealToInt { arg } => self.visit_real_to_int(node, arg, vup),
            NodeKind::RealToBits { arg } => self.visit_real_to_bits(node, arg, vup),
            NodeKind::BitsToReal { arg } => self.visit_bits_to_real(node, arg, vup),

            // Inserted by this pass; their types are fixed at creation.
            NodeKind::Extend { .. }
            | NodeKind::Trunc { .. }
            | NodeKind::PackString { .. }
            | NodeKind::PackArray { .. } => (),
        }
    }

    // ===== Structural rules =====

    fn visit_module(&mut self, node: NodeId, items: Vec<NodeId>, vup: TypeContext<'gcx>) {
        self.assert_at_statement(node, vup);
        let prev = self.module.replace(node);
        for item in items {
            self.iterate(item, TypeContext::self_det(Stage::BOTH));
        }
        self.module = prev;
        self.ast[node].did_width = true;
    }

    fn visit_var(
        &mut self,
        node: NodeId,
        declared: Option<Type<'gcx>>,
        init: Option<NodeId>,
        _vup: TypeContext<'gcx>,
    ) {
        if !self.in_flight.insert(node) {
            self.cx.emit(
                DiagBuilder2::error(format!(
                    "{} depends on its own value",
                    self.ast[node].kind.desc()
                ))
                .span(self.span(node)),
            );
            self.ast.set_ty(node, &ty::ERROR_TYPE);
            return;
        }

        let ty = match (declared, init) {
            (Some(t), _) => t,
            (None, Some(init)) => {
                // Infer the variable's type from its initial value.
                self.iterate(init, TypeContext::self_det(Stage::PRELIM));
                self.node_ty(init)
            }
            (None, None) => {
                self.cx.emit(
                    DiagBuilder2::error(format!(
                        "{} has implicit type but is not initialized",
                        self.ast[node].kind.desc()
                    ))
                    .span(self.span(node))
                    .add_note("specify a type for the variable; or")
                    .add_note("add an initial value"),
                );
                &ty::ERROR_TYPE
            }
        };
        self.ast.set_ty(node, ty);

        if let Some(init) = init {
            if declared.is_some() {
                self.iterate(init, TypeContext::context_det());
            }
            self.iterate_check_assign(node, "initial value", init, Stage::FINAL, ty);
        }

        self.in_flight.remove(&node);
        self.ast[node].did_width = true;
    }

    fn visit_task(
        &mut self,
        node: NodeId,
        ports: Vec<NodeId>,
        stmts: Vec<NodeId>,
        ret: Option<Type<'gcx>>,
        _vup: TypeContext<'gcx>,
    ) {
        if !self.in_flight.insert(node) {
            self.cx.emit(
                DiagBuilder2::error(format!(
                    "{} is involved in a recursive definition",
                    self.ast[node].kind.desc()
                ))
                .span(self.span(node)),
            );
            self.ast.set_ty(node, &ty::ERROR_TYPE);
            return;
        }
        for port in ports {
            self.iterate(port, TypeContext::self_det(Stage::BOTH));
        }
        for stmt in stmts {
            self.iterate(stmt, TypeContext::self_det(Stage::BOTH));
        }
        self.ast.set_ty(node, ret.unwrap_or(&ty::VOID_TYPE));
        self.in_flight.remove(&node);
        self.ast[node].did_width = true;
    }

    fn visit_class(&mut self, node: NodeId, items: Vec<NodeId>, vup: TypeContext<'gcx>) {
        self.assert_at_statement(node, vup);
        for item in items {
            self.iterate(item, TypeContext::self_det(Stage::BOTH));
        }
        self.ast.set_ty(node, self.cx.mkty_class(node));
        self.ast[node].did_width = true;
    }

    fn visit_clocking(&mut self, node: NodeId, items: Vec<NodeId>, vup: TypeContext<'gcx>) {
        self.assert_at_statement(node, vup);
        for item in items {
            self.iterate(item, TypeContext::self_det(Stage::BOTH));
        }
        self.ast[node].did_width = true;
    }

    fn visit_enum_def(
        &mut self,
        node: NodeId,
        base: Option<Type<'gcx>>,
        items: Vec<NodeId>,
        vup: TypeContext<'gcx>,
    ) {
        self.assert_at_statement(node, vup);
        let base = base.unwrap_or(&ty::INT_TYPE);
        let ety = self.cx.mkty_enum(base, node);
        self.ast.set_ty(node, ety);
        for item in items {
            let value = match self.ast[item].kind {
                NodeKind::EnumItem { value, .. } => value,
                _ => bug_span!(
                    self.span(item),
                    self.cx,
                    "enum declaration contains a non-value item"
                ),
            };
            if let Some(value) = value {
                // Explicit values resolve against the backing vector.
                self.iterate(value, TypeContext::context_det());
                self.iterate_check(
                    item,
                    "enum value",
                    value,
                    Determ::Assign,
                    Stage::FINAL,
                    base,
                    ExtendRule::Lhs,
                    true,
                );
            }
            self.ast.set_ty(item, ety);
            self.ast[item].did_width = true;
        }
        self.ast[node].did_width = true;
    }

    fn visit_assign(&mut self, node: NodeId, lhs: NodeId, rhs: NodeId, vup: TypeContext<'gcx>) {
        self.assert_at_statement(node, vup);
        // The right-hand side may adopt the target's width, so resolve it
        // context-determined before the target pins the expectation down.
        self.iterate(rhs, TypeContext::context_det());
        self.iterate(lhs, TypeContext::self_det(Stage::BOTH));
        let lhs_ty = self.node_ty(lhs);
        if lhs_ty.resolve().is_error() {
            return;
        }
        self.ast.set_ty(node, lhs_ty);
        self.iterate_check_assign(node, "assigned value", rhs, Stage::FINAL, lhs_ty);
    }

    fn visit_if(
        &mut self,
        node: NodeId,
        cond: NodeId,
        then_stmts: Vec<NodeId>,
        else_stmts: Vec<NodeId>,
        vup: TypeContext<'gcx>,
    ) {
        self.assert_at_statement(node, vup);
        self.iterate_check_bool(node, "condition", cond, Stage::BOTH);
        for stmt in then_stmts.into_iter().chain(else_stmts) {
            self.iterate(stmt, TypeContext::self_det(Stage::BOTH));
        }
    }

    fn visit_delay(
        &mut self,
        node: NodeId,
        value: NodeId,
        stmt: Option<NodeId>,
        vup: TypeContext<'gcx>,
    ) {
        self.assert_at_statement(node, vup);
        self.iterate_check_delay(node, "delay", value, Stage::BOTH);
        if let Some(stmt) = stmt {
            self.iterate(stmt, TypeContext::self_det(Stage::BOTH));
        }
    }

    // ===== Terminals =====

    fn visit_int_const(
        &mut self,
        node: NodeId,
        value: &num::BigInt,
        width: usize,
        signed: bool,
        is_unsized: bool,
        vup: TypeContext<'gcx>,
    ) {
        if vup.prelim() {
            let needed = (value.bits() as usize).max(1);
            let (w, wmin) = if is_unsized {
                (needed.max(32), needed)
            } else {
                (width, width)
            };
            let ty = self
                .cx
                .mkty_logic(w, wmin, ty::Sign::from_bool(signed));
            self.ast.set_ty(node, ty);
        }
    }

    fn visit_var_ref(&mut self, node: NodeId, target: NodeId, vup: TypeContext<'gcx>) {
        if vup.prelim() {
            if self.ast.ty(target).is_none() {
                self.iterate(target, TypeContext::self_det(Stage::BOTH));
            }
            let ty = self.ast.ty(target).unwrap_or(&ty::ERROR_TYPE);
            self.ast.set_ty(node, ty);
        }
    }

    // ===== Operator dispatch =====

    fn visit_unary(&mut self, node: NodeId, op: UnaryOp, arg: NodeId, vup: TypeContext<'gcx>) {
        use UnaryOp::*;
        match op {
            LogNot => self.visit_log_not(node, arg, vup),
            RedAnd | RedOr | RedXor | OneHot | OneHot0 => self.visit_red(node, arg, vup),
            Negate => self.visit_negate_not(node, arg, true, vup),
            BitNot => self.visit_negate_not(node, arg, false, vup),
            NegateReal | Ceil | Floor => self.visit_real_unop(node, arg, vup),
        }
    }

    fn visit_binary(
        &mut self,
        node: NodeId,
        op: crate::ast::BinaryOp,
        lhs: NodeId,
        rhs: NodeId,
        vup: TypeContext<'gcx>,
    ) {
        use crate::ast::BinaryOp::*;
        match op {
            LogAnd | LogOr | LogIf => self.visit_log_and_or(node, lhs, rhs, vup),
            Eq | Neq | Gt | Gte | Lt | Lte | GtS | GteS | LtS | LteS | EqCase | NeqCase => {
                self.visit_cmp_eq_gt(node, op, lhs, rhs, true, vup)
            }
            EqWild | NeqWild => self.visit_cmp_eq_gt(node, op, lhs, rhs, false, vup),
            EqReal | NeqReal | LtReal | LteReal | GtReal | GteReal => {
                self.visit_cmp_real(node, lhs, rhs, vup)
            }
            EqString | NeqString | LtString | LteString | GtString | GteString => {
                self.visit_cmp_string(node, lhs, rhs, vup)
            }
            And | Or | Xor | BufIf1 => self.visit_bitwise(node, op, lhs, rhs, vup),
            Add | Sub | Mul | Div => self.visit_arith(node, op, lhs, rhs, true, vup),
            MulS | DivS | ModDiv | ModDivS => self.visit_arith(node, op, lhs, rhs, false, vup),
            AddReal | SubReal | MulReal | DivReal | PowReal => {
                self.visit_real_binop(node, lhs, rhs, vup)
            }
            ShiftL | ShiftR | ShiftRS => self.visit_shift(node, lhs, rhs, vup),
        }
    }
}
