// Copyright (c) 2016-2020 Fabian Schuiki

//! Iterate-and-check convenience wrappers and the auxiliary lookups of the
//! inference pass: fixed-type coercion helpers, conversion operator rules,
//! open-array call specialization, the enclosing-class and generated-table
//! memos, and clocking block member resolution.

use super::{Determ, ExtendRule, Stage, TypeContext, Typeck};
use crate::ast::{EnumAttrKind, NodeId, NodeKind, SpecializeRole};
use crate::crate_prelude::*;
use crate::ty::{self, Type, TypeKind};
use itertools::Itertools;

/// Maximum number of bits in an enum's backing vector for which attribute
/// lookup tables are generated.
const ENUM_LOOKUP_BITS: usize = 16;

impl<'a, 'gcx> Typeck<'a, 'gcx> {
    // ===== Fixed-parameter check wrappers =====
    //
    // Each of these is the core check operation with a fixed parameter
    // set; none of them carries its own mismatch logic.

    /// Coerce a self-determined child to real if it is not already.
    pub(crate) fn iterate_check_real(
        &mut self,
        parent: NodeId,
        side: &str,
        under: NodeId,
        stage: Stage,
    ) -> NodeId {
        self.iterate_check_typed_self_prelim(parent, side, under, &ty::REAL_TYPE, stage)
    }

    /// Coerce a self-determined child to 8 bit signed if it is not already.
    pub(crate) fn iterate_check_signed8(
        &mut self,
        parent: NodeId,
        side: &str,
        under: NodeId,
        stage: Stage,
    ) -> NodeId {
        let exp = self.cx.mkty_signed8();
        self.iterate_check_typed_self_prelim(parent, side, under, exp, stage)
    }

    /// Coerce a self-determined child to 32 bit signed if it is not already.
    pub(crate) fn iterate_check_signed32(
        &mut self,
        parent: NodeId,
        side: &str,
        under: NodeId,
        stage: Stage,
    ) -> NodeId {
        let exp = self.cx.mkty_signed32();
        self.iterate_check_typed_self_prelim(parent, side, under, exp, stage)
    }

    /// Coerce a self-determined child to 32 bit unsigned if it is not
    /// already.
    pub(crate) fn iterate_check_uint32(
        &mut self,
        parent: NodeId,
        side: &str,
        under: NodeId,
        stage: Stage,
    ) -> NodeId {
        let exp = self.cx.mkty_unsigned32();
        self.iterate_check_typed_self_prelim(parent, side, under, exp, stage)
    }

    /// Coerce a self-determined child to a 64 bit delay value.
    ///
    /// Reals pass through untouched; everything else widens to 64 bit
    /// unsigned. The 64 bit promotion is expected here, not a mistake, so
    /// expansion warnings are suppressed on the operand's location and the
    /// check runs with warnings off.
    pub(crate) fn iterate_check_delay(
        &mut self,
        parent: NodeId,
        side: &str,
        under: NodeId,
        stage: Stage,
    ) -> NodeId {
        let mut under = under;
        if stage.contains(Stage::PRELIM) {
            self.iterate(under, TypeContext::self_det(Stage::PRELIM));
        }
        if stage.contains(Stage::FINAL) {
            let exp = if self.node_ty(under).is_double() {
                &ty::REAL_TYPE
            } else {
                self.ast[under].suppress |= WarnMask::WIDTHEXPAND;
                self.cx.mkty_logic(64, 64, ty::Sign::Unsigned)
            };
            under = self.iterate_check(
                parent,
                side,
                under,
                Determ::SelfDet,
                Stage::FINAL,
                exp,
                ExtendRule::Expected,
                false,
            );
        }
        under
    }

    /// Coerce a self-determined child to an explicit type, running its
    /// prelim stage first if requested.
    pub(crate) fn iterate_check_typed_self_prelim(
        &mut self,
        parent: NodeId,
        side: &str,
        under: NodeId,
        exp: Type<'gcx>,
        stage: Stage,
    ) -> NodeId {
        let mut under = under;
        if stage.contains(Stage::PRELIM) {
            self.iterate(under, TypeContext::self_det(Stage::PRELIM));
        }
        if stage.contains(Stage::FINAL) {
            under = self.iterate_check(
                parent,
                side,
                under,
                Determ::SelfDet,
                Stage::FINAL,
                exp,
                ExtendRule::Expected,
                true,
            );
        }
        under
    }

    /// Resolve a self-determined child in isolation from the expected type.
    pub(crate) fn iterate_check_self(
        &mut self,
        parent: NodeId,
        side: &str,
        under: NodeId,
        determ: Determ,
        stage: Stage,
    ) -> NodeId {
        debug_assert_eq!(determ, Determ::SelfDet);
        let mut under = under;
        if stage.contains(Stage::PRELIM) {
            self.iterate(under, TypeContext::self_det(Stage::PRELIM));
        }
        let exp = self.node_ty(under);
        under = self.iterate_check(
            parent,
            side,
            under,
            Determ::SelfDet,
            Stage::FINAL,
            exp,
            ExtendRule::Expected,
            true,
        );
        under
    }

    /// Like [`Typeck::iterate_check_self`], but a non-integral child is a
    /// type error.
    pub(crate) fn iterate_check_integral_self(
        &mut self,
        parent: NodeId,
        side: &str,
        under: NodeId,
        determ: Determ,
        stage: Stage,
    ) -> NodeId {
        debug_assert_eq!(determ, Determ::SelfDet);
        let mut under = under;
        if stage.contains(Stage::PRELIM) {
            self.iterate(under, TypeContext::self_det(Stage::PRELIM));
        }
        let uty = self.node_ty(under);
        if !uty.resolve().is_error() && !uty.is_integral() {
            self.cx.emit(
                DiagBuilder2::error(format!(
                    "{} expects an integral value on the {}, but the expression has type `{}`",
                    self.ast[parent].kind.desc(),
                    side,
                    uty
                ))
                .span(self.span(under)),
            );
            return under;
        }
        let exp = uty;
        under = self.iterate_check(
            parent,
            side,
            under,
            Determ::SelfDet,
            Stage::FINAL,
            exp,
            ExtendRule::Expected,
            true,
        );
        under
    }

    /// Resolve a self-determined child and require it to be a sized
    /// number. Reals are converted to integers; domains without a vector
    /// form are rejected outright with a type error.
    pub(crate) fn iterate_check_sized_self(
        &mut self,
        parent: NodeId,
        side: &str,
        under: NodeId,
        determ: Determ,
        stage: Stage,
    ) -> NodeId {
        debug_assert_eq!(determ, Determ::SelfDet);
        let mut under = under;
        if stage.contains(Stage::PRELIM) {
            self.iterate(under, TypeContext::self_det(Stage::PRELIM));
        }
        let uty = self.node_ty(under);
        if uty.resolve().is_error() {
            return under;
        }
        if uty.is_double() {
            under = self.splice_cvt_int(parent, under);
        } else if !uty.is_integral() {
            self.cx.emit(
                DiagBuilder2::error(format!(
                    "expected a numeric value, but the {} of {} has type `{}`",
                    side,
                    self.ast[parent].kind.desc(),
                    uty
                ))
                .span(self.span(under)),
            );
            return under;
        }
        let exp = self.node_ty(under);
        under = self.iterate_check(
            parent,
            side,
            under,
            Determ::SelfDet,
            Stage::FINAL,
            exp,
            ExtendRule::Expected,
            true,
        );
        under
    }

    // ===== Conversion operator rules =====

    /// Conversion of an unsigned integer to real. If the operand turns out
    /// to be signed the node is rewritten in place to the signed-source
    /// conversion, so the conversion always has one canonical form
    /// afterwards.
    pub(crate) fn visit_int_to_real(&mut self, node: NodeId, arg: NodeId, vup: TypeContext<'gcx>) {
        if vup.prelim() {
            self.ast.set_ty(node, &ty::REAL_TYPE);
            self.iterate(arg, TypeContext::self_det(Stage::PRELIM));
            if self.node_ty(arg).is_signed() {
                self.ast[node].kind = NodeKind::SignedToReal { arg };
            }
        }
    }

    /// Conversion of a signed integer to real.
    pub(crate) fn visit_signed_to_real(
        &mut self,
        node: NodeId,
        arg: NodeId,
        vup: TypeContext<'gcx>,
    ) {
        if vup.prelim() {
            self.ast.set_ty(node, &ty::REAL_TYPE);
            self.iterate(arg, TypeContext::self_det(Stage::PRELIM));
        }
    }

    /// Conversion of a real to a 32 bit signed integer.
    pub(crate) fn visit_real_to_int(&mut self, node: NodeId, arg: NodeId, vup: TypeContext<'gcx>) {
        if vup.prelim() {
            self.iterate_check_real(node, "operand", arg, Stage::BOTH);
            self.ast.set_ty(node, self.cx.mkty_signed32());
        }
    }

    /// Reinterpretation of a real's bit pattern as a 64 bit unsigned
    /// integer.
    pub(crate) fn visit_real_to_bits(
        &mut self,
        node: NodeId,
        arg: NodeId,
        vup: TypeContext<'gcx>,
    ) {
        if vup.prelim() {
            self.iterate_check_real(node, "operand", arg, Stage::BOTH);
            self.ast.set_ty(node, self.cx.mkty_uint64());
        }
    }

    /// Reinterpretation of a 64 bit pattern as a real.
    pub(crate) fn visit_bits_to_real(
        &mut self,
        node: NodeId,
        arg: NodeId,
        vup: TypeContext<'gcx>,
    ) {
        if vup.prelim() {
            self.ast.set_ty(node, &ty::REAL_TYPE);
            let exp = self.cx.mkty_logic(64, 64, ty::Sign::Unsigned);
            self.iterate(arg, TypeContext::self_det(Stage::PRELIM));
            self.iterate_check(
                node,
                "operand",
                arg,
                Determ::SelfDet,
                Stage::FINAL,
                exp,
                ExtendRule::Expected,
                true,
            );
        }
    }

    // ===== Calls and open-array specialization =====

    pub(crate) fn visit_call(
        &mut self,
        node: NodeId,
        target: NodeId,
        args: Vec<NodeId>,
        vup: TypeContext<'gcx>,
    ) {
        if vup.prelim() {
            self.iterate(target, TypeContext::self_det(Stage::BOTH));
            for &arg in &args {
                self.iterate(arg, TypeContext::context_det());
            }
            let mut taskp = target;
            if self.task_has_open_array(taskp) {
                taskp = self.make_open_array_shell(node, taskp, &args);
            }
            let (ports, ret) = match &self.ast[taskp].kind {
                NodeKind::Task { ports, ret, .. } => (ports.clone(), *ret),
                _ => bug_span!(
                    self.span(node),
                    self.cx,
                    "call target is not a task or function"
                ),
            };
            if args.len() != ports.len() {
                self.cx.emit(
                    DiagBuilder2::error(format!(
                        "{} expects {} arguments, but {} were supplied",
                        self.ast[node].kind.desc(),
                        ports.len(),
                        args.len()
                    ))
                    .span(self.span(node)),
                );
            }
            for (&port, &arg) in ports.iter().zip(args.iter()) {
                let port_ty = match self.ast.ty(port) {
                    Some(t) => t,
                    None => continue,
                };
                self.iterate_check_assign(node, "argument", arg, Stage::FINAL, port_ty);
            }
            self.ast.set_ty(node, ret.unwrap_or(&ty::VOID_TYPE));
        }
    }

    /// Check whether any formal of a task uses an open array type.
    pub(crate) fn task_has_open_array(&self, taskp: NodeId) -> bool {
        let ports = match &self.ast[taskp].kind {
            NodeKind::Task { ports, .. } => ports,
            _ => return false,
        };
        ports.iter().any(|&p| match &self.ast[p].kind {
            NodeKind::Var {
                declared: Some(t), ..
            } => t.has_open_array(),
            _ => false,
        })
    }

    /// Specialize an open-array task for one call site.
    ///
    /// The declaration is deep-copied, the copy is marked as a concrete
    /// instance bound to this call, each open-array formal of the copy
    /// receives the actual argument's array type, and the call is
    /// redirected to the copy. The original declaration becomes a template
    /// and is never code-generated directly; a declaration can play at most
    /// one of the two roles.
    pub(crate) fn make_open_array_shell(
        &mut self,
        call: NodeId,
        taskp: NodeId,
        args: &[NodeId],
    ) -> NodeId {
        debug!(
            "specializing open-array {} for {}",
            self.ast[taskp].kind.desc(),
            self.ast[call].kind.desc()
        );
        let role = match &self.ast[taskp].kind {
            NodeKind::Task { role, .. } => *role,
            _ => bug_span!(
                self.span(taskp),
                self.cx,
                "open-array specialization of a non-task declaration"
            ),
        };
        let seq = match role {
            SpecializeRole::Child => bug_span!(
                self.span(taskp),
                self.cx,
                "open-array task is already a specialized instance; it cannot also become a \
                 template"
            ),
            SpecializeRole::Parent { children } => children + 1,
            SpecializeRole::None => 1,
        };
        match &mut self.ast[taskp].kind {
            NodeKind::Task { role, .. } => *role = SpecializeRole::Parent { children: seq },
            _ => unreachable!(),
        }

        let newt = self.ast.clone_subtree(taskp);
        let clone_ports = match &mut self.ast[newt].kind {
            NodeKind::Task { name, role, ports, .. } => {
                *role = SpecializeRole::Child;
                let new_name = get_name_table().intern(&format!("{}__open{}", name.value, seq));
                *name = Spanned::new(new_name, name.span);
                ports.clone()
            }
            _ => unreachable!(),
        };
        self.ast[newt].did_width = true;
        self.ast.insert_sibling_after(taskp, newt);

        // Bind each open formal to the actual argument's concrete type.
        for (&port, &arg) in clone_ports.iter().zip(args.iter()) {
            let is_open = match &self.ast[port].kind {
                NodeKind::Var {
                    declared: Some(t), ..
                } => t.has_open_array(),
                _ => false,
            };
            if is_open {
                let aty = self.ast.ty(arg).unwrap_or(&ty::ERROR_TYPE);
                if let NodeKind::Var { declared, .. } = &mut self.ast[port].kind {
                    *declared = Some(aty);
                }
                self.ast.set_ty(port, aty);
            }
            self.ast[port].did_width = true;
        }

        match &mut self.ast[call].kind {
            NodeKind::CallRef { target, .. } => *target = newt,
            _ => unreachable!(),
        }
        newt
    }

    // ===== Member resolution =====

    pub(crate) fn visit_member_ref(
        &mut self,
        node: NodeId,
        scope: NodeId,
        name: Spanned<Name>,
        vup: TypeContext<'gcx>,
    ) {
        if vup.prelim() {
            self.iterate(scope, TypeContext::self_det(Stage::BOTH));
            let (cb_name, items) = match &self.ast[scope].kind {
                NodeKind::Clocking { name, items } => (*name, items.clone()),
                _ => bug_span!(
                    self.span(node),
                    self.cx,
                    "member access base is not a clocking block"
                ),
            };
            match self.member_sel_clocking(&name, cb_name, &items) {
                Some(var) => {
                    if self.ast.ty(var).is_none() {
                        self.iterate(var, TypeContext::self_det(Stage::BOTH));
                    }
                    let ty = self.ast.ty(var).unwrap_or(&ty::ERROR_TYPE);
                    if let NodeKind::MemberRef { resolved, .. } = &mut self.ast[node].kind {
                        *resolved = Some(var);
                    }
                    self.ast.set_ty(node, ty);
                }
                None => self.ast.set_ty(node, &ty::ERROR_TYPE),
            }
        }
    }

    /// Scan a clocking block's item list for a member. On a miss, report an
    /// error that includes the best candidate among the declared names.
    fn member_sel_clocking(
        &mut self,
        name: &Spanned<Name>,
        cb_name: Spanned<Name>,
        items: &[NodeId],
    ) -> Option<NodeId> {
        let mut speller = SpellCheck::new();
        let mut declared = vec![];
        for &item in items {
            if let NodeKind::Var { name: vn, .. } = &self.ast[item].kind {
                if vn.value == name.value {
                    return Some(item);
                }
                speller.push_candidate(vn.value.to_string());
                declared.push(vn.value.to_string());
            }
        }
        let mut d = DiagBuilder2::error(format!(
            "member `{}` not found in clocking block `{}`",
            name.value, cb_name.value
        ))
        .span(name.span);
        if let Some(suggest) = speller.best_candidate(&name.value.as_str()) {
            d = d.add_note(format!("did you mean `{}`?", suggest));
        } else if !declared.is_empty() {
            d = d.add_note(format!("declared members are: {}", declared.iter().join(", ")));
        }
        self.cx.emit(d);
        None
    }

    pub(crate) fn visit_this_ref(&mut self, node: NodeId, vup: TypeContext<'gcx>) {
        if vup.prelim() {
            match self.containing_class_of(node) {
                Some(class) => {
                    let ty = self.cx.mkty_class(class);
                    self.ast.set_ty(node, ty);
                }
                None => {
                    self.cx.emit(
                        DiagBuilder2::error("`this` used outside of a class".to_string())
                            .span(self.span(node)),
                    );
                    self.ast.set_ty(node, &ty::ERROR_TYPE);
                }
            }
        }
    }

    /// The class lexically enclosing a node, if any. Memoized per node; the
    /// parent links make this a pure upward walk.
    pub(crate) fn containing_class_of(&mut self, node: NodeId) -> Option<NodeId> {
        if let Some(&cached) = self.containing_class.get(&node) {
            return cached;
        }
        let result = match self.ast[node].kind {
            NodeKind::Class { .. } => Some(node),
            _ => match self.ast[node].parent {
                Some(p) => self.containing_class_of(p),
                None => None,
            },
        };
        self.containing_class.insert(node, result);
        result
    }

    // ===== Enum attributes and generated lookup tables =====

    pub(crate) fn visit_enum_attr(
        &mut self,
        node: NodeId,
        attr: EnumAttrKind,
        arg: NodeId,
        vup: TypeContext<'gcx>,
    ) {
        if vup.prelim() {
            self.iterate(arg, TypeContext::self_det(Stage::BOTH));
            let aty = self.node_ty(arg);
            let base = match *aty.resolve() {
                TypeKind::Enum { base, .. } => base,
                TypeKind::Error => {
                    self.ast.set_ty(node, &ty::ERROR_TYPE);
                    return;
                }
                _ => {
                    self.cx.emit(
                        DiagBuilder2::error(format!(
                            "attribute `{}` requires an enum operand, but the expression has \
                             type `{}`",
                            attr, aty
                        ))
                        .span(self.span(arg)),
                    );
                    self.ast.set_ty(node, &ty::ERROR_TYPE);
                    return;
                }
            };
            let result_ty = match attr {
                EnumAttrKind::Name => &ty::STRING_TYPE,
                EnumAttrKind::Next | EnumAttrKind::Prev => aty,
            };
            self.ast.set_ty(node, result_ty);
            let span = self.span(node);
            if let Some(table) = self.enum_lookup_table(aty, base, attr, span) {
                if let NodeKind::EnumAttr { table: slot, .. } = &mut self.ast[node].kind {
                    *slot = Some(table);
                }
            }
        }
    }

    /// Get or create the lookup table backing an enum attribute. Repeated
    /// identical attribute lookups share one generated table.
    fn enum_lookup_table(
        &mut self,
        ety: Type<'gcx>,
        base: Type<'gcx>,
        attr: EnumAttrKind,
        span: Span,
    ) -> Option<NodeId> {
        if base.width() > ENUM_LOOKUP_BITS {
            self.cx.emit(
                DiagBuilder2::error(format!(
                    "attribute `{}` on an enum wider than {} bits is not supported",
                    attr, ENUM_LOOKUP_BITS
                ))
                .span(span),
            );
            return None;
        }
        if let Some(&table) = self.table_map.get(&(ety, attr)) {
            return Some(table);
        }
        let elem = match attr {
            EnumAttrKind::Name => &ty::STRING_TYPE,
            EnumAttrKind::Next | EnumAttrKind::Prev => ety,
        };
        let len = 1usize << base.width();
        let table_ty = self.cx.mkty_fixed_array(len, elem);
        let name = get_name_table().intern(&format!(
            "__enum_tab_{}_{}",
            attr,
            self.table_map.len()
        ));
        let var = self.ast.add(
            NodeKind::Var {
                name: Spanned::new(name, span),
                declared: Some(table_ty),
                init: None,
            },
            span,
        );
        self.ast.set_ty(var, table_ty);
        self.ast[var].did_width = true;
        if let Some(module) = self.module {
            self.ast.push_item(module, var);
        }
        trace!("generated {} for `{}`", self.ast[var].kind.desc(), ety);
        self.table_map.insert((ety, attr), var);
        Some(var)
    }

    // ===== Array locators =====

    /// `unique_index` yields a queue of the array's index type. The queue
    /// descriptors are deduplicated per index type.
    pub(crate) fn visit_unique_index(&mut self, node: NodeId, arg: NodeId, vup: TypeContext<'gcx>) {
        if vup.prelim() {
            self.iterate(arg, TypeContext::self_det(Stage::BOTH));
            let aty = self.node_ty(arg);
            let index = match *aty.resolve() {
                TypeKind::AssocArray { index, .. } => index,
                TypeKind::Queue(..)
                | TypeKind::DynArray(..)
                | TypeKind::FixedArray(..)
                | TypeKind::UnsizedArray(..) => self.cx.mkty_signed32(),
                TypeKind::Error => {
                    self.ast.set_ty(node, &ty::ERROR_TYPE);
                    return;
                }
                _ => {
                    self.cx.emit(
                        DiagBuilder2::error(format!(
                            "`unique_index` requires an array operand, but the expression has \
                             type `{}`",
                            aty
                        ))
                        .span(self.span(arg)),
                    );
                    self.ast.set_ty(node, &ty::ERROR_TYPE);
                    return;
                }
            };
            let qty = self.queue_type_indexed_by(index);
            self.ast.set_ty(node, qty);
        }
    }

    /// Get or create the queue descriptor for a given index type.
    pub(crate) fn queue_type_indexed_by(&mut self, index: Type<'gcx>) -> Type<'gcx> {
        if let Some(&q) = self.queue_indexed.get(&index) {
            return q;
        }
        let q = self.cx.mkty_queue(index);
        self.queue_indexed.insert(index, q);
        q
    }
}
