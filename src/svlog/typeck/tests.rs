// Copyright (c) 2016-2020 Fabian Schuiki

//! Unit tests for the inference engine. Trees are built directly through
//! the arena API, the way elaboration would hand them to the pass.

use super::*;
use crate::ast::{Ast, BinaryOp, EnumAttrKind, NodeId, NodeKind, SpecializeRole, UnaryOp};
use crate::context::{GlobalArenas, GlobalContext, WarnCode};
use crate::ty::{self, Sign, Type, TypeKind};
use num::BigInt;

fn sp() -> Span {
    INVALID_SPAN
}

fn name(s: &str) -> Spanned<Name> {
    Spanned::new(get_name_table().intern(s), sp())
}

fn lit(ast: &mut Ast, width: usize, signed: bool, value: i64) -> NodeId {
    ast.add(
        NodeKind::IntConst {
            value: BigInt::from(value),
            width,
            signed,
            is_unsized: false,
        },
        sp(),
    )
}

fn ulit(ast: &mut Ast, value: i64) -> NodeId {
    ast.add(
        NodeKind::IntConst {
            value: BigInt::from(value),
            width: 32,
            signed: false,
            is_unsized: true,
        },
        sp(),
    )
}

fn rlit(ast: &mut Ast, value: f64) -> NodeId {
    ast.add(NodeKind::RealConst(value), sp())
}

fn var<'gcx>(ast: &mut Ast<'gcx>, n: &str, ty: Type<'gcx>) -> NodeId {
    ast.add(
        NodeKind::Var {
            name: name(n),
            declared: Some(ty),
            init: None,
        },
        sp(),
    )
}

fn var_init<'gcx>(ast: &mut Ast<'gcx>, n: &str, init: NodeId) -> NodeId {
    ast.add(
        NodeKind::Var {
            name: name(n),
            declared: None,
            init: Some(init),
        },
        sp(),
    )
}

fn vref(ast: &mut Ast, target: NodeId) -> NodeId {
    ast.add(NodeKind::VarRef { target }, sp())
}

fn bin(ast: &mut Ast, op: BinaryOp, lhs: NodeId, rhs: NodeId) -> NodeId {
    ast.add(NodeKind::Binary(op, lhs, rhs), sp())
}

fn assign(ast: &mut Ast, lhs: NodeId, rhs: NodeId) -> NodeId {
    ast.add(NodeKind::Assign { lhs, rhs }, sp())
}

fn module(ast: &mut Ast, items: Vec<NodeId>) -> NodeId {
    ast.add(
        NodeKind::Module {
            name: name("top"),
            items,
        },
        sp(),
    )
}

fn count_nodes(ast: &Ast, pred: impl Fn(&NodeKind) -> bool) -> usize {
    (0..ast.len())
        .filter(|&i| pred(&ast[NodeId(i as u32)].kind))
        .count()
}

fn count_extends(ast: &Ast) -> usize {
    count_nodes(ast, |k| matches!(k, NodeKind::Extend { .. }))
}

fn count_truncs(ast: &Ast) -> usize {
    count_nodes(ast, |k| matches!(k, NodeKind::Trunc { .. }))
}

fn warn_codes(cx: &GlobalContext) -> Vec<WarnCode> {
    cx.width_warnings().into_iter().map(|(c, _)| c).collect()
}

macro_rules! fixture {
    ($sess:ident, $arena:ident, $cx:ident, $ast:ident) => {
        let $sess = Session::new();
        let $arena = GlobalArenas::default();
        let $cx = GlobalContext::new(&$sess, &$arena);
        #[allow(unused_mut)]
        let mut $ast = Ast::new();
    };
}

#[test]
fn assignment_truncates_and_warns() {
    fixture!(sess, arena, cx, ast);
    let a = var(&mut ast, "a", cx.mkty_logic(6, 6, Sign::Unsigned));
    let b = var(&mut ast, "b", cx.mkty_logic(10, 10, Sign::Unsigned));
    let (ar, br) = (vref(&mut ast, a), vref(&mut ast, b));
    let asn = assign(&mut ast, ar, br);
    let m = module(&mut ast, vec![a, b, asn]);
    run(&cx, &mut ast, m);

    assert_eq!(count_truncs(&ast), 1);
    assert_eq!(warn_codes(&cx), vec![WarnCode::WidthTrunc]);
    assert_eq!(cx.error_count(), 0);
    let trunc = (0..ast.len())
        .map(|i| NodeId(i as u32))
        .find(|&i| matches!(ast[i].kind, NodeKind::Trunc { .. }))
        .unwrap();
    assert_eq!(ast.ty(trunc).unwrap().width(), 6);
}

#[test]
fn assignment_expands_and_warns() {
    fixture!(sess, arena, cx, ast);
    let a = var(&mut ast, "a", cx.mkty_logic(10, 10, Sign::Unsigned));
    let b = var(&mut ast, "b", cx.mkty_logic(6, 6, Sign::Unsigned));
    let (ar, br) = (vref(&mut ast, a), vref(&mut ast, b));
    let asn = assign(&mut ast, ar, br);
    let m = module(&mut ast, vec![a, b, asn]);
    run(&cx, &mut ast, m);

    assert_eq!(count_extends(&ast), 1);
    assert_eq!(warn_codes(&cx), vec![WarnCode::WidthExpand]);
    assert_eq!(cx.error_count(), 0);
}

#[test]
fn matching_widths_are_silent() {
    fixture!(sess, arena, cx, ast);
    let a = var(&mut ast, "a", cx.mkty_logic(8, 8, Sign::Unsigned));
    let b = var(&mut ast, "b", cx.mkty_logic(8, 8, Sign::Unsigned));
    let (ar, br) = (vref(&mut ast, a), vref(&mut ast, b));
    let asn = assign(&mut ast, ar, br);
    let m = module(&mut ast, vec![a, b, asn]);
    run(&cx, &mut ast, m);

    assert_eq!(count_extends(&ast) + count_truncs(&ast), 0);
    assert!(warn_codes(&cx).is_empty());
}

#[test]
fn reentry_is_a_no_op() {
    fixture!(sess, arena, cx, ast);
    let a = var(&mut ast, "a", cx.mkty_logic(6, 6, Sign::Unsigned));
    let b = var(&mut ast, "b", cx.mkty_logic(10, 10, Sign::Unsigned));
    let (ar, br) = (vref(&mut ast, a), vref(&mut ast, b));
    let asn = assign(&mut ast, ar, br);
    let m = module(&mut ast, vec![a, b, asn]);
    run(&cx, &mut ast, m);
    run(&cx, &mut ast, m);

    assert_eq!(count_truncs(&ast), 1);
    assert_eq!(warn_codes(&cx).len(), 1);
}

#[test]
fn rerun_after_clear_inserts_nothing_new() {
    fixture!(sess, arena, cx, ast);
    let a = var(&mut ast, "a", cx.mkty_logic(10, 10, Sign::Unsigned));
    let b = var(&mut ast, "b", cx.mkty_logic(6, 6, Sign::Unsigned));
    let (ar, br) = (vref(&mut ast, a), vref(&mut ast, b));
    let asn = assign(&mut ast, ar, br);
    let m = module(&mut ast, vec![a, b, asn]);
    run(&cx, &mut ast, m);
    assert_eq!(count_extends(&ast), 1);

    // A coerced tree is a fixpoint: clearing the markers and re-running
    // finds nothing left to repair.
    clear_width(&mut ast, m);
    run(&cx, &mut ast, m);
    assert_eq!(count_extends(&ast), 1);
    assert_eq!(cx.error_count(), 0);
}

#[test]
fn arithmetic_takes_max_operand_width() {
    fixture!(sess, arena, cx, ast);
    let a = var(&mut ast, "a", cx.mkty_logic(5, 5, Sign::Unsigned));
    let b = var(&mut ast, "b", cx.mkty_logic(9, 9, Sign::Unsigned));
    let t = var(&mut ast, "t", cx.mkty_logic(9, 9, Sign::Unsigned));
    let (ar, br) = (vref(&mut ast, a), vref(&mut ast, b));
    let add = bin(&mut ast, BinaryOp::Add, ar, br);
    let tr = vref(&mut ast, t);
    let asn = assign(&mut ast, tr, add);
    let m = module(&mut ast, vec![a, b, t, asn]);
    run(&cx, &mut ast, m);

    assert_eq!(ast.ty(add).unwrap().width(), 9);
    // After the final stage both operand slots report the result width.
    let (l, r) = match ast[add].kind {
        NodeKind::Binary(_, l, r) => (l, r),
        _ => unreachable!(),
    };
    assert_eq!(ast.ty(l).unwrap().width(), 9);
    assert_eq!(ast.ty(r).unwrap().width(), 9);
    assert_eq!(cx.error_count(), 0);
}

#[test]
fn arithmetic_promotes_to_real() {
    fixture!(sess, arena, cx, ast);
    let a = var(&mut ast, "a", cx.mkty_logic(8, 8, Sign::Unsigned));
    let r = var(&mut ast, "r", cx.mkty_double());
    let ar = vref(&mut ast, a);
    let c = rlit(&mut ast, 2.5);
    let add = bin(&mut ast, BinaryOp::Add, ar, c);
    let rr = vref(&mut ast, r);
    let asn = assign(&mut ast, rr, add);
    let m = module(&mut ast, vec![a, r, asn]);
    run(&cx, &mut ast, m);

    match ast[add].kind {
        NodeKind::Binary(op, l, rhs) => {
            assert_eq!(op, BinaryOp::AddReal);
            // No residual integral-real mismatch on either side.
            assert!(ast.ty(l).unwrap().is_double());
            assert!(ast.ty(rhs).unwrap().is_double());
        }
        _ => unreachable!(),
    }
    assert!(ast.ty(add).unwrap().is_double());
    assert_eq!(
        count_nodes(&ast, |k| matches!(k, NodeKind::IntToReal { .. })),
        1
    );
    assert_eq!(cx.error_count(), 0);
    assert!(warn_codes(&cx).is_empty());
}

#[test]
fn real_assigned_to_integer_converts() {
    fixture!(sess, arena, cx, ast);
    let r = var(&mut ast, "r", cx.mkty_double());
    let i = var(&mut ast, "i", cx.mkty_signed32());
    let rr = vref(&mut ast, r);
    let ir = vref(&mut ast, i);
    let asn = assign(&mut ast, ir, rr);
    let m = module(&mut ast, vec![r, i, asn]);
    run(&cx, &mut ast, m);

    assert_eq!(
        count_nodes(&ast, |k| matches!(k, NodeKind::RealToInt { .. })),
        1
    );
    assert_eq!(count_extends(&ast) + count_truncs(&ast), 0);
    assert_eq!(cx.error_count(), 0);
}

#[test]
fn sign_cast_round_trip_keeps_width() {
    fixture!(sess, arena, cx, ast);
    let a = var(&mut ast, "a", cx.mkty_logic(8, 8, Sign::Unsigned));
    let t = var(&mut ast, "t", cx.mkty_logic(8, 8, Sign::Unsigned));
    let ar = vref(&mut ast, a);
    let signed = ast.add(
        NodeKind::CastSign {
            sign: Sign::Signed,
            arg: ar,
        },
        sp(),
    );
    let unsigned = ast.add(
        NodeKind::CastSign {
            sign: Sign::Unsigned,
            arg: signed,
        },
        sp(),
    );
    let tr = vref(&mut ast, t);
    let asn = assign(&mut ast, tr, unsigned);
    let m = module(&mut ast, vec![a, t, asn]);
    run(&cx, &mut ast, m);

    let ty = ast.ty(unsigned).unwrap();
    assert_eq!(ty.width(), 8);
    assert!(ty.is_unsigned());
    assert!(ty.is_integral());
    assert_eq!(count_extends(&ast) + count_truncs(&ast), 0);
    assert_eq!(cx.error_count(), 0);
}

#[test]
fn add_4bit_literal_to_8bit_signed_variable() {
    fixture!(sess, arena, cx, ast);
    let b = var(&mut ast, "b", cx.mkty_logic(8, 8, Sign::Signed));
    let t = var(&mut ast, "t", cx.mkty_logic(8, 8, Sign::Signed));
    let small = lit(&mut ast, 4, false, 5);
    let br = vref(&mut ast, b);
    let add = bin(&mut ast, BinaryOp::Add, small, br);
    let tr = vref(&mut ast, t);
    let asn = assign(&mut ast, tr, add);
    let m = module(&mut ast, vec![b, t, asn]);
    run(&cx, &mut ast, m);

    // The 4 bit operand grows to 8 bits through an inserted conversion,
    // classified as an expansion; no error is raised.
    assert_eq!(ast.ty(add).unwrap().width(), 8);
    assert_eq!(count_extends(&ast), 1);
    assert_eq!(warn_codes(&cx), vec![WarnCode::WidthExpand]);
    assert_eq!(cx.error_count(), 0);
}

#[test]
fn unsized_literal_resizes_without_warning() {
    fixture!(sess, arena, cx, ast);
    let t = var(&mut ast, "t", cx.mkty_logic(8, 8, Sign::Unsigned));
    let c = ulit(&mut ast, 5);
    let tr = vref(&mut ast, t);
    let asn = assign(&mut ast, tr, c);
    let m = module(&mut ast, vec![t, asn]);
    run(&cx, &mut ast, m);

    assert!(warn_codes(&cx).is_empty());
    assert_eq!(count_extends(&ast) + count_truncs(&ast), 0);
    assert_eq!(ast.ty(c).unwrap().width(), 8);
}

#[test]
fn oversized_unsized_literal_still_warns() {
    fixture!(sess, arena, cx, ast);
    let t = var(&mut ast, "t", cx.mkty_logic(8, 8, Sign::Unsigned));
    let c = ulit(&mut ast, 300);
    let tr = vref(&mut ast, t);
    let asn = assign(&mut ast, tr, c);
    let m = module(&mut ast, vec![t, asn]);
    run(&cx, &mut ast, m);

    assert_eq!(warn_codes(&cx), vec![WarnCode::WidthTrunc]);
    assert_eq!(count_truncs(&ast), 1);
}

#[test]
fn delay_expands_to_64_bits_silently() {
    fixture!(sess, arena, cx, ast);
    let d = var(&mut ast, "d", cx.mkty_logic(8, 8, Sign::Unsigned));
    let dr = vref(&mut ast, d);
    let delay = ast.add(
        NodeKind::Delay {
            value: dr,
            stmt: None,
        },
        sp(),
    );
    let m = module(&mut ast, vec![d, delay]);
    run(&cx, &mut ast, m);

    assert_eq!(count_extends(&ast), 1);
    assert!(warn_codes(&cx).is_empty());
    let ext = (0..ast.len())
        .map(|i| NodeId(i as u32))
        .find(|&i| matches!(ast[i].kind, NodeKind::Extend { .. }))
        .unwrap();
    assert_eq!(ast.ty(ext).unwrap().width(), 64);
}

#[test]
fn real_delay_passes_through() {
    fixture!(sess, arena, cx, ast);
    let d = var(&mut ast, "d", cx.mkty_double());
    let dr = vref(&mut ast, d);
    let delay = ast.add(
        NodeKind::Delay {
            value: dr,
            stmt: None,
        },
        sp(),
    );
    let m = module(&mut ast, vec![d, delay]);
    run(&cx, &mut ast, m);

    assert_eq!(count_extends(&ast), 0);
    assert_eq!(
        count_nodes(&ast, |k| matches!(k, NodeKind::RealToInt { .. })),
        0
    );
    assert!(warn_codes(&cx).is_empty());
}

#[test]
fn shift_amount_is_not_width_linked() {
    fixture!(sess, arena, cx, ast);
    let a = var(&mut ast, "a", cx.mkty_logic(8, 8, Sign::Unsigned));
    let s = var(&mut ast, "s", cx.mkty_logic(3, 3, Sign::Unsigned));
    let t = var(&mut ast, "t", cx.mkty_logic(16, 16, Sign::Unsigned));
    let (ar, sr) = (vref(&mut ast, a), vref(&mut ast, s));
    let shift = bin(&mut ast, BinaryOp::ShiftL, ar, sr);
    let tr = vref(&mut ast, t);
    let asn = assign(&mut ast, tr, shift);
    let m = module(&mut ast, vec![a, s, t, asn]);
    run(&cx, &mut ast, m);

    assert_eq!(ast.ty(shift).unwrap().width(), 16);
    let (l, r) = match ast[shift].kind {
        NodeKind::Binary(_, l, r) => (l, r),
        _ => unreachable!(),
    };
    // The shifted value grows with the result; the amount keeps its own
    // self-determined width.
    assert_eq!(ast.ty(l).unwrap().width(), 16);
    assert_eq!(ast.ty(r).unwrap().width(), 3);
}

#[test]
fn real_condition_becomes_compare_with_zero() {
    fixture!(sess, arena, cx, ast);
    let r = var(&mut ast, "r", cx.mkty_double());
    let rr = vref(&mut ast, r);
    let iff = ast.add(
        NodeKind::If {
            cond: rr,
            then_stmts: vec![],
            else_stmts: vec![],
        },
        sp(),
    );
    let m = module(&mut ast, vec![r, iff]);
    run(&cx, &mut ast, m);

    let cond = match ast[iff].kind {
        NodeKind::If { cond, .. } => cond,
        _ => unreachable!(),
    };
    match ast[cond].kind {
        NodeKind::Binary(op, ..) => assert_eq!(op, BinaryOp::NeqReal),
        ref k => panic!("condition not rewritten, got {:?}", k),
    }
    assert_eq!(ast.ty(cond).unwrap().width(), 1);
}

#[test]
fn comparison_rewrites_to_signed_flavor() {
    fixture!(sess, arena, cx, ast);
    let a = var(&mut ast, "a", cx.mkty_logic(8, 8, Sign::Signed));
    let b = var(&mut ast, "b", cx.mkty_logic(8, 8, Sign::Signed));
    let t = var(&mut ast, "t", cx.mkty_bit());
    let (ar, br) = (vref(&mut ast, a), vref(&mut ast, b));
    let cmp = bin(&mut ast, BinaryOp::Lt, ar, br);
    let tr = vref(&mut ast, t);
    let asn = assign(&mut ast, tr, cmp);
    let m = module(&mut ast, vec![a, b, t, asn]);
    run(&cx, &mut ast, m);

    match ast[cmp].kind {
        NodeKind::Binary(op, ..) => assert_eq!(op, BinaryOp::LtS),
        _ => unreachable!(),
    }
    assert_eq!(ast.ty(cmp).unwrap().width(), 1);
}

#[test]
fn comparison_with_unsigned_operand_stays_unsigned() {
    fixture!(sess, arena, cx, ast);
    let a = var(&mut ast, "a", cx.mkty_logic(8, 8, Sign::Signed));
    let b = var(&mut ast, "b", cx.mkty_logic(8, 8, Sign::Unsigned));
    let t = var(&mut ast, "t", cx.mkty_bit());
    let (ar, br) = (vref(&mut ast, a), vref(&mut ast, b));
    let cmp = bin(&mut ast, BinaryOp::Lt, ar, br);
    let tr = vref(&mut ast, t);
    let asn = assign(&mut ast, tr, cmp);
    let m = module(&mut ast, vec![a, b, t, asn]);
    run(&cx, &mut ast, m);

    match ast[cmp].kind {
        NodeKind::Binary(op, ..) => assert_eq!(op, BinaryOp::Lt),
        _ => unreachable!(),
    }
}

#[test]
fn comparison_rewrites_to_real_flavor() {
    fixture!(sess, arena, cx, ast);
    let a = var(&mut ast, "a", cx.mkty_logic(8, 8, Sign::Unsigned));
    let t = var(&mut ast, "t", cx.mkty_bit());
    let ar = vref(&mut ast, a);
    let c = rlit(&mut ast, 1.0);
    let cmp = bin(&mut ast, BinaryOp::Lt, ar, c);
    let tr = vref(&mut ast, t);
    let asn = assign(&mut ast, tr, cmp);
    let m = module(&mut ast, vec![a, t, asn]);
    run(&cx, &mut ast, m);

    match ast[cmp].kind {
        NodeKind::Binary(op, l, ..) => {
            assert_eq!(op, BinaryOp::LtReal);
            assert!(ast.ty(l).unwrap().is_double());
        }
        _ => unreachable!(),
    }
}

#[test]
fn comparison_rewrites_to_string_flavor() {
    fixture!(sess, arena, cx, ast);
    let s = var(&mut ast, "s", cx.mkty_string());
    let t = var(&mut ast, "t", cx.mkty_bit());
    let sr = vref(&mut ast, s);
    let c = ast.add(NodeKind::StringConst(get_name_table().intern("x")), sp());
    let cmp = bin(&mut ast, BinaryOp::Eq, sr, c);
    let tr = vref(&mut ast, t);
    let asn = assign(&mut ast, tr, cmp);
    let m = module(&mut ast, vec![s, t, asn]);
    run(&cx, &mut ast, m);

    match ast[cmp].kind {
        NodeKind::Binary(op, ..) => assert_eq!(op, BinaryOp::EqString),
        _ => unreachable!(),
    }
    assert_eq!(cx.error_count(), 0);
}

#[test]
fn comparison_operands_widen_mutually() {
    fixture!(sess, arena, cx, ast);
    let a = var(&mut ast, "a", cx.mkty_logic(4, 4, Sign::Unsigned));
    let b = var(&mut ast, "b", cx.mkty_logic(8, 8, Sign::Unsigned));
    let t = var(&mut ast, "t", cx.mkty_bit());
    let (ar, br) = (vref(&mut ast, a), vref(&mut ast, b));
    let cmp = bin(&mut ast, BinaryOp::Lt, ar, br);
    let tr = vref(&mut ast, t);
    let asn = assign(&mut ast, tr, cmp);
    let m = module(&mut ast, vec![a, b, t, asn]);
    run(&cx, &mut ast, m);

    let (l, r) = match ast[cmp].kind {
        NodeKind::Binary(_, l, r) => (l, r),
        _ => unreachable!(),
    };
    assert_eq!(ast.ty(l).unwrap().width(), 8);
    assert_eq!(ast.ty(r).unwrap().width(), 8);
}

#[test]
fn bitwise_on_real_is_an_error() {
    fixture!(sess, arena, cx, ast);
    let a = var(&mut ast, "a", cx.mkty_logic(8, 8, Sign::Unsigned));
    let t = var(&mut ast, "t", cx.mkty_logic(8, 8, Sign::Unsigned));
    let ar = vref(&mut ast, a);
    let c = rlit(&mut ast, 1.5);
    let and = bin(&mut ast, BinaryOp::And, ar, c);
    let tr = vref(&mut ast, t);
    let asn = assign(&mut ast, tr, and);
    let m = module(&mut ast, vec![a, t, asn]);
    run(&cx, &mut ast, m);

    assert!(cx.has_errors());
}

#[test]
fn conditional_branches_adopt_result_width() {
    fixture!(sess, arena, cx, ast);
    let c = var(&mut ast, "c", cx.mkty_bit());
    let a = var(&mut ast, "a", cx.mkty_logic(4, 4, Sign::Unsigned));
    let b = var(&mut ast, "b", cx.mkty_logic(8, 8, Sign::Unsigned));
    let t = var(&mut ast, "t", cx.mkty_logic(8, 8, Sign::Unsigned));
    let (cr, ar, br) = (vref(&mut ast, c), vref(&mut ast, a), vref(&mut ast, b));
    let cond = ast.add(
        NodeKind::Cond {
            cond: cr,
            then_expr: ar,
            else_expr: br,
        },
        sp(),
    );
    let tr = vref(&mut ast, t);
    let asn = assign(&mut ast, tr, cond);
    let m = module(&mut ast, vec![c, a, b, t, asn]);
    run(&cx, &mut ast, m);

    let (te, ee) = match ast[cond].kind {
        NodeKind::Cond {
            then_expr,
            else_expr,
            ..
        } => (then_expr, else_expr),
        _ => unreachable!(),
    };
    assert_eq!(ast.ty(cond).unwrap().width(), 8);
    assert_eq!(ast.ty(te).unwrap().width(), 8);
    assert_eq!(ast.ty(ee).unwrap().width(), 8);
}

#[test]
fn concatenation_is_self_determined() {
    fixture!(sess, arena, cx, ast);
    let a = var(&mut ast, "a", cx.mkty_logic(4, 4, Sign::Signed));
    let b = var(&mut ast, "b", cx.mkty_logic(8, 8, Sign::Signed));
    let t = var(&mut ast, "t", cx.mkty_logic(12, 12, Sign::Unsigned));
    let (ar, br) = (vref(&mut ast, a), vref(&mut ast, b));
    let cat = ast.add(NodeKind::Concat { lhs: ar, rhs: br }, sp());
    let tr = vref(&mut ast, t);
    let asn = assign(&mut ast, tr, cat);
    let m = module(&mut ast, vec![a, b, t, asn]);
    run(&cx, &mut ast, m);

    let ty = ast.ty(cat).unwrap();
    assert_eq!(ty.width(), 12);
    assert!(ty.is_unsigned());
    assert!(warn_codes(&cx).is_empty());
}

#[test]
fn reduction_accepts_any_width() {
    fixture!(sess, arena, cx, ast);
    let a = var(&mut ast, "a", cx.mkty_logic(17, 17, Sign::Unsigned));
    let t = var(&mut ast, "t", cx.mkty_bit());
    let ar = vref(&mut ast, a);
    let red = ast.add(NodeKind::Unary(UnaryOp::RedXor, ar), sp());
    let tr = vref(&mut ast, t);
    let asn = assign(&mut ast, tr, red);
    let m = module(&mut ast, vec![a, t, asn]);
    run(&cx, &mut ast, m);

    assert_eq!(ast.ty(red).unwrap().width(), 1);
    assert_eq!(ast.ty(ar).unwrap().width(), 17);
    assert_eq!(cx.error_count(), 0);
}

#[test]
fn int_to_real_canonicalizes_signed_source() {
    fixture!(sess, arena, cx, ast);
    let a = var(&mut ast, "a", cx.mkty_logic(8, 8, Sign::Signed));
    let ar = vref(&mut ast, a);
    let cvt = ast.add(NodeKind::IntToReal { arg: ar }, sp());
    let x = var_init(&mut ast, "x", cvt);
    let m = module(&mut ast, vec![a, x]);
    run(&cx, &mut ast, m);

    assert!(matches!(ast[cvt].kind, NodeKind::SignedToReal { .. }));
    assert!(ast.ty(cvt).unwrap().is_double());
}

#[test]
fn bits_to_real_takes_64_bit_operand() {
    fixture!(sess, arena, cx, ast);
    let a = var(&mut ast, "a", cx.mkty_logic(32, 32, Sign::Unsigned));
    let ar = vref(&mut ast, a);
    let cvt = ast.add(NodeKind::BitsToReal { arg: ar }, sp());
    let x = var_init(&mut ast, "x", cvt);
    let m = module(&mut ast, vec![a, x]);
    run(&cx, &mut ast, m);

    assert!(ast.ty(cvt).unwrap().is_double());
    // The operand widens to the 64 bit pattern.
    let arg = match ast[cvt].kind {
        NodeKind::BitsToReal { arg } => arg,
        _ => unreachable!(),
    };
    assert_eq!(ast.ty(arg).unwrap().width(), 64);
}

#[test]
fn packed_array_assignment_packs() {
    fixture!(sess, arena, cx, ast);
    let elem = cx.mkty_logic(8, 8, Sign::Unsigned);
    let arr = var(&mut ast, "arr", cx.mkty_fixed_array(4, elem));
    let t = var(&mut ast, "t", cx.mkty_logic(32, 32, Sign::Unsigned));
    let ar = vref(&mut ast, arr);
    let tr = vref(&mut ast, t);
    let asn = assign(&mut ast, tr, ar);
    let m = module(&mut ast, vec![arr, t, asn]);
    run(&cx, &mut ast, m);

    assert_eq!(
        count_nodes(&ast, |k| matches!(k, NodeKind::PackArray { .. })),
        1
    );
    assert_eq!(cx.error_count(), 0);
}

#[test]
fn open_array_call_specializes_the_task() {
    fixture!(sess, arena, cx, ast);
    let int = cx.mkty_signed32();
    let port = var(&mut ast, "data", cx.mkty_unsized_array(int));
    let task = ast.add(
        NodeKind::Task {
            name: name("sum"),
            ports: vec![port],
            stmts: vec![],
            ret: Some(int),
            role: SpecializeRole::None,
        },
        sp(),
    );
    let arr = var(&mut ast, "arr", cx.mkty_fixed_array(4, int));
    let t = var(&mut ast, "t", int);
    let arg = vref(&mut ast, arr);
    let call = ast.add(
        NodeKind::CallRef {
            name: name("sum"),
            target: task,
            args: vec![arg],
        },
        sp(),
    );
    let tr = vref(&mut ast, t);
    let asn = assign(&mut ast, tr, call);
    let m = module(&mut ast, vec![task, arr, t, asn]);
    run(&cx, &mut ast, m);

    // The template is marked as such and the call now points at a clone
    // whose formal carries the concrete array type.
    match ast[task].kind {
        NodeKind::Task { role, .. } => {
            assert_eq!(role, SpecializeRole::Parent { children: 1 })
        }
        _ => unreachable!(),
    }
    let new_target = match &ast[call].kind {
        NodeKind::CallRef { target, .. } => *target,
        _ => unreachable!(),
    };
    assert_ne!(new_target, task);
    match &ast[new_target].kind {
        NodeKind::Task { role, ports, name, .. } => {
            assert_eq!(*role, SpecializeRole::Child);
            assert!(name.value.as_str().ends_with("__open1"));
            let pty = ast.ty(ports[0]).unwrap();
            assert!(ty::identical(pty, cx.mkty_fixed_array(4, int)));
        }
        _ => unreachable!(),
    }
    assert_eq!(cx.error_count(), 0);
}

#[test]
fn open_array_calls_specialize_per_site() {
    fixture!(sess, arena, cx, ast);
    let int = cx.mkty_signed32();
    let port = var(&mut ast, "data", cx.mkty_unsized_array(int));
    let task = ast.add(
        NodeKind::Task {
            name: name("sum"),
            ports: vec![port],
            stmts: vec![],
            ret: Some(int),
            role: SpecializeRole::None,
        },
        sp(),
    );
    let arr1 = var(&mut ast, "arr1", cx.mkty_fixed_array(4, int));
    let arr2 = var(&mut ast, "arr2", cx.mkty_fixed_array(8, int));
    let t = var(&mut ast, "t", int);
    let arg1 = vref(&mut ast, arr1);
    let call1 = ast.add(
        NodeKind::CallRef {
            name: name("sum"),
            target: task,
            args: vec![arg1],
        },
        sp(),
    );
    let arg2 = vref(&mut ast, arr2);
    let call2 = ast.add(
        NodeKind::CallRef {
            name: name("sum"),
            target: task,
            args: vec![arg2],
        },
        sp(),
    );
    let (t1, t2) = (vref(&mut ast, t), vref(&mut ast, t));
    let asn1 = assign(&mut ast, t1, call1);
    let asn2 = assign(&mut ast, t2, call2);
    let m = module(&mut ast, vec![task, arr1, arr2, t, asn1, asn2]);
    run(&cx, &mut ast, m);

    match ast[task].kind {
        NodeKind::Task { role, .. } => {
            assert_eq!(role, SpecializeRole::Parent { children: 2 })
        }
        _ => unreachable!(),
    }
    assert_eq!(cx.error_count(), 0);
}

#[test]
#[should_panic(expected = "cannot also become a template")]
fn specialized_instance_is_never_a_template() {
    fixture!(sess, arena, cx, ast);
    let int = cx.mkty_signed32();
    let port = var(&mut ast, "data", cx.mkty_unsized_array(int));
    let task = ast.add(
        NodeKind::Task {
            name: name("sum"),
            ports: vec![port],
            stmts: vec![],
            ret: Some(int),
            role: SpecializeRole::Child,
        },
        sp(),
    );
    let arr = var(&mut ast, "arr", cx.mkty_fixed_array(4, int));
    let t = var(&mut ast, "t", int);
    let arg = vref(&mut ast, arr);
    let call = ast.add(
        NodeKind::CallRef {
            name: name("sum"),
            target: task,
            args: vec![arg],
        },
        sp(),
    );
    let tr = vref(&mut ast, t);
    let asn = assign(&mut ast, tr, call);
    let m = module(&mut ast, vec![task, arr, t, asn]);
    run(&cx, &mut ast, m);
}

#[test]
fn call_arity_mismatch_is_an_error() {
    fixture!(sess, arena, cx, ast);
    let int = cx.mkty_signed32();
    let port = var(&mut ast, "x", int);
    let task = ast.add(
        NodeKind::Task {
            name: name("f"),
            ports: vec![port],
            stmts: vec![],
            ret: Some(int),
            role: SpecializeRole::None,
        },
        sp(),
    );
    let t = var(&mut ast, "t", int);
    let call = ast.add(
        NodeKind::CallRef {
            name: name("f"),
            target: task,
            args: vec![],
        },
        sp(),
    );
    let tr = vref(&mut ast, t);
    let asn = assign(&mut ast, tr, call);
    let m = module(&mut ast, vec![task, t, asn]);
    run(&cx, &mut ast, m);

    assert_eq!(cx.error_count(), 1);
}

#[test]
fn clocking_member_miss_suggests_candidate() {
    fixture!(sess, arena, cx, ast);
    let clock = var(&mut ast, "clock", cx.mkty_logic(1, 1, Sign::Unsigned));
    let reset = var(&mut ast, "reset", cx.mkty_logic(1, 1, Sign::Unsigned));
    let cb = ast.add(
        NodeKind::Clocking {
            name: name("cb"),
            items: vec![clock, reset],
        },
        sp(),
    );
    let mref = ast.add(
        NodeKind::MemberRef {
            scope: cb,
            name: name("clk"),
            resolved: None,
        },
        sp(),
    );
    let x = var_init(&mut ast, "x", mref);
    let m = module(&mut ast, vec![cb, x]);
    run(&cx, &mut ast, m);

    assert_eq!(cx.error_count(), 1);
    let diag = cx
        .diagnostics()
        .into_iter()
        .find(|d| d.get_severity() == Severity::Error)
        .unwrap();
    assert!(diag.get_message().contains("not found in clocking block"));
    let suggested = diag.get_segments().iter().any(|s| match s {
        mead_common::errors::DiagSegment::Note(n) => n.contains("`clock`"),
        _ => false,
    });
    assert!(suggested, "missing best-candidate suggestion: {:?}", diag);
}

#[test]
fn clocking_member_hit_resolves() {
    fixture!(sess, arena, cx, ast);
    let clock = var(&mut ast, "clock", cx.mkty_logic(1, 1, Sign::Unsigned));
    let cb = ast.add(
        NodeKind::Clocking {
            name: name("cb"),
            items: vec![clock],
        },
        sp(),
    );
    let mref = ast.add(
        NodeKind::MemberRef {
            scope: cb,
            name: name("clock"),
            resolved: None,
        },
        sp(),
    );
    let x = var_init(&mut ast, "x", mref);
    let m = module(&mut ast, vec![cb, x]);
    run(&cx, &mut ast, m);

    assert_eq!(cx.error_count(), 0);
    match ast[mref].kind {
        NodeKind::MemberRef { resolved, .. } => assert_eq!(resolved, Some(clock)),
        _ => unreachable!(),
    }
    assert_eq!(ast.ty(mref).unwrap().width(), 1);
}

#[test]
fn enum_attribute_tables_are_shared() {
    fixture!(sess, arena, cx, ast);
    let base = cx.mkty_logic(4, 4, Sign::Unsigned);
    let item0 = ast.add(
        NodeKind::EnumItem {
            name: name("IDLE"),
            value: None,
        },
        sp(),
    );
    let item1 = ast.add(
        NodeKind::EnumItem {
            name: name("BUSY"),
            value: None,
        },
        sp(),
    );
    let edef = ast.add(
        NodeKind::EnumDef {
            name: name("state_t"),
            base: Some(base),
            items: vec![item0, item1],
        },
        sp(),
    );
    let ety = cx.mkty_enum(base, edef);
    let s1 = var(&mut ast, "s1", ety);
    let s2 = var(&mut ast, "s2", ety);
    let (r1, r2) = (vref(&mut ast, s1), vref(&mut ast, s2));
    let a1 = ast.add(
        NodeKind::EnumAttr {
            attr: EnumAttrKind::Next,
            arg: r1,
            table: None,
        },
        sp(),
    );
    let a2 = ast.add(
        NodeKind::EnumAttr {
            attr: EnumAttrKind::Next,
            arg: r2,
            table: None,
        },
        sp(),
    );
    let x1 = var_init(&mut ast, "x1", a1);
    let x2 = var_init(&mut ast, "x2", a2);
    let m = module(&mut ast, vec![edef, s1, s2, x1, x2]);
    run(&cx, &mut ast, m);

    let tables = count_nodes(&ast, |k| match k {
        NodeKind::Var { name, .. } => name.value.as_str().starts_with("__enum_tab"),
        _ => false,
    });
    assert_eq!(tables, 1);
    let (t1, t2) = match (&ast[a1].kind, &ast[a2].kind) {
        (
            NodeKind::EnumAttr { table: t1, .. },
            NodeKind::EnumAttr { table: t2, .. },
        ) => (*t1, *t2),
        _ => unreachable!(),
    };
    assert!(t1.is_some());
    assert_eq!(t1, t2);
    // `.next` keeps the enum type itself.
    assert!(matches!(
        *ast.ty(a1).unwrap().resolve(),
        TypeKind::Enum { .. }
    ));
    assert_eq!(cx.error_count(), 0);
}

#[test]
fn enum_name_attribute_is_a_string() {
    fixture!(sess, arena, cx, ast);
    let base = cx.mkty_logic(4, 4, Sign::Unsigned);
    let edef = ast.add(
        NodeKind::EnumDef {
            name: name("state_t"),
            base: Some(base),
            items: vec![],
        },
        sp(),
    );
    let ety = cx.mkty_enum(base, edef);
    let s = var(&mut ast, "s", ety);
    let r = vref(&mut ast, s);
    let attr = ast.add(
        NodeKind::EnumAttr {
            attr: EnumAttrKind::Name,
            arg: r,
            table: None,
        },
        sp(),
    );
    let x = var_init(&mut ast, "x", attr);
    let m = module(&mut ast, vec![edef, s, x]);
    run(&cx, &mut ast, m);

    assert!(ast.ty(attr).unwrap().is_string());
}

#[test]
fn wide_enum_attribute_is_an_error() {
    fixture!(sess, arena, cx, ast);
    let base = cx.mkty_logic(20, 20, Sign::Unsigned);
    let edef = ast.add(
        NodeKind::EnumDef {
            name: name("wide_t"),
            base: Some(base),
            items: vec![],
        },
        sp(),
    );
    let ety = cx.mkty_enum(base, edef);
    let s = var(&mut ast, "s", ety);
    let r = vref(&mut ast, s);
    let attr = ast.add(
        NodeKind::EnumAttr {
            attr: EnumAttrKind::Next,
            arg: r,
            table: None,
        },
        sp(),
    );
    let x = var_init(&mut ast, "x", attr);
    let m = module(&mut ast, vec![edef, s, x]);
    run(&cx, &mut ast, m);

    assert!(cx.has_errors());
}

#[test]
fn unique_index_yields_queue_of_index_type() {
    fixture!(sess, arena, cx, ast);
    let assoc = cx.mkty_assoc_array(cx.mkty_signed32(), cx.mkty_string());
    let a = var(&mut ast, "a", assoc);
    let r = vref(&mut ast, a);
    let ui = ast.add(NodeKind::UniqueIndex { arg: r }, sp());
    let x = var_init(&mut ast, "x", ui);
    let m = module(&mut ast, vec![a, x]);
    run(&cx, &mut ast, m);

    let expected = cx.mkty_queue(cx.mkty_string());
    assert!(std::ptr::eq(ast.ty(ui).unwrap(), expected));
    assert_eq!(cx.error_count(), 0);
}

#[test]
fn class_handle_upcast_is_allowed() {
    fixture!(sess, arena, cx, ast);
    let base = ast.add(
        NodeKind::Class {
            name: name("packet"),
            extends: None,
            items: vec![],
        },
        sp(),
    );
    let der = ast.add(
        NodeKind::Class {
            name: name("tagged_packet"),
            extends: Some(base),
            items: vec![],
        },
        sp(),
    );
    let hb = var(&mut ast, "hb", cx.mkty_class(base));
    let hd = var(&mut ast, "hd", cx.mkty_class(der));
    let (hbr, hdr) = (vref(&mut ast, hb), vref(&mut ast, hd));
    let asn = assign(&mut ast, hbr, hdr);
    let m = module(&mut ast, vec![base, der, hb, hd, asn]);
    run(&cx, &mut ast, m);

    assert_eq!(cx.error_count(), 0);
}

#[test]
fn class_handle_downcast_is_an_error() {
    fixture!(sess, arena, cx, ast);
    let base = ast.add(
        NodeKind::Class {
            name: name("packet"),
            extends: None,
            items: vec![],
        },
        sp(),
    );
    let der = ast.add(
        NodeKind::Class {
            name: name("tagged_packet"),
            extends: Some(base),
            items: vec![],
        },
        sp(),
    );
    let hb = var(&mut ast, "hb", cx.mkty_class(base));
    let hd = var(&mut ast, "hd", cx.mkty_class(der));
    let (hbr, hdr) = (vref(&mut ast, hb), vref(&mut ast, hd));
    let asn = assign(&mut ast, hdr, hbr);
    let m = module(&mut ast, vec![base, der, hb, hd, asn]);
    run(&cx, &mut ast, m);

    assert_eq!(cx.error_count(), 1);
    let diag = cx
        .diagnostics()
        .into_iter()
        .find(|d| d.get_severity() == Severity::Error)
        .unwrap();
    assert!(diag.get_message().contains("does not extend"));
}

#[test]
fn this_ref_resolves_to_enclosing_class() {
    fixture!(sess, arena, cx, ast);
    let this = ast.add(NodeKind::ThisRef, sp());
    let h = var_init(&mut ast, "h", this);
    let class = ast.add(
        NodeKind::Class {
            name: name("packet"),
            extends: None,
            items: vec![h],
        },
        sp(),
    );
    let m = module(&mut ast, vec![class]);
    run(&cx, &mut ast, m);

    assert!(std::ptr::eq(
        ast.ty(this).unwrap(),
        cx.mkty_class(class)
    ));
    assert_eq!(cx.error_count(), 0);
}

#[test]
fn this_ref_outside_class_is_an_error() {
    fixture!(sess, arena, cx, ast);
    let this = ast.add(NodeKind::ThisRef, sp());
    let h = var_init(&mut ast, "h", this);
    let m = module(&mut ast, vec![h]);
    run(&cx, &mut ast, m);

    assert_eq!(cx.error_count(), 1);
}

#[test]
fn circular_initialization_is_an_error() {
    fixture!(sess, arena, cx, ast);
    let a = ast.add(
        NodeKind::Var {
            name: name("a"),
            declared: None,
            init: None,
        },
        sp(),
    );
    let r = vref(&mut ast, a);
    match &mut ast[a].kind {
        NodeKind::Var { init, .. } => *init = Some(r),
        _ => unreachable!(),
    }
    ast[r].parent = Some(a);
    let m = module(&mut ast, vec![a]);
    run(&cx, &mut ast, m);

    assert!(cx.has_errors());
}

#[test]
fn implicit_uninitialized_variable_is_an_error() {
    fixture!(sess, arena, cx, ast);
    let a = ast.add(
        NodeKind::Var {
            name: name("a"),
            declared: None,
            init: None,
        },
        sp(),
    );
    let m = module(&mut ast, vec![a]);
    run(&cx, &mut ast, m);

    assert_eq!(cx.error_count(), 1);
}

#[test]
#[should_panic(expected = "repeat")]
fn leftover_repeat_loop_is_fatal() {
    fixture!(sess, arena, cx, ast);
    let c = ulit(&mut ast, 3);
    let rep = ast.add(
        NodeKind::Repeat {
            count: c,
            stmts: vec![],
        },
        sp(),
    );
    let m = module(&mut ast, vec![rep]);
    run(&cx, &mut ast, m);
}

#[test]
#[should_panic(expected = "target-determined context")]
fn target_context_requires_final_stage() {
    let _ = TypeContext::with_type(&crate::ty::BIT_TYPE, Stage::PRELIM);
}

#[test]
fn fixed_type_wrappers_coerce_self_determined_children() {
    fixture!(sess, arena, cx, ast);
    let a = var(&mut ast, "a", cx.mkty_logic(8, 8, Sign::Unsigned));
    let ar = vref(&mut ast, a);
    let parent = ast.add(NodeKind::Unary(UnaryOp::RedOr, ar), sp());
    let mut v = Typeck::new(&cx, &mut ast);
    let out = v.iterate_check_signed32(parent, "operand", ar, Stage::BOTH);
    assert_ne!(out, ar);
    assert_eq!(v.ast.ty(out).unwrap().width(), 32);
    assert!(v.ast.ty(out).unwrap().is_signed());

    let b = var(&mut v.ast, "b", cx.mkty_logic(4, 4, Sign::Unsigned));
    let br = vref(&mut v.ast, b);
    let parent2 = v.ast.add(NodeKind::Unary(UnaryOp::RedOr, br), sp());
    let out2 = v.iterate_check_uint32(parent2, "operand", br, Stage::BOTH);
    assert_eq!(v.ast.ty(out2).unwrap().width(), 32);
    assert!(v.ast.ty(out2).unwrap().is_unsigned());

    let c = var(&mut v.ast, "c", cx.mkty_logic(4, 4, Sign::Signed));
    let cr = vref(&mut v.ast, c);
    let parent3 = v.ast.add(NodeKind::Unary(UnaryOp::RedOr, cr), sp());
    let out3 = v.iterate_check_signed8(parent3, "operand", cr, Stage::BOTH);
    assert_eq!(v.ast.ty(out3).unwrap().width(), 8);
    assert!(v.ast.ty(out3).unwrap().is_signed());
}

#[test]
fn self_wrappers_keep_the_natural_type() {
    fixture!(sess, arena, cx, ast);
    let a = var(&mut ast, "a", cx.mkty_logic(5, 5, Sign::Unsigned));
    let ar = vref(&mut ast, a);
    let parent = ast.add(NodeKind::Unary(UnaryOp::RedOr, ar), sp());
    let mut v = Typeck::new(&cx, &mut ast);
    let out = v.iterate_check_self(parent, "operand", ar, Determ::SelfDet, Stage::BOTH);
    assert_eq!(out, ar);
    assert_eq!(v.ast.ty(out).unwrap().width(), 5);

    // The integral flavor rejects a real operand.
    let r = var(&mut v.ast, "r", cx.mkty_double());
    let rr = vref(&mut v.ast, r);
    let parent2 = v.ast.add(NodeKind::Unary(UnaryOp::RedOr, rr), sp());
    v.iterate_check_integral_self(parent2, "operand", rr, Determ::SelfDet, Stage::BOTH);
    assert!(cx.has_errors());
}

#[test]
fn sized_self_wrapper_rejects_aggregates() {
    fixture!(sess, arena, cx, ast);
    let q = var(&mut ast, "q", cx.mkty_queue(cx.mkty_signed32()));
    let qr = vref(&mut ast, q);
    let t = var(&mut ast, "t", cx.mkty_bit());
    let red = ast.add(NodeKind::Unary(UnaryOp::RedOr, qr), sp());
    let tr = vref(&mut ast, t);
    let asn = assign(&mut ast, tr, red);
    let m = module(&mut ast, vec![q, t, asn]);
    run(&cx, &mut ast, m);

    assert!(cx.has_errors());
    let diag = cx
        .diagnostics()
        .into_iter()
        .find(|d| d.get_severity() == Severity::Error)
        .unwrap();
    assert!(diag.get_message().contains("numeric"));
}

#[test]
fn signed_division_picks_the_signed_flavor() {
    fixture!(sess, arena, cx, ast);
    let a = var(&mut ast, "a", cx.mkty_logic(8, 8, Sign::Signed));
    let b = var(&mut ast, "b", cx.mkty_logic(8, 8, Sign::Signed));
    let t = var(&mut ast, "t", cx.mkty_logic(8, 8, Sign::Signed));
    let (ar, br) = (vref(&mut ast, a), vref(&mut ast, b));
    let div = bin(&mut ast, BinaryOp::Div, ar, br);
    let tr = vref(&mut ast, t);
    let asn = assign(&mut ast, tr, div);
    let m = module(&mut ast, vec![a, b, t, asn]);
    run(&cx, &mut ast, m);

    match ast[div].kind {
        NodeKind::Binary(op, ..) => assert_eq!(op, BinaryOp::DivS),
        _ => unreachable!(),
    }
    assert_eq!(cx.error_count(), 0);
}

#[test]
fn modulo_on_real_is_an_error() {
    fixture!(sess, arena, cx, ast);
    let a = var(&mut ast, "a", cx.mkty_logic(8, 8, Sign::Unsigned));
    let t = var(&mut ast, "t", cx.mkty_logic(8, 8, Sign::Unsigned));
    let ar = vref(&mut ast, a);
    let c = rlit(&mut ast, 2.0);
    let md = bin(&mut ast, BinaryOp::ModDiv, ar, c);
    let tr = vref(&mut ast, t);
    let asn = assign(&mut ast, tr, md);
    let m = module(&mut ast, vec![a, t, asn]);
    run(&cx, &mut ast, m);

    assert!(cx.has_errors());
}

#[test]
fn implication_is_a_single_bit() {
    fixture!(sess, arena, cx, ast);
    let a = var(&mut ast, "a", cx.mkty_logic(8, 8, Sign::Unsigned));
    let b = var(&mut ast, "b", cx.mkty_logic(4, 4, Sign::Unsigned));
    let t = var(&mut ast, "t", cx.mkty_bit());
    let (ar, br) = (vref(&mut ast, a), vref(&mut ast, b));
    let imp = bin(&mut ast, BinaryOp::LogIf, ar, br);
    let tr = vref(&mut ast, t);
    let asn = assign(&mut ast, tr, imp);
    let m = module(&mut ast, vec![a, b, t, asn]);
    run(&cx, &mut ast, m);

    assert_eq!(ast.ty(imp).unwrap().width(), 1);
    // Truth-testing the operands does not resize them.
    assert_eq!(ast.ty(ar).unwrap().width(), 8);
    assert_eq!(ast.ty(br).unwrap().width(), 4);
    assert_eq!(cx.error_count(), 0);
}

#[test]
fn enum_operand_coerces_through_its_base() {
    fixture!(sess, arena, cx, ast);
    let base = cx.mkty_logic(4, 4, Sign::Unsigned);
    let edef = ast.add(
        NodeKind::EnumDef {
            name: name("state_t"),
            base: Some(base),
            items: vec![],
        },
        sp(),
    );
    let ety = cx.mkty_enum(base, edef);
    let s = var(&mut ast, "s", ety);
    let t = var(&mut ast, "t", cx.mkty_logic(8, 8, Sign::Unsigned));
    let (sr, tr) = (vref(&mut ast, s), vref(&mut ast, t));
    let asn = assign(&mut ast, tr, sr);
    let m = module(&mut ast, vec![edef, s, t, asn]);
    run(&cx, &mut ast, m);

    // 4 bit enum into 8 bit vector: expansion, no error.
    assert_eq!(warn_codes(&cx), vec![WarnCode::WidthExpand]);
    assert_eq!(count_extends(&ast), 1);
    assert_eq!(cx.error_count(), 0);
}
