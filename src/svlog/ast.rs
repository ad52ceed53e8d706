// Copyright (c) 2016-2020 Fabian Schuiki

//! An arena-backed syntax tree for the elaborated input handed to the width
//! and type inference pass.
//!
//! Nodes live in a flat arena and refer to each other through stable
//! [`NodeId`] indices. Children are owned by the parent's [`NodeKind`]
//! variant; detaching and reattaching a subtree is a local splice of the
//! identifier held in the parent's slot, so the tree is structurally valid
//! after every splice. Each node additionally carries a parent back-link,
//! its resolved type, the one-shot "already widthed" marker, and a mask of
//! warnings suppressed at its location.

use crate::context::WarnMask;
use crate::crate_prelude::*;
use crate::ty::{Sign, Type};
use num::BigInt;
use std::fmt;
use std::ops::{Index, IndexMut};

/// A stable identifier of a node in the arena.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// A node stored in the arena.
#[derive(Debug)]
pub struct NodeData<'t> {
    pub kind: NodeKind<'t>,
    pub span: Span,
    /// The resolved type of the node. Set by the inference pass; `None` on
    /// expression nodes of a freshly elaborated tree.
    pub ty: Option<Type<'t>>,
    /// The enclosing node, if this node has been linked into a tree.
    pub parent: Option<NodeId>,
    /// One-shot marker guarding against re-entering a fully processed node.
    pub did_width: bool,
    /// Warnings suppressed at this node's location.
    pub suppress: WarnMask,
}

/// The role a task or function declaration plays in open-array
/// specialization. A declaration is either untouched, the template other
/// declarations were cloned from, or one such clone. The two non-trivial
/// roles are mutually exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpecializeRole {
    None,
    Parent { children: u32 },
    Child,
}

/// The enum attributes that are backed by a generated lookup table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EnumAttrKind {
    Next,
    Prev,
    Name,
}

impl fmt::Display for EnumAttrKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EnumAttrKind::Next => write!(f, "next"),
            EnumAttrKind::Prev => write!(f, "prev"),
            EnumAttrKind::Name => write!(f, "name"),
        }
    }
}

/// The different kinds of nodes.
#[derive(Clone, Debug)]
pub enum NodeKind<'t> {
    // Structure and declarations.
    Module {
        name: Spanned<Name>,
        items: Vec<NodeId>,
    },
    Var {
        name: Spanned<Name>,
        declared: Option<Type<'t>>,
        init: Option<NodeId>,
    },
    Task {
        name: Spanned<Name>,
        ports: Vec<NodeId>,
        stmts: Vec<NodeId>,
        ret: Option<Type<'t>>,
        role: SpecializeRole,
    },
    Class {
        name: Spanned<Name>,
        extends: Option<NodeId>,
        items: Vec<NodeId>,
    },
    Clocking {
        name: Spanned<Name>,
        items: Vec<NodeId>,
    },
    EnumDef {
        name: Spanned<Name>,
        base: Option<Type<'t>>,
        items: Vec<NodeId>,
    },
    EnumItem {
        name: Spanned<Name>,
        value: Option<NodeId>,
    },
    StructDef {
        name: Spanned<Name>,
        members: Vec<(Spanned<Name>, Type<'t>)>,
    },

    // Statements.
    Assign {
        lhs: NodeId,
        rhs: NodeId,
    },
    If {
        cond: NodeId,
        then_stmts: Vec<NodeId>,
        else_stmts: Vec<NodeId>,
    },
    Delay {
        value: NodeId,
        stmt: Option<NodeId>,
    },
    /// Lowered away before this pass; reaching the inference visitor is an
    /// internal consistency failure.
    Repeat {
        count: NodeId,
        stmts: Vec<NodeId>,
    },

    // Expressions.
    IntConst {
        value: BigInt,
        width: usize,
        signed: bool,
        is_unsized: bool,
    },
    RealConst(f64),
    StringConst(Name),
    VarRef {
        target: NodeId,
    },
    Unary(UnaryOp, NodeId),
    Binary(BinaryOp, NodeId, NodeId),
    Cond {
        cond: NodeId,
        then_expr: NodeId,
        else_expr: NodeId,
    },
    Concat {
        lhs: NodeId,
        rhs: NodeId,
    },
    CastSign {
        sign: Sign,
        arg: NodeId,
    },
    CallRef {
        name: Spanned<Name>,
        target: NodeId,
        args: Vec<NodeId>,
    },
    MemberRef {
        scope: NodeId,
        name: Spanned<Name>,
        resolved: Option<NodeId>,
    },
    ThisRef,
    EnumAttr {
        attr: EnumAttrKind,
        arg: NodeId,
        table: Option<NodeId>,
    },
    UniqueIndex {
        arg: NodeId,
    },

    // Conversions inserted by the inference pass.
    Extend {
        signed: bool,
        arg: NodeId,
    },
    Trunc {
        arg: NodeId,
    },
    IntToReal {
        arg: NodeId,
    },
    SignedToReal {
        arg: NodeId,
    },
    RealToInt {
        arg: NodeId,
    },
    RealToBits {
        arg: NodeId,
    },
    BitsToReal {
        arg: NodeId,
    },
    PackString {
        arg: NodeId,
    },
    PackArray {
        arg: NodeId,
    },
}

/// Unary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    LogNot,
    RedAnd,
    RedOr,
    RedXor,
    OneHot,
    OneHot0,
    Negate,
    BitNot,
    NegateReal,
    Ceil,
    Floor,
}

/// Binary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    // Logical.
    LogAnd,
    LogOr,
    LogIf,
    // Relational and equality on bit vectors.
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    GtS,
    GteS,
    LtS,
    LteS,
    EqCase,
    NeqCase,
    EqWild,
    NeqWild,
    // Relational and equality on reals.
    EqReal,
    NeqReal,
    LtReal,
    LteReal,
    GtReal,
    GteReal,
    // Relational and equality on strings.
    EqString,
    NeqString,
    LtString,
    LteString,
    GtString,
    GteString,
    // Bitwise.
    And,
    Or,
    Xor,
    BufIf1,
    // Arithmetic.
    Add,
    Sub,
    Mul,
    Div,
    MulS,
    DivS,
    ModDiv,
    ModDivS,
    // Arithmetic on reals.
    AddReal,
    SubReal,
    MulReal,
    DivReal,
    PowReal,
    // Shifts.
    ShiftL,
    ShiftR,
    ShiftRS,
}

impl BinaryOp {
    /// Map an operator to the flavor matching the given signedness, if it
    /// distinguishes one.
    pub fn with_signedness(self, signed: bool) -> BinaryOp {
        use BinaryOp::*;
        match (self, signed) {
            (Gt, true) => GtS,
            (Gte, true) => GteS,
            (Lt, true) => LtS,
            (Lte, true) => LteS,
            (Mul, true) => MulS,
            (Div, true) => DivS,
            (ModDiv, true) => ModDivS,
            (GtS, false) => Gt,
            (GteS, false) => Gte,
            (LtS, false) => Lt,
            (LteS, false) => Lte,
            (MulS, false) => Mul,
            (DivS, false) => Div,
            (ModDivS, false) => ModDiv,
            _ => self,
        }
    }

    /// Map an operator to its real flavor, if it has one.
    pub fn real_flavor(self) -> Option<BinaryOp> {
        use BinaryOp::*;
        Some(match self {
            Eq | EqCase => EqReal,
            Neq | NeqCase => NeqReal,
            Lt | LtS => LtReal,
            Lte | LteS => LteReal,
            Gt | GtS => GtReal,
            Gte | GteS => GteReal,
            Add => AddReal,
            Sub => SubReal,
            Mul | MulS => MulReal,
            Div | DivS => DivReal,
            _ => return None,
        })
    }

    /// Map an operator to its string flavor, if it has one.
    pub fn string_flavor(self) -> Option<BinaryOp> {
        use BinaryOp::*;
        Some(match self {
            Eq | EqCase => EqString,
            Neq | NeqCase => NeqString,
            Lt => LtString,
            Lte => LteString,
            Gt => GtString,
            Gte => GteString,
            _ => return None,
        })
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use BinaryOp::*;
        let s = match self {
            LogAnd => "&&",
            LogOr => "||",
            LogIf => "->",
            Eq | EqReal | EqString => "==",
            Neq | NeqReal | NeqString => "!=",
            Gt | GtS | GtReal | GtString => ">",
            Gte | GteS | GteReal | GteString => ">=",
            Lt | LtS | LtReal | LtString => "<",
            Lte | LteS | LteReal | LteString => "<=",
            EqCase => "===",
            NeqCase => "!==",
            EqWild => "==?",
            NeqWild => "!=?",
            And => "&",
            Or => "|",
            Xor => "^",
            BufIf1 => "bufif1",
            Add | AddReal => "+",
            Sub | SubReal => "-",
            Mul | MulS | MulReal => "*",
            Div | DivS | DivReal => "/",
            ModDiv | ModDivS => "%",
            PowReal => "**",
            ShiftL => "<<",
            ShiftR => ">>",
            ShiftRS => ">>>",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use UnaryOp::*;
        let s = match self {
            LogNot => "!",
            RedAnd => "&",
            RedOr => "|",
            RedXor => "^",
            OneHot => "$onehot",
            OneHot0 => "$onehot0",
            Negate | NegateReal => "-",
            BitNot => "~",
            Ceil => "$ceil",
            Floor => "$floor",
        };
        write!(f, "{}", s)
    }
}

impl<'t> NodeKind<'t> {
    /// Call `f` on every child slot of this node, in operand order.
    pub fn for_each_child(&self, mut f: impl FnMut(NodeId)) {
        self.clone_map_children(|id| {
            f(id);
            id
        });
    }

    /// Collect the children of this node, in operand order.
    pub fn children(&self) -> Vec<NodeId> {
        let mut out = vec![];
        self.for_each_child(|id| out.push(id));
        out
    }

    /// Apply `f` to every child slot, replacing each with the returned id.
    /// This is the single place that knows every kind's operand layout.
    pub fn map_children(&mut self, mut f: impl FnMut(NodeId) -> NodeId) {
        use NodeKind::*;
        let each = |v: &mut Vec<NodeId>, f: &mut dyn FnMut(NodeId) -> NodeId| {
            for id in v.iter_mut() {
                *id = f(*id);
            }
        };
        match self {
            Module { items, .. } => each(items, &mut f),
            Var { init, .. } => {
                if let Some(i) = init {
                    *i = f(*i);
                }
            }
            Task { ports, stmts, .. } => {
                each(ports, &mut f);
                each(stmts, &mut f);
            }
            Class { items, .. } => each(items, &mut f),
            Clocking { items, .. } => each(items, &mut f),
            EnumDef { items, .. } => each(items, &mut f),
            EnumItem { value, .. } => {
                if let Some(v) = value {
                    *v = f(*v);
                }
            }
            StructDef { .. } | ThisRef => (),
            Assign { lhs, rhs } => {
                *lhs = f(*lhs);
                *rhs = f(*rhs);
            }
            If {
                cond,
                then_stmts,
                else_stmts,
            } => {
                *cond = f(*cond);
                each(then_stmts, &mut f);
                each(else_stmts, &mut f);
            }
            Delay { value, stmt } => {
                *value = f(*value);
                if let Some(s) = stmt {
                    *s = f(*s);
                }
            }
            Repeat { count, stmts } => {
                *count = f(*count);
                each(stmts, &mut f);
            }
            IntConst { .. } | RealConst(..) | StringConst(..) => (),
            VarRef { .. } => (),
            Unary(_, arg) => *arg = f(*arg),
            Binary(_, lhs, rhs) => {
                *lhs = f(*lhs);
                *rhs = f(*rhs);
            }
            Cond {
                cond,
                then_expr,
                else_expr,
            } => {
                *cond = f(*cond);
                *then_expr = f(*then_expr);
                *else_expr = f(*else_expr);
            }
            Concat { lhs, rhs } => {
                *lhs = f(*lhs);
                *rhs = f(*rhs);
            }
            CastSign { arg, .. } => *arg = f(*arg),
            CallRef { args, .. } => each(args, &mut f),
            MemberRef { .. } => (),
            EnumAttr { arg, .. } => *arg = f(*arg),
            UniqueIndex { arg } => *arg = f(*arg),
            Extend { arg, .. }
            | Trunc { arg }
            | IntToReal { arg }
            | SignedToReal { arg }
            | RealToInt { arg }
            | RealToBits { arg }
            | BitsToReal { arg }
            | PackString { arg }
            | PackArray { arg } => *arg = f(*arg),
        }
    }

    fn clone_map_children(&self, mut f: impl FnMut(NodeId) -> NodeId) {
        let mut copy = self.clone();
        copy.map_children(&mut f);
    }

    /// A short user-facing description of what this node is.
    pub fn desc(&self) -> String {
        use NodeKind::*;
        match self {
            Module { name, .. } => format!("module `{}`", name.value),
            Var { name, .. } => format!("variable `{}`", name.value),
            Task { name, .. } => format!("task `{}`", name.value),
            Class { name, .. } => format!("class `{}`", name.value),
            Clocking { name, .. } => format!("clocking block `{}`", name.value),
            EnumDef { name, .. } => format!("enum `{}`", name.value),
            EnumItem { name, .. } => format!("enum value `{}`", name.value),
            StructDef { name, .. } => format!("struct `{}`", name.value),
            Assign { .. } => "assignment".to_string(),
            If { .. } => "if statement".to_string(),
            Delay { .. } => "delay".to_string(),
            Repeat { .. } => "repeat loop".to_string(),
            IntConst { value, .. } => format!("constant `{}`", value),
            RealConst(v) => format!("constant `{}`", v),
            StringConst(s) => format!("string `\"{}\"`", s),
            VarRef { .. } => "variable reference".to_string(),
            Unary(op, ..) => format!("operator `{}`", op),
            Binary(op, ..) => format!("operator `{}`", op),
            Cond { .. } => "conditional expression".to_string(),
            Concat { .. } => "concatenation".to_string(),
            CastSign { sign: Sign::Signed, .. } => "`$signed` cast".to_string(),
            CastSign { .. } => "`$unsigned` cast".to_string(),
            CallRef { name, .. } => format!("call to `{}`", name.value),
            MemberRef { name, .. } => format!("member `{}`", name.value),
            ThisRef => "`this`".to_string(),
            EnumAttr { attr, .. } => format!("enum attribute `{}`", attr),
            UniqueIndex { .. } => "`unique_index` method".to_string(),
            Extend { .. } | Trunc { .. } => "width conversion".to_string(),
            IntToReal { .. } | SignedToReal { .. } | BitsToReal { .. } => {
                "conversion to real".to_string()
            }
            RealToInt { .. } | RealToBits { .. } => "conversion from real".to_string(),
            PackString { .. } => "conversion to string".to_string(),
            PackArray { .. } => "array packing conversion".to_string(),
        }
    }
}

/// The arena all nodes of a tree live in.
#[derive(Default)]
pub struct Ast<'t> {
    nodes: Vec<NodeData<'t>>,
}

impl<'t> Ast<'t> {
    /// Create a new empty arena.
    pub fn new() -> Ast<'t> {
        Default::default()
    }

    /// Add a node to the arena and adopt its children.
    pub fn add(&mut self, kind: NodeKind<'t>, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            kind,
            span,
            ty: None,
            parent: None,
            did_width: false,
            suppress: WarnMask::empty(),
        });
        let children = self.nodes[id.0 as usize].kind.children();
        for child in children {
            self.nodes[child.0 as usize].parent = Some(id);
        }
        id
    }

    /// The number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check whether the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get the resolved type of a node.
    pub fn ty(&self, id: NodeId) -> Option<Type<'t>> {
        self[id].ty
    }

    /// Set the resolved type of a node.
    pub fn set_ty(&mut self, id: NodeId, ty: Type<'t>) {
        self[id].ty = Some(ty);
    }

    /// Replace the occurrence of `old` among `parent`'s children with `new`,
    /// updating the parent back-links on both sides.
    ///
    /// Panics if `old` is not a child of `parent`; a caller holding a stale
    /// id indicates a defect in an operator rule.
    pub fn relink(&mut self, parent: NodeId, old: NodeId, new: NodeId) {
        let mut found = false;
        let mut kind = std::mem::replace(&mut self[parent].kind, NodeKind::ThisRef);
        kind.map_children(|id| {
            if id == old && !found {
                found = true;
                new
            } else {
                id
            }
        });
        self[parent].kind = kind;
        assert!(
            found,
            "relink: {:?} is not a child of {:?}",
            old, parent
        );
        self[new].parent = Some(parent);
    }

    /// Append `new` right after `anchor` in the item list of `anchor`'s
    /// parent, if the parent carries an item list.
    pub fn insert_sibling_after(&mut self, anchor: NodeId, new: NodeId) {
        let parent = match self[anchor].parent {
            Some(p) => p,
            None => return,
        };
        let items = match &mut self.nodes[parent.0 as usize].kind {
            NodeKind::Module { items, .. }
            | NodeKind::Class { items, .. }
            | NodeKind::Clocking { items, .. } => items,
            _ => return,
        };
        let pos = items.iter().position(|&i| i == anchor);
        match pos {
            Some(p) => items.insert(p + 1, new),
            None => items.push(new),
        }
        self[new].parent = Some(parent);
    }

    /// Append an item to the item list of a container node, adopting it.
    pub fn push_item(&mut self, parent: NodeId, item: NodeId) {
        match &mut self.nodes[parent.0 as usize].kind {
            NodeKind::Module { items, .. }
            | NodeKind::Class { items, .. }
            | NodeKind::Clocking { items, .. } => items.push(item),
            _ => panic!("push_item: {:?} has no item list", parent),
        }
        self[item].parent = Some(parent);
    }

    /// Deep-copy the subtree rooted at `id` into fresh arena entries. The
    /// copy is unparented, carries the same spans and types, and has its
    /// processed markers cleared.
    pub fn clone_subtree(&mut self, id: NodeId) -> NodeId {
        let mut kind = self[id].kind.clone();
        let span = self[id].span;
        let ty = self[id].ty;
        let suppress = self[id].suppress;
        kind.map_children(|child| self.clone_subtree(child));
        let new = self.add(kind, span);
        self[new].ty = ty;
        self[new].suppress = suppress;
        new
    }
}

impl<'t> Index<NodeId> for Ast<'t> {
    type Output = NodeData<'t>;
    fn index(&self, id: NodeId) -> &NodeData<'t> {
        &self.nodes[id.0 as usize]
    }
}

impl<'t> IndexMut<NodeId> for Ast<'t> {
    fn index_mut(&mut self, id: NodeId) -> &mut NodeData<'t> {
        &mut self.nodes[id.0 as usize]
    }
}
