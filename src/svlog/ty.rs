// Copyright (c) 2016-2020 Fabian Schuiki

//! An implementation of the verilog type system.

use crate::ast::NodeId;
use crate::crate_prelude::*;
use std::fmt::{self, Display, Formatter};

/// A verilog type.
pub type Type<'t> = &'t TypeKind<'t>;

/// Type data.
#[derive(Debug, PartialEq, Eq, Hash)]
pub enum TypeKind<'t> {
    /// An error occurred during type computation.
    Error,
    /// The `void` type.
    Void,
    /// A simple bit vector type.
    ///
    /// `width` is the storage width in bits, `width_min` the number of bits
    /// the value actually requires. The two differ only for values whose
    /// source form was unsized; `width >= width_min >= 1` always holds.
    BitVector {
        domain: Domain,
        sign: Sign,
        width: usize,
        width_min: usize,
        dubbed: bool,
    },
    /// The `real` type.
    Real,
    /// The `string` type.
    String,
    /// A fixed-size unpacked array, e.g. `int x[8]`.
    FixedArray(usize, Type<'t>),
    /// An unsized ("open") array, whose dimensions are only known at each
    /// call site, e.g. the formal `int x[]` of an imported task.
    UnsizedArray(Type<'t>),
    /// A dynamically sized array.
    DynArray(Type<'t>),
    /// An associative array with the given element and index types.
    AssocArray { elem: Type<'t>, index: Type<'t> },
    /// A queue with the given element type.
    Queue(Type<'t>),
    /// A struct type, referring to its definition in the tree.
    Struct(NodeId),
    /// An enum backed by a bit vector type.
    Enum { base: Type<'t>, def: NodeId },
    /// A class handle.
    Class(NodeId),
    /// A reference to an interface instance.
    IfaceRef(NodeId),
    /// A named type.
    ///
    /// The first field represents how the type was originally named by the
    /// user. The second field represents the actual type.
    Named(Spanned<Name>, Type<'t>),
}

/// The number of values each bit of a type can assume.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Domain {
    /// Two-valued types such as `bit` or `int`.
    TwoValued,
    /// Four-valued types such as `logic` or `integer`.
    FourValued,
}

/// Whether a type is signed or unsigned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Sign {
    Signed,
    Unsigned,
}

impl<'t> TypeKind<'t> {
    /// Check if this is the error type.
    pub fn is_error(&self) -> bool {
        match *self {
            TypeKind::Named(_, ty) => ty.is_error(),
            TypeKind::Error => true,
            _ => false,
        }
    }

    /// Check if this is the void type.
    pub fn is_void(&self) -> bool {
        match *self {
            TypeKind::Named(_, ty) => ty.is_void(),
            TypeKind::Void => true,
            _ => false,
        }
    }

    /// Check if this is the real type.
    pub fn is_double(&self) -> bool {
        match *self.resolve() {
            TypeKind::Real => true,
            _ => false,
        }
    }

    /// Check if this is the string type.
    pub fn is_string(&self) -> bool {
        match *self.resolve() {
            TypeKind::String => true,
            _ => false,
        }
    }

    /// Check if this is a class handle.
    pub fn is_class(&self) -> bool {
        match *self.resolve() {
            TypeKind::Class(..) => true,
            _ => false,
        }
    }

    /// Get the definition of a class handle.
    pub fn get_class_def(&self) -> Option<NodeId> {
        match *self.resolve() {
            TypeKind::Class(id) => Some(id),
            _ => None,
        }
    }

    /// Dereference name aliases and reveal the concrete fundamental type.
    ///
    /// All width and signing decisions must be made on the type this
    /// returns, never on the alias wrapper.
    pub fn resolve(&'t self) -> Type<'t> {
        match *self {
            TypeKind::Named(_, ty) => ty.resolve(),
            _ => self,
        }
    }

    /// Get the simple bit vector equivalent of this type, if it has one.
    ///
    /// Bit vectors map to themselves, enums to their backing vector. All
    /// other types have no simple bit vector equivalent.
    pub fn coercible_bit_vector(&'t self) -> Option<Type<'t>> {
        match *self.resolve() {
            TypeKind::BitVector { .. } => Some(self.resolve()),
            TypeKind::Enum { base, .. } => base.coercible_bit_vector(),
            _ => None,
        }
    }

    /// Check if this type is integral, i.e. has a simple bit vector
    /// equivalent.
    pub fn is_integral(&'t self) -> bool {
        self.coercible_bit_vector().is_some()
    }

    /// Get the width of the type.
    ///
    /// Panics if the type has no width.
    pub fn width(&'t self) -> usize {
        match *self.resolve() {
            TypeKind::BitVector { width, .. } => width,
            TypeKind::Enum { base, .. } => base.width(),
            _ => panic!("{:?} has no width", self),
        }
    }

    /// Get the minimum width of the type.
    ///
    /// Panics if the type has no width.
    pub fn width_min(&'t self) -> usize {
        match *self.resolve() {
            TypeKind::BitVector { width_min, .. } => width_min,
            TypeKind::Enum { base, .. } => base.width_min(),
            _ => panic!("{:?} has no width", self),
        }
    }

    /// Return the domain of the type, if it has one.
    pub fn get_value_domain(&'t self) -> Option<Domain> {
        match *self.resolve() {
            TypeKind::BitVector { domain, .. } => Some(domain),
            TypeKind::Enum { base, .. } => base.get_value_domain(),
            _ => None,
        }
    }

    /// Return the sign of the type, if it has one.
    pub fn get_sign(&'t self) -> Option<Sign> {
        match *self.resolve() {
            TypeKind::BitVector { sign, .. } => Some(sign),
            TypeKind::Enum { base, .. } => base.get_sign(),
            _ => None,
        }
    }

    /// Check whether the type is unsigned.
    ///
    /// Returns false for types which have no sign.
    pub fn is_unsigned(&'t self) -> bool {
        self.get_sign() == Some(Sign::Unsigned)
    }

    /// Check whether the type is signed.
    ///
    /// Returns false for types which have no sign.
    pub fn is_signed(&'t self) -> bool {
        self.get_sign() == Some(Sign::Signed)
    }

    /// Check whether this type or any of its array element types is an open
    /// array.
    pub fn has_open_array(&'t self) -> bool {
        match *self.resolve() {
            TypeKind::UnsizedArray(..) => true,
            TypeKind::FixedArray(_, ty) => ty.has_open_array(),
            TypeKind::DynArray(ty) => ty.has_open_array(),
            TypeKind::Queue(ty) => ty.has_open_array(),
            _ => false,
        }
    }

    /// Get the total number of packed bits of this type, if it packs into a
    /// plain bit vector.
    pub fn packed_bits(&'t self) -> Option<usize> {
        match *self.resolve() {
            TypeKind::BitVector { width, .. } => Some(width),
            TypeKind::Enum { base, .. } => base.packed_bits(),
            TypeKind::FixedArray(n, ty) => ty.packed_bits().map(|w| w * n),
            _ => None,
        }
    }
}

impl Sign {
    /// Check whether the type is unsigned.
    pub fn is_unsigned(&self) -> bool {
        *self == Sign::Unsigned
    }

    /// Check whether the type is signed.
    pub fn is_signed(&self) -> bool {
        *self == Sign::Signed
    }

    /// Convert a boolean "signed" flag into a sign.
    pub fn from_bool(signed: bool) -> Sign {
        if signed {
            Sign::Signed
        } else {
            Sign::Unsigned
        }
    }
}

impl Display for Sign {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Sign::Signed => write!(f, "signed"),
            Sign::Unsigned => write!(f, "unsigned"),
        }
    }
}

impl Domain {
    /// Return the single-bit name for this domain (`bit` or `logic`).
    pub fn bit_name(&self) -> &'static str {
        match self {
            Domain::TwoValued => "bit",
            Domain::FourValued => "logic",
        }
    }
}

impl<'t> Display for TypeKind<'t> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match *self {
            TypeKind::Error => write!(f, "<error>"),
            TypeKind::Void => write!(f, "void"),
            TypeKind::Real => write!(f, "real"),
            TypeKind::String => write!(f, "string"),
            TypeKind::FixedArray(n, ty) => write!(f, "{} [{}]", ty, n),
            TypeKind::UnsizedArray(ty) => write!(f, "{} []", ty),
            TypeKind::DynArray(ty) => write!(f, "{} []", ty),
            TypeKind::AssocArray { elem, index } => write!(f, "{} [{}]", elem, index),
            TypeKind::Queue(ty) => write!(f, "{} [$]", ty),
            TypeKind::Struct(_) => write!(f, "struct"),
            TypeKind::Enum { base, .. } => write!(f, "enum {}", base),
            TypeKind::Class(_) => write!(f, "class"),
            TypeKind::IfaceRef(_) => write!(f, "interface"),
            TypeKind::Named(name, ..) => write!(f, "{}", name.value),
            TypeKind::BitVector {
                domain,
                sign,
                width,
                dubbed,
                ..
            } => {
                // Use the builtin name if called such by the user.
                if dubbed {
                    let dub = match width {
                        8 if domain == Domain::TwoValued => Some("byte"),
                        16 if domain == Domain::TwoValued => Some("shortint"),
                        32 if domain == Domain::TwoValued => Some("int"),
                        32 if domain == Domain::FourValued => Some("integer"),
                        64 if domain == Domain::TwoValued => Some("longint"),
                        _ => None,
                    };
                    if let Some(dub) = dub {
                        write!(f, "{}", dub)?;
                        if sign != Sign::Signed {
                            write!(f, " {}", sign)?;
                        }
                        return Ok(());
                    }
                }

                // Otherwise use the regular bit name with vector range.
                write!(f, "{}", domain.bit_name())?;
                if sign != Sign::Unsigned {
                    write!(f, " {}", sign)?;
                }
                if width != 1 {
                    write!(f, " [{}:0]", width - 1)?;
                }
                Ok(())
            }
        }
    }
}

/// The `<error>` type.
pub static ERROR_TYPE: TypeKind<'static> = TypeKind::Error;

/// The `void` type.
pub static VOID_TYPE: TypeKind<'static> = TypeKind::Void;

/// The `real` type.
pub static REAL_TYPE: TypeKind<'static> = TypeKind::Real;

/// The `string` type.
pub static STRING_TYPE: TypeKind<'static> = TypeKind::String;

/// The `bit` type.
pub static BIT_TYPE: TypeKind<'static> = TypeKind::BitVector {
    domain: Domain::TwoValued,
    sign: Sign::Unsigned,
    width: 1,
    width_min: 1,
    dubbed: true,
};

/// The `logic` type.
pub static LOGIC_TYPE: TypeKind<'static> = TypeKind::BitVector {
    domain: Domain::FourValued,
    sign: Sign::Unsigned,
    width: 1,
    width_min: 1,
    dubbed: true,
};

/// The `byte` type.
pub static BYTE_TYPE: TypeKind<'static> = TypeKind::BitVector {
    domain: Domain::TwoValued,
    sign: Sign::Signed,
    width: 8,
    width_min: 8,
    dubbed: true,
};

/// The `int` type.
pub static INT_TYPE: TypeKind<'static> = TypeKind::BitVector {
    domain: Domain::TwoValued,
    sign: Sign::Signed,
    width: 32,
    width_min: 32,
    dubbed: true,
};

/// The `integer` type.
pub static INTEGER_TYPE: TypeKind<'static> = TypeKind::BitVector {
    domain: Domain::FourValued,
    sign: Sign::Signed,
    width: 32,
    width_min: 32,
    dubbed: true,
};

/// The `longint` type.
pub static LONGINT_TYPE: TypeKind<'static> = TypeKind::BitVector {
    domain: Domain::TwoValued,
    sign: Sign::Signed,
    width: 64,
    width_min: 64,
    dubbed: true,
};

/// The 32 bit unsigned type.
pub static UINT32_TYPE: TypeKind<'static> = TypeKind::BitVector {
    domain: Domain::TwoValued,
    sign: Sign::Unsigned,
    width: 32,
    width_min: 32,
    dubbed: false,
};

/// The 64 bit unsigned type.
pub static UINT64_TYPE: TypeKind<'static> = TypeKind::BitVector {
    domain: Domain::TwoValued,
    sign: Sign::Unsigned,
    width: 64,
    width_min: 64,
    dubbed: false,
};

/// Check if two types are identical.
///
/// This is not the same as a check for equality, since the types may contain
/// names and spans in the source code which are different, yet still refer to
/// the same type.
pub fn identical(a: Type, b: Type) -> bool {
    let a = a.resolve();
    let b = b.resolve();
    match (a, b) {
        (
            TypeKind::BitVector {
                domain: da,
                sign: sa,
                width: wa,
                ..
            },
            TypeKind::BitVector {
                domain: db,
                sign: sb,
                width: wb,
                ..
            },
        ) => da == db && sa == sb && wa == wb,

        (TypeKind::FixedArray(na, ta), TypeKind::FixedArray(nb, tb)) => {
            na == nb && identical(ta, tb)
        }
        (TypeKind::UnsizedArray(ta), TypeKind::UnsizedArray(tb)) => identical(ta, tb),
        (TypeKind::DynArray(ta), TypeKind::DynArray(tb)) => identical(ta, tb),
        (TypeKind::Queue(ta), TypeKind::Queue(tb)) => identical(ta, tb),
        (
            TypeKind::AssocArray {
                elem: ea,
                index: ia,
            },
            TypeKind::AssocArray {
                elem: eb,
                index: ib,
            },
        ) => identical(ea, eb) && identical(ia, ib),

        _ => a == b,
    }
}
