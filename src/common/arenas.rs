// Copyright (c) 2016-2020 Fabian Schuiki

//! Arenas into which the compiler allocates the data it keeps alive for the
//! duration of an entire compilation.

/// Allocates values.
pub trait Alloc<'t, T> {
    /// Allocate a value of type `T`.
    fn alloc(&'t self, value: T) -> &'t T;
}

/// An arena that owns values of a single type.
pub struct TypedArena<T> {
    arena: typed_arena::Arena<T>,
}

impl<T> Default for TypedArena<T> {
    fn default() -> TypedArena<T> {
        TypedArena {
            arena: typed_arena::Arena::default(),
        }
    }
}

impl<T> TypedArena<T> {
    /// Create a new arena.
    pub fn new() -> TypedArena<T> {
        TypedArena {
            arena: typed_arena::Arena::new(),
        }
    }
}

impl<'t, T: 't> Alloc<'t, T> for TypedArena<T> {
    fn alloc(&'t self, value: T) -> &'t T {
        self.arena.alloc(value)
    }
}
