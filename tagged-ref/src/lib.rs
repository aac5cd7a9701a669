//! Runtime half of `tagged-ref-macros`.
//!
//! A *tagged reference* is an enum whose every variant borrows one value of a
//! distinct type. The set of types is its *catalogue*. `#[tagged_ref]` writes
//! the enum and implements [`TaggedRef`], [`Member`] and [`Accept`] for it;
//! `#[visitor]` implements [`Visit`] for a handler. [`dispatch`] then resolves
//! any number of tagged references into one call of the matching overload.

/// Invokes `$mac!` once per tuple tail of length 0 to 7.
macro_rules! for_each_tail {
    ($mac:ident) => {
        $mac!();
        $mac!(A0);
        $mac!(A0, A1);
        $mac!(A0, A1, A2);
        $mac!(A0, A1, A2, A3);
        $mac!(A0, A1, A2, A3, A4);
        $mac!(A0, A1, A2, A3, A4, A5);
        $mac!(A0, A1, A2, A3, A4, A5, A6);
    };
}

mod dispatch;
mod error;
mod visit;

pub use dispatch::{dispatch, Bind, Dispatch, Probe};
pub use error::{Error, Result};
pub use visit::{Accept, Prepend, Visit};

/// An enum of shared borrows over a fixed catalogue of types.
pub trait TaggedRef<'a>: Copy + 'a {
    /// Field-less mirror of the variants.
    type Tag: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    const NAME: &'static str;
    /// Member type names in ordinal order.
    const CATALOGUE: &'static [&'static str];
    const LEN: usize = Self::CATALOGUE.len();

    fn ordinal(&self) -> usize;

    fn tag(&self) -> Self::Tag;

    fn new<X: Member<'a, Self>>(referent: &'a X) -> Self {
        referent.wrap()
    }

    /// Points `self` at another referent, possibly of another member type.
    fn rebind<X: Member<'a, Self>>(&mut self, referent: &'a X) {
        *self = referent.wrap();
    }

    /// `true` iff the referent is exactly an `X`.
    fn has_type<X: Member<'a, Self>>(&self) -> bool {
        self.ordinal() == X::ORDINAL
    }

    fn get<X: Member<'a, Self>>(self) -> Option<&'a X> {
        X::peel(self)
    }

    fn type_name(&self) -> &'static str {
        Self::CATALOGUE[self.ordinal()]
    }

    /// Calls the overload of `visitor` for the referent's concrete type.
    fn visit<V>(self, visitor: V) -> <Self as Accept<V>>::Output
    where
        Self: Accept<V>,
    {
        self.accept(visitor, ())
    }

    /// Like [`TaggedRef::visit`], passing the elements of `extra` after the
    /// referent.
    fn visit_with<V, E>(self, visitor: V, extra: E) -> <Self as Accept<V, E>>::Output
    where
        Self: Accept<V, E>,
    {
        self.accept(visitor, extra)
    }
}

/// Implemented for each type in the catalogue of `R`.
///
/// Types outside the catalogue have no impl, so constructing or querying a
/// tagged reference with them does not compile.
pub trait Member<'a, R: TaggedRef<'a>>: 'a {
    const ORDINAL: usize;

    fn wrap(&'a self) -> R;

    fn peel(tagged: R) -> Option<&'a Self>;
}
