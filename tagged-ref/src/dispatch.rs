use crate::{Accept, Visit};

/// A handler with its first argument already resolved.
///
/// `Bind<V, X>` visits `(a, b, ..)` by calling `V` with `(x, a, b, ..)`.
pub struct Bind<V, X> {
    visitor: V,
    bound: X,
}

impl<V, X> Bind<V, X> {
    pub fn new(visitor: V, bound: X) -> Self {
        Self { visitor, bound }
    }
}

/// Lets an n-ary handler be accepted by a single tagged reference.
///
/// The referent resolved by that reference arrives as the head of the
/// argument tuple; any tagged references still unresolved follow it. With
/// none left the handler is called directly, otherwise the head is bound
/// into the handler and the next reference is resolved.
pub struct Probe<V> {
    visitor: V,
}

impl<V> Probe<V> {
    pub fn new(visitor: V) -> Self {
        Self { visitor }
    }
}

impl<V, X> Visit<(X,)> for Probe<V>
where
    V: Visit<(X,)>,
{
    type Output = V::Output;

    #[inline]
    fn visit(self, args: (X,)) -> V::Output {
        self.visitor.visit(args)
    }
}

macro_rules! impl_probe {
    ($($rest:ident),*) => {
        impl<V, X, T, $($rest),*> Visit<(X, T, $($rest,)*)> for Probe<V>
        where
            T: Accept<Probe<Bind<V, X>>, ($($rest,)*)>,
        {
            type Output = T::Output;

            #[allow(non_snake_case)]
            #[inline]
            fn visit(self, (head, next, $($rest,)*): (X, T, $($rest,)*)) -> Self::Output {
                let bound = Probe::new(Bind::new(self.visitor, head));
                <T as Accept<_, _>>::accept(next, bound, ($($rest,)*))
            }
        }
    };
}

macro_rules! impl_bind {
    ($($a:ident),*) => {
        impl<V, X, $($a),*> Visit<($($a,)*)> for Bind<V, X>
        where
            V: Visit<(X, $($a,)*)>,
        {
            type Output = V::Output;

            #[allow(non_snake_case)]
            #[inline]
            fn visit(self, ($($a,)*): ($($a,)*)) -> V::Output {
                self.visitor.visit((self.bound, $($a,)*))
            }
        }
    };
}

for_each_tail!(impl_probe);
for_each_tail!(impl_bind);

/// A tuple of tagged references that can be resolved together.
pub trait Dispatch<V> {
    type Output;

    fn dispatch(self, visitor: V) -> Self::Output;
}

/// Nothing to resolve; the handler is dropped uncalled.
impl<V> Dispatch<V> for () {
    type Output = ();

    fn dispatch(self, _visitor: V) {}
}

macro_rules! impl_dispatch {
    ($($rest:ident),*) => {
        impl<V, T, $($rest),*> Dispatch<V> for (T, $($rest,)*)
        where
            T: Accept<Probe<V>, ($($rest,)*)>,
        {
            type Output = T::Output;

            #[allow(non_snake_case)]
            fn dispatch(self, visitor: V) -> Self::Output {
                let (first, $($rest,)*) = self;
                <T as Accept<_, _>>::accept(first, Probe::new(visitor), ($($rest,)*))
            }
        }
    };
}

for_each_tail!(impl_dispatch);

/// Resolves every tagged reference in `refs`, left to right, and calls the
/// overload of `visitor` taking that exact tuple of concrete types.
///
/// ```ignore
/// let lost = dispatch(LosesTo, (alice, bob));
/// ```
pub fn dispatch<V, R>(visitor: V, refs: R) -> R::Output
where
    R: Dispatch<V>,
{
    refs.dispatch(visitor)
}

/// `dispatch!(visitor; a, b, c)` is `dispatch(visitor, (a, b, c))`.
#[macro_export]
macro_rules! dispatch {
    ($visitor:expr; $($tagged:expr),* $(,)?) => {
        $crate::dispatch($visitor, ($($tagged,)*))
    };
}
