/// One overload of a handler.
///
/// `Args` is the tuple of resolved referents followed by any extra
/// arguments, e.g. `(&Rock,)` or `(&Rock, &Paper)`. A handler implements
/// `Visit` once per combination it accepts; a missing combination is a
/// compile error at the call that needs it.
///
/// `visit` consumes the handler. Stateless handlers are passed by value;
/// stateful ones implement `Visit` for `&mut Handler` or `&Handler`.
pub trait Visit<Args> {
    type Output;

    fn visit(self, args: Args) -> Self::Output;
}

/// Single dispatch: resolves `self` to its concrete referent and calls the
/// matching `Visit` impl of `V` with the referent prepended to `extra`.
///
/// Generated by `#[tagged_ref]`, one `match` arm per catalogue member.
pub trait Accept<V, E = ()> {
    type Output;

    fn accept(self, visitor: V, extra: E) -> Self::Output;
}

/// Tuple cons: `(a, b).prepend(x) == (x, a, b)`.
pub trait Prepend<X> {
    type Output;

    fn prepend(self, head: X) -> Self::Output;
}

macro_rules! impl_prepend {
    ($($a:ident),*) => {
        impl<X, $($a),*> Prepend<X> for ($($a,)*) {
            type Output = (X, $($a,)*);

            #[allow(non_snake_case)]
            #[inline]
            fn prepend(self, head: X) -> Self::Output {
                let ($($a,)*) = self;
                (head, $($a,)*)
            }
        }
    };
}

for_each_tail!(impl_prepend);
