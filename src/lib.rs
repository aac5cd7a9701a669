use proc_macro::TokenStream;
use syn::{parse_macro_input, Result};

mod common;

mod tagged_ref;
mod visitor;

#[inline]
fn result_of(doit: Result<impl Into<TokenStream>>) -> TokenStream {
    match doit {
        Ok(token_stream) => token_stream.into(),
        Err(err) => err.into_compile_error().into(),
    }
}

/// Turns an enum listing a catalogue of types into a tagged reference: an
/// enum of shared borrows, one variant per type, implementing
/// [`tagged_ref::TaggedRef`].
///
/// ```
/// use tagged_ref::TaggedRef;
/// use tagged_ref_macros::tagged_ref;
///
/// struct Rock;
/// struct Paper;
///
/// #[tagged_ref]
/// enum HandRef {
///     Rock,
///     Paper,
/// }
///
/// let (rock, paper) = (Rock, Paper);
/// let mut hand = HandRef::new(&rock);
/// assert!(hand.has_type::<Rock>());
/// hand.rebind(&paper);
/// assert_eq!(hand.tag(), HandRefTag::Paper);
/// assert_eq!(hand.type_name(), "Paper");
/// ```
///
/// A variant is either a unit variant naming the type, or a one-field tuple
/// variant `Name(Type)` / `Name(&'a Type)`. The enum gets one lifetime, `'a`
/// unless it declares its own.
///
/// Valid arguments:
/// - `tag`: name of the generated tag enum, `tag(Kind)` or `tag = "Kind"`.
///   Defaults to the enum's name followed by `Tag`.
/// - `no_impl`: stop [`From`] `&Type` and [`TryFrom`] enum from being implemented.
/// - `dynamic`: also implement `TryFrom<&dyn Any>`, checking the catalogue in
///   order. Every member must then be `'static`.
///
/// Types outside the catalogue are rejected by the compiler:
///
/// ```compile_fail
/// use tagged_ref::TaggedRef;
/// use tagged_ref_macros::tagged_ref;
///
/// struct Rock;
/// struct Paper;
/// struct Lizard;
///
/// #[tagged_ref]
/// enum HandRef {
///     Rock,
///     Paper,
/// }
///
/// let lizard = Lizard;
/// let _ = HandRef::new(&lizard);
/// ```
///
/// And so is a type listed twice:
///
/// ```compile_fail
/// use tagged_ref_macros::tagged_ref;
///
/// struct Rock;
///
/// #[tagged_ref]
/// enum HandRef {
///     Rock,
///     Stone(Rock),
/// }
/// ```
#[proc_macro_attribute]
pub fn tagged_ref(args: TokenStream, input: TokenStream) -> TokenStream {
    result_of(tagged_ref::doit(
        args.into(),
        parse_macro_input!(input),
    ))
}

/// Implements [`tagged_ref::Visit`] once per function of an inherent impl
/// block, so one handler can carry an overload for every combination of
/// types it is dispatched on. Names of the functions don't matter and may
/// repeat.
///
/// ```
/// use tagged_ref::{dispatch, TaggedRef};
/// use tagged_ref_macros::{tagged_ref, visitor};
///
/// struct Rock;
/// struct Paper;
///
/// #[tagged_ref]
/// enum HandRef {
///     Rock,
///     Paper,
/// }
///
/// struct Beats;
///
/// #[visitor]
/// impl Beats {
///     fn visit(_: &Paper, _: &Rock) -> bool {
///         true
///     }
///
///     #[fallback]
///     fn visit<A, B>(_: A, _: B) -> bool {
///         false
///     }
/// }
///
/// let (rock, paper) = (Rock, Paper);
/// assert!(dispatch(Beats, (HandRef::new(&paper), HandRef::new(&rock))));
/// assert!(!dispatch(Beats, (HandRef::new(&rock), HandRef::new(&paper))));
/// ```
///
/// The receiver picks what `Visit` is implemented for: the handler itself
/// (no receiver or `self`), `&Handler` (`&self`) or `&mut Handler`
/// (`&mut self`). All functions of a block take it the same way.
///
/// `#[fallback]` marks a generic catch-all for its number of arguments. The
/// other overloads of that arity are tried first, by exact type, so they
/// take precedence. Their dispatched parameters must be shared references to
/// `'static` types.
///
/// Without a fallback, a combination no overload covers does not compile:
///
/// ```compile_fail
/// use tagged_ref::TaggedRef;
/// use tagged_ref_macros::{tagged_ref, visitor};
///
/// struct Rock;
/// struct Paper;
///
/// #[tagged_ref]
/// enum HandRef {
///     Rock,
///     Paper,
/// }
///
/// struct OnlyRocks;
///
/// #[visitor]
/// impl OnlyRocks {
///     fn visit(_: &Rock) {}
/// }
///
/// let rock = Rock;
/// HandRef::new(&rock).visit(OnlyRocks);
/// ```
#[proc_macro_attribute]
pub fn visitor(args: TokenStream, input: TokenStream) -> TokenStream {
    result_of(visitor::doit(args.into(), parse_macro_input!(input)))
}
