use std::collections::{BTreeMap, HashMap, HashSet};

use proc_macro2::{Span, TokenStream, TokenTree};
use quote::{format_ident, quote, ToTokens};
use syn::{
    parse_quote,
    punctuated::Punctuated,
    visit_mut::{self, VisitMut},
    Error, FnArg, GenericParam, Generics, Ident, ImplItem, ImplItemFn, ItemImpl, Lifetime,
    LifetimeParam, Meta, ParenthesizedGenericArguments, Receiver, Result, ReturnType, Token,
    TraitBound, TraitBoundModifier, Type, TypeBareFn, TypeParam, TypeParamBound, TypePath,
    TypeReference, Visibility, WherePredicate,
};

use tap::prelude::*;

pub fn doit(args: TokenStream, item_impl: ItemImpl) -> Result<TokenStream> {
    if !args.is_empty() {
        Err(Error::new_spanned(args, "`#[visitor]` takes no arguments"))?
    }

    let ItemImpl {
        attrs,
        defaultness,
        unsafety,
        impl_token,
        generics,
        trait_,
        self_ty,
        items,
        ..
    } = &item_impl;

    if let Some((_, path, _)) = trait_ {
        Err(Error::new_spanned(
            path,
            "expected an inherent impl block, `#[visitor]` implements `Visit` itself",
        ))?
    }
    if let Some(defaultness) = defaultness {
        Err(Error::new_spanned(defaultness, "`default impl` unsupported"))?
    }
    if let Some(unsafety) = unsafety {
        Err(Error::new_spanned(unsafety, "`unsafe impl` unsupported"))?
    }

    let overloads = items
        .iter()
        .enumerate()
        .map(|(index, item)| Overload::new(index, item))
        .collect::<Result<Vec<_>>>()?;
    let target = common_target(&overloads)?;
    check_unique(&overloads)?;

    let visitor = Visitor {
        self_ty,
        generics,
        target,
    };
    let visit_impls = group_by_arity(&overloads)?
        .into_iter()
        .map(|(_, group)| match group.fallback {
            Some(fallback) => visitor.blanket_impl(&group.specific, fallback),
            None => group
                .specific
                .iter()
                .map(|overload| visitor.specific_impl(overload))
                .collect::<Result<TokenStream>>(),
        })
        .collect::<Result<Vec<_>>>()?;

    let (impl_generics, _, where_clause) = generics.split_for_impl();
    let methods = overloads.iter().map(|overload| &overload.method);
    Ok(quote! {
        #(#attrs)*
        #impl_token #impl_generics #self_ty #where_clause {
            #(#methods)*
        }
        #(#visit_impls)*
    })
}

/// How an overload takes `self`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Kind {
    Static,
    Value,
    Shared,
    Exclusive,
}

/// The type `Visit` is implemented for.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Target {
    Owned,
    Shared,
    Exclusive,
}

impl From<Kind> for Target {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Static | Kind::Value => Target::Owned,
            Kind::Shared => Target::Shared,
            Kind::Exclusive => Target::Exclusive,
        }
    }
}

struct Overload {
    kind: Kind,
    inputs: Vec<Type>,
    output: Type,
    lifetimes: Vec<LifetimeParam>,
    type_params: HashSet<Ident>,
    fallback: bool,
    /// The function as emitted into the inherent impl, renamed.
    method: ImplItemFn,
}

impl Overload {
    fn new(index: usize, item: &ImplItem) -> Result<Self> {
        let ImplItem::Fn(function) = item else {
            return Err(Error::new_spanned(
                item,
                "only functions are allowed in a `#[visitor]` block",
            ));
        };
        let sig = &function.sig;
        if let Some(constness) = &sig.constness {
            Err(Error::new_spanned(constness, "`const` overloads unsupported"))?
        }
        if let Some(asyncness) = &sig.asyncness {
            Err(Error::new_spanned(asyncness, "`async` overloads unsupported"))?
        }
        if let Some(unsafety) = &sig.unsafety {
            Err(Error::new_spanned(unsafety, "`unsafe` overloads unsupported"))?
        }
        if let Some(abi) = &sig.abi {
            Err(Error::new_spanned(abi, "`extern` overloads unsupported"))?
        }
        if let Some(variadic) = &sig.variadic {
            Err(Error::new_spanned(variadic, "variadic overloads unsupported"))?
        }

        let mut fallback = false;
        let mut attrs = Vec::with_capacity(function.attrs.len());
        for attr in &function.attrs {
            if !attr.path().is_ident("fallback") {
                attrs.push(attr.clone());
            } else if let Meta::Path(_) = attr.meta {
                fallback = true;
            } else {
                Err(Error::new_spanned(attr, "`#[fallback]` takes no arguments"))?
            }
        }

        let mut kind = Kind::Static;
        let mut inputs = Vec::new();
        for input in &sig.inputs {
            match input {
                FnArg::Receiver(receiver) => kind = receiver_kind(receiver)?,
                FnArg::Typed(typed) => {
                    if let Type::ImplTrait(ty) = &*typed.ty {
                        Err(Error::new_spanned(
                            ty,
                            "`impl Trait` parameters unsupported, name the type or use a `#[fallback]` type parameter",
                        ))?
                    }
                    inputs.push((*typed.ty).clone())
                }
            }
        }

        let mut lifetimes = Vec::new();
        let mut type_params = HashSet::new();
        for param in &sig.generics.params {
            match param {
                GenericParam::Lifetime(param) => lifetimes.push(param.clone()),
                GenericParam::Type(param) if fallback => {
                    type_params.insert(param.ident.clone());
                }
                param => Err(Error::new_spanned(
                    param,
                    "overloads take concrete types, mark a generic catch-all with `#[fallback]`",
                ))?,
            }
        }
        if fallback && type_params.is_empty() {
            Err(Error::new_spanned(
                &sig.ident,
                "a `#[fallback]` overload must be generic over at least one parameter",
            ))?
        }
        if let (false, Some(where_clause)) = (fallback, &sig.generics.where_clause) {
            Err(Error::new_spanned(
                where_clause,
                "where clauses are only allowed on the `#[fallback]` overload",
            ))?
        }

        let output = match &sig.output {
            ReturnType::Default => parse_quote!(()),
            ReturnType::Type(_, ty) => (**ty).clone(),
        };

        let method = function.clone().tap_mut(|method| {
            method.attrs = attrs;
            method.vis = Visibility::Inherited;
            method.sig.ident = format_ident!("__{}_overload_{}", sig.ident, index);
        });

        Ok(Overload {
            kind,
            inputs,
            output,
            lifetimes,
            type_params,
            fallback,
            method,
        })
    }

    fn name(&self) -> &Ident {
        &self.method.sig.ident
    }

    fn arity(&self) -> usize {
        self.inputs.len()
    }

    fn key(&self) -> Vec<String> {
        self.inputs.iter().map(type_key).collect()
    }

    /// How the fallback takes each argument. Every type parameter must be
    /// the whole type of exactly one parameter, as `A` or `&A`.
    fn positions(&self) -> Result<Vec<Position>> {
        let mut typed_by = HashMap::new();
        let mut positions = Vec::with_capacity(self.arity());
        for (index, ty) in self.inputs.iter().enumerate() {
            let position = if let Some(param) = type_param_of(ty, &self.type_params) {
                Position::ByValue(param.clone())
            } else if let Some(param) = shared_referent(ty)
                .ok()
                .and_then(|elem| type_param_of(elem, &self.type_params))
            {
                Position::ByRef(param.clone())
            } else if mentions(ty.to_token_stream(), &self.type_params) {
                Err(Error::new_spanned(
                    ty,
                    "a `#[fallback]` parameter using its type parameters must be `A` or `&A`",
                ))?
            } else {
                Position::Plain
            };
            if let Position::ByValue(param) | Position::ByRef(param) = &position {
                if typed_by.insert(param.clone(), index).is_some() {
                    Err(Error::new_spanned(
                        ty,
                        format!("`{param}` already types another `#[fallback]` parameter"),
                    ))?
                }
            }
            positions.push(position);
        }
        for param in self.method.sig.generics.type_params() {
            if !typed_by.contains_key(&param.ident) {
                Err(Error::new_spanned(
                    &param.ident,
                    format!(
                        "`{0}` must be the type of one of the `#[fallback]`'s parameters, `{0}` or `&{0}`",
                        param.ident
                    ),
                ))?
            }
        }
        Ok(positions)
    }
}

/// One argument of a `#[fallback]`.
enum Position {
    /// A concrete type shared by every overload of the arity.
    Plain,
    /// `A`, standing for some `&T`.
    ByValue(Ident),
    /// `&A`, standing for some `T`.
    ByRef(Ident),
}

fn type_param_of<'t>(ty: &'t Type, params: &HashSet<Ident>) -> Option<&'t Ident> {
    match ty {
        Type::Path(TypePath { qself: None, path }) => {
            path.get_ident().filter(|ident| params.contains(*ident))
        }
        Type::Paren(paren) => type_param_of(&paren.elem, params),
        _ => None,
    }
}

fn receiver_kind(receiver: &Receiver) -> Result<Kind> {
    if receiver.colon_token.is_some() {
        Err(Error::new_spanned(
            receiver,
            "typed receivers unsupported, use `self`, `&self` or `&mut self`",
        ))?
    }
    Ok(match (&receiver.reference, &receiver.mutability) {
        (None, _) => Kind::Value,
        (Some(_), None) => Kind::Shared,
        (Some(_), Some(_)) => Kind::Exclusive,
    })
}

fn common_target(overloads: &[Overload]) -> Result<Target> {
    let mut target = None;
    for overload in overloads {
        let this = Target::from(overload.kind);
        match target {
            None => target = Some(this),
            Some(target) if target != this => Err(Error::new_spanned(
                &overload.method.sig,
                "every overload in a `#[visitor]` block must take `self` the same way",
            ))?,
            Some(_) => {}
        }
    }
    Ok(target.unwrap_or(Target::Owned))
}

fn check_unique(overloads: &[Overload]) -> Result<()> {
    let mut seen = HashMap::new();
    for overload in overloads.iter().filter(|overload| !overload.fallback) {
        let key = overload.key();
        if seen.insert(key.clone(), overload.name()).is_some() {
            Err(Error::new_spanned(
                &overload.method.sig,
                format!("duplicate overload for `({})`", key.join(", ")),
            ))?
        }
    }
    Ok(())
}

#[derive(Default)]
struct Group<'o> {
    specific: Vec<&'o Overload>,
    fallback: Option<&'o Overload>,
}

fn group_by_arity(overloads: &[Overload]) -> Result<BTreeMap<usize, Group<'_>>> {
    let mut groups = BTreeMap::<usize, Group>::new();
    for overload in overloads {
        let group = groups.entry(overload.arity()).or_default();
        if !overload.fallback {
            group.specific.push(overload);
        } else if group.fallback.replace(overload).is_some() {
            Err(Error::new_spanned(
                &overload.method.sig,
                format!("a second `#[fallback]` taking {} arguments", overload.arity()),
            ))?
        }
    }
    Ok(groups)
}

struct Visitor<'i> {
    self_ty: &'i Type,
    generics: &'i Generics,
    target: Target,
}

impl Visitor<'_> {
    fn receiver_lifetime(&self) -> Option<LifetimeParam> {
        match self.target {
            Target::Owned => None,
            Target::Shared | Target::Exclusive => Some(parse_quote!('__visitor)),
        }
    }

    fn target_type(&self) -> TokenStream {
        let self_ty = self.self_ty;
        match self.target {
            Target::Owned => quote!(#self_ty),
            Target::Shared => quote!(&'__visitor #self_ty),
            Target::Exclusive => quote!(&'__visitor mut #self_ty),
        }
    }

    fn call(&self, overload: &Overload, args: &[Ident]) -> TokenStream {
        let self_ty = self.self_ty;
        let name = overload.name();
        match overload.kind {
            Kind::Static => quote!(<#self_ty>::#name(#(#args),*)),
            _ => quote!(<#self_ty>::#name(self, #(#args),*)),
        }
    }

    /// `impl Visit<(A, B)> for Target`, one per overload.
    fn specific_impl(&self, overload: &Overload) -> Result<TokenStream> {
        let mut namer = NameElided::default();
        let inputs = overload
            .inputs
            .iter()
            .cloned()
            .map(|mut ty| {
                namer.visit_type_mut(&mut ty);
                ty
            })
            .collect::<Vec<_>>();
        let generics = self.impl_generics(
            self.receiver_lifetime()
                .into_iter()
                .chain(overload.lifetimes.iter().cloned())
                .chain(namer.fresh),
            std::iter::empty(),
            std::iter::empty(),
        );
        let (impl_generics, _, where_clause) = generics.split_for_impl();
        let args = arg_idents("__arg", overload.arity());
        let call = self.call(overload, &args);
        let target = self.target_type();
        let output = self.output_type(&overload.output, &inputs)?;

        Ok(quote! {
            impl #impl_generics ::tagged_ref::Visit<(#(#inputs,)*)> for #target #where_clause {
                type Output = #output;

                #[inline]
                fn visit(self, (#(#args,)*): (#(#inputs,)*)) -> Self::Output {
                    #call
                }
            }
        })
    }

    /// One impl covering every combination of one arity. Positions the
    /// fallback is generic over accept any `&T` with `T: Any`; the body tries
    /// each specific overload by exact `TypeId` match before the fallback.
    fn blanket_impl(&self, specific: &[&Overload], fallback: &Overload) -> Result<TokenStream> {
        let positions = fallback.positions()?;
        let dispatched = positions
            .iter()
            .map(|position| !matches!(position, Position::Plain))
            .collect::<Vec<_>>();
        let arity = fallback.arity();

        let mut namer = NameElided::default();
        let mut header: Vec<Type> = Vec::with_capacity(arity);
        let mut arg_lifetimes = Vec::new();
        let mut type_params: Vec<TypeParam> = Vec::new();
        let mut substitutions = HashMap::new();
        for (index, (ty, position)) in fallback.inputs.iter().zip(&positions).enumerate() {
            let (param, by_value) = match position {
                Position::Plain => {
                    header.push(ty.clone().tap_mut(|ty| namer.visit_type_mut(ty)));
                    continue;
                }
                Position::ByValue(param) => (param, true),
                Position::ByRef(param) => (param, false),
            };
            let lifetime = Lifetime::new(&format!("'__arg{index}"), Span::call_site());
            let erased = format_ident!("__T{index}");
            let referent: Type = parse_quote!(&#lifetime #erased);
            substitutions.insert(
                param.clone(),
                if by_value {
                    referent.clone()
                } else {
                    parse_quote!(#erased)
                },
            );
            header.push(referent);
            arg_lifetimes.push(LifetimeParam::new(lifetime));
            type_params.push(parse_quote!(#erased: ::core::any::Any));
        }
        let predicates = fallback_predicates(fallback, &substitutions);

        let args = arg_idents("__arg", arity);
        let hits = arg_idents("__hit", arity);
        let attempts = specific
            .iter()
            .map(|overload| {
                let mut patterns = Vec::new();
                let mut downcasts = Vec::new();
                let mut call_args = Vec::with_capacity(arity);
                for (position, ty) in overload.inputs.iter().enumerate() {
                    if dispatched[position] {
                        let elem = shared_referent(ty)?;
                        let (arg, hit) = (&args[position], &hits[position]);
                        patterns.push(quote!(::core::option::Option::Some(#hit)));
                        downcasts.push(quote!(<dyn ::core::any::Any>::downcast_ref::<#elem>(#arg)));
                        call_args.push(hit.clone());
                    } else {
                        let expected = &fallback.inputs[position];
                        if type_key(ty) != type_key(expected) {
                            Err(Error::new_spanned(
                                ty,
                                format!(
                                    "the `#[fallback]` takes `{}` here, overloads of the same arity must too",
                                    expected.to_token_stream()
                                ),
                            ))?
                        }
                        call_args.push(args[position].clone());
                    }
                }
                let call = self.call(overload, &call_args);
                Ok(quote! {
                    if let (#(#patterns,)*) = (#(#downcasts,)*) {
                        return #call;
                    }
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let generics = self.impl_generics(
            self.receiver_lifetime()
                .into_iter()
                .chain(fallback.lifetimes.iter().cloned())
                .chain(namer.fresh)
                .chain(arg_lifetimes),
            type_params,
            predicates,
        );
        let (impl_generics, _, where_clause) = generics.split_for_impl();
        let fallback_call = self.call(fallback, &args);
        let target = self.target_type();
        let output = fallback
            .output
            .clone()
            .tap_mut(|ty| Substitute(&substitutions).visit_type_mut(ty));
        let output = self.output_type(&output, &header)?;

        Ok(quote! {
            impl #impl_generics ::tagged_ref::Visit<(#(#header,)*)> for #target #where_clause {
                type Output = #output;

                fn visit(self, (#(#args,)*): (#(#header,)*)) -> Self::Output {
                    #(#attempts)*
                    #fallback_call
                }
            }
        })
    }

    /// The return type with elided lifetimes filled in the way fn signatures
    /// do: the receiver's borrow if there is one, else the only lifetime of
    /// the parameters.
    fn output_type(&self, output: &Type, inputs: &[Type]) -> Result<Type> {
        let lifetime = match self.target {
            Target::Shared | Target::Exclusive => Some(parse_quote!('__visitor)),
            Target::Owned => match input_lifetimes(inputs).as_slice() {
                [only] => Some(only.clone()),
                _ => None,
            },
        };
        let mut elide = ElideOutput {
            lifetime,
            missing: false,
        };
        let filled = output.clone().tap_mut(|ty| elide.visit_type_mut(ty));
        if elide.missing {
            Err(Error::new_spanned(
                output,
                "cannot tell which argument the returned borrow comes from, name its lifetime",
            ))?
        }
        Ok(filled)
    }

    /// The block's generics plus `lifetimes`, `types` and `predicates`,
    /// lifetimes first.
    fn impl_generics(
        &self,
        lifetimes: impl IntoIterator<Item = LifetimeParam>,
        types: impl IntoIterator<Item = TypeParam>,
        predicates: impl IntoIterator<Item = WherePredicate>,
    ) -> Generics {
        let (block_lifetimes, block_rest): (Vec<_>, Vec<_>) = self
            .generics
            .params
            .iter()
            .cloned()
            .partition(|param| matches!(param, GenericParam::Lifetime(_)));
        let params = lifetimes
            .into_iter()
            .map(GenericParam::Lifetime)
            .chain(block_lifetimes)
            .chain(block_rest)
            .chain(types.into_iter().map(GenericParam::Type))
            .collect::<Punctuated<GenericParam, Token![,]>>();
        let mut generics = Generics {
            params,
            ..self.generics.clone()
        };
        let mut predicates = predicates.into_iter().peekable();
        if predicates.peek().is_some() {
            generics.make_where_clause().predicates.extend(predicates);
        }
        generics
    }
}

/// The fallback's bounds and where clause, restated over the impl's erased
/// parameters. `?Sized` is dropped, the erased types must be `Sized` for
/// `Any`.
fn fallback_predicates(
    fallback: &Overload,
    substitutions: &HashMap<Ident, Type>,
) -> Vec<WherePredicate> {
    let generics = &fallback.method.sig.generics;
    let inline = generics.type_params().filter_map(|param| {
        let bounds = without_maybe_sized(&param.bounds);
        let bounded = &substitutions[&param.ident];
        (!bounds.is_empty()).then(|| -> WherePredicate { parse_quote!(#bounded: #bounds) })
    });
    let clauses = generics
        .where_clause
        .iter()
        .flat_map(|where_clause| where_clause.predicates.iter().cloned())
        .filter_map(|mut predicate| {
            if let WherePredicate::Type(predicate) = &mut predicate {
                predicate.bounds = without_maybe_sized(&predicate.bounds);
                if predicate.bounds.is_empty() {
                    return None;
                }
            }
            Substitute(substitutions).visit_where_predicate_mut(&mut predicate);
            Some(predicate)
        });
    inline.chain(clauses).collect()
}

fn without_maybe_sized(
    bounds: &Punctuated<TypeParamBound, Token![+]>,
) -> Punctuated<TypeParamBound, Token![+]> {
    bounds
        .iter()
        .filter(|bound| {
            !matches!(
                bound,
                TypeParamBound::Trait(TraitBound {
                    modifier: TraitBoundModifier::Maybe(_),
                    ..
                })
            )
        })
        .cloned()
        .collect()
}

/// Replaces the fallback's type parameters, also as the head of an
/// associated type path (`A::Item`).
struct Substitute<'s>(&'s HashMap<Ident, Type>);

impl VisitMut for Substitute<'_> {
    fn visit_type_mut(&mut self, ty: &mut Type) {
        let replacement = match &*ty {
            Type::Path(TypePath { qself: None, path }) if path.leading_colon.is_none() => {
                let mut segments = path.segments.iter();
                segments
                    .next()
                    .filter(|head| head.arguments.is_none())
                    .and_then(|head| self.0.get(&head.ident))
                    .map(|replacement| {
                        let rest = segments.collect::<Vec<_>>();
                        if rest.is_empty() {
                            replacement.clone()
                        } else {
                            parse_quote!(<#replacement>::#(#rest)::*)
                        }
                    })
            }
            _ => None,
        };
        match replacement {
            Some(replacement) => *ty = replacement,
            None => visit_mut::visit_type_mut(self, ty),
        }
    }
}

/// Distinct lifetimes named in `types`, outside fn types and `Fn(..)` sugar.
fn input_lifetimes(types: &[Type]) -> Vec<Lifetime> {
    #[derive(Default)]
    struct Collect(Vec<Lifetime>);
    impl VisitMut for Collect {
        fn visit_lifetime_mut(&mut self, lifetime: &mut Lifetime) {
            if !self.0.contains(lifetime) {
                self.0.push(lifetime.clone());
            }
        }
        fn visit_type_bare_fn_mut(&mut self, _: &mut TypeBareFn) {}
        fn visit_parenthesized_generic_arguments_mut(
            &mut self,
            _: &mut ParenthesizedGenericArguments,
        ) {
        }
    }
    let mut collect = Collect::default();
    for ty in types {
        collect.visit_type_mut(&mut ty.clone());
    }
    collect.0
}

/// Fills elided lifetimes of a return type with `lifetime`, flagging them as
/// `missing` when there is none to use.
struct ElideOutput {
    lifetime: Option<Lifetime>,
    missing: bool,
}

impl ElideOutput {
    fn fill(&mut self) -> Option<Lifetime> {
        self.missing |= self.lifetime.is_none();
        self.lifetime.clone()
    }
}

impl VisitMut for ElideOutput {
    fn visit_type_reference_mut(&mut self, reference: &mut TypeReference) {
        if reference.lifetime.is_none() {
            reference.lifetime = self.fill();
        }
        visit_mut::visit_type_reference_mut(self, reference);
    }

    fn visit_lifetime_mut(&mut self, lifetime: &mut Lifetime) {
        if lifetime.ident == "_" {
            if let Some(filled) = self.fill() {
                *lifetime = filled;
            }
        }
    }

    fn visit_type_bare_fn_mut(&mut self, _: &mut TypeBareFn) {}

    fn visit_parenthesized_generic_arguments_mut(&mut self, _: &mut ParenthesizedGenericArguments) {}
}

fn arg_idents(prefix: &str, arity: usize) -> Vec<Ident> {
    (0..arity).map(|i| format_ident!("{prefix}{i}")).collect()
}

fn shared_referent(ty: &Type) -> Result<&Type> {
    match ty {
        Type::Reference(TypeReference {
            mutability: None,
            elem,
            ..
        }) => Ok(elem),
        Type::Paren(paren) => shared_referent(&paren.elem),
        ty => Err(Error::new_spanned(
            ty,
            "next to a `#[fallback]`, dispatched parameters must be shared references",
        )),
    }
}

fn mentions(tokens: TokenStream, idents: &HashSet<Ident>) -> bool {
    tokens.into_iter().any(|tree| match tree {
        TokenTree::Ident(ident) => idents.contains(&ident),
        TokenTree::Group(group) => mentions(group.stream(), idents),
        _ => false,
    })
}

/// Type spelled without lifetimes, so `&Rock` and `&'a Rock` compare equal.
fn type_key(ty: &Type) -> String {
    struct StripLifetimes;
    impl VisitMut for StripLifetimes {
        fn visit_type_reference_mut(&mut self, reference: &mut TypeReference) {
            reference.lifetime = None;
            visit_mut::visit_type_reference_mut(self, reference);
        }
        fn visit_lifetime_mut(&mut self, lifetime: &mut Lifetime) {
            lifetime.ident = Ident::new("_", lifetime.ident.span());
        }
    }
    ty.clone()
        .tap_mut(|ty| StripLifetimes.visit_type_mut(ty))
        .to_token_stream()
        .to_string()
}

/// Gives every elided or `'_` lifetime a name, so the same type can appear
/// in an impl header and in the method signature.
#[derive(Default)]
struct NameElided {
    fresh: Vec<LifetimeParam>,
}

impl NameElided {
    fn next(&mut self) -> Lifetime {
        let lifetime = Lifetime::new(&format!("'__elided{}", self.fresh.len()), Span::call_site());
        self.fresh.push(LifetimeParam::new(lifetime.clone()));
        lifetime
    }
}

impl VisitMut for NameElided {
    fn visit_type_reference_mut(&mut self, reference: &mut TypeReference) {
        if reference.lifetime.is_none() {
            reference.lifetime = Some(self.next());
        }
        visit_mut::visit_type_reference_mut(self, reference);
    }

    fn visit_lifetime_mut(&mut self, lifetime: &mut Lifetime) {
        if lifetime.ident == "_" {
            *lifetime = self.next();
        }
    }

    // elided lifetimes in these are bound by the fn type itself
    fn visit_type_bare_fn_mut(&mut self, _: &mut TypeBareFn) {}

    fn visit_parenthesized_generic_arguments_mut(&mut self, _: &mut ParenthesizedGenericArguments) {}
}
