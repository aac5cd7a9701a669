use std::collections::HashMap;

use proc_macro2::{Span, TokenStream};
use quote::{format_ident, quote};
use syn::{
    parse::Parser, punctuated::Punctuated, Attribute, Error, GenericParam, Generics, Ident,
    ItemEnum, Lifetime, Meta, MetaList, Path, Result, Token,
};

use tap::prelude::*;

use crate::common::{
    duplicate, fill_empty_or_else, flag_value, generate_conversion_impl, generate_member_impl,
    ident, ident_value, Args, WrappedVariant,
};

pub fn doit(args: TokenStream, item_enum: ItemEnum) -> Result<TokenStream> {
    let args = Args::parse_terminated.parse2(args)?;
    let params = Params::try_from(args)?;
    let Config {
        tag,
        implement_conversions,
        dynamic,
    } = Config::new(params, &item_enum);

    let ItemEnum {
        attrs,
        vis,
        enum_token,
        ident,
        generics,
        brace_token,
        variants,
    } = &item_enum;

    let lifetime = enum_lifetime(generics)?;
    if variants.is_empty() {
        Err(Error::new(
            brace_token.span.join(),
            "catalogue must name at least one type",
        ))?
    }

    let wrapped_variants = variants
        .iter()
        .map(|variant| WrappedVariant::new(variant, &lifetime))
        .collect::<Result<Vec<_>>>()?
        .pipe(|variants| check_distinct(&variants).map(|()| variants))?;

    let attrs = strip_copy_derives(attrs)?;
    let ids = wrapped_variants.iter().map(|v| &v.id).collect::<Vec<_>>();
    let tys = wrapped_variants.iter().map(|v| &v.ty).collect::<Vec<_>>();
    let len = wrapped_variants.len();
    let name = ident.to_string();
    let type_names = wrapped_variants
        .iter()
        .map(WrappedVariant::type_name)
        .collect::<Vec<_>>();
    let tag_doc = format!("Which member of [`{name}`]'s catalogue is borrowed.");

    let member_impls = wrapped_variants
        .iter()
        .enumerate()
        .map(|(ordinal, variant)| generate_member_impl(ident, ordinal, variant));

    let conversion_impls = wrapped_variants.iter().map(|variant| {
        if implement_conversions {
            generate_conversion_impl(ident, variant)
        } else {
            quote!()
        }
    });

    let dynamic_impl = if dynamic {
        quote! {
            impl<#lifetime> ::core::convert::TryFrom<&#lifetime (dyn ::core::any::Any + 'static)>
                for #ident<#lifetime>
            {
                type Error = ::tagged_ref::Error;

                fn try_from(
                    value: &#lifetime (dyn ::core::any::Any + 'static),
                ) -> ::core::result::Result<Self, Self::Error> {
                    #(
                        if let ::core::option::Option::Some(referent) = value.downcast_ref::<#tys>() {
                            return ::core::result::Result::Ok(#ident::#ids(referent));
                        }
                    )*
                    ::core::result::Result::Err(::tagged_ref::Error::unknown_referent(
                        <Self as ::tagged_ref::TaggedRef<#lifetime>>::NAME,
                        <Self as ::tagged_ref::TaggedRef<#lifetime>>::CATALOGUE,
                    ))
                }
            }
        }
    } else {
        quote!()
    };

    Ok(quote! {
        #(#attrs)*
        #[derive(Clone, Copy)]
        #vis #enum_token #ident<#lifetime> {
            #(#wrapped_variants),*
        }

        #[doc = #tag_doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #vis enum #tag {
            #(#ids),*
        }

        impl #tag {
            pub const ALL: [Self; #len] = [#(#tag::#ids),*];

            #[inline]
            pub fn ordinal(self) -> usize {
                self as usize
            }
        }

        impl ::core::convert::TryFrom<usize> for #tag {
            type Error = ::tagged_ref::Error;

            fn try_from(ordinal: usize) -> ::core::result::Result<Self, Self::Error> {
                Self::ALL.get(ordinal).copied().ok_or_else(|| {
                    ::tagged_ref::Error::ordinal_out_of_range(#name, ordinal, #len)
                })
            }
        }

        impl<#lifetime> ::core::convert::From<#ident<#lifetime>> for #tag {
            fn from(tagged: #ident<#lifetime>) -> Self {
                ::tagged_ref::TaggedRef::tag(&tagged)
            }
        }

        impl<#lifetime> ::tagged_ref::TaggedRef<#lifetime> for #ident<#lifetime> {
            type Tag = #tag;

            const NAME: &'static str = #name;
            const CATALOGUE: &'static [&'static str] = &[#(#type_names),*];

            #[inline]
            fn ordinal(&self) -> usize {
                ::tagged_ref::TaggedRef::tag(self) as usize
            }

            #[inline]
            fn tag(&self) -> #tag {
                match self {
                    #(#ident::#ids(_) => #tag::#ids),*
                }
            }
        }

        impl<#lifetime, __V, __E, __R> ::tagged_ref::Accept<__V, __E> for #ident<#lifetime>
        where
            __E: #(::tagged_ref::Prepend<&#lifetime #tys>)+*,
            __V: #(::tagged_ref::Visit<
                <__E as ::tagged_ref::Prepend<&#lifetime #tys>>::Output,
                Output = __R,
            >)+*,
        {
            type Output = __R;

            fn accept(self, visitor: __V, extra: __E) -> __R {
                match self {
                    #(#ident::#ids(referent) => {
                        let args = <__E as ::tagged_ref::Prepend<&#lifetime #tys>>::prepend(extra, referent);
                        <__V as ::tagged_ref::Visit<
                            <__E as ::tagged_ref::Prepend<&#lifetime #tys>>::Output,
                        >>::visit(visitor, args)
                    })*
                }
            }
        }

        #(#member_impls)*
        #(#conversion_impls)*
        #dynamic_impl
    })
}

fn enum_lifetime(generics: &Generics) -> Result<Lifetime> {
    if let Some(where_clause) = &generics.where_clause {
        Err(Error::new_spanned(where_clause, "where clauses unsupported"))?
    }
    let mut lifetimes = Vec::new();
    for param in &generics.params {
        match param {
            GenericParam::Lifetime(param) => {
                if !param.bounds.is_empty() {
                    Err(Error::new_spanned(&param.bounds, "lifetime bounds unsupported"))?
                }
                lifetimes.push(param.lifetime.clone())
            }
            param => Err(Error::new_spanned(
                param,
                "generic type and const parameters unsupported, a catalogue is a fixed list of types",
            ))?,
        }
    }
    match lifetimes.len() {
        0 => Ok(Lifetime::new("'a", Span::call_site())),
        1 => Ok(lifetimes.remove(0)),
        _ => Err(Error::new_spanned(
            &generics.params,
            "at most one lifetime, the lifetime of the borrows",
        )),
    }
}

fn check_distinct(variants: &[WrappedVariant]) -> Result<()> {
    let mut seen = HashMap::new();
    let mut error: Option<Error> = None;
    for variant in variants {
        if let Some(first) = seen.insert(variant.type_key(), &variant.id) {
            let err = Error::new_spanned(
                &variant.ty,
                format!(
                    "catalogue types must be distinct, `{}` is already borrowed by `{first}`",
                    variant.type_key()
                ),
            );
            match &mut error {
                Some(error) => error.combine(err),
                None => error = Some(err),
            }
        }
    }
    error.map_or(Ok(()), Err)
}

/// The enum always derives `Clone` and `Copy`; drop the user's to avoid
/// conflicting impls.
fn strip_copy_derives(attrs: &[Attribute]) -> Result<Vec<Attribute>> {
    let is_copy_derive = |path: &Path| {
        path.segments
            .last()
            .map_or(false, |segment| segment.ident == "Clone" || segment.ident == "Copy")
    };
    attrs
        .iter()
        .filter_map(|attr| {
            let Meta::List(list) = &attr.meta else {
                return Some(Ok(attr.clone()));
            };
            if !attr.path().is_ident("derive") {
                return Some(Ok(attr.clone()));
            }
            let derives = match Punctuated::<Path, Token![,]>::parse_terminated
                .parse2(list.tokens.clone())
            {
                Ok(derives) => derives,
                Err(err) => return Some(Err(err)),
            };
            let kept = derives
                .into_iter()
                .filter(|path| !is_copy_derive(path))
                .collect::<Vec<_>>();
            (!kept.is_empty()).then(|| {
                Ok(Attribute {
                    meta: Meta::List(MetaList {
                        tokens: quote! { #(#kept),* },
                        ..list.clone()
                    }),
                    ..attr.clone()
                })
            })
        })
        .collect()
}

#[derive(Default)]
struct Params {
    tag: Option<Ident>,
    no_impl: Option<bool>,
    dynamic: Option<bool>,
}

impl TryFrom<Args> for Params {
    type Error = Error;
    fn try_from(args: Args) -> std::result::Result<Self, Self::Error> {
        let mut params = Params::default();
        for arg in args {
            let key = ident(&arg)?.clone();
            match key.to_string().as_str() {
                "tag" => fill_empty_or_else(&mut params.tag, ident_value(arg)?, duplicate(&key))?,
                "no_impl" => {
                    fill_empty_or_else(&mut params.no_impl, flag_value(arg)?, duplicate(&key))?
                }
                "dynamic" => {
                    fill_empty_or_else(&mut params.dynamic, flag_value(arg)?, duplicate(&key))?
                }
                _ => Err(Error::new_spanned(
                    key,
                    "tagged_ref: unrecognized parameter, expected `tag`, `no_impl` or `dynamic`",
                ))?,
            }
        }
        Ok(params)
    }
}

struct Config {
    tag: Ident,
    implement_conversions: bool,
    dynamic: bool,
}
impl Config {
    fn new(
        Params {
            tag,
            no_impl,
            dynamic,
        }: Params,
        item_enum: &ItemEnum,
    ) -> Self {
        Self {
            tag: tag.unwrap_or_else(|| format_ident!("{}Tag", item_enum.ident)),
            implement_conversions: !no_impl.unwrap_or_default(),
            dynamic: dynamic.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quote::quote;
    use syn::{parse_quote, Expr, File, ImplItem, Item, ItemImpl, Type};

    fn expand(args: TokenStream, input: TokenStream) -> Result<File> {
        doit(args, syn::parse2(input).unwrap()).map(|tokens| syn::parse2(tokens).unwrap())
    }

    fn error(args: TokenStream, input: TokenStream) -> String {
        doit(args, syn::parse2(input).unwrap())
            .unwrap_err()
            .to_string()
    }

    fn enum_named<'f>(file: &'f File, name: &str) -> Option<&'f ItemEnum> {
        file.items.iter().find_map(|item| match item {
            Item::Enum(item) if item.ident == name => Some(item),
            _ => None,
        })
    }

    fn impls_of<'f>(file: &'f File, trait_name: &str) -> Vec<&'f ItemImpl> {
        file.items
            .iter()
            .filter_map(|item| match item {
                Item::Impl(item) => item.trait_.as_ref().and_then(|(_, path, _)| {
                    (path.segments.last()?.ident == trait_name).then_some(item)
                }),
                _ => None,
            })
            .collect()
    }

    fn field_types(item: &ItemEnum) -> Vec<Type> {
        item.variants
            .iter()
            .map(|variant| variant.fields.iter().next().unwrap().ty.clone())
            .collect()
    }

    #[test]
    fn unit_and_tuple_variants() {
        let file = expand(
            quote!(),
            quote! {
                pub enum HandRef {
                    Rock,
                    Sheet(Paper),
                    Blades(&'a Scissors),
                }
            },
        )
        .unwrap();

        let hand_ref = enum_named(&file, "HandRef").unwrap();
        let generics: Generics = parse_quote!(<'a>);
        assert_eq!(hand_ref.generics, generics);
        let expected: Vec<Type> = vec![
            parse_quote!(&'a Rock),
            parse_quote!(&'a Paper),
            parse_quote!(&'a Scissors),
        ];
        assert_eq!(field_types(hand_ref), expected);

        let tag = enum_named(&file, "HandRefTag").unwrap();
        let tag_variants = tag.variants.iter().map(|v| v.ident.to_string()).collect::<Vec<_>>();
        assert_eq!(tag_variants, ["Rock", "Sheet", "Blades"]);

        let tagged_ref = impls_of(&file, "TaggedRef")[0];
        let catalogue = tagged_ref
            .items
            .iter()
            .find_map(|item| match item {
                ImplItem::Const(item) if item.ident == "CATALOGUE" => Some(&item.expr),
                _ => None,
            })
            .unwrap();
        let expected: Expr = parse_quote!(&["Rock", "Paper", "Scissors"]);
        assert_eq!(*catalogue, expected);

        assert_eq!(impls_of(&file, "Member").len(), 3);
        assert_eq!(impls_of(&file, "Accept").len(), 1);
        let paper: Type = parse_quote!(&'a Paper);
        assert!(impls_of(&file, "TryFrom")
            .iter()
            .any(|item| *item.self_ty == paper));
    }

    #[test]
    fn catalogue_names_keep_their_spelling() {
        let file = expand(
            quote!(),
            quote! {
                enum Buffer {
                    Bytes([u8; 4]),
                    Owned(Vec<u8>),
                    Path(std::path::PathBuf),
                    Pair((u8, u16)),
                    Object(dyn core::any::Any),
                }
            },
        )
        .unwrap();
        let tagged_ref = impls_of(&file, "TaggedRef")[0];
        let catalogue = tagged_ref
            .items
            .iter()
            .find_map(|item| match item {
                ImplItem::Const(item) if item.ident == "CATALOGUE" => Some(&item.expr),
                _ => None,
            })
            .unwrap();
        let expected: Expr = parse_quote! {
            &["[u8; 4]", "Vec<u8>", "std::path::PathBuf", "(u8, u16)", "dyn core::any::Any"]
        };
        assert_eq!(*catalogue, expected);
    }

    #[test]
    fn declared_lifetime_is_kept() {
        let file = expand(quote!(), quote!(enum Shape<'s> { Circle, Square })).unwrap();
        let shape = enum_named(&file, "Shape").unwrap();
        let expected: Vec<Type> = vec![parse_quote!(&'s Circle), parse_quote!(&'s Square)];
        assert_eq!(field_types(shape), expected);
    }

    #[test]
    fn params() {
        for args in [
            quote!(),
            quote!(no_impl),
            quote!(no_impl = false),
            quote!(dynamic),
            quote!(tag(Kind)),
            quote!(tag = "Kind", dynamic = true, no_impl),
        ] {
            assert!(expand(args, quote!(enum E { A })).is_ok());
        }

        let renamed = expand(quote!(tag = "Kind"), quote!(enum E { A })).unwrap();
        assert!(enum_named(&renamed, "Kind").is_some());
        assert!(enum_named(&renamed, "ETag").is_none());

        let enum_type: Type = parse_quote!(E<'a>);
        let dynamic_impls = |file: &File| {
            impls_of(file, "TryFrom")
                .into_iter()
                .filter(|item| *item.self_ty == enum_type)
                .count()
        };

        let plain = expand(quote!(), quote!(enum E { A })).unwrap();
        assert_eq!(impls_of(&plain, "From").len(), 2);
        assert_eq!(dynamic_impls(&plain), 0);

        // the tag's `From<E>` stays
        let no_impl = expand(quote!(no_impl), quote!(enum E { A })).unwrap();
        assert_eq!(impls_of(&no_impl, "From").len(), 1);
        assert_eq!(impls_of(&no_impl, "TryFrom").len(), 1);

        let dynamic = expand(quote!(dynamic), quote!(enum E { A })).unwrap();
        assert_eq!(dynamic_impls(&dynamic), 1);
    }

    #[test]
    fn rejected_params() {
        assert!(error(quote!(tag = 1), quote!(enum E { A })).contains("valid forms are `tag(Ident)`"));
        assert!(error(quote!(no_impl, no_impl), quote!(enum E { A })).contains("duplicate parameter"));
        assert!(error(quote!(dynamic = "yes"), quote!(enum E { A })).contains("dynamic = true|false"));
        assert!(error(quote!(prefix = "X"), quote!(enum E { A })).contains("unrecognized parameter"));
    }

    #[test]
    fn rejected_catalogues() {
        assert!(error(quote!(), quote!(enum E {})).contains("at least one type"));
        assert!(error(quote!(), quote!(enum E { A { x: u8 } })).contains("named fields"));
        assert!(error(quote!(), quote!(enum E { A(u8, u8) })).contains("exactly 1 field"));
        assert!(error(quote!(), quote!(enum E { A(&'a mut u8) })).contains("`&mut` unsupported"));
        assert!(error(quote!(), quote!(enum E<'x> { A(&'y u8) })).contains("enum's lifetime"));
        assert!(error(quote!(), quote!(enum E<T> { A(T) })).contains("generic type"));
        assert!(error(quote!(), quote!(enum E<'x, 'y> { A })).contains("at most one lifetime"));
        assert!(error(quote!(), quote!(enum E { A = 1 })).contains("explicit discriminants"));
        assert!(error(quote!(), quote!(enum E { A, B(A) })).contains("must be distinct"));
    }

    #[test]
    fn copy_derives_are_replaced() {
        let file = expand(
            quote!(),
            quote! {
                #[derive(Clone, Copy, Debug)]
                enum E { A }
            },
        )
        .unwrap();
        let attrs = &enum_named(&file, "E").unwrap().attrs;
        let expected: Vec<Attribute> = vec![
            parse_quote!(#[derive(Debug)]),
            parse_quote!(#[derive(Clone, Copy)]),
        ];
        assert_eq!(*attrs, expected);
    }

    #[test]
    fn strip_keeps_other_attributes() {
        let attrs: Vec<Attribute> = vec![
            parse_quote!(#[doc = "hands"]),
            parse_quote!(#[derive(core::clone::Clone, PartialEq)]),
            parse_quote!(#[derive(Copy)]),
        ];
        let stripped = strip_copy_derives(&attrs).unwrap();
        let expected: Vec<Attribute> = vec![
            parse_quote!(#[doc = "hands"]),
            parse_quote!(#[derive(PartialEq)]),
        ];
        assert_eq!(stripped, expected);
    }
}
