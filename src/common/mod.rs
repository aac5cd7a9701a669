use proc_macro2::{Delimiter, Group, TokenStream};
use quote::{quote, ToTokens, TokenStreamExt};
use syn::{
    punctuated::Punctuated, Attribute, Error, Expr, ExprLit, Fields, FieldsUnnamed, Ident,
    Lifetime, Lit, Meta, MetaList, MetaNameValue, Path, Result, Token, Type, TypePath,
    TypeReference, Variant,
};

pub type Args = Punctuated<Meta, Token![,]>;
pub fn ident(arg: &Meta) -> Result<&Ident> {
    let path = arg.path();
    path.get_ident()
        .ok_or_else(|| Error::new_spanned(path, "must be a bare identifier"))
}

/// `name` or `name = bool`.
pub fn flag_value(arg: Meta) -> Result<bool> {
    match arg {
        Meta::Path(_) => Ok(true),
        Meta::NameValue(MetaNameValue {
            value: Expr::Lit(ExprLit {
                lit: Lit::Bool(value),
                ..
            }),
            ..
        }) => Ok(value.value),
        _ => {
            let name = arg.path().to_token_stream();
            Err(Error::new_spanned(
                &arg,
                format!("valid forms are `{name}` or `{name} = true|false`"),
            ))
        }
    }
}

/// `name(Ident)` or `name = "Ident"`.
pub fn ident_value(arg: Meta) -> Result<Ident> {
    let name = arg.path().to_token_stream();
    let error = |tokens: &dyn ToTokens| {
        Error::new_spanned(
            tokens,
            format!(r#"valid forms are `{name}(Ident)` or `{name} = "Ident"`"#),
        )
    };
    match &arg {
        Meta::List(MetaList { tokens, .. }) => syn::parse2(tokens.clone()).map_err(|mut err| {
            err.combine(error(tokens));
            err
        }),
        Meta::NameValue(MetaNameValue {
            value: Expr::Lit(ExprLit {
                lit: Lit::Str(s), ..
            }),
            ..
        }) => s.parse().map_err(|mut err| {
            err.combine(error(s));
            err
        }),
        _ => Err(error(&arg)),
    }
}

pub fn fill_empty_or_else<T>(
    opt: &mut Option<T>,
    new: T,
    err: impl FnOnce(&T, T) -> Error,
) -> Result<()> {
    match opt {
        Some(old) => Err(err(old, new)),
        None => {
            opt.replace(new);
            Ok(())
        }
    }
}

pub fn duplicate<T>(key: &Ident) -> impl FnOnce(&T, T) -> Error + '_ {
    move |_, _| Error::new_spanned(key, format!("duplicate parameter `{key}`"))
}

/// One catalogue entry: the variant `id` borrowing a `ty` for `lifetime`.
pub struct WrappedVariant {
    pub attrs: Vec<Attribute>,
    pub id: Ident,
    pub ty: Type,
    pub lifetime: Lifetime,
}

impl ToTokens for WrappedVariant {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        let WrappedVariant {
            attrs,
            id,
            ty,
            lifetime,
        } = self;
        tokens.extend(quote!(#(#attrs)* #id));
        tokens.append(Group::new(
            Delimiter::Parenthesis,
            quote!(&#lifetime #ty),
        ));
    }
}

impl WrappedVariant {
    /// `Rock`, `Stone(Rock)` and `Stone(&'a Rock)` all borrow a `Rock`.
    pub fn new(variant: &Variant, lifetime: &Lifetime) -> Result<Self> {
        let attrs = variant.attrs.clone();
        let id = variant.ident.clone();
        if let Some((eq_token, _)) = &variant.discriminant {
            Err(Error::new_spanned(
                eq_token,
                "explicit discriminants unsupported, the ordinal is the variant's position",
            ))?
        }
        let ty = match &variant.fields {
            Fields::Named(named_fields) => Err(Error::new(
                named_fields.brace_token.span.join(),
                "named fields unsupported",
            ))?,
            Fields::Unnamed(FieldsUnnamed {
                unnamed,
                paren_token,
            }) => {
                if unnamed.len() != 1 {
                    Err(Error::new(
                        paren_token.span.join(),
                        "tuple-like variant must have exactly 1 field",
                    ))?
                }
                referent_type(&unnamed[0].ty, lifetime)?
            }
            Fields::Unit => Type::Path(TypePath {
                qself: None,
                path: Path::from(id.clone()),
            }),
        };
        Ok(WrappedVariant {
            attrs,
            id,
            ty,
            lifetime: lifetime.clone(),
        })
    }

    /// Key used to detect a type listed twice.
    pub fn type_key(&self) -> String {
        self.ty.to_token_stream().to_string()
    }

    /// The member type as it would be written by hand: `std::path::PathBuf`,
    /// `Vec<u8>`, `[u8; 4]`, `dyn Any`.
    pub fn type_name(&self) -> String {
        [
            (" :: ", "::"),
            (":: ", "::"),
            (" <", "<"),
            ("< ", "<"),
            (" >", ">"),
            (" ,", ","),
            (" ;", ";"),
            ("& ", "&"),
            ("( ", "("),
            (" )", ")"),
        ]
        .into_iter()
        .fold(self.type_key(), |name, (from, to)| name.replace(from, to))
    }
}

fn referent_type(ty: &Type, lifetime: &Lifetime) -> Result<Type> {
    match ty {
        Type::Reference(TypeReference {
            mutability: Some(mutability),
            ..
        }) => Err(Error::new_spanned(
            mutability,
            "tagged references hold shared borrows, `&mut` unsupported",
        )),
        Type::Reference(TypeReference {
            lifetime: Some(found),
            ..
        }) if found != lifetime => Err(Error::new_spanned(
            found,
            format!("borrow must use the enum's lifetime `{lifetime}`"),
        )),
        Type::Reference(TypeReference { elem, .. }) => Ok((**elem).clone()),
        Type::Paren(paren) => referent_type(&paren.elem, lifetime),
        ty => Ok(ty.clone()),
    }
}

pub fn generate_conversion_impl(
    ident: &Ident,
    WrappedVariant {
        id, ty, lifetime, ..
    }: &WrappedVariant,
) -> TokenStream {
    quote! {
        impl<#lifetime> ::core::convert::From<&#lifetime #ty> for #ident<#lifetime> {
            fn from(value: &#lifetime #ty) -> Self {
                #ident::#id(value)
            }
        }

        impl<#lifetime> ::core::convert::TryFrom<#ident<#lifetime>> for &#lifetime #ty {
            type Error = #ident<#lifetime>;
            #[allow(irrefutable_let_patterns)]
            fn try_from(value: #ident<#lifetime>) -> ::core::result::Result<Self, Self::Error> {
                if let #ident::#id(value) = value {
                    ::core::result::Result::Ok(value)
                } else {
                    ::core::result::Result::Err(value)
                }
            }
        }
    }
}

pub fn generate_member_impl(ident: &Ident, ordinal: usize, variant: &WrappedVariant) -> TokenStream {
    let WrappedVariant {
        id, ty, lifetime, ..
    } = variant;
    quote! {
        impl<#lifetime> ::tagged_ref::Member<#lifetime, #ident<#lifetime>> for #ty {
            const ORDINAL: usize = #ordinal;

            #[inline]
            fn wrap(&#lifetime self) -> #ident<#lifetime> {
                #ident::#id(self)
            }

            #[allow(unreachable_patterns)]
            #[inline]
            fn peel(tagged: #ident<#lifetime>) -> ::core::option::Option<&#lifetime Self> {
                match tagged {
                    #ident::#id(referent) => ::core::option::Option::Some(referent),
                    _ => ::core::option::Option::None,
                }
            }
        }
    }
}
