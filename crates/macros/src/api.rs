use proc_macro2::{Span, TokenStream};
use syn::{Attribute, Ident, Lit, LitStr, Meta, NestedMeta, spanned::Spanned};
use synstructure::{BindingInfo, Structure, VariantInfo};

struct Error(TokenStream);

impl Error {
    fn new(span: Span, message: &str) -> Error {
        Error(quote_spanned! { span =>
            compile_error!(#message);
        })
    }
}

/// Contents of an `#[api(...)]` attribute.
#[derive(Default)]
struct Api {
    internal: bool,
    code: Option<LitStr>,
    status: Option<Ident>,
}

/// How a single variant reports its status and code.
enum Source {
    Attribute(Api),
    /// Binding of the `#[cause]` field.
    Cause(TokenStream),
}

pub fn derive_error(s: Structure) -> TokenStream {
    let statuses = s.each_variant(|v| match source(v) {
        Ok(Source::Attribute(api)) => match api.status {
            Some(status) => quote!(actix_web::http::StatusCode::#status),
            None => quote!(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR),
        },
        Ok(Source::Cause(cause)) => quote!(ApiError::status(#cause)),
        Err(err) => err.0,
    });

    let codes = s.each_variant(|v| match source(v) {
        Ok(Source::Attribute(api)) => match api.code {
            Some(code) => quote!(Some(Cow::Borrowed(#code))),
            None => quote!(None),
        },
        Ok(Source::Cause(cause)) => quote!(ApiError::code(#cause)),
        Err(err) => err.0,
    });

    s.gen_impl(quote! {
        extern crate actix_web;
        use std::borrow::Cow;

        gen impl ApiError for @Self {
            fn status(&self) -> actix_web::http::StatusCode {
                match *self { #statuses }
            }

            fn code(&self) -> Option<Cow<str>> {
                match *self { #codes }
            }
        }
    })
}

/// Decide where a variant's status and code come from: its own `#[api]`
/// attribute or, lacking one, the field marked `#[cause]`.
fn source(v: &VariantInfo) -> Result<Source, Error> {
    if let Some(api) = parse_api(v.ast().attrs)? {
        return Ok(Source::Attribute(api));
    }

    v.bindings()
        .iter()
        .find(is_cause)
        .map(|cause| Source::Cause(quote!(#cause)))
        .ok_or_else(|| Error::new(
            v.ast().ident.span(),
            "each variant must be #[api]-annotated or have a #[cause]",
        ))
}

/// Find and parse the single `#[api(...)]` attribute in a list.
fn parse_api(attrs: &[Attribute]) -> Result<Option<Api>, Error> {
    let mut metas = attrs.iter()
        .filter_map(|attr| attr.parse_meta().ok())
        .filter(|meta| meta.path().is_ident("api"));

    let list = match metas.next() {
        None => return Ok(None),
        Some(Meta::List(list)) => list,
        Some(meta) => return Err(Error::new(
            meta.span(), "api attribute must take a list in parentheses")),
    };

    if let Some(meta) = metas.next() {
        return Err(Error::new(meta.span(), "api attribute must be used once"));
    }

    if list.nested.is_empty() {
        return Err(Error::new(
            list.span(), "api attribute requires at least one argument"));
    }

    let mut api = Api::default();

    for item in &list.nested {
        match item {
            NestedMeta::Meta(Meta::Path(path)) if path.is_ident("internal") =>
                api.internal = true,
            NestedMeta::Meta(Meta::NameValue(nv)) if nv.path.is_ident("code") =>
                match nv.lit {
                    Lit::Str(ref code) => api.code = Some(code.clone()),
                    _ => return Err(Error::new(nv.lit.span(), "expected a string")),
                },
            NestedMeta::Meta(Meta::NameValue(nv)) if nv.path.is_ident("status") =>
                match nv.lit {
                    Lit::Str(ref s) =>
                        api.status = Some(Ident::new(&s.value(), s.span())),
                    _ => return Err(Error::new(nv.lit.span(), "expected a string")),
                },
            _ => return Err(Error::new(
                item.span(), "expected one of: internal, code, status")),
        }
    }

    if api.internal && (api.code.is_some() || api.status.is_some()) {
        return Err(Error::new(
            list.span(), "internal errors can't have codes or statuses"));
    }

    Ok(Some(api))
}

fn is_cause(bi: &&BindingInfo) -> bool {
    bi.ast()
        .attrs
        .iter()
        .filter_map(|attr| attr.parse_meta().ok())
        .any(|meta| meta.path().is_ident("cause"))
}
