use proc_macro2::TokenStream;
use synstructure::{BindingInfo, Structure};

/// Generate `From<T>` for every variant whose only field is marked
/// `#[from]`.
pub fn derive_from(s: Structure) -> TokenStream {
    let mut impls = TokenStream::new();

    for variant in s.variants() {
        let field = match variant.bindings().iter().find(is_from) {
            Some(field) => field,
            None => continue,
        };

        if variant.bindings().len() != 1 {
            impls.extend(quote_spanned! {variant.ast().ident.span()=>
                compile_error!("#[from] can only be used on variants with \
                    exactly one field");
            });
            continue;
        }

        let ty = &field.ast().ty;
        let construct = variant.construct(|_, _| quote!(value));

        impls.extend(s.gen_impl(quote! {
            gen impl From<#ty> for @Self {
                fn from(value: #ty) -> Self {
                    #construct
                }
            }
        }));
    }

    impls
}

fn is_from(bi: &&BindingInfo) -> bool {
    bi.ast()
        .attrs
        .iter()
        .filter_map(|attr| attr.parse_meta().ok())
        .any(|meta| meta.path().is_ident("from"))
}
