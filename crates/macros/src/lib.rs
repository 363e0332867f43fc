//! Derive macros shared by Quire crates.

extern crate proc_macro;

#[macro_use] extern crate quote;
#[macro_use] extern crate synstructure;

mod api;
mod from;

decl_derive!([ApiError, attributes(api)] => api::derive_error);
decl_derive!([From, attributes(from)] => from::derive_from);
