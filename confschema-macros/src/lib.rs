//! Small proc-macros used by `confschema-model`.
//!
//! Kept free of any dependency on the sibling crates, same as the macro
//! crate this workspace is modeled on: these operate purely on token text.

extern crate proc_macro;

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, LitStr};

/// Validates an arity literal (`"0"`, `"?"`, `"1"`, `"+"`, `"*"`, or
/// `"min:max"`) at compile time and expands to the same string literal.
///
/// Catches typos in arity literals used as constants (e.g.
/// `const SIZE: &str = arity!("1:2");`) before runtime parsing ever sees
/// them.
#[proc_macro]
pub fn arity(input: TokenStream) -> TokenStream {
    let lit = parse_macro_input!(input as LitStr);
    let s = lit.value();
    if !is_valid_arity(&s) {
        return syn::Error::new(lit.span(), format!("invalid arity literal: {s:?}"))
            .to_compile_error()
            .into();
    }
    quote!(#s).into()
}

fn is_valid_arity(s: &str) -> bool {
    if matches!(s, "0" | "?" | "1" | "+" | "*") {
        return true;
    }
    let Some((lo, hi)) = s.split_once(':') else {
        return false;
    };
    let lo_ok = lo.is_empty() || lo.parse::<u64>().is_ok();
    let hi_ok = hi.is_empty() || hi.parse::<u64>().is_ok();
    if !lo_ok || !hi_ok {
        return false;
    }
    if let (Ok(lo), Ok(hi)) = (lo.parse::<u64>(), hi.parse::<u64>()) {
        lo <= hi
    } else {
        true
    }
}

/// Replaces underscores with dashes in an identifier-like string literal.
///
/// Attribute and kind names in model files are dash-cased (`"either"`,
/// `"read-only"`-style extensions); Rust identifiers for the same concept
/// are snake_case. This lets a `snake_case` name be written once and
/// reused as the dash-cased textual form.
#[proc_macro]
pub fn dash_case(input: TokenStream) -> TokenStream {
    let lit = parse_macro_input!(input as LitStr);
    let s = lit.value().replace('_', "-");
    quote!(#s).into()
}
