use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::ext::IdentExt;
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::{Ident, ItemFn, LitStr, Path, ReturnType, Token, Type, parse_macro_input};

// ============================================================================
// Attribute arguments
// ============================================================================

struct ImplementationArgs {
    service: Path,
    order: Option<Ident>,
    filters: Vec<Path>,
    name: Option<LitStr>,
    krate: Option<Path>,
}

enum Arg {
    Order(Ident),
    Filter(Path),
    Name(LitStr),
    Crate(Path),
}

impl Parse for Arg {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        // `crate` is a keyword and needs `parse_any`.
        let key = Ident::parse_any(input)?;
        input.parse::<Token![=]>()?;
        match key.to_string().as_str() {
            "order" => Ok(Arg::Order(input.parse()?)),
            "filter" => Ok(Arg::Filter(input.parse()?)),
            "name" => Ok(Arg::Name(input.parse()?)),
            "crate" => Ok(Arg::Crate(input.parse()?)),
            other => Err(syn::Error::new(
                key.span(),
                format!("unknown argument `{other}`, expected one of: order, filter, name, crate"),
            )),
        }
    }
}

impl Parse for ImplementationArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        if input.is_empty() {
            return Err(input.error("expected the service type, e.g. `#[implementation(Greeting)]`"));
        }
        let service: Path = input.parse()?;

        let mut args = Self {
            service,
            order: None,
            filters: Vec::new(),
            name: None,
            krate: None,
        };

        if input.is_empty() {
            return Ok(args);
        }
        input.parse::<Token![,]>()?;

        for arg in Punctuated::<Arg, Token![,]>::parse_terminated(input)? {
            match arg {
                Arg::Order(order) => {
                    if args.order.replace(order.clone()).is_some() {
                        return Err(syn::Error::new(order.span(), "duplicate `order` argument"));
                    }
                }
                Arg::Filter(path) => args.filters.push(path),
                Arg::Name(name) => {
                    if args.name.replace(name.clone()).is_some() {
                        return Err(syn::Error::new(name.span(), "duplicate `name` argument"));
                    }
                }
                Arg::Crate(path) => {
                    if args.krate.replace(path.clone()).is_some() {
                        return Err(syn::Error::new_spanned(path, "duplicate `crate` argument"));
                    }
                }
            }
        }
        Ok(args)
    }
}

impl ImplementationArgs {
    /// Path every generated item is resolved against.
    fn root(&self) -> Path {
        self.krate
            .clone()
            .unwrap_or_else(|| syn::parse_quote!(::sluice::core))
    }
}

// ============================================================================
// Adapter selection
// ============================================================================

fn adapter_for(root: &Path, output: &ReturnType) -> proc_macro2::TokenStream {
    let last_segment = match output {
        ReturnType::Type(_, ty) => match ty.as_ref() {
            Type::Path(path) => path.path.segments.last().map(|s| s.ident.to_string()),
            _ => None,
        },
        ReturnType::Default => None,
    };

    match last_segment.as_deref() {
        Some("State") => quote!(#root::side_effect_fn),
        Some("ControlFlow") => quote!(#root::consumer_fn),
        _ => quote!(#root::service_fn),
    }
}

// ============================================================================
// Expansion
// ============================================================================

/// Implementation of the `#[implementation(Service, ...)]` attribute macro.
///
/// Leaves the decorated function unchanged and appends a
/// `#[linkme::distributed_slice]` static holding its `Registrar`. Every
/// generated path starts at the core crate root, `::sluice::core` unless
/// overridden with `crate = ...`.
pub fn implementation(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as ImplementationArgs);
    let func = parse_macro_input!(item as ItemFn);

    if func.sig.asyncness.is_some() {
        return syn::Error::new(
            func.sig.fn_token.span,
            "implementations are synchronous; remove `async`",
        )
        .into_compile_error()
        .into();
    }

    let fn_name = &func.sig.ident;
    let fn_name_upper = fn_name.to_string().to_uppercase();
    let static_name = Ident::new(
        &format!("_SLUICE_IMPLEMENTATION_{fn_name_upper}"),
        Span::call_site(),
    );

    let root = args.root();
    let service = &args.service;
    let adapter = adapter_for(&root, &func.sig.output);
    let registrar_name = quote!(::core::concat!(::core::module_path!(), "::", ::core::stringify!(#fn_name)));

    let named = match &args.name {
        Some(name) => quote!(.named(#name)),
        None => quote!(.named(#registrar_name)),
    };
    let ordered = args
        .order
        .as_ref()
        .map(|order| quote!(.with_order(#root::ExecutionOrder::#order)));
    let filters = &args.filters;

    quote! {
        #func

        #[#root::linkme::distributed_slice(#root::IMPLEMENTATIONS)]
        #[linkme(crate = #root::linkme)]
        static #static_name: #root::Registrar = #root::Registrar {
            name: #registrar_name,
            service: #root::ServiceKey::of::<#service>,
            register: |pipeline| {
                pipeline
                    .register_implementation::<#service>(
                        #adapter(#fn_name) #named #ordered,
                        [#(#root::Filter::new(#filters)),*],
                    )
                    .map(|_| ())
            },
        };
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root_of(args: &ImplementationArgs) -> String {
        let root = args.root();
        quote!(#root).to_string()
    }

    #[test]
    fn test_default_root_is_facade() {
        let args: ImplementationArgs = syn::parse_str("Greeting, order = First").unwrap();
        assert_eq!(root_of(&args), quote!(::sluice::core).to_string());
        assert!(args.order.is_some());
    }

    #[test]
    fn test_crate_argument_overrides_root() {
        let args: ImplementationArgs =
            syn::parse_str("Greeting, crate = ::sluice_core, filter = is_potato").unwrap();
        assert_eq!(root_of(&args), quote!(::sluice_core).to_string());
        assert_eq!(args.filters.len(), 1);
    }

    #[test]
    fn test_duplicate_crate_argument() {
        let parsed = syn::parse_str::<ImplementationArgs>("Greeting, crate = a, crate = b");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_adapter_paths_follow_root() {
        let root: Path = syn::parse_quote!(::sluice::core);
        let output: ReturnType = syn::parse_quote!(-> State);
        assert_eq!(
            adapter_for(&root, &output).to_string(),
            quote!(::sluice::core::side_effect_fn).to_string()
        );
        let output: ReturnType = syn::parse_quote!(-> Option<i32>);
        assert_eq!(
            adapter_for(&root, &output).to_string(),
            quote!(::sluice::core::service_fn).to_string()
        );
    }
}
