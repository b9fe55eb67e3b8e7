use darling::FromMeta;
use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::{parse2, spanned::Spanned};

/// Turns an annotated trait into an RPC client.
///
/// Every method carries `#[rpc(route = "...", method = "...")]`. The macro
/// strips those attributes from the trait, emits a blanket implementation for
/// any `ClientTransport`, and emits a `ROUTES` table describing each endpoint.
/// At most one non-receiver argument is allowed; it is sent as the JSON body.
#[proc_macro_attribute]
pub fn rpc(
    attr: proc_macro::TokenStream,
    item: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    let attr = TokenStream::from(attr);
    let item = TokenStream::from(item);

    match rpc_inner(attr, item) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

#[derive(Debug, darling::FromMeta)]
struct FnAttributeArgs {
    method: Option<String>,
    route: String,
}

struct Endpoint {
    name: String,
    method: String,
    route: String,
}

fn rpc_inner(attr: TokenStream, item: TokenStream) -> syn::Result<TokenStream> {
    if !attr.is_empty() {
        return Err(syn::Error::new(attr.span(), "rpc takes no arguments on the trait"));
    }

    let mut t: syn::ItemTrait = parse2(item)?;
    let trait_ident = t.ident.clone();

    let functions = t.items.iter_mut().filter_map(|item| match item {
        syn::TraitItem::Fn(method) => Some(method),
        _ => None,
    });

    let mut client_fns = vec![];
    let mut endpoints = vec![];
    for function in functions {
        let pos = function
            .attrs
            .iter()
            .position(|a| a.path().is_ident("rpc"))
            .ok_or_else(|| {
                syn::Error::new(function.sig.span(), "every method needs #[rpc(route = ...)]")
            })?;
        let attr = function.attrs.remove(pos);
        let list = attr.meta.require_list()?;

        let nested = darling::ast::NestedMeta::parse_meta_list(list.tokens.clone())?;
        let args = FnAttributeArgs::from_list(&nested)
            .map_err(|e| syn::Error::new(list.span(), e.to_string()))?;

        let method = args.method.unwrap_or_else(|| "post".to_owned()).to_lowercase();
        let route = args.route;

        let mut body_args = function.sig.inputs.iter().filter_map(|arg| match arg {
            syn::FnArg::Typed(t) => Some(t),
            syn::FnArg::Receiver(_) => None,
        });
        let body_arg = body_args.next();
        if let Some(extra) = body_args.next() {
            return Err(syn::Error::new(
                extra.span(),
                "rpc methods take at most one body argument",
            ));
        }

        let body_block = match body_arg {
            Some(arg) => {
                let pat = &arg.pat;
                quote! {
                    let body = match ::serde_json::to_value(#pat) {
                        Ok(body) => Some(body),
                        Err(e) => return Err(ClientError::Serialization(e)),
                    };
                }
            }
            None => quote! { let body = None; },
        };

        let mut client_fn = function.clone();
        client_fn.semi_token = None;
        client_fn.default = Some(parse2(quote! { {
            let method = #method;
            let route = #route;

            #body_block
            let resp = match self.send_request(method, route, body).await {
                Ok(resp) => resp,
                Err(e) => return Err(ClientError::Transport(e)),
            };

            match resp {
                Ok(resp) => ::serde_json::from_value(resp).map_err(ClientError::Deserialization),
                Err(resp) => match ::serde_json::from_value(resp.clone()) {
                    Ok(failure) => Err(ClientError::Api(failure)),
                    Err(_) => Err(ClientError::Rejected(resp)),
                },
            }
        } })?);

        endpoints.push(Endpoint {
            name: function.sig.ident.to_string(),
            method,
            route,
        });
        client_fns.push(client_fn);
    }

    let route_entries = endpoints.iter().map(|e| {
        let Endpoint { name, method, route } = e;
        quote! { Route { name: #name, method: #method, path: #route } }
    });
    let routes_doc = format!("Every endpoint declared on `{trait_ident}`, in declaration order.");
    let routes_ident = syn::Ident::new("ROUTES", Span::call_site());

    Ok(quote! {
        #t

        impl<Transport> #trait_ident for Transport
        where
            Transport: ClientTransport,
        {
            type ErrorWrapper<InnerError: Debug + for<'a> Deserialize<'a>> =
                ClientError<InnerError, Transport::Error>;

            #(#client_fns)*
        }

        #[doc = #routes_doc]
        pub const #routes_ident: &[Route] = &[#(#route_entries),*];
    })
}
