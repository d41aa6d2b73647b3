use proc_macro2::TokenStream;
use quote::{quote, ToTokens};
use syn::parse::Parser;
use syn::spanned::Spanned;
use syn::{
    Attribute, Block, Ident, ImplItem, Item, ItemFn, ItemImpl, LitBool, LitStr, Signature, Type,
};

/// Parsed `#[instrument(...)]` arguments.
#[derive(Default)]
pub(crate) struct InstrumentArgs {
    span_name: Option<LitStr>,
    record_exception: Option<LitBool>,
    ignore: bool,
    attributes: Vec<(Ident, LitStr)>,
}

impl InstrumentArgs {
    pub(crate) fn parse(attr: TokenStream) -> syn::Result<Self> {
        let mut args = InstrumentArgs::default();
        if attr.is_empty() {
            return Ok(args);
        }
        let parser = syn::meta::parser(|meta| {
            if meta.path.is_ident("span_name") {
                args.span_name = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("record_exception") {
                args.record_exception = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("ignore") {
                args.ignore = true;
                Ok(())
            } else if meta.path.is_ident("attributes") {
                meta.parse_nested_meta(|nested| {
                    let key = nested
                        .path
                        .get_ident()
                        .cloned()
                        .ok_or_else(|| nested.error("attribute keys must be identifiers"))?;
                    let value: LitStr = nested.value()?.parse()?;
                    args.attributes.push((key, value));
                    Ok(())
                })
            } else {
                Err(meta.error("unsupported instrument argument"))
            }
        });
        parser.parse2(attr)?;
        Ok(args)
    }

    fn record_exception(&self) -> bool {
        self.record_exception
            .as_ref()
            .map(|flag| flag.value)
            .unwrap_or(true)
    }

    /// The `InstrumentOptions` construction expression for these
    /// arguments.
    fn options_expr(&self) -> TokenStream {
        let mut expr = quote!(::otel_instrument::InstrumentOptions::default());
        if let Some(span_name) = &self.span_name {
            expr = quote!(#expr.with_span_name(#span_name));
        }
        if let Some(record_exception) = &self.record_exception {
            expr = quote!(#expr.with_record_exception(#record_exception));
        }
        if !self.attributes.is_empty() {
            let pairs = self.attributes.iter().map(|(key, value)| {
                let key = LitStr::new(&key.to_string(), key.span());
                quote!(::otel_instrument::KeyValue::new(#key, #value))
            });
            expr = quote!(#expr.with_attributes([#(#pairs),*]));
        }
        expr
    }
}

pub(crate) fn expand(args: InstrumentArgs, item: Item) -> syn::Result<TokenStream> {
    match item {
        Item::Fn(item_fn) => expand_fn(args, item_fn),
        Item::Impl(item_impl) => expand_impl(args, item_impl),
        other => Err(syn::Error::new(
            other.span(),
            "#[instrument] supports functions and impl blocks",
        )),
    }
}

fn expand_fn(args: InstrumentArgs, mut func: ItemFn) -> syn::Result<TokenStream> {
    if args.ignore {
        return Ok(func.into_token_stream());
    }
    // A second #[instrument] on the same function: defer to the innermost
    // one, so the closest-to-the-function options win.
    if has_instrument_attr(&func.attrs) {
        return Ok(func.into_token_stream());
    }
    let qualified_name = func.sig.ident.to_string();
    let rewritten = instrumented_block(&args, &func.sig, &func.block, &qualified_name)?;
    func.block = Box::new(rewritten);
    Ok(func.into_token_stream())
}

fn expand_impl(args: InstrumentArgs, mut item_impl: ItemImpl) -> syn::Result<TokenStream> {
    if let Some(span_name) = &args.span_name {
        return Err(syn::Error::new(
            span_name.span(),
            "span_name cannot be applied to an impl block; set it on individual methods",
        ));
    }
    if args.ignore {
        return Ok(item_impl.into_token_stream());
    }
    let type_name = impl_type_name(&item_impl.self_ty)?;
    for item in &mut item_impl.items {
        if let ImplItem::Fn(method) = item {
            let name = method.sig.ident.to_string();
            if name.starts_with('_') {
                continue;
            }
            if has_instrument_attr(&method.attrs) {
                continue;
            }
            let qualified_name = format!("{type_name}::{name}");
            let rewritten = instrumented_block(&args, &method.sig, &method.block, &qualified_name)?;
            method.block = rewritten;
        }
    }
    Ok(item_impl.into_token_stream())
}

/// Rewrites a function body so it runs inside a span. The synchronous
/// shape holds a `SpanScope` guard across the body; the suspending shape
/// wraps the body in an `async move` block driven by `with_span`, so the
/// span stays open across every suspension point.
///
/// The body runs in an inner scope (an immediately-called closure for the
/// sync shape, a nested `async` block for the suspending shape) so that
/// `?` and early `return`s exit the body, not the instrumented function:
/// the return probe sees every propagated `Err` before the span closes.
fn instrumented_block(
    args: &InstrumentArgs,
    sig: &Signature,
    block: &Block,
    qualified_name: &str,
) -> syn::Result<Block> {
    if sig.constness.is_some() {
        return Err(syn::Error::new(
            sig.span(),
            "const functions cannot be instrumented",
        ));
    }
    let qualified_name = LitStr::new(qualified_name, sig.ident.span());
    let options = args.options_expr();
    let probe = args.record_exception();

    let rewritten: Block = if sig.asyncness.is_some() {
        let probe = probe.then(|| {
            quote! {
                {
                    use ::otel_instrument::outcome::{FallibleOutcome as _, InfallibleOutcome as _};
                    ::otel_instrument::__private::get_active_span(|__otel_span| {
                        (&__otel_ret).record_failure(&__otel_span);
                    });
                }
            }
        });
        syn::parse_quote!({
            let __otel_target = ::otel_instrument::fn_target!(#qualified_name);
            let __otel_options = #options;
            ::otel_instrument::with_span(__otel_target, __otel_options, async move {
                let __otel_ret = async move #block.await;
                #probe
                __otel_ret
            })
            .await
        })
    } else {
        let probe = probe.then(|| {
            quote! {
                {
                    use ::otel_instrument::outcome::{FallibleOutcome as _, InfallibleOutcome as _};
                    (&__otel_ret).record_failure(&__otel_scope.span());
                }
            }
        });
        syn::parse_quote!({
            let __otel_target = ::otel_instrument::fn_target!(#qualified_name);
            let __otel_options = #options;
            let __otel_scope = ::otel_instrument::SpanScope::enter(&__otel_target, &__otel_options);
            let __otel_ret = (move || #block)();
            #probe
            __otel_scope.finish();
            __otel_ret
        })
    };
    Ok(rewritten)
}

/// Whether the item already carries this crate's `#[instrument]`
/// attribute, written bare or crate-qualified. Foreign attributes that
/// happen to end in `instrument` (`#[tracing::instrument]`) do not count
/// and do not suppress expansion.
fn has_instrument_attr(attrs: &[Attribute]) -> bool {
    attrs.iter().any(|attr| {
        let path = attr.path();
        if path.is_ident("instrument") {
            return true;
        }
        let mut segments = path.segments.iter();
        matches!(
            (segments.next(), segments.next(), segments.next()),
            (Some(first), Some(last), None)
                if first.ident == "otel_instrument_macros" && last.ident == "instrument"
        )
    })
}

fn impl_type_name(self_ty: &Type) -> syn::Result<String> {
    match self_ty {
        Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .map(|segment| segment.ident.to_string())
            .ok_or_else(|| syn::Error::new(self_ty.span(), "unsupported impl target")),
        _ => Err(syn::Error::new(
            self_ty.span(),
            "#[instrument] impl blocks must target a named type",
        )),
    }
}
