use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, ItemFn};

/// Binds a function taking Clap options to a web form.
///
/// Applied to `fn name(opts: &Opts) -> R`, the function is kept unchanged
/// and two siblings are generated:
///
/// - `name_kwargs(&Kwargs) -> Result<(), InvokeError>` parses keyword
///   arguments into `Opts` and calls `name`
/// - `name_web_form(FormConfig) -> Result<WebForm, ConfigurationError>`
///   builds the form for `Opts` bound to `name_kwargs`
#[proc_macro_attribute]
pub fn web_form_bind(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input_fn = parse_macro_input!(item as ItemFn);

    let fn_name = &input_fn.sig.ident;
    let fn_vis = &input_fn.vis;
    let fn_output = &input_fn.sig.output;

    // Extract the options type from `&Type`
    let param_type = match single_reference_param(&input_fn) {
        Ok(ty) => ty,
        Err(err) => return err.to_compile_error().into(),
    };

    let kwargs_fn_name = syn::Ident::new(&format!("{}_kwargs", fn_name), fn_name.span());
    let form_fn_name = syn::Ident::new(&format!("{}_web_form", fn_name), fn_name.span());

    let returns_result = matches!(fn_output, syn::ReturnType::Type(_, ty)
        if matches!(&**ty, syn::Type::Path(type_path)
            if type_path.path.segments.last()
                .map(|seg| seg.ident == "Result")
                .unwrap_or(false)));

    let call = if returns_result {
        quote! {
            #fn_name(&opts)
                .map(|_| ())
                .map_err(|e| ::clap_web_form::InvokeError::Failed(e.to_string()))
        }
    } else {
        quote! {
            {
                #fn_name(&opts);
                Ok(())
            }
        }
    };

    let expanded = quote! {
        #input_fn

        /// Calls the bound function with keyword arguments from a form submission.
        #fn_vis fn #kwargs_fn_name(
            kwargs: &::clap_web_form::Kwargs,
        ) -> ::std::result::Result<(), ::clap_web_form::InvokeError> {
            let opts = ::clap_web_form::parse_kwargs::<#param_type>(kwargs)?;
            #call
        }

        /// Builds the web form for the bound function.
        #fn_vis fn #form_fn_name(
            config: ::clap_web_form::FormConfig,
        ) -> ::std::result::Result<::clap_web_form::WebForm, ::clap_web_form::ConfigurationError> {
            let command = <#param_type as ::clap::CommandFactory>::command();
            ::clap_web_form::WebForm::new(&command, config, #kwargs_fn_name)
        }
    };

    TokenStream::from(expanded)
}

fn single_reference_param(input_fn: &ItemFn) -> syn::Result<&syn::Type> {
    let sig = &input_fn.sig;
    if sig.inputs.len() != 1 {
        return Err(syn::Error::new_spanned(
            &sig.inputs,
            "#[web_form_bind] functions take exactly one `&Options` parameter",
        ));
    }

    match sig.inputs.first() {
        Some(syn::FnArg::Typed(pat_type)) => match &*pat_type.ty {
            syn::Type::Reference(type_ref) => Ok(&type_ref.elem),
            other => Err(syn::Error::new_spanned(other, "parameter must be a reference")),
        },
        Some(other) => Err(syn::Error::new_spanned(other, "parameter must be typed")),
        None => Err(syn::Error::new_spanned(&sig.ident, "missing options parameter")),
    }
}
