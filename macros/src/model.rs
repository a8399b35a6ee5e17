use darling::{ast, FromDeriveInput, FromField};
use proc_macro2::TokenTree;
use quote::{format_ident, quote, ToTokens};
use syn::Meta;

#[derive(Debug, FromDeriveInput)]
#[darling(supports(struct_named), forward_attrs)]
struct ModelInputReceiver {
	ident: syn::Ident,

	generics: syn::Generics,

	data: ast::Data<(), ModelFieldReceiver>,

	attrs: Vec<syn::Attribute>,
}

#[derive(Debug, FromField)]
#[darling(forward_attrs)]
struct ModelFieldReceiver {
	ident: Option<syn::Ident>,

	ty: syn::Type,
	vis: syn::Visibility,

	attrs: Vec<syn::Attribute>,
}

/// Whether the field is never read from a request body,
/// i.e. it carries `#[serde(skip_deserializing)]` or `#[serde(skip)]`.
fn is_server_assigned(attrs: &[syn::Attribute]) -> bool {
	attrs.iter().any(|attr| {
		let Meta::List(ref list) = attr.meta else {
			return false;
		};

		if !list.path.is_ident("serde") {
			return false;
		}

		list.tokens.to_token_stream().into_iter().any(|token| {
			matches!(token, TokenTree::Ident(ref ident) if ident == "skip_deserializing" || ident == "skip")
		})
	})
}

fn is_option(ty: &syn::Type) -> bool {
	let syn::Type::Path(path) = ty else {
		return false;
	};

	path.qself.is_none()
		&& path
			.path
			.segments
			.last()
			.is_some_and(|segment| segment.ident == "Option")
}

pub fn from_input(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
	let input = syn::parse_macro_input!(input as syn::DeriveInput);
	let receiver = match ModelInputReceiver::from_derive_input(&input) {
		Ok(x) => x,
		Err(e) => return e.write_errors().into(),
	};

	let ident = &receiver.ident;
	let vis = &input.vis;
	let generics = &receiver.generics;
	let input_ident = format_ident!("{}Input", ident);

	let attrs = receiver
		.attrs
		.iter()
		.filter(|attr| !attr.path().is_ident("doc"))
		.collect::<Vec<_>>();

	let Some(fields) = receiver.data.take_struct() else {
		return syn::Error::new_spanned(ident, "#[model] only supports structs with named fields")
			.to_compile_error()
			.into();
	};

	let fields = fields.iter().filter_map(|field| {
		let ident = field.ident.as_ref()?;

		if is_server_assigned(&field.attrs) {
			return None;
		}

		let attrs = &field.attrs;
		let vis = &field.vis;
		let ty = &field.ty;
		let ty = if is_option(ty) {
			quote!(#ty)
		} else {
			quote!(Option<#ty>)
		};

		Some(quote! {
			#(#attrs)*
			#vis #ident: #ty,
		})
	});

	let doc = format!(
		"Request body for [`{ident}`]. Every field is optional here; which \
		 ones are required is decided by the handler."
	);

	quote! {
		#input

		#[doc = #doc]
		#(#attrs)*
		#vis struct #input_ident #generics {
			#(
				#fields
			)*
		}
	}
	.into()
}
