mod model;
mod route;

use proc_macro::TokenStream;

/// Creates a documentation function for the route, named after the original
/// function with the suffix `_docs`.
///
/// The first doc comment line becomes the `OpenAPI` summary, the remaining
/// lines the description.
#[proc_macro_attribute]
pub fn route(args: TokenStream, input: TokenStream) -> TokenStream {
	route::from_input(args, input)
}

/// Creates an `XInput` struct next to the model `X`.
///
/// Fields with `#[serde(skip_deserializing)]` or `#[serde(skip)]` are left
/// out, all other fields are copied with their attributes and wrapped in
/// `Option` (unless they already are one).
#[proc_macro_attribute]
pub fn model(_args: TokenStream, input: TokenStream) -> TokenStream {
	model::from_input(input)
}
