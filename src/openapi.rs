use aide::{openapi::Tag, transform::TransformOpenApi};

use crate::{error, extract::Json};

pub mod tag {
	pub const SERVICE: &str = "Service";
	pub const POST: &str = "Post";
}

pub fn docs(api: TransformOpenApi) -> TransformOpenApi {
	api.title("Post Service")
		.summary("Stores posts and announces their creation")
		.description(include_str!("../README.md"))
		.tag(Tag {
			name: tag::SERVICE.into(),
			description: Some("Service information".into()),
			..Default::default()
		})
		.tag(Tag {
			name: tag::POST.into(),
			description: Some("Post management".into()),
			..Default::default()
		})
		.default_response_with::<Json<error::Message>, _>(|res| {
			res.example(error::Message::new("error message"))
		})
}
