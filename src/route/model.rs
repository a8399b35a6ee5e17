use std::borrow::Cow;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Path parameters of routes addressing a single row, e.g. `/post/:id`.
#[derive(Deserialize, Validate, JsonSchema)]
pub struct IdInput {
	pub id: i32,
}

/// A plain confirmation returned by routes that do not return a resource.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct Confirmation {
	pub message: Cow<'static, str>,
}

impl Confirmation {
	pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
		Self {
			message: message.into(),
		}
	}
}
