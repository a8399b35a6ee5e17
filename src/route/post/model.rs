pub use crate::route::model::{Confirmation, IdInput};

use chrono::{DateTime, Utc};
use macros::model;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, Row};
use validator::Validate;

use super::Error;

/// Length limit of the `title` column, in characters.
pub const TITLE_MAX_CHARS: usize = 255;
use crate::{announce::Announcement, config::Messaging};

/// A single post.
#[model]
#[derive(Debug, Deserialize, Serialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Post {
	/// The unique identifier of the post, assigned by the store.
	#[serde(skip_deserializing)]
	pub id: i32,
	/// The title of the post, at most 255 characters.
	pub title: String,
	/// The content of the post.
	pub content: Option<String>,
	/// The user that created the post.
	pub author_id: Option<i32>,
	/// The creation time of the post, assigned by the store.
	#[serde(skip_deserializing)]
	pub created_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, PgRow> for Post {
	fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
		Ok(Self {
			id: row.try_get("id")?,
			title: row.try_get("title")?,
			content: row.try_get("content")?,
			author_id: row.try_get("author_id")?,
			created_at: row.try_get("created_at")?,
		})
	}
}

/// A post body that carries every field the current messaging mode requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
	pub title: String,
	pub content: Option<String>,
	pub author_id: Option<i32>,
}

impl PostInput {
	/// Checks that the required fields are present.
	///
	/// When posts are announced, `title`, `content` and `authorId` are all
	/// required and empty strings count as missing. Otherwise only `title` is,
	/// and any `authorId` is dropped. A title longer than the column allows
	/// is rejected in every mode.
	pub fn require(self, messaging: Messaging) -> Result<NewPost, Error> {
		let title = self.title.filter(|title| !title.is_empty());

		if title
			.as_ref()
			.is_some_and(|title| title.chars().count() > TITLE_MAX_CHARS)
		{
			return Err(Error::TitleTooLong);
		}

		if !messaging.announces() {
			return Ok(NewPost {
				title: title.ok_or(Error::MissingTitle)?,
				content: self.content,
				author_id: None,
			});
		}

		match (
			title,
			self.content.filter(|content| !content.is_empty()),
			self.author_id,
		) {
			(Some(title), Some(content), Some(author_id)) => Ok(NewPost {
				title,
				content: Some(content),
				author_id: Some(author_id),
			}),
			_ => Err(Error::MissingFields),
		}
	}
}

impl From<NewPost> for Announcement {
	fn from(post: NewPost) -> Self {
		Self {
			title: post.title,
			content: post.content,
			author_id: post.author_id,
		}
	}
}
