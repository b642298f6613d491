use serde::{Deserialize, Serialize};
use validator::Validate;

use super::TopicId;

/// Subject a group project works on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate, sqlx::FromRow)]
pub struct Topic {
    pub id: TopicId,
    #[validate(length(max = 100, code = "max_length", message = "Title must be at most 100 characters long."))]
    pub title: String,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct TopicBody {
    #[validate(
        required(code = "null", message = "This field is required."),
        length(max = 100, code = "max_length", message = "Title must be at most 100 characters long.")
    )]
    pub title: Option<String>,
}

impl TopicBody {
    pub fn into_topic(self) -> Topic {
        Topic {
            id: TopicId::default(),
            title: self.title.unwrap_or_default(),
        }
    }

    pub fn apply(self, topic: &mut Topic) {
        if let Some(title) = self.title {
            topic.title = title;
        }
    }
}
