use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{DEFAULT_LINK, GroupId, TopicId};

/// Group project.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate, sqlx::FromRow)]
pub struct Group {
    pub id: GroupId,
    #[validate(length(max = 100, code = "max_length", message = "Name must be at most 100 characters long."))]
    pub name: String,
    #[sqlx(rename = "topic_id")]
    pub topic: TopicId,
    #[validate(custom(function = "crate::validate::validate_https_hostname"))]
    pub link_django: String,
    #[validate(custom(function = "crate::validate::validate_https_hostname"))]
    pub link_tui: String,
    #[validate(custom(function = "crate::validate::validate_https_hostname"))]
    pub link_gui: String,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct GroupBody {
    #[validate(
        required(code = "null", message = "This field is required."),
        length(max = 100, code = "max_length", message = "Name must be at most 100 characters long.")
    )]
    pub name: Option<String>,
    #[validate(required(code = "null", message = "This field is required."))]
    pub topic: Option<TopicId>,
    #[validate(custom(function = "crate::validate::validate_https_hostname"))]
    pub link_django: Option<String>,
    #[validate(custom(function = "crate::validate::validate_https_hostname"))]
    pub link_tui: Option<String>,
    #[validate(custom(function = "crate::validate::validate_https_hostname"))]
    pub link_gui: Option<String>,
}

impl GroupBody {
    pub fn into_group(self) -> Group {
        let link = |value: Option<String>| value.unwrap_or_else(|| DEFAULT_LINK.to_owned());

        Group {
            id: GroupId::default(),
            name: self.name.unwrap_or_default(),
            topic: self.topic.unwrap_or_default(),
            link_django: link(self.link_django),
            link_tui: link(self.link_tui),
            link_gui: link(self.link_gui),
        }
    }

    pub fn apply(self, group: &mut Group) {
        if let Some(name) = self.name {
            group.name = name;
        }
        if let Some(topic) = self.topic {
            group.topic = topic;
        }
        if let Some(link) = self.link_django {
            group.link_django = link;
        }
        if let Some(link) = self.link_tui {
            group.link_tui = link;
        }
        if let Some(link) = self.link_gui {
            group.link_gui = link;
        }
    }
}
