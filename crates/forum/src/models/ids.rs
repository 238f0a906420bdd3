//! Numeric identifiers assigned by the forum server

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            pub fn value(&self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Forum instance ID
    ForumId
);
define_id!(
    /// Course module ID of the forum activity
    CourseModuleId
);
define_id!(
    /// Course the forum belongs to
    CourseId
);
define_id!(
    /// Server-assigned discussion ID
    DiscussionId
);
define_id!(
    /// Post ID. A parent of 0 marks the opening post of a discussion.
    PostId
);
define_id!(UserId);
define_id!(GroupId);

impl PostId {
    /// Parent value carried by opening posts
    pub const ROOT: PostId = PostId(0);

    pub fn is_root(&self) -> bool {
        self.0 == 0
    }
}
