//! Error type of the forum index session

/// Errors surfaced by [`crate::ForumIndex`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ForumError {
    #[error("Forum is not loaded")]
    NotLoaded,

    #[error("Not in the discussion list: {item}")]
    NotFound { item: String },

    #[error("Fetch error: {message}")]
    Fetch { message: String },

    #[error("Error updating preference: {message}")]
    PreferenceUpdate { message: String },

    #[error("Navigation error: {message}")]
    Navigation { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl ForumError {
    pub fn fetch(e: &anyhow::Error) -> Self {
        ForumError::Fetch {
            message: format!("{:#}", e),
        }
    }
}

impl From<anyhow::Error> for ForumError {
    fn from(e: anyhow::Error) -> Self {
        ForumError::fetch(&e)
    }
}

pub type ForumResult<T> = std::result::Result<T, ForumError>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_fetch_error_keeps_context_chain() {
        let error = Err::<(), _>(anyhow::anyhow!("timeout"))
            .context("Failed to fetch forum")
            .unwrap_err();
        let forum_error = ForumError::from(error);
        assert_eq!(
            forum_error.to_string(),
            "Fetch error: Failed to fetch forum: timeout"
        );
    }
}
