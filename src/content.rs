use include_dir::{include_dir, Dir};
use serde::de::DeserializeOwned;
use thiserror::Error;

static CONTENT_DIR: Dir = include_dir!("src/content");

pub const CARDS_FILE: &str = "cards.json";
pub const QUIZZES_FILE: &str = "quizzes.json";
pub const REPLIES_FILE: &str = "replies.json";

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("content file {0} not found")]
    Missing(String),
    #[error("content file {0} is not valid utf-8")]
    NotUtf8(String),
    #[error("content file {file} could not be parsed: {source}")]
    Parse {
        file: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Deserializes one of the JSON files embedded at build time.
pub fn load<T: DeserializeOwned>(file_name: &str) -> Result<T, ContentError> {
    let file = CONTENT_DIR
        .get_file(file_name)
        .ok_or_else(|| ContentError::Missing(file_name.to_string()))?;

    let text = file
        .contents_utf8()
        .ok_or_else(|| ContentError::NotUtf8(file_name.to_string()))?;

    serde_json::from_str(text).map_err(|source| ContentError::Parse {
        file: file_name.to_string(),
        source,
    })
}
