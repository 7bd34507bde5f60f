use crate::model::CommentRecord;
use crate::result::CommonResult;
use std::path::{Path, PathBuf};

/// Supplier of the flat comment listing for a thread
pub trait CommentSource {
    /// Fetch every comment of the thread, in server order
    fn fetch(&self) -> CommonResult<Vec<CommentRecord>>;
}

/// Comment dump stored as a JSON array on disk
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CommentSource for JsonFileSource {
    fn fetch(&self) -> CommonResult<Vec<CommentRecord>> {
        let content = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// In-memory source for testing
pub struct MockCommentSource {
    pub records: Vec<CommentRecord>,
}

impl MockCommentSource {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    pub fn add_comment(&mut self, id: &str, parent_id: Option<&str>, content: &str) {
        self.records.push(CommentRecord {
            id: id.to_string(),
            post_id: None,
            user_id: None,
            parent_id: parent_id.map(str::to_string),
            content: content.to_string(),
            created_at: None,
            updated_at: None,
            user: None,
        });
    }
}

impl Default for MockCommentSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CommentSource for MockCommentSource {
    fn fetch(&self) -> CommonResult<Vec<CommentRecord>> {
        Ok(self.records.clone())
    }
}
