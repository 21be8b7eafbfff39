use serde::{Deserialize, Serialize};

/// State of an asynchronous processing job on the server.
///
/// The client never polls on its own; callers re-issue
/// `check_task_status` as often as they like.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingTask {
    #[serde(default)]
    pub task_id: String,
    #[serde(default)]
    pub paper_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ProcessingTask {
    /// Fill in the task id when the server response left it out.
    pub(crate) fn with_fallback_id(mut self, task_id: &str) -> Self {
        if self.task_id.is_empty() {
            self.task_id = task_id.to_string();
        }
        self
    }
}
