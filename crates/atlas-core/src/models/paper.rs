use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl Paper {
    /// Title if present, otherwise the uploaded file name.
    pub fn display_name(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.is_empty())
            .or(self.file_name.as_deref())
            .unwrap_or("(untitled)")
    }
}

/// One page of the user's papers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperList {
    pub papers: Vec<Paper>,
    pub total_papers: u64,
    pub page: u32,
    pub page_size: u32,
}

impl PaperList {
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total_papers.div_ceil(u64::from(self.page_size))
    }
}
