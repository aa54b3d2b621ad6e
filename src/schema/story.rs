use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::profile::Theme;

/// Every story is exactly this many pages long.
pub const PAGES_PER_STORY: usize = 8;

/// Illustration lifecycle of a whole story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryStatus {
    /// At least one page is still waiting for its illustration.
    Generating,
    /// Every page has an illustration URL.
    Ready,
    /// An order has been placed for this story.
    Ordered,
}

/// One page of a story, in narrative order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryPage {
    /// 1-based position in the story. Never reordered.
    pub id: u32,
    pub text: String,
    pub illustration_prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub illustration_url: Option<String>,
    /// Decorative glyph shown until the illustration arrives.
    pub glyph: String,
}

impl StoryPage {
    pub fn is_illustrated(&self) -> bool {
        self.illustration_url.is_some()
    }
}

/// Output of a theme template: the story before it gets an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryDraft {
    pub child_name: String,
    pub theme: Theme,
    pub title: String,
    pub pages: Vec<StoryPage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
    pub id: String,
    pub child_name: String,
    pub theme: Theme,
    pub title: String,
    pub pages: Vec<StoryPage>,
    pub created_at: DateTime<Utc>,
    pub status: StoryStatus,
}

impl Story {
    pub fn page(&self, id: u32) -> Option<&StoryPage> {
        self.pages.iter().find(|p| p.id == id)
    }

    /// Number of pages whose illustration has arrived.
    pub fn illustrated_count(&self) -> usize {
        self.pages.iter().filter(|p| p.is_illustrated()).count()
    }

    pub fn is_fully_illustrated(&self) -> bool {
        self.pages.iter().all(StoryPage::is_illustrated)
    }

    /// Share of illustrated pages as a whole percentage, rounded half up.
    pub fn progress_percent(&self) -> u8 {
        let total = self.pages.len();
        if total == 0 {
            return 0;
        }
        let done = self.illustrated_count();
        ((200 * done + total) / (2 * total)) as u8
    }
}
