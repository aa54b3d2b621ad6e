//! Story preview pager.
//!
//! The reader opens on a cover and flips through pages in narrative order.
//! It never blocks on illustrations: a page without one shows its glyph.

use serde::Serialize;

use crate::core::catalog::ThemeMeta;
use crate::core::session::{SessionEvent, SessionStore, Step};
use crate::schema::story::{Story, StoryStatus};

pub const STILL_PAINTING_BANNER: &str = "✨ Illustrations still loading…";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageArt {
    Illustration { url: String },
    Placeholder { glyph: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverView {
    pub title: String,
    pub emoji: &'static str,
    pub accent_color: &'static str,
    /// Shown while any page is still waiting for its illustration.
    pub banner: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageView {
    /// 1-based page number.
    pub number: usize,
    pub total: usize,
    pub text: String,
    pub glyph: String,
    pub art: PageArt,
    pub is_last: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum ReaderView {
    Cover(CoverView),
    Page(PageView),
}

/// Position within a story. Holds no story data itself so the latest
/// session snapshot can be rendered on every change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoryReader {
    on_cover: bool,
    index: usize,
}

impl Default for StoryReader {
    fn default() -> Self {
        Self {
            on_cover: true,
            index: 0,
        }
    }
}

impl StoryReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_cover(&self) -> bool {
        self.on_cover
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn open(&mut self) {
        self.on_cover = false;
    }

    pub fn close(&mut self) {
        self.on_cover = true;
    }

    /// Move forward one page, stopping at the last.
    pub fn next(&mut self, story: &Story) {
        let last = story.pages.len().saturating_sub(1);
        self.index = (self.index + 1).min(last);
    }

    pub fn previous(&mut self) {
        self.index = self.index.saturating_sub(1);
    }

    /// Jump to `index`, clamped to the story.
    pub fn go_to(&mut self, story: &Story, index: usize) {
        self.index = index.min(story.pages.len().saturating_sub(1));
        self.on_cover = false;
    }

    pub fn view(&self, story: &Story) -> ReaderView {
        let page = story.pages.get(self.index);
        match page {
            Some(page) if !self.on_cover => {
                let art = match &page.illustration_url {
                    Some(url) => PageArt::Illustration { url: url.clone() },
                    None => PageArt::Placeholder {
                        glyph: page.glyph.clone(),
                    },
                };
                ReaderView::Page(PageView {
                    number: self.index + 1,
                    total: story.pages.len(),
                    text: page.text.clone(),
                    glyph: page.glyph.clone(),
                    art,
                    is_last: self.index + 1 == story.pages.len(),
                })
            }
            _ => ReaderView::Cover(cover(story)),
        }
    }
}

fn cover(story: &Story) -> CoverView {
    let ThemeMeta {
        emoji,
        accent_color,
        ..
    } = story.theme.meta();
    CoverView {
        title: story.title.clone(),
        emoji,
        accent_color,
        banner: (story.status == StoryStatus::Generating).then_some(STILL_PAINTING_BANNER),
    }
}

/// Leave the preview for checkout.
pub fn start_order(store: &SessionStore) {
    store.dispatch(SessionEvent::SetStep(Step::Order));
}

/// Back to the wizard for another story.
pub fn create_another(store: &SessionStore) {
    store.dispatch(SessionEvent::SetStep(Step::Onboarding));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::assembler::StoryAssembler;
    use crate::schema::profile::{ChildProfile, PhotoHandle, Theme};

    fn story() -> Story {
        let profile = ChildProfile {
            name: "ivy".to_string(),
            age: 6,
            theme: Theme::Jungle,
            interests: vec!["frogs".to_string()],
            best_friend: String::new(),
            fears: String::new(),
            favorite_place: "the garden".to_string(),
            photos: vec![PhotoHandle("p1".to_string()), PhotoHandle("p2".to_string())],
        };
        StoryAssembler::builtin().unwrap().assemble(&profile).unwrap()
    }

    #[test]
    fn opens_on_cover_with_banner() {
        let story = story();
        let ReaderView::Cover(cover) = StoryReader::new().view(&story) else {
            panic!("expected cover");
        };
        assert_eq!(cover.title, story.title);
        assert_eq!(cover.emoji, "🌴");
        assert_eq!(cover.banner, Some(STILL_PAINTING_BANNER));
    }

    #[test]
    fn banner_hidden_once_ready() {
        let mut story = story();
        story.status = StoryStatus::Ready;
        let ReaderView::Cover(cover) = StoryReader::new().view(&story) else {
            panic!("expected cover");
        };
        assert!(cover.banner.is_none());
    }

    #[test]
    fn navigation_clamps() {
        let story = story();
        let mut reader = StoryReader::new();
        reader.open();
        reader.previous();
        assert_eq!(reader.index(), 0);
        for _ in 0..20 {
            reader.next(&story);
        }
        assert_eq!(reader.index(), 7);
        reader.go_to(&story, 99);
        assert_eq!(reader.index(), 7);
        let ReaderView::Page(page) = reader.view(&story) else {
            panic!("expected page");
        };
        assert!(page.is_last);
        assert_eq!(page.number, 8);
    }

    #[test]
    fn glyph_until_illustrated() {
        let mut story = story();
        let mut reader = StoryReader::new();
        reader.go_to(&story, 1);
        let ReaderView::Page(page) = reader.view(&story) else {
            panic!("expected page");
        };
        assert_eq!(page.art, PageArt::Placeholder { glyph: page.glyph.clone() });

        story.pages[1].illustration_url = Some("https://img/2.png".to_string());
        let ReaderView::Page(page) = reader.view(&story) else {
            panic!("expected page");
        };
        assert_eq!(
            page.art,
            PageArt::Illustration {
                url: "https://img/2.png".to_string()
            }
        );
    }

    #[test]
    fn actions_move_session() {
        let store = SessionStore::new();
        start_order(&store);
        assert_eq!(store.step(), Step::Order);
        create_another(&store);
        assert_eq!(store.step(), Step::Onboarding);
    }
}
