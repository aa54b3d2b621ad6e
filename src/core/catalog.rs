//! Theme catalog: display metadata and page templates for every theme.
//!
//! Both mappings are exhaustive `match`es over [`Theme`], so a new theme
//! does not compile until it has metadata and a template file. The
//! templates themselves are checked once by [`ThemeCatalog::builtin`].

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use strum::IntoEnumIterator;
use thiserror::Error;

use crate::core::template::{Template, TemplateError};
use crate::schema::profile::{ChildProfile, Theme};
use crate::schema::story::{StoryDraft, StoryPage, PAGES_PER_STORY};

/// Appended to every page prompt so the whole book shares one art style.
pub const ART_STYLE_SUFFIX: &str = ", watercolor children's book illustration, soft pastel palette";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("template error in theme '{theme}': {source}")]
    Template {
        theme: &'static str,
        #[source]
        source: TemplateError,
    },
    #[error("RON error in theme '{theme}': {source}")]
    Ron {
        theme: &'static str,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("theme '{theme}' has {found} pages, expected 8")]
    PageCount { theme: &'static str, found: usize },
    #[error("theme '{theme}' page {page}: {problem}")]
    BlankPage {
        theme: &'static str,
        page: u32,
        problem: &'static str,
    },
    #[error("theme '{0}' has a blank title")]
    BlankTitle(&'static str),
    #[error("no template registered for theme '{0}'")]
    MissingTheme(&'static str),
}

/// Display metadata for a theme card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThemeMeta {
    pub label: &'static str,
    pub emoji: &'static str,
    pub accent_color: &'static str,
    pub description: &'static str,
}

impl Theme {
    pub fn meta(&self) -> ThemeMeta {
        match self {
            Self::Dinosaurs => ThemeMeta {
                label: "Dinosaur World",
                emoji: "🦕",
                accent_color: "green",
                description: "A prehistoric rescue mission in a land of giant dinos",
            },
            Self::Space => ThemeMeta {
                label: "Space Explorer",
                emoji: "🚀",
                accent_color: "indigo",
                description: "Blast off to a planet that looks just like your backyard",
            },
            Self::Fantasy => ThemeMeta {
                label: "Magic Kingdom",
                emoji: "🧙",
                accent_color: "purple",
                description: "Enchanted forests, dragons, and a legendary quest",
            },
            Self::Ocean => ThemeMeta {
                label: "Ocean Adventure",
                emoji: "🐠",
                accent_color: "cyan",
                description: "Dive deep where mermaids and sea creatures need your help",
            },
            Self::Superheroes => ThemeMeta {
                label: "Super Squad",
                emoji: "🦸",
                accent_color: "red",
                description: "Discover your super powers and save the city",
            },
            Self::Jungle => ThemeMeta {
                label: "Jungle Quest",
                emoji: "🌴",
                accent_color: "emerald",
                description: "Trek through wild jungle to find the lost treasure",
            },
            Self::MagicSchool => ThemeMeta {
                label: "Magic Academy",
                emoji: "⚡",
                accent_color: "amber",
                description: "Your first day at a school where spells come to life",
            },
        }
    }

    /// The embedded RON template for this theme.
    pub fn template_source(&self) -> &'static str {
        match self {
            Self::Dinosaurs => include_str!("../../themes/dinosaurs.ron"),
            Self::Space => include_str!("../../themes/space.ron"),
            Self::Fantasy => include_str!("../../themes/fantasy.ron"),
            Self::Ocean => include_str!("../../themes/ocean.ron"),
            Self::Superheroes => include_str!("../../themes/superheroes.ron"),
            Self::Jungle => include_str!("../../themes/jungle.ron"),
            Self::MagicSchool => include_str!("../../themes/magic-school.ron"),
        }
    }
}

// On-disk shape of a theme file.

#[derive(Debug, Deserialize)]
struct RonPage {
    text: String,
    prompt: String,
    glyph: String,
}

#[derive(Debug, Deserialize)]
struct RonTheme {
    title: String,
    pages: Vec<RonPage>,
}

/// One page of a theme template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageTemplate {
    pub text: Template,
    pub prompt: Template,
    pub glyph: String,
}

/// A theme's eight-page template builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeTemplate {
    pub theme: Theme,
    pub title: Template,
    pub pages: Vec<PageTemplate>,
}

impl ThemeTemplate {
    /// Parse and validate a theme template from a RON string.
    pub fn parse_ron(theme: Theme, input: &str) -> Result<ThemeTemplate, CatalogError> {
        let tag = theme.tag();
        let raw: RonTheme =
            ron::from_str(input).map_err(|source| CatalogError::Ron { theme: tag, source })?;
        let parse = |text: &str| {
            Template::parse(text).map_err(|source| CatalogError::Template { theme: tag, source })
        };

        let title = parse(&raw.title)?;
        if title.is_blank() {
            return Err(CatalogError::BlankTitle(tag));
        }
        if raw.pages.len() != PAGES_PER_STORY {
            return Err(CatalogError::PageCount {
                theme: tag,
                found: raw.pages.len(),
            });
        }

        let mut pages = Vec::with_capacity(PAGES_PER_STORY);
        for (index, page) in raw.pages.into_iter().enumerate() {
            let page_id = index as u32 + 1;
            let blank = |problem| CatalogError::BlankPage {
                theme: tag,
                page: page_id,
                problem,
            };
            let text = parse(&page.text)?;
            if text.is_blank() {
                return Err(blank("blank text"));
            }
            let prompt = parse(&page.prompt)?;
            if prompt.is_blank() {
                return Err(blank("blank prompt"));
            }
            if page.glyph.trim().is_empty() {
                return Err(blank("blank glyph"));
            }
            pages.push(PageTemplate {
                text,
                prompt,
                glyph: page.glyph,
            });
        }

        Ok(ThemeTemplate {
            theme,
            title,
            pages,
        })
    }

    /// Load a theme template from a RON file.
    pub fn load_from_ron(theme: Theme, path: &Path) -> Result<ThemeTemplate, CatalogError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(theme, &contents)
    }

    /// Render the story skeleton for `profile`. Pure: the same profile
    /// always yields the same draft, and no page has an illustration yet.
    pub fn build(&self, profile: &ChildProfile) -> StoryDraft {
        let pages = self
            .pages
            .iter()
            .enumerate()
            .map(|(index, page)| StoryPage {
                id: index as u32 + 1,
                text: page.text.render(profile),
                illustration_prompt: format!("{}{}", page.prompt.render(profile), ART_STYLE_SUFFIX),
                illustration_url: None,
                glyph: page.glyph.clone(),
            })
            .collect();

        StoryDraft {
            child_name: profile.name.trim().to_string(),
            theme: self.theme,
            title: self.title.render(profile),
            pages,
        }
    }
}

/// Registry of validated templates, one per theme.
#[derive(Debug, Clone)]
pub struct ThemeCatalog {
    templates: FxHashMap<Theme, ThemeTemplate>,
}

impl ThemeCatalog {
    /// Parse and validate the embedded template of every theme.
    pub fn builtin() -> Result<ThemeCatalog, CatalogError> {
        let mut templates = FxHashMap::default();
        for theme in Theme::iter() {
            let template = ThemeTemplate::parse_ron(theme, theme.template_source())?;
            templates.insert(theme, template);
        }
        tracing::debug!(themes = templates.len(), "theme catalog loaded");
        Ok(ThemeCatalog { templates })
    }

    /// Replace one theme's template, e.g. with an edited file under test.
    pub fn with_template(mut self, template: ThemeTemplate) -> ThemeCatalog {
        self.templates.insert(template.theme, template);
        self
    }

    pub fn template(&self, theme: Theme) -> Result<&ThemeTemplate, CatalogError> {
        self.templates
            .get(&theme)
            .ok_or(CatalogError::MissingTheme(theme.tag()))
    }

    /// Metadata for every theme, in declaration order.
    pub fn themes(&self) -> Vec<(Theme, ThemeMeta)> {
        Theme::iter().map(|theme| (theme, theme.meta())).collect()
    }
}
