//! Story assembly: profile in, freshly identified story out.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::core::catalog::{CatalogError, ThemeCatalog};
use crate::schema::profile::ChildProfile;
use crate::schema::story::{Story, StoryStatus};

/// Turns a finished child profile into a story awaiting illustrations.
#[derive(Debug, Clone)]
pub struct StoryAssembler {
    catalog: ThemeCatalog,
}

impl StoryAssembler {
    pub fn new(catalog: ThemeCatalog) -> Self {
        Self { catalog }
    }

    /// An assembler over the embedded theme templates.
    pub fn builtin() -> Result<Self, CatalogError> {
        Ok(Self::new(ThemeCatalog::builtin()?))
    }

    pub fn catalog(&self) -> &ThemeCatalog {
        &self.catalog
    }

    /// Build the story for `profile`, stamped with the current time.
    ///
    /// The only failure is a theme missing from the catalog, which
    /// [`ThemeCatalog::builtin`] already rules out.
    pub fn assemble(&self, profile: &ChildProfile) -> Result<Story, CatalogError> {
        self.assemble_at(profile, Utc::now())
    }

    pub fn assemble_at(
        &self,
        profile: &ChildProfile,
        created_at: DateTime<Utc>,
    ) -> Result<Story, CatalogError> {
        let draft = self.catalog.template(profile.theme)?.build(profile);
        let story = Story {
            id: format!("story-{}", Uuid::new_v4().simple()),
            child_name: draft.child_name,
            theme: draft.theme,
            title: draft.title,
            pages: draft.pages,
            created_at,
            status: StoryStatus::Generating,
        };
        tracing::info!(story_id = %story.id, theme = story.theme.tag(), "story assembled");
        Ok(story)
    }
}
