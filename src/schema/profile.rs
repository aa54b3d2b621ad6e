use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use strum::{EnumCount, EnumIter, EnumString, IntoStaticStr};
use thiserror::Error;

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 30;
pub const MIN_AGE: u8 = 3;
pub const MAX_AGE: u8 = 10;
pub const MAX_INTERESTS: usize = 6;
pub const MIN_PHOTOS: usize = 2;
pub const MAX_PHOTOS: usize = 3;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProfileError {
    #[error("name must be 2-30 characters, got {0}")]
    NameLength(usize),
    #[error("age must be between 3 and 10, got {0}")]
    AgeOutOfRange(u8),
    #[error("at most 6 interests allowed, got {0}")]
    TooManyInterests(usize),
    #[error("interest listed twice: {0}")]
    DuplicateInterest(String),
    #[error("interests must not be blank")]
    BlankInterest,
    #[error("2-3 reference photos required, got {0}")]
    PhotoCount(usize),
}

/// The narrative setting a story is told in.
///
/// Wire tags are kebab-case (`"magic-school"`), matching what the
/// browser front end sends.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    EnumIter,
    EnumCount,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Theme {
    #[default]
    Dinosaurs,
    Space,
    Fantasy,
    Ocean,
    Superheroes,
    Jungle,
    MagicSchool,
}

impl Theme {
    /// Returns the wire tag for this theme (e.g., "magic-school").
    pub fn tag(&self) -> &'static str {
        (*self).into()
    }
}

/// Reference to an uploaded photo of the child, as accepted by the
/// fine-tune service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhotoHandle(pub String);

impl PhotoHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Everything collected about the child during onboarding.
///
/// Built once when the wizard finishes and never edited afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildProfile {
    pub name: String,
    pub age: u8,
    pub theme: Theme,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub best_friend: String,
    #[serde(default)]
    pub fears: String,
    #[serde(default)]
    pub favorite_place: String,
    #[serde(default)]
    pub photos: Vec<PhotoHandle>,
}

impl ChildProfile {
    /// Check the field constraints the onboarding wizard enforces.
    pub fn validate(&self) -> Result<(), ProfileError> {
        let name_len = self.name.trim().chars().count();
        if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&name_len) {
            return Err(ProfileError::NameLength(name_len));
        }
        if !(MIN_AGE..=MAX_AGE).contains(&self.age) {
            return Err(ProfileError::AgeOutOfRange(self.age));
        }
        if self.interests.len() > MAX_INTERESTS {
            return Err(ProfileError::TooManyInterests(self.interests.len()));
        }
        let mut seen = FxHashSet::default();
        for interest in &self.interests {
            if interest.trim().is_empty() {
                return Err(ProfileError::BlankInterest);
            }
            if !seen.insert(interest.as_str()) {
                return Err(ProfileError::DuplicateInterest(interest.clone()));
            }
        }
        if !(MIN_PHOTOS..=MAX_PHOTOS).contains(&self.photos.len()) {
            return Err(ProfileError::PhotoCount(self.photos.len()));
        }
        Ok(())
    }

    /// Photo references in upload order.
    pub fn photo_urls(&self) -> Vec<String> {
        self.photos.iter().map(|p| p.0.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::{EnumCount, IntoEnumIterator};

    fn profile() -> ChildProfile {
        ChildProfile {
            name: "Mia".to_string(),
            age: 6,
            theme: Theme::Ocean,
            interests: vec!["drawing".to_string()],
            best_friend: "Zoe".to_string(),
            fears: String::new(),
            favorite_place: "the beach house".to_string(),
            photos: vec![
                PhotoHandle("upload://1".to_string()),
                PhotoHandle("upload://2".to_string()),
            ],
        }
    }

    #[test]
    fn valid_profile_passes() {
        assert_eq!(profile().validate(), Ok(()));
    }

    #[test]
    fn name_too_short() {
        let mut p = profile();
        p.name = " M ".to_string();
        assert_eq!(p.validate(), Err(ProfileError::NameLength(1)));
    }

    #[test]
    fn age_bounds() {
        let mut p = profile();
        p.age = 11;
        assert_eq!(p.validate(), Err(ProfileError::AgeOutOfRange(11)));
        p.age = 3;
        assert!(p.validate().is_ok());
    }

    #[test]
    fn duplicate_interest_rejected() {
        let mut p = profile();
        p.interests.push("drawing".to_string());
        assert_eq!(
            p.validate(),
            Err(ProfileError::DuplicateInterest("drawing".to_string()))
        );
    }

    #[test]
    fn photo_count_enforced() {
        let mut p = profile();
        p.photos.truncate(1);
        assert_eq!(p.validate(), Err(ProfileError::PhotoCount(1)));
    }

    #[test]
    fn theme_tags_round_trip_through_strum_and_serde() {
        assert_eq!(Theme::COUNT, 7);
        for theme in Theme::iter() {
            assert_eq!(Theme::from_str(theme.tag()).unwrap(), theme);
            let json = serde_json::to_string(&theme).unwrap();
            assert_eq!(json, format!("\"{}\"", theme.tag()));
        }
        assert_eq!(Theme::MagicSchool.tag(), "magic-school");
        assert_eq!(Theme::default(), Theme::Dinosaurs);
    }
}
