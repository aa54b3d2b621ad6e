//! Slot templates: parsing and rendering of profile-driven story text.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::profile::ChildProfile;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template parse error: {0}")]
    Parse(String),
    #[error("unknown profile field '{0}'")]
    UnknownField(String),
}

/// A profile value a template slot can pull in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProfileField {
    /// Child's name with the first letter capitalised.
    Name,
    /// Child's name exactly as entered.
    RawName,
    Age,
    FavoritePlace,
    BestFriend,
    Fears,
    /// All interests joined with ", ".
    Interests,
    /// All interests joined with " and ".
    InterestsAnd,
    FirstInterest,
    /// First interest with the first letter capitalised.
    FirstInterestTitle,
}

impl ProfileField {
    pub fn from_key(key: &str) -> Option<Self> {
        let field = match key {
            "name" => Self::Name,
            "raw_name" => Self::RawName,
            "age" => Self::Age,
            "favorite_place" => Self::FavoritePlace,
            "best_friend" => Self::BestFriend,
            "fears" => Self::Fears,
            "interests" => Self::Interests,
            "interests_and" => Self::InterestsAnd,
            "first_interest" => Self::FirstInterest,
            "first_interest_title" => Self::FirstInterestTitle,
            _ => return None,
        };
        Some(field)
    }

    /// Phrase used when the profile leaves this field empty and the
    /// slot does not name its own fallback.
    pub fn default_fallback(&self) -> &'static str {
        match self {
            Self::Name | Self::RawName => "our hero",
            Self::Age => "young",
            Self::FavoritePlace => "home",
            Self::BestFriend => "their best friend",
            Self::Fears => "something scary",
            Self::Interests | Self::InterestsAnd => "all their favourite things",
            Self::FirstInterest | Self::FirstInterestTitle => "something they love",
        }
    }

    /// The profile's value for this field, or `None` when it is blank.
    pub fn resolve(&self, profile: &ChildProfile) -> Option<String> {
        let value = match self {
            Self::Name => capitalize(profile.name.trim()),
            Self::RawName => profile.name.trim().to_string(),
            Self::Age => profile.age.to_string(),
            Self::FavoritePlace => profile.favorite_place.trim().to_string(),
            Self::BestFriend => profile.best_friend.trim().to_string(),
            Self::Fears => profile.fears.trim().to_string(),
            Self::Interests => profile.interests.join(", "),
            Self::InterestsAnd => profile.interests.join(" and "),
            Self::FirstInterest => profile.interests.first().cloned().unwrap_or_default(),
            Self::FirstInterestTitle => profile
                .interests
                .first()
                .map(|i| capitalize(i))
                .unwrap_or_default(),
        };
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    }
}

/// Upper-case the first character, leave the rest untouched.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// A segment of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemplateSegment {
    /// Literal text, emitted as-is.
    Literal(String),
    /// Profile interpolation: `{field}` or `{field|fallback}`.
    Slot {
        field: ProfileField,
        fallback: Option<String>,
    },
}

/// A parsed template: a sequence of segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub segments: Vec<TemplateSegment>,
}

impl Template {
    /// Parse a template string into a sequence of segments.
    ///
    /// Syntax:
    /// - `{field}` → `Slot` using the field's default fallback
    /// - `{field|fallback text}` → `Slot` with its own fallback
    /// - `{{` / `}}` → literal `{` / `}`
    /// - Everything else → `Literal`
    pub fn parse(input: &str) -> Result<Template, TemplateError> {
        let mut segments = Vec::new();
        let mut literal_buf = String::new();
        let chars: Vec<char> = input.chars().collect();
        let len = chars.len();
        let mut i = 0;

        while i < len {
            if chars[i] == '{' {
                // Escaped brace
                if i + 1 < len && chars[i + 1] == '{' {
                    literal_buf.push('{');
                    i += 2;
                    continue;
                }

                if !literal_buf.is_empty() {
                    segments.push(TemplateSegment::Literal(std::mem::take(&mut literal_buf)));
                }

                let start = i + 1;
                let mut end = start;
                while end < len && chars[end] != '}' {
                    if chars[end] == '{' {
                        return Err(TemplateError::Parse(
                            "nested braces are not allowed".to_string(),
                        ));
                    }
                    end += 1;
                }
                if end == len {
                    return Err(TemplateError::Parse("unclosed brace".to_string()));
                }

                let content: String = chars[start..end].iter().collect();
                if content.trim().is_empty() {
                    return Err(TemplateError::Parse("empty braces".to_string()));
                }

                segments.push(Self::parse_slot(&content)?);
                i = end + 1;
            } else if chars[i] == '}' {
                if i + 1 < len && chars[i + 1] == '}' {
                    literal_buf.push('}');
                    i += 2;
                    continue;
                }
                return Err(TemplateError::Parse(
                    "unmatched closing brace".to_string(),
                ));
            } else {
                literal_buf.push(chars[i]);
                i += 1;
            }
        }

        if !literal_buf.is_empty() {
            segments.push(TemplateSegment::Literal(literal_buf));
        }

        Ok(Template { segments })
    }

    fn parse_slot(content: &str) -> Result<TemplateSegment, TemplateError> {
        let (key, fallback) = match content.split_once('|') {
            Some((key, fallback)) => {
                if fallback.trim().is_empty() {
                    return Err(TemplateError::Parse(format!(
                        "empty fallback in '{{{}}}'",
                        content
                    )));
                }
                (key.trim(), Some(fallback.to_string()))
            }
            None => (content.trim(), None),
        };
        let field = ProfileField::from_key(key)
            .ok_or_else(|| TemplateError::UnknownField(key.to_string()))?;
        Ok(TemplateSegment::Slot { field, fallback })
    }

    /// Fields referenced by this template, in order of appearance.
    pub fn fields(&self) -> impl Iterator<Item = ProfileField> + '_ {
        self.segments.iter().filter_map(|s| match s {
            TemplateSegment::Slot { field, .. } => Some(*field),
            TemplateSegment::Literal(_) => None,
        })
    }

    /// Substitute profile values. Blank values take the slot's fallback,
    /// so no slot ever renders as an empty string.
    pub fn render(&self, profile: &ChildProfile) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                TemplateSegment::Literal(text) => out.push_str(text),
                TemplateSegment::Slot { field, fallback } => match field.resolve(profile) {
                    Some(value) => out.push_str(&value),
                    None => out.push_str(
                        fallback
                            .as_deref()
                            .unwrap_or_else(|| field.default_fallback()),
                    ),
                },
            }
        }
        out
    }

    pub fn is_blank(&self) -> bool {
        self.segments.iter().all(|s| match s {
            TemplateSegment::Literal(text) => text.trim().is_empty(),
            TemplateSegment::Slot { .. } => false,
        })
    }
}
