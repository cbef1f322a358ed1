use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Visibility {
    #[default]
    #[serde(rename = "VISIBILITY_PUBLIC", alias = "public")]
    Public,
    #[serde(rename = "VISIBILITY_PRIVATE", alias = "private")]
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "VISIBILITY_PUBLIC",
            Visibility::Private => "VISIBILITY_PRIVATE",
        }
    }
}

/// Which social flag a toggle targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocialKind {
    Like,
    Favorite,
}

impl SocialKind {
    /// Path segment of the toggle endpoint (`/templates/{id}/{segment}`).
    pub fn path_segment(&self) -> &'static str {
        match self {
            SocialKind::Like => "like",
            SocialKind::Favorite => "favorite",
        }
    }
}

/// A boolean social flag and the counter that goes with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SocialState {
    pub active: bool,
    pub count: i64,
}

impl SocialState {
    pub fn new(active: bool, count: i64) -> Self {
        Self { active, count }
    }

    /// Flip the flag and move the counter by exactly one in the matching direction.
    pub fn toggled(self) -> Self {
        let active = !self.active;
        let count = if active { self.count + 1 } else { self.count - 1 };
        Self { active, count }
    }
}

/// One template row as listed by the feed endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateItem {
    pub id: String,
    #[serde(default)]
    pub owner_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default, rename = "type")]
    pub template_type: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, alias = "likes_count")]
    pub like_count: i64,
    #[serde(default, alias = "favorites_count")]
    pub favorite_count: i64,
    #[serde(default)]
    pub is_liked: bool,
    #[serde(default)]
    pub is_favorited: bool,
    #[serde(default)]
    pub latest_version: Option<TemplateVersion>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl TemplateItem {
    pub fn social(&self, kind: SocialKind) -> SocialState {
        match kind {
            SocialKind::Like => SocialState::new(self.is_liked, self.like_count),
            SocialKind::Favorite => SocialState::new(self.is_favorited, self.favorite_count),
        }
    }

    pub fn set_social(&mut self, kind: SocialKind, state: SocialState) {
        match kind {
            SocialKind::Like => {
                self.is_liked = state.active;
                self.like_count = state.count;
            }
            SocialKind::Favorite => {
                self.is_favorited = state.active;
                self.favorite_count = state.count;
            }
        }
    }
}

/// One immutable revision of a template's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateVersion {
    pub id: i64,
    #[serde(default)]
    pub template_id: String,
    pub version: i32,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateTemplateRequest {
    pub title: String,
    pub description: String,
    pub content: String,
    pub visibility: Visibility,
    pub category: String,
    pub tags: Vec<String>,
    #[serde(rename = "type")]
    pub template_type: String,
    pub language: String,
}

/// Full replacement payload; a changed `content` creates a new version server-side.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateTemplateRequest {
    pub template_id: String,
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    pub visibility: Visibility,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub content: String,
}

impl UpdateTemplateRequest {
    /// Carry every field of `template` over, replacing only the content.
    pub fn from_template(template: &TemplateItem, content: impl Into<String>) -> Self {
        Self {
            template_id: template.id.clone(),
            owner_id: template.owner_id.clone(),
            title: template.title.clone(),
            description: template.description.clone(),
            visibility: template.visibility,
            category: template.category.clone(),
            tags: template.tags.clone(),
            content: content.into(),
        }
    }
}
