use serde::{Deserialize, Serialize};

/// Number of templates filed under a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStat {
    pub name: String,
    #[serde(default)]
    pub count: i64,
}

/// Number of templates carrying a tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagStat {
    pub name: String,
    #[serde(default)]
    pub count: i64,
}
