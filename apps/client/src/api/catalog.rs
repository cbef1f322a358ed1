use reqwest::Method;
use serde::Deserialize;

use super::HttpApi;
use crate::errors::ClientError;
use crate::models::{CategoryStat, TagStat};

/// How many categories the sidebar lists before "More...".
pub const DEFAULT_VISIBLE_CATEGORIES: usize = 10;

#[derive(Debug, Deserialize)]
struct CategoriesBody {
    #[serde(default)]
    categories: Option<Vec<CategoryStat>>,
}

#[derive(Debug, Deserialize)]
struct TagsBody {
    #[serde(default)]
    tags: Option<Vec<TagStat>>,
}

/// Category and tag counts backing the feed sidebar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SidebarData {
    pub categories: Vec<CategoryStat>,
    pub tags: Vec<TagStat>,
}

impl SidebarData {
    pub fn visible_categories(&self, show_all: bool) -> &[CategoryStat] {
        if show_all {
            &self.categories
        } else {
            &self.categories[..self.categories.len().min(DEFAULT_VISIBLE_CATEGORIES)]
        }
    }

    pub fn has_more_categories(&self) -> bool {
        self.categories.len() > DEFAULT_VISIBLE_CATEGORIES
    }
}

impl HttpApi {
    pub async fn categories(&self) -> Result<Vec<CategoryStat>, ClientError> {
        let body: CategoriesBody = self.send_json(self.request(Method::GET, "/categories")).await?;
        Ok(body.categories.unwrap_or_default())
    }

    pub async fn tags(&self) -> Result<Vec<TagStat>, ClientError> {
        let body: TagsBody = self.send_json(self.request(Method::GET, "/tags")).await?;
        Ok(body.tags.unwrap_or_default())
    }

    /// Both lists, requested concurrently.
    pub async fn sidebar(&self) -> Result<SidebarData, ClientError> {
        let (categories, tags) = tokio::try_join!(self.categories(), self.tags())?;
        Ok(SidebarData { categories, tags })
    }
}

#[cfg(test)]
mod tests {
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    use super::*;
    use crate::api::http::tests::{api, serve};
    use crate::session::{Session, SessionStore};

    fn stat(name: &str) -> CategoryStat {
        CategoryStat {
            name: name.to_string(),
            count: 1,
        }
    }

    #[test]
    fn test_visible_categories_truncates_to_ten() {
        let data = SidebarData {
            categories: (0..12).map(|i| stat(&format!("c{i}"))).collect(),
            tags: vec![],
        };
        assert_eq!(data.visible_categories(false).len(), 10);
        assert_eq!(data.visible_categories(true).len(), 12);
        assert!(data.has_more_categories());
    }

    #[tokio::test]
    async fn test_sidebar_fetches_both_lists_anonymously() {
        let router = Router::new()
            .route(
                "/api/v1/categories",
                get(|| async { Json(json!({"categories": [{"name": "Coding", "count": 4}]})) }),
            )
            .route("/api/v1/tags", get(|| async { Json(json!({"tags": null})) }));
        let api = api(serve(router).await, SessionStore::in_memory(Session::anonymous()));

        let data = api.sidebar().await.unwrap();
        assert_eq!(data.categories, vec![CategoryStat { name: "Coding".into(), count: 4 }]);
        assert!(data.tags.is_empty());
    }
}
