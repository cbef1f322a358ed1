use std::collections::BTreeSet;

use tokio::sync::watch;
use tracing::debug;

use crate::models::Visibility;

/// Visibility part of the feed query. `Unset` asks for the mixed view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisibilityFilter {
    #[default]
    Public,
    Private,
    Unset,
}

impl VisibilityFilter {
    pub fn as_query(&self) -> Option<&'static str> {
        match self {
            VisibilityFilter::Public => Some(Visibility::Public.as_str()),
            VisibilityFilter::Private => Some(Visibility::Private.as_str()),
            VisibilityFilter::Unset => None,
        }
    }
}

impl From<Visibility> for VisibilityFilter {
    fn from(v: Visibility) -> Self {
        match v {
            Visibility::Public => VisibilityFilter::Public,
            Visibility::Private => VisibilityFilter::Private,
        }
    }
}

/// The query the feed is currently showing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub visibility: VisibilityFilter,
    pub category: Option<String>,
    pub tags: BTreeSet<String>,
    pub my_likes: bool,
    pub my_favorites: bool,
}

impl Filter {
    pub fn is_special_view(&self) -> bool {
        self.my_likes || self.my_favorites
    }

    /// The mixed view needs a session; anonymous callers fall back to public.
    pub fn resolved(&self, authenticated: bool) -> Filter {
        let mut filter = self.clone();
        if !authenticated && filter.visibility == VisibilityFilter::Unset && !filter.is_special_view() {
            filter.visibility = VisibilityFilter::Public;
        }
        filter
    }

    /// Query-string pairs for `GET /templates`, paging parameters excluded.
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(v) = self.visibility.as_query() {
            query.push(("visibility", v.to_string()));
        }
        if let Some(category) = &self.category {
            query.push(("category", category.clone()));
        }
        for tag in &self.tags {
            query.push(("tags", tag.clone()));
        }
        if self.my_likes {
            query.push(("my_likes", "true".to_string()));
        }
        if self.my_favorites {
            query.push(("my_favorites", "true".to_string()));
        }
        query
    }
}

/// A partial filter write. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterUpdate {
    pub visibility: Option<VisibilityFilter>,
    pub category: Option<Option<String>>,
    pub tags: Option<BTreeSet<String>>,
    pub my_likes: Option<bool>,
    pub my_favorites: Option<bool>,
}

impl FilterUpdate {
    /// A sidebar category entry; `None` is the "All Public"/"All Private" row.
    pub fn category(name: Option<&str>, visibility: VisibilityFilter) -> Self {
        Self {
            visibility: Some(visibility),
            category: Some(name.map(str::to_string)),
            ..Default::default()
        }
    }

    /// Select a single tag, replacing any previous one.
    pub fn tag(name: &str) -> Self {
        Self {
            tags: Some(BTreeSet::from([name.to_string()])),
            ..Default::default()
        }
    }

    pub fn visibility(visibility: VisibilityFilter) -> Self {
        Self {
            visibility: Some(visibility),
            ..Default::default()
        }
    }

    pub fn my_likes() -> Self {
        Self {
            my_likes: Some(true),
            ..Default::default()
        }
    }

    pub fn my_favorites() -> Self {
        Self {
            my_favorites: Some(true),
            ..Default::default()
        }
    }

    fn touches_query(&self) -> bool {
        self.visibility.is_some() || self.category.is_some() || self.tags.is_some()
    }
}

/// Filter plus the version it was published under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSnapshot {
    pub version: u64,
    pub filter: Filter,
}

/// Single source of truth for the active feed query.
pub struct FilterState {
    current: Filter,
    version: u64,
    tx: watch::Sender<FilterSnapshot>,
}

impl FilterState {
    pub fn new(initial: Filter) -> Self {
        let (tx, _rx) = watch::channel(FilterSnapshot {
            version: 0,
            filter: initial.clone(),
        });
        Self {
            current: initial,
            version: 0,
            tx,
        }
    }

    pub fn get(&self) -> &Filter {
        &self.current
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn subscribe(&self) -> watch::Receiver<FilterSnapshot> {
        self.tx.subscribe()
    }

    /// Merge `update` into the current filter.
    ///
    /// Query fields and special views are exclusive: writing visibility,
    /// category or tags drops my-likes/my-favorites, and turning a special view
    /// on empties the query. A category and a tag are also exclusive; when one
    /// update names both, the tag wins. Returns whether anything changed; only
    /// changes are published.
    pub fn set(&mut self, update: FilterUpdate) -> bool {
        let mut next = self.current.clone();

        if update.touches_query() {
            next.my_likes = false;
            next.my_favorites = false;
        }
        if let Some(visibility) = update.visibility {
            next.visibility = visibility;
        }
        if let Some(category) = update.category {
            if category.is_some() {
                next.tags.clear();
            }
            next.category = category;
        }
        if let Some(tags) = update.tags {
            if !tags.is_empty() {
                next.category = None;
            }
            next.tags = tags;
        }

        if let Some(on) = update.my_likes {
            next.my_likes = on;
            if on {
                next.my_favorites = false;
                clear_query(&mut next);
            }
        }
        if let Some(on) = update.my_favorites {
            next.my_favorites = on;
            if on {
                next.my_likes = false;
                clear_query(&mut next);
            }
        }

        if next == self.current {
            return false;
        }

        self.current = next;
        self.version += 1;
        debug!(version = self.version, filter = ?self.current, "feed filter changed");
        self.tx.send_replace(FilterSnapshot {
            version: self.version,
            filter: self.current.clone(),
        });
        true
    }
}

impl Default for FilterState {
    fn default() -> Self {
        Self::new(Filter::default())
    }
}

fn clear_query(filter: &mut Filter) {
    filter.visibility = VisibilityFilter::Unset;
    filter.category = None;
    filter.tags.clear();
}
