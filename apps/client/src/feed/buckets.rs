use std::sync::{Arc, Mutex};

use crate::models::{TemplateItem, Visibility};

/// Which of the two result lists an item lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Public,
    Private,
}

impl From<Visibility> for Bucket {
    fn from(v: Visibility) -> Self {
        match v {
            Visibility::Public => Bucket::Public,
            Visibility::Private => Bucket::Private,
        }
    }
}

/// The rendered feed: public and private templates, each in fetch order.
///
/// `epoch` counts filter sessions. Rows from an earlier epoch are gone even
/// when a row with the same id came back, so pending work captured against
/// an old epoch must not touch the current rows.
#[derive(Debug, Clone, Default)]
pub struct FeedBuckets {
    pub public_items: Vec<TemplateItem>,
    pub private_items: Vec<TemplateItem>,
    epoch: u64,
}

/// Equal when both buckets hold the same rows, whatever the epoch.
impl PartialEq for FeedBuckets {
    fn eq(&self, other: &Self) -> bool {
        self.public_items == other.public_items && self.private_items == other.private_items
    }
}

/// Buckets shared between the fetcher (writer) and the coordinator/renderer.
pub type SharedBuckets = Arc<Mutex<FeedBuckets>>;

impl FeedBuckets {
    pub fn bucket(&self, bucket: Bucket) -> &[TemplateItem] {
        match bucket {
            Bucket::Public => &self.public_items,
            Bucket::Private => &self.private_items,
        }
    }

    pub fn extend(&mut self, bucket: Bucket, items: impl IntoIterator<Item = TemplateItem>) {
        match bucket {
            Bucket::Public => self.public_items.extend(items),
            Bucket::Private => self.private_items.extend(items),
        }
    }

    pub fn clear(&mut self) {
        self.public_items.clear();
        self.private_items.clear();
    }

    /// Drop every row and start a new epoch.
    pub fn restart(&mut self) -> u64 {
        self.clear();
        self.epoch += 1;
        self.epoch
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn len(&self) -> usize {
        self.public_items.len() + self.private_items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn find(&self, id: &str) -> Option<&TemplateItem> {
        self.public_items
            .iter()
            .chain(self.private_items.iter())
            .find(|t| t.id == id)
    }

    /// Bucket-agnostic lookup for in-place mutation.
    pub fn find_mut(&mut self, id: &str) -> Option<&mut TemplateItem> {
        self.public_items
            .iter_mut()
            .chain(self.private_items.iter_mut())
            .find(|t| t.id == id)
    }

    /// Remove `id` from both buckets, returning how many rows went away.
    pub fn evict(&mut self, id: &str) -> usize {
        let before = self.len();
        self.public_items.retain(|t| t.id != id);
        self.private_items.retain(|t| t.id != id);
        before - self.len()
    }
}
