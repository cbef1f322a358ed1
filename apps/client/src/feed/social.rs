use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::buckets::SharedBuckets;
use super::lock;
use crate::api::{FeedBackend, SocialToggle};
use crate::errors::ClientError;
use crate::models::{SocialKind, SocialState, TemplateItem};
use crate::session::SessionStore;

/// Applies like/favorite toggles to the shared buckets before the server
/// confirms them, and undoes them if the server refuses.
#[derive(Clone)]
pub struct OptimisticActionCoordinator {
    backend: Arc<dyn FeedBackend>,
    session: SessionStore,
    buckets: SharedBuckets,
}

/// A toggle whose network call is still running.
#[derive(Debug)]
pub struct PendingToggle {
    template_id: String,
    kind: SocialKind,
    optimistic: SocialState,
    handle: JoinHandle<Result<SocialState, ClientError>>,
}

impl PendingToggle {
    pub fn template_id(&self) -> &str {
        &self.template_id
    }

    pub fn kind(&self) -> SocialKind {
        self.kind
    }

    /// The state shown to the user right after the call.
    pub fn optimistic(&self) -> SocialState {
        self.optimistic
    }

    /// Wait for the server. `Ok` carries the confirmed state; on `Err` the
    /// optimistic change has already been reverted, unless the feed was
    /// reset in between and the row it changed no longer exists.
    pub async fn settle(self) -> Result<SocialState, ClientError> {
        self.handle
            .await
            .map_err(|e| ClientError::Task(e.to_string()))?
    }
}

impl OptimisticActionCoordinator {
    pub fn new(backend: Arc<dyn FeedBackend>, session: SessionStore, buckets: SharedBuckets) -> Self {
        Self {
            backend,
            session,
            buckets,
        }
    }

    /// Flip `kind` on `template_id` immediately and confirm in the background.
    ///
    /// The optimistic change is visible in the buckets before this returns.
    /// If the request fails, the flag is flipped back and the counter moves
    /// by the inverse delta, so overlapping toggles on the same item still
    /// net out. Once the buckets have been restarted the row this toggle
    /// changed is gone, and neither the revert nor the reconcile touch its
    /// replacement.
    pub fn toggle(&self, template_id: &str, kind: SocialKind) -> Result<PendingToggle, ClientError> {
        if !self.session.is_authenticated() {
            return Err(ClientError::Unauthenticated);
        }
        let runtime = Handle::try_current().map_err(|e| ClientError::Task(e.to_string()))?;

        let (epoch, before, optimistic) = {
            let mut buckets = lock(&self.buckets);
            let epoch = buckets.epoch();
            let item = buckets
                .find_mut(template_id)
                .ok_or_else(|| ClientError::NotFound(template_id.to_string()))?;
            let before = item.social(kind);
            let after = before.toggled();
            item.set_social(kind, after);
            (epoch, before, after)
        };
        debug!("{:?} on {} applied optimistically: {:?}", kind, template_id, optimistic);

        let backend = self.backend.clone();
        let buckets = self.buckets.clone();
        let id = template_id.to_string();
        let delta = optimistic.count - before.count;
        let handle = runtime.spawn(async move {
            match backend.toggle_social(&id, kind).await {
                Ok(confirmed) => Ok(reconcile(&buckets, epoch, &id, kind, confirmed, optimistic)),
                Err(e) => {
                    warn!("{:?} on {} failed, reverting: {}", kind, id, e);
                    revert(&buckets, epoch, &id, kind, delta);
                    Err(e)
                }
            }
        });

        Ok(PendingToggle {
            template_id: template_id.to_string(),
            kind,
            optimistic,
            handle,
        })
    }

    /// Delete a template and drop it from the buckets once the server agrees.
    pub async fn delete_template(&self, template_id: &str) -> Result<(), ClientError> {
        if !self.session.is_authenticated() {
            return Err(ClientError::Unauthenticated);
        }
        self.backend.delete_template(template_id).await?;
        let removed = lock(&self.buckets).evict(template_id);
        info!("Deleted template {} ({} feed rows removed)", template_id, removed);
        Ok(())
    }

    /// Copy someone else's template into the caller's private list.
    pub async fn fork(&self, template_id: &str) -> Result<TemplateItem, ClientError> {
        if !self.session.is_authenticated() {
            return Err(ClientError::Unauthenticated);
        }
        let forked = self.backend.fork_template(template_id).await?;
        info!("Forked template {} into {}", template_id, forked.id);
        Ok(forked)
    }
}

/// Adopt whatever the server reported; missing fields keep the local value.
fn reconcile(
    buckets: &SharedBuckets,
    epoch: u64,
    id: &str,
    kind: SocialKind,
    confirmed: SocialToggle,
    optimistic: SocialState,
) -> SocialState {
    let server = SocialState {
        active: confirmed.active.unwrap_or(optimistic.active),
        count: confirmed.count.unwrap_or(optimistic.count),
    };
    let mut buckets = lock(buckets);
    if buckets.epoch() != epoch {
        debug!("{:?} on {} confirmed after the feed was reset", kind, id);
        return server;
    }
    let Some(item) = buckets.find_mut(id) else {
        // evicted while the request was out
        return server;
    };
    let current = item.social(kind);
    let settled = SocialState {
        active: confirmed.active.unwrap_or(current.active),
        count: confirmed.count.unwrap_or(current.count),
    };
    if settled != current {
        debug!("{:?} on {} reconciled to server state {:?}", kind, id, settled);
        item.set_social(kind, settled);
    }
    settled
}

fn revert(buckets: &SharedBuckets, epoch: u64, id: &str, kind: SocialKind, delta: i64) {
    let mut buckets = lock(buckets);
    if buckets.epoch() != epoch {
        debug!("{:?} on {} failed after the feed was reset; nothing to revert", kind, id);
        return;
    }
    if let Some(item) = buckets.find_mut(id) {
        let current = item.social(kind);
        item.set_social(
            kind,
            SocialState {
                active: !current.active,
                count: current.count - delta,
            },
        );
    }
}
