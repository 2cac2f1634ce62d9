// Editor tab session persistence.
// Open tabs survive reloads for the length of a typical work session.

use std::convert::Infallible;

use tracing::{debug, info};

use crate::cache::{ExpiringStore, editor_tabs_key, ttl};

use super::types::Tab;

pub struct TabSession {
    store: ExpiringStore,
}

impl TabSession {
    pub fn new(store: ExpiringStore) -> Self {
        Self { store }
    }

    /// Restore the saved tabs, seeding the cache with `initial` when nothing is saved.
    pub async fn load(&self, initial: Vec<Tab>) -> Vec<Tab> {
        let result: Result<Vec<Tab>, Infallible> = self
            .store
            .get_or_compute(
                &editor_tabs_key(),
                || async move { Ok(initial) },
                ttl::VERY_LONG,
                false,
            )
            .await;

        match result {
            Ok(tabs) => {
                debug!(tabs = tabs.len(), "Loaded editor tabs");
                tabs
            }
            Err(never) => match never {},
        }
    }

    /// Persist the current tab list. An empty list is not written.
    pub async fn save(&self, tabs: &[Tab]) {
        if tabs.is_empty() {
            return;
        }
        self.store.set(&editor_tabs_key(), tabs, ttl::VERY_LONG).await;
    }

    /// Drop all cached state at a session boundary such as logout.
    pub async fn end(&self) {
        info!("Ending editor session, clearing cache");
        self.store.clear().await;
    }
}
