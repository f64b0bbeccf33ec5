//! Client SDK for the manufacturing operations dashboard
//!
//! This crate drives the receiving log, the change-request (C.A.) board and
//! the requisition flows against the dashboard backend: a typed REST client,
//! a query cache with single-flight fetches and table-driven invalidation,
//! and one state machine per page surface.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod notify;
pub mod session;
pub mod urgency;
pub mod workflow;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::cache::QueryCache;
use crate::client::ApiClient;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::notify::{Notice, Notifier};
use crate::session::{FileTokenStore, Session};
use crate::workflow::{KanbanWorkflow, ReceivingWorkflow};

/// One page of a paginated listing, as the backend returns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListPage<T> {
    pub items: Vec<T>,
    pub total: i64,
}

impl<T> ListPage<T> {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// Root handle wiring the client, the shared cache and the notice channel.
///
/// Workflows minted from one dashboard share the cache, so a mutation issued
/// by any of them stales out every affected read, whichever page triggered
/// it.
#[derive(Clone)]
pub struct Dashboard {
    client: ApiClient,
    cache: Arc<QueryCache>,
    notifier: Notifier,
}

impl Dashboard {
    /// Builds a dashboard over an explicit session. The returned receiver
    /// carries the notices workflows emit; drain it from the embedding UI.
    pub fn new(
        config: &ClientConfig,
        session: Session,
    ) -> Result<(Self, mpsc::Receiver<Notice>), ClientError> {
        let client = ApiClient::new(config, session)?;
        let cache = Arc::new(QueryCache::from_settings(&config.cache));
        let (notifier, notices) = Notifier::channel(config.notice_channel_capacity);
        Ok((
            Self {
                client,
                cache,
                notifier,
            },
            notices,
        ))
    }

    /// Builds a dashboard with the session the config implies: a file-backed
    /// token under `token_dir` when set, in-memory otherwise. A persisted
    /// token is restored before the first request.
    pub async fn from_config(
        config: &ClientConfig,
    ) -> Result<(Self, mpsc::Receiver<Notice>), ClientError> {
        let session = match &config.token_dir {
            Some(dir) => Session::new(Arc::new(FileTokenStore::new(dir))),
            None => Session::in_memory(),
        };
        session.restore().await?;
        Self::new(config, session)
    }

    /// A fresh receiving-page workflow sharing this dashboard's cache.
    pub fn receiving(&self) -> ReceivingWorkflow {
        ReceivingWorkflow::new(
            self.client.clone(),
            Arc::clone(&self.cache),
            self.notifier.clone(),
        )
    }

    /// A fresh change-request board workflow sharing this dashboard's cache.
    pub fn kanban(&self) -> KanbanWorkflow {
        KanbanWorkflow::new(
            self.client.clone(),
            Arc::clone(&self.cache),
            self.notifier.clone(),
        )
    }

    /// The underlying API client, for calls outside any page workflow.
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn session(&self) -> &Session {
        self.client.session()
    }
}

pub mod prelude {
    //! Common imports for embedders.
    pub use crate::cache::{MutationKind, QueryCache, QueryKey};
    pub use crate::client::ApiClient;
    pub use crate::config::{load_config, ClientConfig};
    pub use crate::error::ClientError;
    pub use crate::models::*;
    pub use crate::notify::{Notice, NoticeLevel};
    pub use crate::session::Session;
    pub use crate::urgency::{derive_urgent, UrgentMatches};
    pub use crate::workflow::{
        BoardColumns, KanbanWorkflow, ReceivingState, ReceivingWorkflow, ReturnDetails,
        ReturnOutcome, WorkflowError,
    };
    pub use crate::{Dashboard, ListPage};
}
