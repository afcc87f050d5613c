//! Write-behind remote sync.
//!
//! After a deposit the session pushes a containment record and the
//! player's running totals upstream. Failures degrade to warnings;
//! nothing here can block or roll back gameplay.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::ids::OwnerKey;
use crate::progress::PlayerProgress;

/// One completed deposit, as shipped upstream.
#[derive(Debug, Clone, Serialize)]
pub struct DepositRecord {
    pub owner: String,
    pub checkpoint: String,
    pub ghost_count: u32,
    pub total_points: u32,
    pub bonus_points: u32,
    pub kind_counts: BTreeMap<String, u32>,
    pub deposited_at: DateTime<Utc>,
}

pub trait SyncBackend: Send + Sync {
    fn push_deposit<'a>(
        &'a self,
        record: &'a DepositRecord,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    fn push_totals<'a>(
        &'a self,
        owner: &'a OwnerKey,
        progress: &'a PlayerProgress,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Backend for deployments with sync disabled.
#[derive(Debug, Default)]
pub struct NullSync;

impl SyncBackend for NullSync {
    fn push_deposit<'a>(
        &'a self,
        _record: &'a DepositRecord,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async { Ok(()) })
    }

    fn push_totals<'a>(
        &'a self,
        _owner: &'a OwnerKey,
        _progress: &'a PlayerProgress,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async { Ok(()) })
    }
}

/// JSON-over-HTTP backend: deposits append to `/containments`,
/// totals land at `/players/{owner}`.
#[derive(Debug, Clone)]
pub struct HttpSync {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSync {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl SyncBackend for HttpSync {
    fn push_deposit<'a>(
        &'a self,
        record: &'a DepositRecord,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let url = format!("{}/containments", self.base_url);
            self.client
                .post(&url)
                .json(record)
                .send()
                .await?
                .error_for_status()?;
            tracing::debug!(url, "deposit record synced");
            Ok(())
        })
    }

    fn push_totals<'a>(
        &'a self,
        owner: &'a OwnerKey,
        progress: &'a PlayerProgress,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let url = format!("{}/players/{}", self.base_url, owner);
            self.client
                .post(&url)
                .json(progress)
                .send()
                .await?
                .error_for_status()?;
            tracing::debug!(url, "player totals synced");
            Ok(())
        })
    }
}
