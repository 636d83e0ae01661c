//! Per-operation deadlines for any adapter.
//!
//! A pending operation that outlives the deadline fails with
//! [`AdapterError::Timeout`] instead of hanging. The inner operation is
//! dropped at that point; a write may or may not have been applied.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;
use uuid::Uuid;

use crate::{Adapter, AdapterError, FetchOptions, Query, Result, Storable, Table};

pub struct DeadlineAdapter<A> {
    inner: A,
    deadline: Duration,
}

impl<A: Adapter> DeadlineAdapter<A> {
    pub fn new(inner: A, deadline: Duration) -> Self {
        Self { inner, deadline }
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    async fn within<F, T>(&self, op: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        run_within(self.deadline, op, fut).await
    }
}

async fn run_within<F, T>(deadline: Duration, op: &'static str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!(op, ?deadline, "adapter operation timed out");
            Err(AdapterError::Timeout(deadline))
        }
    }
}

#[async_trait]
impl<A: Adapter> Adapter for DeadlineAdapter<A> {
    async fn connect(&self) -> Result<bool> {
        self.within("connect", self.inner.connect()).await
    }

    async fn disconnect(&self) -> Result<bool> {
        self.within("disconnect", self.inner.disconnect()).await
    }

    async fn insert<T: Table + ?Sized, S: Storable>(&self, table: &T, storable: &S) -> Result<bool> {
        self.within("insert", self.inner.insert(table, storable)).await
    }

    async fn find<T: Table + ?Sized, S: Storable>(
        &self,
        table: &T,
        uuid: Uuid,
    ) -> Result<Option<S>> {
        self.within("find", self.inner.find(table, uuid)).await
    }

    async fn fetch_with<T: Table + ?Sized, S: Storable>(
        &self,
        table: &T,
        query: Option<&Query>,
        options: &FetchOptions,
    ) -> Result<Vec<S>> {
        self.within("fetch", self.inner.fetch_with(table, query, options))
            .await
    }

    async fn update<T: Table + ?Sized, S: Storable>(&self, table: &T, storable: &S) -> Result<bool> {
        self.within("update", self.inner.update(table, storable)).await
    }

    async fn delete<T: Table + ?Sized, S: Storable>(&self, table: &T, storable: &S) -> Result<bool> {
        self.within("delete", self.inner.delete(table, storable)).await
    }

    async fn count<T: Table + ?Sized>(&self, table: &T, query: Option<&Query>) -> Result<usize> {
        self.within("count", self.inner.count(table, query)).await
    }
}
