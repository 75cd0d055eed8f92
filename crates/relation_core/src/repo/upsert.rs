//! Upsert-by-key on top of any `RowStore`.
//!
//! # Responsibility
//! - Run "update if present, else create" as a lookup followed by exactly
//!   one write, and tag the result with the branch that ran.
//!
//! # Invariants
//! - Lookup strictly precedes the write; a failed lookup issues no write.
//! - Exactly one `save` per successful call: the mutated row or the fallback.
//! - `mutate` runs at most once, only on the found branch; the fallback is
//!   only built on the missing branch.
//! - No compare-and-swap: two callers racing on a missing key may both take
//!   the create branch, and the store's overwrite semantics decide the row.
//! - Cancellation is honored up to the moment the write is issued.

use crate::model::state::DomainDataState;
use crate::repo::{RepoError, RepoResult, RowStore};
use async_trait::async_trait;
use futures::future::{pending, FutureExt};
use log::{debug, error, info, warn};
use std::fmt::Display;
use std::future::Future;
use std::pin::pin;
use std::time::Instant;

/// Upsert capability available on every `RowStore`.
#[async_trait]
pub trait UpsertRepository<T>: RowStore<T>
where
    T: Send + 'static,
{
    /// Updates the row at `id` through `mutate`, or inserts `fallback`.
    async fn update_or_create<F>(
        &self,
        id: Self::Key,
        mutate: F,
        fallback: T,
    ) -> RepoResult<DomainDataState<T>>
    where
        F: FnOnce(&mut T) + Send,
    {
        run_upsert(self, id, mutate, move || fallback, pending()).await
    }

    /// Like `update_or_create`, but builds the fallback only when needed.
    async fn update_or_create_with<F, B>(
        &self,
        id: Self::Key,
        mutate: F,
        make_fallback: B,
    ) -> RepoResult<DomainDataState<T>>
    where
        F: FnOnce(&mut T) + Send,
        B: FnOnce() -> T + Send,
    {
        run_upsert(self, id, mutate, make_fallback, pending()).await
    }

    /// Like `update_or_create`, aborting with `RepoError::Cancelled` when
    /// `cancel` resolves before the write is issued.
    async fn update_or_create_or_cancel<F, C>(
        &self,
        id: Self::Key,
        mutate: F,
        fallback: T,
        cancel: C,
    ) -> RepoResult<DomainDataState<T>>
    where
        F: FnOnce(&mut T) + Send,
        C: Future<Output = ()> + Send,
    {
        run_upsert(self, id, mutate, move || fallback, cancel).await
    }
}

impl<T, S> UpsertRepository<T> for S
where
    S: RowStore<T> + ?Sized,
    T: Send + 'static,
{
}

async fn run_upsert<S, T, F, B, C>(
    store: &S,
    id: S::Key,
    mutate: F,
    make_fallback: B,
    cancel: C,
) -> RepoResult<DomainDataState<T>>
where
    S: RowStore<T> + ?Sized,
    T: Send + 'static,
    F: FnOnce(&mut T) + Send,
    B: FnOnce() -> T + Send,
    C: Future<Output = ()> + Send,
{
    let started_at = Instant::now();
    let mut cancel = pin!(cancel);
    debug!("event=upsert module=repo status=start key={id}");

    let found = tokio::select! {
        biased;
        () = &mut cancel => return Err(cancelled(&id, "lookup")),
        found = store.find_by_key(&id) => found,
    };
    let found = found.map_err(|err| {
        error!(
            "event=upsert module=repo status=error stage=lookup key={id} duration_ms={} error={err}",
            started_at.elapsed().as_millis()
        );
        RepoError::from_lookup(err)
    })?;

    if cancel.as_mut().now_or_never().is_some() {
        return Err(cancelled(&id, "write"));
    }

    let written = match found {
        Some(mut existing) => {
            mutate(&mut existing);
            store.save(existing).await.map(DomainDataState::Updated)
        }
        None => store
            .save(make_fallback())
            .await
            .map(DomainDataState::Created),
    };

    match written {
        Ok(result) => {
            info!(
                "event=upsert module=repo status=ok state={} duration_ms={}",
                result.state(),
                started_at.elapsed().as_millis()
            );
            Ok(result)
        }
        Err(err) => {
            error!(
                "event=upsert module=repo status=error stage=write key={id} duration_ms={} error={err}",
                started_at.elapsed().as_millis()
            );
            Err(RepoError::from_write(err))
        }
    }
}

fn cancelled(id: &impl Display, stage: &str) -> RepoError {
    warn!("event=upsert module=repo status=cancelled stage={stage} key={id}");
    RepoError::Cancelled
}

#[cfg(test)]
mod tests {
    use super::UpsertRepository;
    use crate::model::resource::Resource;
    use crate::model::state::DataState;
    use crate::repo::memory_store::MemoryStore;
    use crate::repo::RepoError;

    #[tokio::test]
    async fn lazy_fallback_is_not_built_when_row_exists() {
        let store = MemoryStore::resources();
        let resource = Resource::new("existing");
        store.seed(resource.clone()).unwrap();

        let result = store
            .update_or_create_with(
                resource.id,
                |found| found.rename("renamed"),
                || panic!("fallback must not be built for an existing row"),
            )
            .await
            .unwrap();

        assert_eq!(result.state(), DataState::Updated);
        assert_eq!(result.entity().name, "renamed");
    }

    #[tokio::test]
    async fn already_resolved_cancel_skips_lookup_and_write() {
        let store = MemoryStore::resources();
        let resource = Resource::new("never written");

        let err = store
            .update_or_create_or_cancel(resource.id, |_| {}, resource.clone(), async {})
            .await
            .unwrap_err();

        assert!(matches!(err, RepoError::Cancelled));
        assert_eq!(store.read_count(), 0);
        assert_eq!(store.write_count(), 0);
    }
}
