//! Asynchronous load state for strata backed by a remote document.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use catalog_reactive::{untracked, Observable};
use tracing::{debug, info, warn};
use wms_common::{CatalogError, CatalogResult};

/// Where a loadable stratum is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Unloaded,
    Loading,
    Loaded,
    LoadFailed,
}

/// Everything observers may see about a load, written as one value.
pub struct LoadSnapshot<P> {
    pub is_loading: bool,
    pub payload: Option<Arc<P>>,
    pub error: Option<CatalogError>,
    /// Ticket of the most recently started load.
    pub request: u64,
}

impl<P> LoadSnapshot<P> {
    pub fn status(&self) -> LoadStatus {
        match (self.is_loading, &self.payload, &self.error) {
            (true, _, _) => LoadStatus::Loading,
            (false, Some(_), _) => LoadStatus::Loaded,
            (false, None, Some(_)) => LoadStatus::LoadFailed,
            (false, None, None) => LoadStatus::Unloaded,
        }
    }
}

impl<P> Clone for LoadSnapshot<P> {
    fn clone(&self) -> Self {
        Self {
            is_loading: self.is_loading,
            payload: self.payload.clone(),
            error: self.error.clone(),
            request: self.request,
        }
    }
}

impl<P> Default for LoadSnapshot<P> {
    fn default() -> Self {
        Self {
            is_loading: false,
            payload: None,
            error: None,
            request: 0,
        }
    }
}

impl<P> fmt::Debug for LoadSnapshot<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadSnapshot")
            .field("is_loading", &self.is_loading)
            .field("has_payload", &self.payload.is_some())
            .field("error", &self.error)
            .field("request", &self.request)
            .finish()
    }
}

/// Identifies one started load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

impl LoadTicket {
    pub fn request(&self) -> u64 {
        self.0
    }
}

/// Observable load state for a payload of type `P`.
///
/// Only the most recently started load may settle; a response that arrives
/// after a newer load began is dropped.
pub struct LoadCell<P> {
    name: String,
    state: Observable<LoadSnapshot<P>>,
    next_request: AtomicU64,
}

impl<P: Send + Sync + 'static> LoadCell<P> {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            state: Observable::new(format!("{name}.load"), LoadSnapshot::default()),
            name,
            next_request: AtomicU64::new(1),
        }
    }

    pub fn snapshot(&self) -> LoadSnapshot<P> {
        self.state.get()
    }

    pub fn payload(&self) -> Option<Arc<P>> {
        self.state.with(|s| s.payload.clone())
    }

    pub fn is_loading(&self) -> bool {
        self.state.with(|s| s.is_loading)
    }

    pub fn error(&self) -> Option<CatalogError> {
        self.state.with(|s| s.error.clone())
    }

    pub fn status(&self) -> LoadStatus {
        self.state.with(LoadSnapshot::status)
    }

    /// Request number of the payload currently held, if any.
    pub fn payload_request(&self) -> Option<u64> {
        self.state
            .with(|s| s.payload.as_ref().map(|_| s.request))
    }

    /// Start a load: drop the previous payload and error and mark loading.
    pub fn begin(&self) -> LoadTicket {
        let request = self.next_request.fetch_add(1, Ordering::Relaxed);
        self.state.update(|s| {
            s.is_loading = true;
            s.payload = None;
            s.error = None;
            s.request = request;
        });
        info!(cell = %self.name, request, "Load started");
        LoadTicket(request)
    }

    /// Record the outcome of a load. Returns `false` if a newer load has
    /// started since `ticket` was issued.
    pub fn settle(&self, ticket: LoadTicket, result: CatalogResult<Arc<P>>) -> bool {
        let latest = untracked(|| self.state.with(|s| s.request));
        if latest != ticket.0 {
            debug!(cell = %self.name, request = ticket.0, latest, "Ignoring stale load result");
            return false;
        }
        let failed = result.is_err();
        self.state.update(|s| {
            s.is_loading = false;
            match result {
                Ok(payload) => {
                    s.payload = Some(payload);
                    s.error = None;
                }
                Err(err) => {
                    s.payload = None;
                    s.error = Some(err);
                }
            }
        });
        info!(cell = %self.name, request = ticket.0, failed, "Load finished");
        true
    }

    /// Run `fetch` as a load. The caller gets the fetch result even if a newer
    /// load has superseded it.
    pub async fn load<F>(&self, fetch: F) -> CatalogResult<Arc<P>>
    where
        F: Future<Output = CatalogResult<Arc<P>>>,
    {
        let mut pending = PendingLoad {
            cell: self,
            ticket: Some(self.begin()),
        };
        let result = fetch.await;
        if let Some(ticket) = pending.ticket.take() {
            self.settle(ticket, result.clone());
        }
        result
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Settles a load whose future was dropped before the fetch finished.
struct PendingLoad<'a, P: Send + Sync + 'static> {
    cell: &'a LoadCell<P>,
    ticket: Option<LoadTicket>,
}

impl<P: Send + Sync + 'static> Drop for PendingLoad<'_, P> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            warn!(cell = %self.cell.name, request = ticket.0, "Load cancelled before completion");
            self.cell.settle(
                ticket,
                Err(CatalogError::network_or_parse(
                    "Load cancelled",
                    format!("loading {} was cancelled before it finished", self.cell.name),
                )),
            );
        }
    }
}

impl<P> fmt::Debug for LoadCell<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadCell")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_reactive::autorun;
    use parking_lot::Mutex;
    use tokio_test::{assert_pending, task};

    #[test]
    fn test_status_transitions() {
        let cell: LoadCell<String> = LoadCell::new("doc");
        assert_eq!(cell.status(), LoadStatus::Unloaded);

        let ticket = cell.begin();
        assert_eq!(cell.status(), LoadStatus::Loading);
        assert!(cell.settle(ticket, Ok(Arc::new("v1".into()))));
        assert_eq!(cell.status(), LoadStatus::Loaded);
        assert_eq!(cell.payload_request(), Some(ticket.request()));

        let ticket = cell.begin();
        assert!(cell.payload().is_none());
        cell.settle(ticket, Err(CatalogError::network_or_parse("Failed", "timeout")));
        assert_eq!(cell.status(), LoadStatus::LoadFailed);
        assert!(cell.payload().is_none());
        assert_eq!(cell.error().unwrap().title(), "Failed");
    }

    #[test]
    fn test_stale_settlement_is_ignored() {
        let cell: LoadCell<String> = LoadCell::new("doc");
        let first = cell.begin();
        let second = cell.begin();

        assert!(cell.settle(second, Ok(Arc::new("new".into()))));
        assert!(!cell.settle(first, Ok(Arc::new("old".into()))));
        assert_eq!(*cell.payload().unwrap(), "new");
    }

    #[test]
    fn test_observers_never_see_payload_while_loading() {
        let cell: Arc<LoadCell<u32>> = Arc::new(LoadCell::new("doc"));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let _watch = autorun("watch", {
            let (cell, seen) = (cell.clone(), seen.clone());
            move || {
                let s = cell.snapshot();
                seen.lock().push((s.is_loading, s.payload.map(|p| *p)));
            }
        });

        let t = cell.begin();
        cell.settle(t, Ok(Arc::new(1)));
        let t = cell.begin();
        cell.settle(t, Ok(Arc::new(2)));

        let seen = seen.lock();
        assert_eq!(
            *seen,
            vec![
                (false, None),
                (true, None),
                (false, Some(1)),
                (true, None),
                (false, Some(2)),
            ]
        );
    }

    #[test]
    fn test_dropped_load_does_not_stay_loading() {
        let cell: LoadCell<String> = LoadCell::new("doc");
        let mut load = task::spawn(cell.load(std::future::pending()));
        assert_pending!(load.poll());
        assert_eq!(cell.status(), LoadStatus::Loading);

        drop(load);
        assert_eq!(cell.status(), LoadStatus::LoadFailed);
        assert_eq!(cell.error().unwrap().title(), "Load cancelled");
    }

    #[test]
    fn test_dropped_load_leaves_newer_load_alone() {
        let cell: LoadCell<String> = LoadCell::new("doc");
        let mut stale = task::spawn(cell.load(std::future::pending()));
        assert_pending!(stale.poll());

        let ticket = cell.begin();
        cell.settle(ticket, Ok(Arc::new("fresh".into())));
        drop(stale);

        assert_eq!(cell.status(), LoadStatus::Loaded);
        assert_eq!(*cell.payload().unwrap(), "fresh");
    }

    #[tokio::test]
    async fn test_load_returns_fetch_result() {
        let cell: LoadCell<String> = LoadCell::new("doc");
        let result = cell.load(async { Ok(Arc::new("doc".to_string())) }).await;
        assert_eq!(*result.unwrap(), "doc");
        assert_eq!(cell.status(), LoadStatus::Loaded);

        let result = cell
            .load(async { Err(CatalogError::network_or_parse("Failed", "503")) })
            .await;
        assert!(result.is_err());
        assert_eq!(cell.status(), LoadStatus::LoadFailed);
    }
}
