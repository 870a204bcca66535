//! Async bindings for `courier_core::Provider`.
//!
//! # Overview
//! `ReactiveProvider` turns the blocking provider calls into lazy futures and
//! streams driven by the tokio blocking pool.
//!
//! # Design
//! - Nothing happens until the returned future is first polled.
//! - With `track_inflights`, identical requests (same `EndpointKey`) that
//!   overlap in time share one provider call. Every waiter gets a clone of
//!   the same result.
//! - Cache entries carry a generation id. An entry is removed by the call
//!   that created it, or by a cancellation of that same entry, never by a
//!   stale call finishing after a newer entry took its key.
//! - Cancelling one waiter cancels the shared call, so joined waiters
//!   resolve with `Cancelled` as well.

mod ext;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use courier_core::{
    Cancellable, CourierError, CourierResult, EndpointKey, ProgressResponse, Provider, RequestOptions,
    Response, TargetType, UnderlyingError,
};
use futures::channel::mpsc;
use futures::future::{self, BoxFuture, FutureExt, Shared};
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

pub use ext::ResponseFutureExt;

type SharedResponse = Shared<BoxFuture<'static, CourierResult<Response>>>;

struct Inflight {
    id: u64,
    response: SharedResponse,
    cancellable: Cancellable,
}

type InflightMap = Arc<Mutex<HashMap<EndpointKey, Inflight>>>;

/// A handle on one started (or joined) provider call.
struct Started {
    entry: Option<(EndpointKey, u64)>,
    response: SharedResponse,
    cancellable: Cancellable,
}

pub struct ReactiveProvider<T> {
    provider: Arc<Provider<T>>,
    track_inflights: bool,
    inflight: InflightMap,
    next_id: Arc<AtomicU64>,
}

impl<T> Clone for ReactiveProvider<T> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            track_inflights: self.track_inflights,
            inflight: Arc::clone(&self.inflight),
            next_id: Arc::clone(&self.next_id),
        }
    }
}

impl<T: TargetType + 'static> ReactiveProvider<T> {
    pub fn new(provider: impl Into<Arc<Provider<T>>>, track_inflights: bool) -> Self {
        Self {
            provider: provider.into(),
            track_inflights,
            inflight: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn provider(&self) -> &Provider<T> {
        &self.provider
    }

    pub fn track_inflights(&self) -> bool {
        self.track_inflights
    }

    /// Number of distinct requests currently in flight.
    pub fn inflight_count(&self) -> usize {
        self.inflight.lock().len()
    }

    pub fn inflight_keys(&self) -> Vec<EndpointKey> {
        self.inflight.lock().keys().cloned().collect()
    }

    /// Request `target` once polled.
    pub fn request(&self, target: T) -> BoxFuture<'static, CourierResult<Response>> {
        self.request_cancellable(target, CancellationToken::new())
    }

    /// Like `request`, resolving with `Cancelled` as soon as `token` fires.
    pub fn request_cancellable(
        &self,
        target: T,
        token: CancellationToken,
    ) -> BoxFuture<'static, CourierResult<Response>> {
        let this = self.clone();
        async move {
            if token.is_cancelled() {
                return Err(CourierError::cancelled());
            }
            let Started { entry, response, cancellable } = this.start(target);
            tokio::select! {
                result = response => result,
                _ = token.cancelled() => {
                    this.cancel(entry, &cancellable);
                    Err(CourierError::cancelled())
                }
            }
        }
        .boxed()
    }

    /// Stream the progress of `target`. Each item carries the latest known
    /// progress and, at the end, the response. The stream ends after the
    /// completed item or the first error. Progress requests are never shared.
    pub fn request_with_progress(&self, target: T) -> BoxStream<'static, CourierResult<ProgressResponse>> {
        let provider = Arc::clone(&self.provider);
        let updates = async move {
            let (tx, rx) = mpsc::unbounded();
            tokio::task::spawn_blocking(move || run_with_progress(&provider, &target, tx));
            rx
        };

        stream::once(updates)
            .flatten()
            .scan((ProgressResponse::default(), false), |(latest, finished), item| {
                if *finished {
                    return future::ready(None);
                }
                let item = item.map(|update| {
                    let merged = ProgressResponse {
                        progress: update.progress.or(latest.progress),
                        response: update.response.or_else(|| latest.response.clone()),
                    };
                    *latest = merged.clone();
                    merged
                });
                *finished = item.as_ref().map_or(true, ProgressResponse::completed);
                future::ready(Some(item))
            })
            .boxed()
    }

    fn start(&self, target: T) -> Started {
        if !self.track_inflights {
            let cancellable = Cancellable::new();
            let response = self.spawn(target, cancellable.clone(), None);
            return Started {
                entry: None,
                response,
                cancellable,
            };
        }

        let key = self.provider.endpoint(&target).key();
        let mut inflight = self.inflight.lock();
        if let Some(existing) = inflight.get(&key) {
            tracing::debug!(id = existing.id, "joining inflight request");
            return Started {
                entry: Some((key, existing.id)),
                response: existing.response.clone(),
                cancellable: existing.cancellable.clone(),
            };
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cancellable = Cancellable::new();
        let response = self.spawn(target, cancellable.clone(), Some((key.clone(), id)));
        inflight.insert(
            key.clone(),
            Inflight {
                id,
                response: response.clone(),
                cancellable: cancellable.clone(),
            },
        );
        tracing::debug!(id, "started inflight request");
        Started {
            entry: Some((key, id)),
            response,
            cancellable,
        }
    }

    fn spawn(&self, target: T, cancellable: Cancellable, entry: Option<(EndpointKey, u64)>) -> SharedResponse {
        let provider = Arc::clone(&self.provider);
        let inflight = Arc::clone(&self.inflight);
        let handle = tokio::task::spawn_blocking(move || {
            let options = RequestOptions {
                cancellable: Some(&cancellable),
                progress: None,
            };
            let result = provider.request_with(&target, options);
            if let Some((key, id)) = entry {
                remove_entry(&inflight, &key, id);
            }
            result
        });
        async move {
            handle
                .await
                .unwrap_or_else(|e| Err(CourierError::underlying(UnderlyingError::Runtime(e.to_string()))))
        }
        .boxed()
        .shared()
    }

    fn cancel(&self, entry: Option<(EndpointKey, u64)>, cancellable: &Cancellable) {
        cancellable.cancel();
        if let Some((key, id)) = entry {
            remove_entry(&self.inflight, &key, id);
            tracing::debug!(id, "cancelled inflight request");
        }
    }
}

fn remove_entry(inflight: &InflightMap, key: &EndpointKey, id: u64) {
    let mut inflight = inflight.lock();
    if inflight.get(key).is_some_and(|entry| entry.id == id) {
        inflight.remove(key);
    }
}

fn run_with_progress<T: TargetType + 'static>(
    provider: &Provider<T>,
    target: &T,
    tx: mpsc::UnboundedSender<CourierResult<ProgressResponse>>,
) {
    // The final item is built from the processed result below.
    let sink = |update: ProgressResponse| {
        if !update.completed() {
            // The receiver may be gone; the request still runs to completion.
            let _ = tx.unbounded_send(Ok(update));
        }
    };
    let options = RequestOptions {
        cancellable: None,
        progress: Some(&sink),
    };
    let last = match provider.request_with(target, options) {
        Ok(response) => Ok(ProgressResponse::from_response(response)),
        Err(e) => Err(e),
    };
    let _ = tx.unbounded_send(last);
}
