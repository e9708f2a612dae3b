//! Async driver for one mounted view.
//!
//! A [`ViewSession`] owns a [`ViewEngine`] and is the only writer to it.
//! It waits on three things at once: the shared script load, the fetch
//! for the latest requested location, and commands from the host (user
//! input and teardown). Each completion is fed to the engine along with
//! the mount generation it was started under, and every status change is
//! published on a [`watch`] channel.

use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use vibemap_types::{FilterState, ViewStatus};

use crate::error::{FetchError, StoreError};
use crate::loader::LoadFuture;
use crate::source::{DataSource, FetchOutcome, FetchTicket};
use crate::store::PlaceStore;
use crate::surface::MapBackend;
use crate::view::ViewEngine;

/// Input to a running view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewCommand {
    /// Show the dataset for a location. Supersedes any pending fetch.
    SetLocation(String),
    /// Change the emotion filter.
    SetFilter(FilterState),
    /// Tear the view down and stop the session.
    Teardown,
}

/// Drives a [`ViewEngine`] from asynchronous completions.
pub struct ViewSession<S, B: MapBackend> {
    engine: ViewEngine<B>,
    source: DataSource<S>,
    script: LoadFuture,
    status: watch::Sender<ViewStatus>,
}

impl<S: PlaceStore, B: MapBackend> ViewSession<S, B> {
    /// Create a session. The returned receiver observes every status
    /// change of the view.
    ///
    /// The session fetches through [`DataSource::for_view`], so only its
    /// own newer requests can make a pending fetch stale.
    pub fn new(
        engine: ViewEngine<B>,
        source: DataSource<S>,
        script: LoadFuture,
    ) -> (Self, watch::Receiver<ViewStatus>) {
        let (status, rx) = watch::channel(engine.status().clone());
        (
            Self {
                engine,
                source: source.for_view(),
                script,
                status,
            },
            rx,
        )
    }

    /// Run until a [`ViewCommand::Teardown`] arrives or the command
    /// channel closes, then tear the view down and return the engine.
    ///
    /// A pending fetch is aborted when a new location is requested and
    /// when the session ends, so no completion can reach a torn-down view.
    pub async fn run(mut self, mut commands: mpsc::Receiver<ViewCommand>) -> ViewEngine<B> {
        let view = self.engine.id();
        info!(%view, "view session started");

        let mut script = self.script.clone();
        let mut script_generation = self.engine.begin_script_load();
        self.publish();

        let mut fetches: JoinSet<(u64, FetchOutcome)> = JoinSet::new();
        let mut pending: Option<FetchTicket> = None;

        loop {
            tokio::select! {
                outcome = &mut script, if script_generation.is_some() => {
                    if let Some(generation) = script_generation.take() {
                        self.engine.on_script_loaded(generation, outcome);
                    }
                }
                Some(joined) = fetches.join_next(), if !fetches.is_empty() => {
                    match joined {
                        Ok((generation, outcome)) => {
                            if pending.as_ref() == Some(outcome.ticket()) {
                                pending = None;
                            }
                            self.engine.on_fetch_completed(generation, outcome);
                        }
                        Err(e) if e.is_cancelled() => {
                            debug!(%view, "superseded fetch aborted");
                        }
                        Err(e) => {
                            warn!(%view, error = %e, "fetch task failed");
                            if let Some(ticket) = pending.take() {
                                let outcome = FetchOutcome::Current {
                                    result: Err(FetchError {
                                        location_key: ticket.location_key.clone(),
                                        source: StoreError::Query(e.to_string()),
                                    }),
                                    ticket,
                                };
                                let generation = self.engine.generation();
                                self.engine.on_fetch_completed(generation, outcome);
                            }
                        }
                    }
                }
                command = commands.recv() => {
                    match command {
                        Some(ViewCommand::SetLocation(location)) => {
                            fetches.abort_all();
                            let (ticket, fetch) = self.source.fetch(&location);
                            let generation = self.engine.begin_fetch(ticket.clone());
                            fetches.spawn(async move { (generation, fetch.await) });
                            pending = Some(ticket);
                        }
                        Some(ViewCommand::SetFilter(filter)) => {
                            self.engine.set_filter(filter);
                        }
                        Some(ViewCommand::Teardown) | None => break,
                    }
                }
            }
            self.publish();
        }

        fetches.abort_all();
        self.engine.teardown();
        info!(%view, "view session ended");
        self.engine
    }

    fn publish(&self) {
        let current = self.engine.status();
        self.status.send_if_modified(|status| {
            if *status == *current {
                false
            } else {
                status.clone_from(current);
                true
            }
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use futures::FutureExt;
    use serde_json::json;

    use super::*;
    use crate::backend::CommandBackend;
    use crate::config::{MapConfig, MarkerConfig};
    use crate::error::ScriptLoadError;
    use crate::source::Normalizer;
    use crate::store::{MemoryPlaceStore, RawPlace};

    fn source() -> DataSource<MemoryPlaceStore> {
        let store = MemoryPlaceStore::with_places(vec![
            RawPlace::new(
                "p1",
                json!({"city": "SF", "location": {"lat": 37.7, "lng": -122.4}, "emotions": {"happy": 0.9}}),
            ),
            RawPlace::new(
                "p2",
                json!({"city": "SF", "location": {"lat": 37.8, "lng": -122.5}, "emotions": {"lonely": 0.4}}),
            ),
        ]);
        DataSource::new(Arc::new(store), Normalizer::default())
    }

    fn ready_script() -> LoadFuture {
        async { Ok(()) }.boxed().shared()
    }

    #[tokio::test]
    async fn location_then_filter_reaches_ready() {
        let (backend, _commands) = CommandBackend::channel();
        let engine = ViewEngine::new(backend, &MapConfig::default(), MarkerConfig::default());
        let (session, mut status) = ViewSession::new(engine, source(), ready_script());
        let (tx, rx) = mpsc::channel(8);
        let task = tokio::spawn(session.run(rx));

        tx.send(ViewCommand::SetLocation(String::from("SF"))).await.unwrap();
        status
            .wait_for(|s| matches!(s, ViewStatus::Ready { visible: 2, .. }))
            .await
            .unwrap();

        tx.send(ViewCommand::SetFilter(FilterState::parse("happy"))).await.unwrap();
        status
            .wait_for(|s| matches!(s, ViewStatus::Ready { visible: 1, total: 2, .. }))
            .await
            .unwrap();

        tx.send(ViewCommand::Teardown).await.unwrap();
        let engine = task.await.unwrap();
        assert!(engine.is_torn_down());
        assert_eq!(engine.surface().marker_count(), 0);
    }

    #[tokio::test]
    async fn script_failure_becomes_error_status() {
        let (backend, _commands) = CommandBackend::channel();
        let engine = ViewEngine::new(backend, &MapConfig::default(), MarkerConfig::default());
        let script: LoadFuture = async { Err(ScriptLoadError::Status(403)) }.boxed().shared();
        let (session, mut status) = ViewSession::new(engine, source(), script);
        let (tx, rx) = mpsc::channel(8);
        let task = tokio::spawn(session.run(rx));

        status
            .wait_for(|s| matches!(s, ViewStatus::Error { .. }))
            .await
            .unwrap();
        drop(tx);
        let engine = task.await.unwrap();
        assert!(!engine.surface().is_ready());
    }
}
