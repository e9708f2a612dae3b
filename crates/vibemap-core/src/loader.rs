//! Load-once resource loader for the external mapping script.
//!
//! A [`ResourceLoader`] memoizes a single load attempt as a shared
//! future. The first call to [`ResourceLoader::ensure_loaded`] starts the
//! attempt; every caller, before or after completion, awaits the same
//! outcome. A failed attempt is never retried: the failure is the
//! outcome for the rest of the process lifetime.
//!
//! The mapping script used by every view is the process-wide instance
//! returned by [`maps_script`], keyed by [`MAPS_SCRIPT_KEY`].

use std::future::Future;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{info, warn};

use crate::config::MapConfig;
use crate::error::ScriptLoadError;

/// Resource key of the mapping script.
pub const MAPS_SCRIPT_KEY: &str = "google-maps-script";

/// Outcome of a load attempt: `Ok(())` is ready.
pub type LoadOutcome = Result<(), ScriptLoadError>;

/// A cloneable handle to the single load attempt.
pub type LoadFuture = Shared<BoxFuture<'static, LoadOutcome>>;

/// Loads one resource at most once.
pub struct ResourceLoader {
    key: String,
    attempt: OnceLock<LoadFuture>,
    attempts: AtomicU64,
}

impl core::fmt::Debug for ResourceLoader {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ResourceLoader")
            .field("key", &self.key)
            .field("attempts", &self.attempts())
            .field("outcome", &self.outcome())
            .finish()
    }
}

impl ResourceLoader {
    /// Create a loader for the resource identified by `key`.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            attempt: OnceLock::new(),
            attempts: AtomicU64::new(0),
        }
    }

    /// The resource key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Return the shared load attempt, starting it with `load` if no
    /// attempt exists yet.
    ///
    /// `load` is invoked at most once over the lifetime of the loader.
    /// Inside a Tokio runtime the attempt runs on its own task, so it
    /// completes even if every waiter is dropped.
    pub fn ensure_loaded<F, Fut>(&self, load: F) -> LoadFuture
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = LoadOutcome> + Send + 'static,
    {
        self.attempt
            .get_or_init(|| {
                self.attempts.fetch_add(1, Ordering::AcqRel);
                info!(key = %self.key, "starting resource load");
                let key = self.key.clone();
                let attempt = load();
                let logged = async move {
                    let outcome = attempt.await;
                    match &outcome {
                        Ok(()) => info!(%key, "resource loaded"),
                        Err(e) => warn!(%key, error = %e, "resource load failed; not retrying"),
                    }
                    outcome
                };
                drive(logged).shared()
            })
            .clone()
    }

    /// The outcome if the attempt has finished.
    pub fn outcome(&self) -> Option<LoadOutcome> {
        self.attempt.get().and_then(|attempt| attempt.peek().cloned())
    }

    /// Number of load attempts ever started (zero or one).
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Acquire)
    }
}

/// Detach the attempt onto the current runtime when there is one.
fn drive<Fut>(attempt: Fut) -> BoxFuture<'static, LoadOutcome>
where
    Fut: Future<Output = LoadOutcome> + Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(runtime) => {
            let task = runtime.spawn(attempt);
            async move {
                task.await
                    .unwrap_or_else(|e| Err(ScriptLoadError::Aborted(e.to_string())))
            }
            .boxed()
        }
        Err(_) => attempt.boxed(),
    }
}

/// The process-wide loader for the mapping script.
pub fn maps_script() -> &'static ResourceLoader {
    static MAPS_SCRIPT: OnceLock<ResourceLoader> = OnceLock::new();
    MAPS_SCRIPT.get_or_init(|| ResourceLoader::new(MAPS_SCRIPT_KEY))
}

/// Fetches the mapping script over HTTP.
///
/// A successful load means the script host answered 2xx with a
/// non-empty body for the keyed URL.
#[derive(Debug, Clone)]
pub struct ScriptSource {
    client: reqwest::Client,
    url: Option<String>,
}

impl ScriptSource {
    /// Create a source for an already-keyed script URL. `None` means no
    /// API key is configured.
    pub fn new(url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }

    /// Create a source from the map configuration.
    pub fn from_config(map: &MapConfig) -> Self {
        Self::new(map.keyed_script_url())
    }

    /// Perform the load.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptLoadError::MissingApiKey`] when no URL is
    /// configured, otherwise the transport or HTTP failure.
    pub async fn load(self) -> LoadOutcome {
        let url = self.url.ok_or(ScriptLoadError::MissingApiKey)?;

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ScriptLoadError::Request(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScriptLoadError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ScriptLoadError::Request(e.without_url().to_string()))?;
        if body.is_empty() {
            return Err(ScriptLoadError::EmptyBody);
        }
        Ok(())
    }
}
