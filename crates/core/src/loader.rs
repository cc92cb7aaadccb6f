//! Provider SDK loader
//!
//! Collapses every `load()` call in the process into one in-flight load whose
//! outcome all concurrent callers share, success or failure. After a
//! successful load the script is never fetched again; a failed load clears
//! the slot so a later call can try again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use roomlink_common::{poll_until, PollConfig, PollError};
use roomlink_domain::{LoaderConfig, SessionError};
use tracing::{debug, info, instrument, warn};

use crate::ports::SdkAssets;

type SharedLoad = Shared<BoxFuture<'static, Result<(), SessionError>>>;

/// Loads the provider SDK at most once per successful load.
pub struct SdkLoader {
    core: Arc<LoaderCore>,
    in_flight: Arc<Mutex<Option<SharedLoad>>>,
}

struct LoaderCore {
    assets: Arc<dyn SdkAssets>,
    config: LoaderConfig,
    loaded: AtomicBool,
}

impl SdkLoader {
    /// Loader for the assets described by `config`. Nothing is fetched until
    /// the first [`load`](Self::load).
    pub fn new(assets: Arc<dyn SdkAssets>, config: LoaderConfig) -> Self {
        Self {
            core: Arc::new(LoaderCore { assets, config, loaded: AtomicBool::new(false) }),
            in_flight: Arc::new(Mutex::new(None)),
        }
    }

    /// Whether a load has completed successfully.
    pub fn is_loaded(&self) -> bool {
        self.core.loaded.load(Ordering::SeqCst)
    }

    /// Make the SDK available, loading it on first use.
    ///
    /// # Errors
    /// `SessionError::SdkLoadFailure` when the globals or the script fail to
    /// load, or the entry point never appears. Every caller that joined the
    /// failed load gets the same error.
    pub async fn load(&self) -> Result<(), SessionError> {
        if self.is_loaded() {
            return Ok(());
        }

        let future = {
            let mut slot = self.in_flight.lock();
            if let Some(running) = slot.as_ref() {
                debug!("joining in-flight SDK load");
                running.clone()
            } else {
                let core = Arc::clone(&self.core);
                let slot_handle = Arc::clone(&self.in_flight);
                let future = async move {
                    let result = core.load_assets().await;
                    if result.is_ok() {
                        core.loaded.store(true, Ordering::SeqCst);
                    }
                    *slot_handle.lock() = None;
                    result
                }
                .boxed()
                .shared();
                *slot = Some(future.clone());
                future
            }
        };

        future.await
    }
}

impl LoaderCore {
    #[instrument(skip(self), fields(script = %self.config.script_url))]
    async fn load_assets(&self) -> Result<(), SessionError> {
        info!("loading meeting SDK");

        self.assets.ensure_globals().await.map_err(|e| {
            SessionError::SdkLoadFailure(format!("runtime globals unavailable: {e}"))
        })?;

        for url in &self.config.stylesheet_urls {
            if let Err(e) = self.assets.load_stylesheet(url).await {
                warn!(url = %url, error = %e, "stylesheet failed to load; continuing");
            }
        }

        self.assets
            .load_script(&self.config.script_url)
            .await
            .map_err(|e| SessionError::SdkLoadFailure(format!("script failed to load: {e}")))?;

        let poll = PollConfig::new(self.config.poll_interval(), self.config.max_polls);
        let assets = &self.assets;
        match poll_until(&poll, None, |_| async move { assets.entry_point_ready().await }).await {
            Ok(polls) => {
                debug!(polls, "SDK entry point defined");
                info!("meeting SDK loaded");
                Ok(())
            }
            Err(PollError::TimedOut { attempts, .. } | PollError::Cancelled { attempts }) => {
                Err(SessionError::SdkLoadFailure(format!(
                    "entry point not defined after {attempts} polls"
                )))
            }
        }
    }
}
