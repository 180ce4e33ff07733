//! Weather lookup followed by an icon download, one query at a time.
//!
//! A [`WeatherSession`] owns the single [`Snapshot`] slot that a presentation
//! layer renders. Every [`WeatherSession::search`] replaces the slot wholesale
//! and cancels the query that was in flight, so a slow earlier answer can never
//! overwrite a newer one.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::{
    FetchState, ImageBuffer, ImageError, WeatherError, WeatherQuery, WeatherResult,
    icon::ImageFetcher, provider::WeatherClient,
};

/// Everything the presentation layer needs for the current query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    /// Bumped by every search; tasks from older generations cannot write.
    pub generation: u64,
    /// City as typed by the user. `None` until the first search.
    pub query: Option<String>,
    pub weather: Option<FetchState<WeatherResult, WeatherError>>,
    /// Stays `None` unless the weather settled with a usable icon URL.
    pub icon: Option<FetchState<ImageBuffer, ImageError>>,
}

#[derive(Debug)]
pub struct WeatherSession {
    client: Arc<dyn WeatherClient>,
    images: Arc<dyn ImageFetcher>,
    state: Arc<watch::Sender<Snapshot>>,
    in_flight: Mutex<Option<CancellationToken>>,
}

impl WeatherSession {
    pub fn new(client: Arc<dyn WeatherClient>, images: Arc<dyn ImageFetcher>) -> Self {
        let (state, _) = watch::channel(Snapshot::default());

        Self { client, images, state: Arc::new(state), in_flight: Mutex::new(None) }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.state.subscribe()
    }

    /// Start a lookup for `city`, superseding any lookup still running.
    ///
    /// The snapshot shows `Loading` as soon as this returns. The handle resolves
    /// once the weather (and, on success, the icon) has settled or the task was
    /// superseded.
    pub fn search(&self, city: &str) -> JoinHandle<()> {
        let token = CancellationToken::new();

        // `in_flight` stays locked until the generation is bumped, so the live
        // token always belongs to the newest generation.
        let mut in_flight = self.lock_in_flight();
        if let Some(previous) = in_flight.replace(token.clone()) {
            previous.cancel();
        }

        let mut generation = 0;
        self.state.send_modify(|s| {
            s.generation += 1;
            generation = s.generation;
            s.query = Some(city.to_string());
            s.weather = Some(FetchState::Loading);
            s.icon = None;
        });
        drop(in_flight);
        debug!(generation, city, "Search started");

        let task = SearchTask {
            generation,
            token,
            client: Arc::clone(&self.client),
            images: Arc::clone(&self.images),
            state: Arc::clone(&self.state),
        };

        tokio::spawn(task.run(city.to_string()))
    }

    /// Stop the running lookup, if any.
    ///
    /// Whatever was still `Loading` goes back to idle (`None`); settled weather
    /// and icon states are kept.
    pub fn cancel(&self) {
        let mut in_flight = self.lock_in_flight();
        if let Some(token) = in_flight.take() {
            token.cancel();
        }

        self.state.send_if_modified(|s| {
            let weather_loading = s.weather.as_ref().is_some_and(FetchState::is_loading);
            let icon_loading = s.icon.as_ref().is_some_and(FetchState::is_loading);
            if !weather_loading && !icon_loading {
                return false;
            }

            s.generation += 1;
            if weather_loading {
                s.query = None;
                s.weather = None;
            }
            s.icon = None;
            true
        });
        drop(in_flight);
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct SearchTask {
    generation: u64,
    token: CancellationToken,
    client: Arc<dyn WeatherClient>,
    images: Arc<dyn ImageFetcher>,
    state: Arc<watch::Sender<Snapshot>>,
}

impl SearchTask {
    #[instrument(skip(self), fields(generation = self.generation))]
    async fn run(self, city: String) {
        let weather = match WeatherQuery::new(&city) {
            Ok(query) => {
                tokio::select! {
                    biased;
                    () = self.token.cancelled() => {
                        debug!("Weather lookup superseded");
                        return;
                    }
                    result = self.client.fetch_current_weather(&query) => result,
                }
            }
            Err(err) => Err(err),
        };

        let icon_url = weather.as_ref().ok().and_then(|w| w.current.resolved_icon_url());
        match &weather {
            Ok(w) => {
                info!(condition = %w.current.condition, temp_c = w.current.temperature, "Weather loaded");
            }
            Err(err) => info!(error = %err, "Weather lookup failed"),
        }

        if !self.publish(|s| s.weather = Some(weather.into())) {
            return;
        }

        let Some(url) = icon_url else {
            return;
        };

        if !self.publish(|s| s.icon = Some(FetchState::Loading)) {
            return;
        }

        let image = tokio::select! {
            biased;
            () = self.token.cancelled() => {
                debug!("Icon download superseded");
                return;
            }
            result = self.images.fetch_image(&url) => result,
        };

        if let Err(err) = &image {
            info!(%url, error = %err, "Icon download failed");
        }

        self.publish(|s| s.icon = Some(image.into()));
    }

    /// Apply `update` only while this task is still the current one.
    fn publish(&self, update: impl FnOnce(&mut Snapshot)) -> bool {
        self.state.send_if_modified(|s| {
            if s.generation != self.generation || self.token.is_cancelled() {
                return false;
            }
            update(s);
            true
        })
    }
}
