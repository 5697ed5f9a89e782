use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use crate::catalog::{CatalogError, CatalogService};

/// A finished catalog request, tagged with the generation it was issued as.
#[derive(Debug)]
pub struct FetchResult<T> {
    pub generation: u64,
    pub result: Result<T, CatalogError>,
}

/// Runs catalog requests off the UI thread. Only the newest request's
/// result is ever handed back; older ones are dropped on arrival.
pub struct Fetcher<T> {
    catalog: Arc<dyn CatalogService>,
    tx: Sender<FetchResult<T>>,
    rx: Receiver<FetchResult<T>>,
    generation: u64,
}

impl<T: Send + 'static> Fetcher<T> {
    pub fn new(catalog: Arc<dyn CatalogService>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            catalog,
            tx,
            rx,
            generation: 0,
        }
    }

    /// Run `job` against the catalog on a fresh thread, superseding any
    /// request still in flight.
    pub fn request<F>(&mut self, job: F) -> u64
    where
        F: FnOnce(&dyn CatalogService) -> Result<T, CatalogError> + Send + 'static,
    {
        self.generation += 1;
        let generation = self.generation;
        let catalog = Arc::clone(&self.catalog);
        let tx = self.tx.clone();

        thread::spawn(move || {
            let result = job(catalog.as_ref());
            let _ = tx.send(FetchResult { generation, result });
        });

        tracing::debug!(generation, "catalog request issued");
        generation
    }

    /// The latest current-generation result, if one arrived.
    pub fn poll(&self) -> Option<Result<T, CatalogError>> {
        let mut latest = None;
        for r in self.rx.try_iter() {
            if let Some(result) = self.accept(r) {
                latest = Some(result);
            }
        }
        latest
    }

    fn accept(&self, r: FetchResult<T>) -> Option<Result<T, CatalogError>> {
        if r.generation == self.generation {
            Some(r.result)
        } else {
            tracing::debug!(
                stale = r.generation,
                current = self.generation,
                "dropping superseded catalog result"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::{Duration, Instant};

    use super::*;
    use crate::catalog::{CatalogView, filter_tracks};
    use crate::library::{MediaSource, Track, TrackId};

    struct Fixed(Vec<Track>);

    impl CatalogService for Fixed {
        fn list_tracks(&self) -> Result<Vec<Track>, CatalogError> {
            Ok(self.0.clone())
        }

        fn search(&self, query: &str) -> Result<Vec<Track>, CatalogError> {
            Ok(filter_tracks(self.0.clone(), query))
        }

        fn record_play(&self, _id: &TrackId) -> Result<(), CatalogError> {
            Ok(())
        }

        fn favorites(&self) -> Result<Vec<Track>, CatalogError> {
            Ok(self.0.iter().take(1).cloned().collect())
        }
    }

    fn t(title: &str) -> Track {
        Track {
            id: TrackId::from(title),
            title: title.into(),
            artist: None,
            album: None,
            genre: None,
            duration: None,
            source: MediaSource::File(PathBuf::from(title)),
            artwork: None,
            display: title.into(),
        }
    }

    fn wait<T: Send + 'static>(fetcher: &Fetcher<T>) -> Result<T, CatalogError> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(r) = fetcher.poll() {
                return r;
            }
            assert!(Instant::now() < deadline, "catalog result never arrived");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn view_request(fetcher: &mut Fetcher<Vec<Track>>, view: CatalogView, query: &str) {
        let query = query.to_string();
        fetcher.request(move |catalog| view.fetch(catalog, &query));
    }

    #[test]
    fn blank_query_lists_and_text_searches() {
        let mut fetcher = Fetcher::new(Arc::new(Fixed(vec![t("alpha"), t("beta")])));

        view_request(&mut fetcher, CatalogView::Library, "  ");
        assert_eq!(wait(&fetcher).unwrap().len(), 2);

        view_request(&mut fetcher, CatalogView::Library, "bet");
        let found = wait(&fetcher).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "beta");

        view_request(&mut fetcher, CatalogView::Favorites, "");
        let favorites = wait(&fetcher).unwrap();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].title, "alpha");
    }

    #[test]
    fn unsupported_collections_surface_as_errors() {
        let mut fetcher: Fetcher<Vec<crate::catalog::PlaylistSummary>> =
            Fetcher::new(Arc::new(Fixed(Vec::new())));
        fetcher.request(|catalog| catalog.playlists());
        assert!(matches!(
            wait(&fetcher),
            Err(CatalogError::Unsupported("playlists"))
        ));
    }

    #[test]
    fn superseded_results_are_dropped() {
        let mut fetcher = Fetcher::new(Arc::new(Fixed(vec![t("alpha")])));
        view_request(&mut fetcher, CatalogView::Library, "");
        view_request(&mut fetcher, CatalogView::Library, "");
        assert_eq!(fetcher.generation, 2);

        fetcher
            .tx
            .send(FetchResult {
                generation: 1,
                result: Ok(Vec::new()),
            })
            .unwrap();

        // The stale empty list never wins over the current request.
        assert_eq!(wait(&fetcher).unwrap().len(), 1);
    }
}
