//! Backend boundary: the unit repository and plan-image blob store the
//! editor talks to, plus the async pipelines that keep network/decode work
//! off the UI thread.
//!
//! The hosted backend itself is out of scope; the traits here are its
//! contract and `InMemoryBackend` is the reference implementation used by
//! the app shell and the tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

use crate::item::Geometry;
use crate::log_err;
use crate::ops::diff::{SaveError, SaveOutcome};

// ============================================================================
// Domain records
// ============================================================================

/// Sellable unit status, as reported by the backend. The palette in
/// `theme.rs` maps each status to a fill color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnitStatus {
    Available,
    Reserved,
    Sold,
    Blocked,
}

impl UnitStatus {
    pub fn label(&self) -> &'static str {
        match self {
            UnitStatus::Available => "Available",
            UnitStatus::Reserved => "Reserved",
            UnitStatus::Sold => "Sold",
            UnitStatus::Blocked => "Blocked",
        }
    }
}

/// A sellable unit, read from the backend. `geometry` is the only field the
/// editor ever writes back.
#[derive(Clone, Debug, PartialEq)]
pub struct Unit {
    pub id: String,
    pub code: String,
    pub block: String,
    /// Floor number; `None` for units without one (ground annexes, plots).
    pub floor: Option<i32>,
    pub status: UnitStatus,
    pub typology: String,
    pub area_m2: f32,
    pub price: f64,
    pub notes: String,
    pub geometry: Option<Geometry>,
}

/// Plan image metadata as stored by the backend.
#[derive(Clone, Debug, PartialEq)]
pub struct MapImage {
    pub url: String,
    pub pixel_width: u32,
    pub pixel_height: u32,
}

// ============================================================================
// Collaborator traits
// ============================================================================

/// Error type for backend operations.
#[derive(Debug, Clone)]
pub enum BackendError {
    NotFound(String),
    Transport(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotFound(what) => write!(f, "not found: {}", what),
            BackendError::Transport(msg) => write!(f, "backend unavailable: {}", msg),
        }
    }
}

/// Read/write access to the unit collection. Geometry writes must be safe to
/// issue concurrently for distinct unit ids.
pub trait UnitRepository: Send + Sync {
    fn units_for_map(&self, map_id: &str) -> Result<Vec<Unit>, BackendError>;
    fn write_geometry(&self, unit_id: &str, geometry: &Geometry) -> Result<(), BackendError>;
    /// Null out the geometry of every listed unit in one batched write.
    fn clear_geometry(&self, unit_ids: &[String]) -> Result<(), BackendError>;
}

/// Read/write access to the plan image blob store.
pub trait PlanImageStore: Send + Sync {
    fn map_image(&self, map_id: &str) -> Result<MapImage, BackendError>;
    fn fetch_image(&self, url: &str) -> Result<Vec<u8>, BackendError>;
    fn upload_image(
        &self,
        map_id: &str,
        bytes: Vec<u8>,
        width: u32,
        height: u32,
    ) -> Result<MapImage, BackendError>;
}

/// Signals the editor raises toward the host application. The host decides
/// what "invalidate" means for its cached unit/map views.
pub trait HostNotifier: Send + Sync {
    fn save_completed(&self, changes: usize);
    fn save_failed(&self, message: &str);
    fn invalidate_unit_cache(&self);
}

/// Default notifier: mirrors host signals into the session log.
pub struct LoggingNotifier;

impl HostNotifier for LoggingNotifier {
    fn save_completed(&self, changes: usize) {
        crate::log_info!("save completed ({} changes)", changes);
    }
    fn save_failed(&self, message: &str) {
        log_err!("save failed: {}", message);
    }
    fn invalidate_unit_cache(&self) {
        crate::log_info!("host: invalidate unit/map caches");
    }
}

// ============================================================================
// Cancellation
// ============================================================================

/// Issues cancellation tokens for async work tied to one editor/viewer
/// instance. Re-targeting the instance (new image, teardown) cancels every
/// outstanding token at once.
#[derive(Default)]
pub struct CancelSource {
    generation: Arc<AtomicU64>,
}

impl CancelSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invalidate all previously issued tokens.
    pub fn cancel_all(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn token(&self) -> CancelToken {
        CancelToken {
            generation: Arc::clone(&self.generation),
            issued_at: self.generation.load(Ordering::SeqCst),
        }
    }
}

/// Handle checked at every resumption point of an async task. A cancelled
/// task's results are silently discarded — never an error condition.
#[derive(Clone)]
pub struct CancelToken {
    generation: Arc<AtomicU64>,
    issued_at: u64,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        self.generation.load(Ordering::SeqCst) != self.issued_at
    }
}

// ============================================================================
// Async pipelines
// ============================================================================

/// Results posted back to the UI thread by background workers. `tag`
/// identifies which surface (editor or viewer) requested the load.
pub enum IoEvent {
    /// Plan image decoded: raw RGBA plus pixel dimensions.
    ImageLoaded {
        token: CancelToken,
        tag: String,
        rgba: Vec<u8>,
        size: [usize; 2],
    },
    /// Plan image fetch/decode failed. Editing proceeds on a blank canvas.
    ImageFailed {
        token: CancelToken,
        tag: String,
        error: String,
    },
    /// A save run finished, successfully or not.
    SaveFinished {
        result: Result<SaveOutcome, SaveError>,
    },
}

/// Fetch and decode the plan image on a worker thread. The token is checked
/// after every blocking step; a stale result is dropped without logging.
pub fn spawn_image_load(
    store: Arc<dyn PlanImageStore>,
    url: String,
    token: CancelToken,
    tag: String,
    tx: Sender<IoEvent>,
) {
    std::thread::spawn(move || {
        let bytes = match store.fetch_image(&url) {
            Ok(bytes) => bytes,
            Err(e) => {
                if !token.is_cancelled() {
                    let _ = tx.send(IoEvent::ImageFailed {
                        token,
                        tag,
                        error: e.to_string(),
                    });
                }
                return;
            }
        };
        if token.is_cancelled() {
            return;
        }
        match image::load_from_memory(&bytes) {
            Ok(decoded) => {
                let rgba = decoded.into_rgba8();
                let size = [rgba.width() as usize, rgba.height() as usize];
                if token.is_cancelled() {
                    return;
                }
                let _ = tx.send(IoEvent::ImageLoaded {
                    token,
                    tag,
                    rgba: rgba.into_raw(),
                    size,
                });
            }
            Err(e) => {
                if !token.is_cancelled() {
                    let _ = tx.send(IoEvent::ImageFailed {
                        token,
                        tag,
                        error: format!("decode failed: {}", e),
                    });
                }
            }
        }
    });
}

// ============================================================================
// In-memory backend
// ============================================================================

/// Reference backend holding everything in memory behind a mutex. Doubles as
/// the test backend; the write counters exist so tests can assert on the
/// exact number of writes a save issued.
pub struct InMemoryBackend {
    units: Mutex<HashMap<String, Unit>>,
    images: Mutex<HashMap<String, (MapImage, Vec<u8>)>>,
    geometry_writes: AtomicUsize,
    clear_calls: AtomicUsize,
    fail_writes: Mutex<bool>,
}

impl InMemoryBackend {
    pub fn new(units: Vec<Unit>) -> Self {
        Self {
            units: Mutex::new(units.into_iter().map(|u| (u.id.clone(), u)).collect()),
            images: Mutex::new(HashMap::new()),
            geometry_writes: AtomicUsize::new(0),
            clear_calls: AtomicUsize::new(0),
            fail_writes: Mutex::new(false),
        }
    }

    pub fn set_map_image(&self, map_id: &str, meta: MapImage, bytes: Vec<u8>) {
        self.images
            .lock()
            .expect("image store poisoned")
            .insert(map_id.to_string(), (meta, bytes));
    }

    pub fn unit(&self, unit_id: &str) -> Option<Unit> {
        self.units
            .lock()
            .expect("unit store poisoned")
            .get(unit_id)
            .cloned()
    }

    /// Total `write_geometry` calls since construction.
    pub fn geometry_write_count(&self) -> usize {
        self.geometry_writes.load(Ordering::SeqCst)
    }

    /// Total `clear_geometry` calls since construction.
    pub fn clear_call_count(&self) -> usize {
        self.clear_calls.load(Ordering::SeqCst)
    }

    /// Make every subsequent write fail with a transport error (tests).
    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().expect("flag poisoned") = fail;
    }

    fn writes_failing(&self) -> bool {
        *self.fail_writes.lock().expect("flag poisoned")
    }
}

impl UnitRepository for InMemoryBackend {
    fn units_for_map(&self, _map_id: &str) -> Result<Vec<Unit>, BackendError> {
        let units = self.units.lock().expect("unit store poisoned");
        let mut list: Vec<Unit> = units.values().cloned().collect();
        list.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(list)
    }

    fn write_geometry(&self, unit_id: &str, geometry: &Geometry) -> Result<(), BackendError> {
        self.geometry_writes.fetch_add(1, Ordering::SeqCst);
        if self.writes_failing() {
            return Err(BackendError::Transport("injected failure".into()));
        }
        let mut units = self.units.lock().expect("unit store poisoned");
        match units.get_mut(unit_id) {
            Some(unit) => {
                unit.geometry = Some(geometry.clone());
                Ok(())
            }
            None => Err(BackendError::NotFound(format!("unit {}", unit_id))),
        }
    }

    fn clear_geometry(&self, unit_ids: &[String]) -> Result<(), BackendError> {
        self.clear_calls.fetch_add(1, Ordering::SeqCst);
        if self.writes_failing() {
            return Err(BackendError::Transport("injected failure".into()));
        }
        let mut units = self.units.lock().expect("unit store poisoned");
        for unit_id in unit_ids {
            match units.get_mut(unit_id) {
                Some(unit) => unit.geometry = None,
                None => return Err(BackendError::NotFound(format!("unit {}", unit_id))),
            }
        }
        Ok(())
    }
}

impl PlanImageStore for InMemoryBackend {
    fn map_image(&self, map_id: &str) -> Result<MapImage, BackendError> {
        self.images
            .lock()
            .expect("image store poisoned")
            .get(map_id)
            .map(|(meta, _)| meta.clone())
            .ok_or_else(|| BackendError::NotFound(format!("map image for {}", map_id)))
    }

    fn fetch_image(&self, url: &str) -> Result<Vec<u8>, BackendError> {
        let images = self.images.lock().expect("image store poisoned");
        images
            .values()
            .find(|(meta, _)| meta.url == url)
            .map(|(_, bytes)| bytes.clone())
            .ok_or_else(|| BackendError::NotFound(format!("blob {}", url)))
    }

    fn upload_image(
        &self,
        map_id: &str,
        bytes: Vec<u8>,
        width: u32,
        height: u32,
    ) -> Result<MapImage, BackendError> {
        let meta = MapImage {
            url: format!("mem://plans/{}/{}", map_id, uuid::Uuid::new_v4()),
            pixel_width: width,
            pixel_height: height,
        };
        self.images
            .lock()
            .expect("image store poisoned")
            .insert(map_id.to_string(), (meta.clone(), bytes));
        Ok(meta)
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use crate::item::Point;

    pub fn unit(id: &str, code: &str, block: &str, floor: Option<i32>) -> Unit {
        Unit {
            id: id.to_string(),
            code: code.to_string(),
            block: block.to_string(),
            floor,
            status: UnitStatus::Available,
            typology: "2BR".to_string(),
            area_m2: 64.0,
            price: 250_000.0,
            notes: String::new(),
            geometry: None,
        }
    }

    pub fn unit_with_geometry(id: &str, code: &str, geometry: Geometry) -> Unit {
        let mut u = unit(id, code, "A", Some(1));
        u.geometry = Some(geometry);
        u
    }

    pub fn marker_geometry(x: f32, y: f32, radius: f32) -> Geometry {
        Geometry::marker(Point::new(x, y), radius)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn cancelled_token_reports_stale() {
        let source = CancelSource::new();
        let token = source.token();
        assert!(!token.is_cancelled());
        source.cancel_all();
        assert!(token.is_cancelled());
        // Tokens issued after the cancellation are live again.
        assert!(!source.token().is_cancelled());
    }

    #[test]
    fn clear_geometry_nulls_every_listed_unit() {
        let backend = InMemoryBackend::new(vec![
            unit_with_geometry("u1", "101", marker_geometry(1.0, 1.0, 10.0)),
            unit_with_geometry("u2", "102", marker_geometry(2.0, 2.0, 10.0)),
        ]);
        backend
            .clear_geometry(&["u1".to_string(), "u2".to_string()])
            .expect("clear succeeds");
        assert!(backend.unit("u1").unwrap().geometry.is_none());
        assert!(backend.unit("u2").unwrap().geometry.is_none());
        assert_eq!(backend.clear_call_count(), 1);
    }

    #[test]
    fn injected_failure_surfaces_as_transport_error() {
        let backend = InMemoryBackend::new(vec![unit("u1", "101", "A", Some(1))]);
        backend.fail_writes(true);
        let err = backend
            .write_geometry("u1", &marker_geometry(0.0, 0.0, 10.0))
            .expect_err("write must fail");
        assert!(matches!(err, BackendError::Transport(_)));
    }
}
