//! Best-effort reverse geocoding
//!
//! `resolve` is total: every failure mode (I/O error, timeout, panicking
//! geocoder) degrades to the empty string, inline or on the lookup worker.
//!
//! Bounded lookups run on one long-lived worker thread per resolver, so a
//! geocoder that hangs holds at most one thread. Requests queued behind a
//! hung call time out, and the worker skips them once their caller has
//! given up.

use crate::domain::types::AddressRecord;
use crate::infra::metrics::{GeocodeOutcome, Metrics};
use crate::io::geocoder::{GeocodeError, Geocoder};
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Candidates requested per lookup
pub const MAX_RESULTS: usize = 1;

const UNKNOWN_ADMIN_AREA: &str = "unknown";
const UNKNOWN_POSTAL_CODE: &str = "unknown zip code";
const UNKNOWN_COUNTRY: &str = "unknown country";

/// Merge geocoding candidates into one display string.
///
/// Locality, admin area and country come from the first candidate; the
/// postal code is the first non-empty one in candidate order.
pub fn format_address(candidates: &[AddressRecord]) -> String {
    let Some(first) = candidates.first() else {
        return String::new();
    };

    let locality = first.locality.as_deref().unwrap_or("");
    let admin_area = first.admin_area.as_deref().unwrap_or(UNKNOWN_ADMIN_AREA);
    let country_code = first.country_code.as_deref().unwrap_or(UNKNOWN_COUNTRY);
    let postal_code = candidates
        .iter()
        .filter_map(|c| c.postal_code.as_deref())
        .find(|code| !code.is_empty())
        .unwrap_or(UNKNOWN_POSTAL_CODE);

    let mut result = String::new();
    if !locality.is_empty() {
        result.push_str(locality);
        result.push_str(", ");
    }
    result.push_str(admin_area);
    result.push_str(", ");
    result.push_str(postal_code);
    result.push_str(", ");
    result.push_str(country_code);
    result
}

type LookupResult = Result<Vec<AddressRecord>, GeocodeError>;

/// Run one lookup, turning a panicking geocoder into an error
fn guarded_lookup(geocoder: &dyn Geocoder, latitude: f64, longitude: f64) -> LookupResult {
    panic::catch_unwind(AssertUnwindSafe(|| geocoder.from_location(latitude, longitude, MAX_RESULTS)))
        .unwrap_or_else(|_| Err(GeocodeError::Unavailable("geocoder panicked".into())))
}

struct LookupJob {
    latitude: f64,
    longitude: f64,
    submitted: Instant,
    timeout: Duration,
    reply: mpsc::SyncSender<LookupResult>,
}

/// Handle to the lookup thread. The thread exits once the handle is dropped
/// and its current call returns.
struct LookupWorker {
    jobs: mpsc::Sender<LookupJob>,
}

impl LookupWorker {
    fn spawn(geocoder: Arc<dyn Geocoder>) -> std::io::Result<Self> {
        let (jobs, queue) = mpsc::channel::<LookupJob>();
        thread::Builder::new().name("geocoder".to_string()).spawn(move || {
            for job in queue {
                // Replies fail harmlessly once the caller has stopped waiting
                if job.submitted.elapsed() >= job.timeout {
                    debug!(latitude = %job.latitude, longitude = %job.longitude, "geocode_request_expired");
                    let _ = job.reply.send(Err(GeocodeError::Timeout(job.timeout)));
                    continue;
                }
                let _ = job.reply.send(guarded_lookup(geocoder.as_ref(), job.latitude, job.longitude));
            }
        })?;
        debug!("geocoder_worker_started");
        Ok(Self { jobs })
    }
}

pub struct AddressResolver {
    geocoder: Arc<dyn Geocoder>,
    worker: Mutex<Option<LookupWorker>>,
    metrics: Arc<Metrics>,
}

impl AddressResolver {
    pub fn new(geocoder: Arc<dyn Geocoder>, metrics: Arc<Metrics>) -> Self {
        Self { geocoder, worker: Mutex::new(None), metrics }
    }

    /// Resolve a coordinate to an address, or `""` if none is available
    /// within `timeout`. A zero timeout runs the lookup on the caller thread.
    pub fn resolve(&self, latitude: f64, longitude: f64, timeout: Duration) -> String {
        let start = Instant::now();
        let result = self.lookup(latitude, longitude, timeout);
        let latency_ms = start.elapsed().as_millis() as u64;

        let (address, outcome) = match result {
            Ok(candidates) if candidates.is_empty() => (String::new(), GeocodeOutcome::NoCandidates),
            Ok(candidates) => (format_address(&candidates), GeocodeOutcome::Resolved),
            Err(GeocodeError::Timeout(limit)) => {
                warn!(
                    latitude = %latitude,
                    longitude = %longitude,
                    timeout_ms = %limit.as_millis(),
                    "geocode_timeout"
                );
                (String::new(), GeocodeOutcome::TimedOut)
            }
            Err(e) => {
                warn!(latitude = %latitude, longitude = %longitude, error = %e, "geocode_failed");
                (String::new(), GeocodeOutcome::Failed)
            }
        };

        debug!(latency_ms = %latency_ms, address = %address, "geocode_done");
        self.metrics.record_geocode(outcome, latency_ms);
        address
    }

    fn lookup(&self, latitude: f64, longitude: f64, timeout: Duration) -> LookupResult {
        if timeout.is_zero() {
            return guarded_lookup(self.geocoder.as_ref(), latitude, longitude);
        }

        let (reply, rx) = mpsc::sync_channel(1);
        self.submit(LookupJob { latitude, longitude, submitted: Instant::now(), timeout, reply })?;

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(GeocodeError::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => {
                Err(GeocodeError::Unavailable("geocoder worker exited without a result".into()))
            }
        }
    }

    /// Queue a job on the worker, starting a new worker if none is running
    fn submit(&self, job: LookupJob) -> Result<(), GeocodeError> {
        let mut worker = self.worker.lock();
        let job = match worker.as_ref() {
            Some(running) => match running.jobs.send(job) {
                Ok(()) => return Ok(()),
                Err(mpsc::SendError(job)) => {
                    warn!("geocoder_worker_restarted");
                    job
                }
            },
            None => job,
        };

        let started = LookupWorker::spawn(Arc::clone(&self.geocoder))?;
        started
            .jobs
            .send(job)
            .map_err(|_| GeocodeError::Unavailable("geocoder worker exited".into()))?;
        *worker = Some(started);
        Ok(())
    }
}
