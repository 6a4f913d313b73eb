//! Request accounting and per-owner counters, exported in Prometheus text
//! format from `GET /metrics`.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use dashmap::DashSet;
use parking_lot::Mutex;
use prometheus::{
    Encoder, Gauge, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder,
};

use crate::common::types::OwnerNickname;

/// Bounded window for the response-time average.
const MAX_RESPONSE_TIMES: usize = 1000;

pub struct Metrics {
    registry: Registry,

    pub total_requests: IntCounter,
    pub successful_requests: IntCounter,
    pub failed_requests: IntCounter,
    pub upload_requests: IntCounter,
    pub delete_requests: IntCounter,
    pub download_requests: IntCounter,
    pub bytes_uploaded: IntCounter,
    pub bytes_downloaded: IntCounter,
    pub active_connections: IntGauge,
    pub total_connections: IntCounter,

    errors: IntCounterVec,

    owner_uploads: IntCounterVec,
    owner_deletes: IntCounterVec,
    owner_songs: IntGaugeVec,
    owner_storage: IntGaugeVec,
    known_owners: DashSet<String>,

    response_time_avg: Gauge,
    uptime_seconds: IntGauge,
    response_times: Mutex<VecDeque<Duration>>,
    start: Instant,
}

/// Point-in-time view of one owner's counters.
#[derive(Debug, serde::Serialize)]
pub struct OwnerMetricsView {
    pub owner_id: String,
    pub uploads: u64,
    pub deletes: u64,
    pub songs_count: i64,
    pub storage_bytes: i64,
}

macro_rules! counter {
    ($registry:expr, $name:literal, $help:literal) => {{
        let c = IntCounter::new($name, $help).expect("metric definition");
        $registry.register(Box::new(c.clone())).expect("register");
        c
    }};
}

macro_rules! gauge {
    ($registry:expr, $name:literal, $help:literal) => {{
        let g = IntGauge::new($name, $help).expect("metric definition");
        $registry.register(Box::new(g.clone())).expect("register");
        g
    }};
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let errors = IntCounterVec::new(
            Opts::new("wavy_errors_total", "Error responses by status code"),
            &["status"],
        )
        .expect("metric definition");
        registry.register(Box::new(errors.clone())).expect("register");

        let owner_uploads = IntCounterVec::new(
            Opts::new("wavy_owner_uploads_total", "Total uploads from this owner"),
            &["owner"],
        )
        .expect("metric definition");
        registry
            .register(Box::new(owner_uploads.clone()))
            .expect("register");

        let owner_deletes = IntCounterVec::new(
            Opts::new("wavy_owner_deletes_total", "Total deletes from this owner"),
            &["owner"],
        )
        .expect("metric definition");
        registry
            .register(Box::new(owner_deletes.clone()))
            .expect("register");

        let owner_songs = IntGaugeVec::new(
            Opts::new("wavy_owner_songs_count", "Current songs count for this owner"),
            &["owner"],
        )
        .expect("metric definition");
        registry
            .register(Box::new(owner_songs.clone()))
            .expect("register");

        let owner_storage = IntGaugeVec::new(
            Opts::new("wavy_owner_storage_bytes", "Storage used by this owner"),
            &["owner"],
        )
        .expect("metric definition");
        registry
            .register(Box::new(owner_storage.clone()))
            .expect("register");

        let response_time_avg = Gauge::new(
            "wavy_response_time_avg",
            "Average response time over the recent window, milliseconds",
        )
        .expect("metric definition");
        registry
            .register(Box::new(response_time_avg.clone()))
            .expect("register");

        let uptime_seconds = gauge!(registry, "wavy_uptime_seconds", "Server uptime in seconds");

        Self {
            total_requests: counter!(registry, "wavy_requests_total", "Total HTTP requests"),
            successful_requests: counter!(
                registry,
                "wavy_requests_successful",
                "Total successful requests"
            ),
            failed_requests: counter!(registry, "wavy_requests_failed", "Total failed requests"),
            upload_requests: counter!(registry, "wavy_upload_requests", "Total upload requests"),
            delete_requests: counter!(registry, "wavy_delete_requests", "Total DELETE requests"),
            download_requests: counter!(
                registry,
                "wavy_download_requests",
                "Total download requests"
            ),
            bytes_uploaded: counter!(registry, "wavy_bytes_uploaded_total", "Total bytes uploaded"),
            bytes_downloaded: counter!(
                registry,
                "wavy_bytes_downloaded_total",
                "Total bytes downloaded"
            ),
            active_connections: gauge!(
                registry,
                "wavy_active_connections",
                "Current active connections"
            ),
            total_connections: counter!(
                registry,
                "wavy_connections_total",
                "Total connections accepted"
            ),
            errors,
            owner_uploads,
            owner_deletes,
            owner_songs,
            owner_storage,
            known_owners: DashSet::new(),
            response_time_avg,
            uptime_seconds,
            response_times: Mutex::new(VecDeque::with_capacity(MAX_RESPONSE_TIMES)),
            start: Instant::now(),
            registry,
        }
    }

    pub fn record_error_status(&self, status: u16) {
        self.errors.with_label_values(&[&status.to_string()]).inc();
    }

    pub fn error_count(&self, status: u16) -> u64 {
        self.errors.with_label_values(&[&status.to_string()]).get()
    }

    pub fn record_response_time(&self, duration: Duration) {
        let mut times = self.response_times.lock();
        if times.len() == MAX_RESPONSE_TIMES {
            times.pop_front();
        }
        times.push_back(duration);
    }

    pub fn avg_response_time_ms(&self) -> f64 {
        let times = self.response_times.lock();
        if times.is_empty() {
            return 0.0;
        }
        let total: Duration = times.iter().sum();
        total.as_secs_f64() * 1000.0 / times.len() as f64
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start.elapsed().as_secs()
    }

    /// `bytes` is the placed on-disk size of the audio, the same unit
    /// `record_owner_delete` subtracts and startup seeding sets.
    pub fn record_owner_upload(&self, owner: &OwnerNickname, bytes: u64) {
        self.known_owners.insert(owner.0.clone());
        self.owner_uploads.with_label_values(&[&owner.0]).inc();
        self.owner_songs.with_label_values(&[&owner.0]).inc();
        self.owner_storage
            .with_label_values(&[&owner.0])
            .add(bytes as i64);
    }

    pub fn record_owner_delete(&self, owner: &OwnerNickname, bytes: u64) {
        self.known_owners.insert(owner.0.clone());
        self.owner_deletes.with_label_values(&[&owner.0]).inc();
        self.owner_songs.with_label_values(&[&owner.0]).dec();
        self.owner_storage
            .with_label_values(&[&owner.0])
            .sub(bytes as i64);
    }

    /// Seeds the per-owner gauges when the index is rebuilt at startup.
    pub fn seed_owner(&self, owner: &OwnerNickname, songs: i64, storage_bytes: i64) {
        self.known_owners.insert(owner.0.clone());
        self.owner_songs.with_label_values(&[&owner.0]).set(songs);
        self.owner_storage
            .with_label_values(&[&owner.0])
            .set(storage_bytes);
    }

    pub fn owner_snapshot(&self, owner: &OwnerNickname) -> Option<OwnerMetricsView> {
        if !self.known_owners.contains(&owner.0) {
            return None;
        }
        Some(OwnerMetricsView {
            owner_id: owner.0.clone(),
            uploads: self.owner_uploads.with_label_values(&[&owner.0]).get(),
            deletes: self.owner_deletes.with_label_values(&[&owner.0]).get(),
            songs_count: self.owner_songs.with_label_values(&[&owner.0]).get(),
            storage_bytes: self.owner_storage.with_label_values(&[&owner.0]).get(),
        })
    }

    /// Prometheus text exposition of every registered metric.
    pub fn render(&self) -> String {
        self.response_time_avg.set(self.avg_response_time_ms());
        self.uptime_seconds.set(self.uptime_secs() as i64);

        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        if encoder.encode(&self.registry.gather(), &mut buf).is_err() {
            return String::new();
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped request timer: created at request entry, marks the final status,
/// and on destruction records the elapsed time and outcome counters. Drop
/// without a mark (a cancelled handler) counts as a failure.
pub struct RequestTimer<'a> {
    metrics: &'a Metrics,
    start: Instant,
    status: Option<u16>,
}

impl<'a> RequestTimer<'a> {
    pub fn new(metrics: &'a Metrics) -> Self {
        metrics.total_requests.inc();
        metrics.total_connections.inc();
        metrics.active_connections.inc();
        Self {
            metrics,
            start: Instant::now(),
            status: None,
        }
    }

    pub fn mark(&mut self, status: u16) {
        self.status = Some(status);
    }
}

impl Drop for RequestTimer<'_> {
    fn drop(&mut self) {
        self.metrics.record_response_time(self.start.elapsed());
        self.metrics.active_connections.dec();

        match self.status {
            Some(status) if status < 400 => self.metrics.successful_requests.inc(),
            Some(status) => {
                self.metrics.failed_requests.inc();
                self.metrics.record_error_status(status);
            }
            None => self.metrics.failed_requests.inc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_records_outcome_on_drop() {
        let metrics = Metrics::new();
        {
            let mut timer = RequestTimer::new(&metrics);
            timer.mark(200);
        }
        {
            let mut timer = RequestTimer::new(&metrics);
            timer.mark(403);
        }
        assert_eq!(metrics.total_requests.get(), 2);
        assert_eq!(metrics.successful_requests.get(), 1);
        assert_eq!(metrics.failed_requests.get(), 1);
        assert_eq!(metrics.error_count(403), 1);
        assert_eq!(metrics.active_connections.get(), 0);
    }

    #[test]
    fn unmarked_timer_counts_as_failure() {
        let metrics = Metrics::new();
        drop(RequestTimer::new(&metrics));
        assert_eq!(metrics.failed_requests.get(), 1);
    }

    #[test]
    fn response_window_is_bounded() {
        let metrics = Metrics::new();
        for _ in 0..(MAX_RESPONSE_TIMES + 100) {
            metrics.record_response_time(Duration::from_millis(10));
        }
        assert_eq!(metrics.response_times.lock().len(), MAX_RESPONSE_TIMES);
        assert!((metrics.avg_response_time_ms() - 10.0).abs() < 0.5);
    }

    #[test]
    fn owner_counters_track_uploads_and_deletes() {
        let metrics = Metrics::new();
        let owner = OwnerNickname::from("alice");

        assert!(metrics.owner_snapshot(&owner).is_none());

        metrics.record_owner_upload(&owner, 4096);
        metrics.record_owner_upload(&owner, 1024);
        metrics.record_owner_delete(&owner, 1024);

        let view = metrics.owner_snapshot(&owner).unwrap();
        assert_eq!(view.uploads, 2);
        assert_eq!(view.deletes, 1);
        assert_eq!(view.songs_count, 1);
        assert_eq!(view.storage_bytes, 4096);
    }

    #[test]
    fn render_exposes_counters() {
        let metrics = Metrics::new();
        metrics.upload_requests.inc();
        let text = metrics.render();
        assert!(text.contains("wavy_upload_requests 1"));
        assert!(text.contains("wavy_response_time_avg"));
        assert!(text.contains("wavy_uptime_seconds"));
    }
}
