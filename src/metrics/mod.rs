//! Prometheus counters for change propagation and the request pipeline.
//!
//! Counters are process-wide; [`gather_text`] renders them in the text
//! exposition format for whatever endpoint the host application exposes.


use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::Encoder;
use prometheus::IntCounter;
use prometheus::IntCounterVec;
use prometheus::Opts;
use prometheus::Registry;
use tracing::error;

lazy_static! {
    pub static ref FLUSH_COUNTER: IntCounter =
        IntCounter::new("atom_flushes", "Number of change notification flushes")
            .expect("metric can not be created");

    pub static ref NOTIFIED_WATCHERS: IntCounterVec = IntCounterVec::new(
        Opts::new("atom_notified_watchers", "Watchers whose callbacks ran, by class"),
        &["class"]
    )
    .expect("metric can not be created");

    pub static ref REQUESTS_DISPATCHED: IntCounterVec = IntCounterVec::new(
        Opts::new("atom_requests_dispatched", "Requests handed to the transport, by endpoint"),
        &["name"]
    )
    .expect("metric can not be created");

    pub static ref CACHE_HITS: IntCounterVec = IntCounterVec::new(
        Opts::new("atom_cache_hits", "Requests resolved from the response cache, by endpoint"),
        &["name"]
    )
    .expect("metric can not be created");

    pub static ref TRANSPORT_ERRORS: IntCounterVec = IntCounterVec::new(
        Opts::new("atom_transport_errors", "Requests converted into onError responses, by endpoint"),
        &["name"]
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new();
}

static REGISTER: Once = Once::new();

pub(crate) fn register_custom_metrics(registry: &Registry) {
    registry
        .register(Box::new(FLUSH_COUNTER.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(NOTIFIED_WATCHERS.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(REQUESTS_DISPATCHED.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(CACHE_HITS.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(TRANSPORT_ERRORS.clone()))
        .expect("collector can be registered");
}

/// Export metrics for Prometheus to scrape
pub fn gather_text() -> String {
    REGISTER.call_once(|| register_custom_metrics(&REGISTRY));

    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        error!("could not encode custom metrics: {}", e);
        return String::default();
    }
    String::from_utf8(buffer).unwrap_or_else(|e| {
        error!("custom metrics could not be from_utf8'd: {}", e);
        String::default()
    })
}
