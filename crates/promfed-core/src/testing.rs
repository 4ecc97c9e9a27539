//! In-memory upstream used by the engine tests.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, SystemTime},
};

use async_trait::async_trait;

use promfed_model::{METRIC_NAME_LABEL, Sample};
use promfed_upstream::{UpstreamApi, UpstreamError};

enum Response {
    Samples(Vec<Sample>),
    Fail,
    Hang,
}

/// Scriptable [`UpstreamApi`] that records concurrency.
///
/// Names without a scripted response answer with one sample named after the query.
#[derive(Default)]
pub(crate) struct MockUpstream {
    labels: Mutex<Option<Vec<String>>>,
    responses: Mutex<HashMap<String, Response>>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
    completed: AtomicUsize,
}

pub(crate) fn sample(pairs: &[(&str, &str)], timestamp_ms: i64, value: f64) -> Sample {
    let labels: BTreeMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Sample::new(labels, timestamp_ms, value)
}

impl MockUpstream {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn with_delay(self: Arc<Self>, delay: Duration) -> Arc<Self> {
        let mut inner = Arc::into_inner(self).expect("configure before sharing");
        inner.delay = delay;
        Arc::new(inner)
    }

    pub(crate) fn set_labels(&self, labels: &[&str]) {
        *self.labels.lock().unwrap() = Some(labels.iter().map(|s| s.to_string()).collect());
    }

    pub(crate) fn fail_labels(&self) {
        *self.labels.lock().unwrap() = None;
    }

    pub(crate) fn respond(&self, name: &str, samples: Vec<Sample>) {
        self.responses
            .lock()
            .unwrap()
            .insert(name.to_string(), Response::Samples(samples));
    }

    pub(crate) fn fail(&self, name: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(name.to_string(), Response::Fail);
    }

    pub(crate) fn hang(&self, name: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(name.to_string(), Response::Hang);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn scripted(&self, name: &str) -> Option<Result<Vec<Sample>, ()>> {
        match self.responses.lock().unwrap().get(name) {
            Some(Response::Samples(samples)) => Some(Ok(samples.clone())),
            Some(Response::Fail) => Some(Err(())),
            Some(Response::Hang) => None,
            None => Some(Ok(vec![sample(&[(METRIC_NAME_LABEL, name)], 1_000, 1.0)])),
        }
    }
}

struct InFlight<'a>(&'a MockUpstream);

impl<'a> InFlight<'a> {
    fn enter(upstream: &'a MockUpstream) -> Self {
        upstream.calls.fetch_add(1, Ordering::SeqCst);
        let now = upstream.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        upstream.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Self(upstream)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.0.completed.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl UpstreamApi for MockUpstream {
    async fn label_values(&self, label: &str) -> Result<Vec<String>, UpstreamError> {
        assert_eq!(label, METRIC_NAME_LABEL);
        self.labels
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| UpstreamError::InvalidResponse("labels unavailable".into()))
    }

    async fn instant_query(
        &self,
        expr: &str,
        _at: SystemTime,
    ) -> Result<Vec<Sample>, UpstreamError> {
        let _guard = InFlight::enter(self);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.scripted(expr) {
            Some(Ok(samples)) => Ok(samples),
            Some(Err(())) => Err(UpstreamError::Status {
                status: 503,
                body: format!("{expr} unavailable"),
            }),
            None => std::future::pending().await,
        }
    }
}
