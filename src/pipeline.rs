use crate::concurrency::for_each_limited;
use crate::config::{Credentials, RunConfig};
use crate::date::{date_token, Clock};
use crate::emit::emit;
use crate::error::{EventError, TransportError};
use crate::filters::select_events;
use crate::paths::{export_file_path, plan_export_paths, run_directory};
use crate::progress::ProgressScope;
use crate::reconcile::{reconcile, Reconciled};
use crate::service::ApiService;
use crate::signer::RequestSigner;
use crate::transport::{HttpConfig, HttpTransport, Transport};
use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::Date;

/// What happened to one event during a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventOutcome {
    Written { path: PathBuf, rows: u64 },
    /// The window held no data; no file was produced.
    Empty,
    Failed { stage: &'static str, error: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventReport {
    pub event: String,
    pub outcome: EventOutcome,
}

/// Per-event outcomes of a run, in catalog order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportSummary {
    pub run_date: Date,
    pub events: Vec<EventReport>,
}

impl ExportSummary {
    pub fn outcome(&self, event: &str) -> Option<&EventOutcome> {
        self.events.iter().find(|r| r.event == event).map(|r| &r.outcome)
    }
    pub fn written(&self) -> usize {
        self.count(|o| matches!(o, EventOutcome::Written { .. }))
    }
    pub fn empty(&self) -> usize {
        self.count(|o| matches!(o, EventOutcome::Empty))
    }
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, EventOutcome::Failed { .. }))
    }
    fn count(&self, pred: impl Fn(&EventOutcome) -> bool) -> usize {
        self.events.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// Lists the catalog, then requests, reconciles and emits each selected event.
pub struct DataExporter {
    config: RunConfig,
    service: ApiService,
}

impl DataExporter {
    pub fn new(config: RunConfig, service: ApiService) -> Self {
        Self { config, service }
    }

    /// Wire the HTTP transport described by `config`.
    pub fn connect(config: RunConfig, credentials: Credentials, clock: Arc<dyn Clock>) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(HttpConfig::from_run_config(&config))?;
        Ok(Self::with_transport(config, credentials, Arc::new(transport), clock))
    }

    pub fn with_transport(
        config: RunConfig,
        credentials: Credentials,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let signer = RequestSigner::new(credentials, config.expiry_policy());
        Self::new(config, ApiService::new(signer, transport, clock))
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn service(&self) -> &ApiService {
        &self.service
    }

    /// One full pass. Only a catalog failure is an error; per-event failures are
    /// logged and reported in the summary.
    pub fn run(&self) -> Result<ExportSummary> {
        let cfg = &self.config;
        let run_date = self.service.clock().today();
        tracing::info!(run_date = %date_token(run_date), "started data export");

        let catalog = self.service.event_names().context("retrieving the event catalog")?;
        let events = select_events(&catalog, &cfg.events_to_include, &cfg.events_to_exclude);
        tracing::info!(catalog = catalog.len(), selected = events.len(), "will attempt download for {:?}", events);
        tracing::info!(
            output = %run_directory(&cfg.output_root, run_date, cfg.subfolders_by_date).display(),
            window = %cfg.window(),
            "export settings"
        );

        let destinations = plan_export_paths(&cfg.output_root, run_date, &events, cfg.subfolders_by_date);
        for (event, dest) in events.iter().zip(&destinations) {
            if *dest != export_file_path(&cfg.output_root, run_date, event, cfg.subfolders_by_date) {
                tracing::warn!(event = %event, path = %dest.display(), "file name shared with another event; using a suffixed name");
            }
        }

        let reports = Mutex::new(Vec::with_capacity(events.len()));
        let progress = ProgressScope::count(cfg.progress, "Exporting events", events.len() as u64);

        for_each_limited(&events, cfg.concurrency, |idx, event| {
            let outcome = match self.export_event(event, &destinations[idx]) {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(event = %event, stage = e.stage(), error = %e, "event export failed; continuing");
                    EventOutcome::Failed { stage: e.stage(), error: e.to_string() }
                }
            };
            reports.lock().push((idx, EventReport { event: event.clone(), outcome }));
            progress.inc(1);
        });
        progress.finish("done");

        let mut reports = reports.into_inner();
        reports.sort_by_key(|(idx, _)| *idx);
        let summary = ExportSummary { run_date, events: reports.into_iter().map(|(_, r)| r).collect() };

        tracing::info!(
            written = summary.written(),
            empty = summary.empty(),
            failed = summary.failed(),
            "data export finished"
        );
        Ok(summary)
    }

    /// Requesting → Reconciling → Emitting for a single event, written to `dest`.
    pub fn export_event(&self, event: &str, dest: &Path) -> Result<EventOutcome, EventError> {
        tracing::info!(event = %event, "downloading event");
        let filter = [event.to_string()];
        let body = self.service.export(self.config.window(), Some(&filter[..]))?;

        match reconcile(body.as_deref())? {
            Reconciled::Empty => {
                tracing::info!(event = %event, "no data found");
                Ok(EventOutcome::Empty)
            }
            Reconciled::Records { records, header } => {
                tracing::info!(event = %event, records = records.len(), columns = header.len(), "retrieved records");
                let rows = emit(event, &records, &header, dest, self.service.clock())?;
                tracing::info!(event = %event, rows, "download complete");
                Ok(EventOutcome::Written { path: dest.to_path_buf(), rows })
            }
        }
    }
}
