//! # Pipeline Module
//!
//! Drives discovery, download, structuring and storage for one court across
//! one or more dates.
//!
//! ## Key Components
//!
//! - `Pipeline`: the orchestrator, composed from a court profile, a fetcher,
//!   a structurer and a repository
//! - `PipelineConfig`: stage switches and worker pool sizes
//! - `RunReport` / `DateReport`: per-date state, counts and document outcomes
//!
//! ## Features
//!
//! - Per-date state machine `DISCOVER → FILTER → DOWNLOAD → STRUCTURE → STORE → DONE`,
//!   with `FAILED` only when the listing cannot be retrieved
//! - Downloads and structuring fan out over bounded worker pools and fan back
//!   in before the next stage; sequential mode uses a pool of one
//! - A failed document is recorded and skipped, never failing the date
//! - URL and content dedupe shared across every date of a run
//! - `metadata.json` written per date regardless of partial failures

mod config;
mod report;

pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use report::{DateReport, DocumentOutcome, RunReport, Stage, StageCounts};

use crate::classifier::{Classification, LinkClassifier};
use crate::extract::{Extractor, GeminiConfig, GeminiExtractor};
use crate::fetcher::{DownloadOutcome, Fetcher, FetcherConfig, Layout, ListingLink, RunContext};
use crate::profile::CourtProfile;
use crate::store::{DbError, NewCase, Repository};
use crate::structurer::{StructureFailure, Structured, Structurer};
use crate::tagging;
use chrono::{Local, NaiveDate};
use futures::future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, error, info, instrument, warn};

/// Progress notifications for interactive front ends
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// A date entered a new state
    Stage { date: NaiveDate, stage: Stage },
    /// A document finished a stage
    Document { date: NaiveDate, name: String },
}

/// Cause-list ingestion pipeline for one court
pub struct Pipeline<E> {
    profile: CourtProfile,
    classifier: LinkClassifier,
    fetcher: Fetcher,
    structurer: Arc<Structurer<E>>,
    repo: Repository,
    layout: Layout,
    config: PipelineConfig,
    progress: Option<mpsc::Sender<ProgressEvent>>,
}

impl Pipeline<GeminiExtractor> {
    /// Build a Gemini-backed pipeline on the database file at `database`
    pub async fn connect(
        profile: CourtProfile,
        fetcher_config: FetcherConfig,
        gemini_config: GeminiConfig,
        database: &str,
        config: PipelineConfig,
    ) -> crate::Result<Self> {
        profile.validate()?;
        let fetcher = Fetcher::new(fetcher_config)?;
        let extractor = GeminiExtractor::new(gemini_config)?;
        let repo = Repository::new_from_path(database).await?;
        Ok(Self::new(profile, fetcher, extractor, repo, config))
    }
}

impl<E: Extractor + 'static> Pipeline<E> {
    /// Compose a pipeline
    pub fn new(
        profile: CourtProfile,
        fetcher: Fetcher,
        extractor: E,
        repo: Repository,
        config: PipelineConfig,
    ) -> Self {
        let structurer =
            Structurer::new(extractor, &profile).reuse_companions(config.reuse_companions);
        Self {
            classifier: LinkClassifier::new(&profile),
            layout: Layout::new(&config.output_dir, &profile.code),
            structurer: Arc::new(structurer),
            profile,
            fetcher,
            repo,
            config,
            progress: None,
        }
    }

    /// Send progress events to `sender`
    pub fn with_progress(mut self, sender: mpsc::Sender<ProgressEvent>) -> Self {
        self.progress = Some(sender);
        self
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Run every date in order with one shared run context
    #[instrument(skip(self, dates), fields(court = %self.profile.code))]
    pub async fn run(&self, dates: &[NaiveDate]) -> RunReport {
        let ctx = RunContext::new();
        let court_id = self.seed_court().await;

        let mut report = RunReport::default();
        for date in dates {
            report.dates.push(self.run_date(&ctx, court_id, *date).await);
        }

        if self.config.auto_tag && self.config.process {
            match tagging::apply_auto_tags(&self.repo).await {
                Ok(summary) => report.tagging = Some(summary),
                Err(e) => warn!("Auto-tagging failed: {}", e),
            }
        }

        report.log_summary();
        report
    }

    /// Structure and store the documents already present in `dir`
    #[instrument(skip(self))]
    pub async fn process_directory(&self, dir: &Path) -> RunReport {
        let date = dir
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| NaiveDate::parse_from_str(n, "%Y-%m-%d").ok())
            .unwrap_or_else(|| Local::now().date_naive());
        let court_id = self.seed_court().await;

        let mut date_report = DateReport::new(date, &self.profile.code);
        self.collect_existing(&mut date_report, dir).await;
        self.process_documents(&mut date_report, court_id).await;
        date_report.finish();
        self.write_metadata(&date_report, dir).await;

        let mut report = RunReport {
            dates: vec![date_report],
            tagging: None,
        };
        if self.config.auto_tag {
            match tagging::apply_auto_tags(&self.repo).await {
                Ok(summary) => report.tagging = Some(summary),
                Err(e) => warn!("Auto-tagging failed: {}", e),
            }
        }
        report.log_summary();
        report
    }

    /// Run the state machine for one date
    #[instrument(skip(self, ctx, court_id))]
    pub async fn run_date(
        &self,
        ctx: &RunContext,
        court_id: Option<i64>,
        date: NaiveDate,
    ) -> DateReport {
        let dir = self.layout.date_dir(date);
        let mut report = DateReport::new(date, &self.profile.code);
        self.notify_stage(date, Stage::Discover).await;

        if self.config.scrape {
            let url = self.profile.listing_url_for(date);
            report.listing_url = Some(url.clone());

            let links = match self
                .fetcher
                .fetch_listing(&url, &self.profile.document_extensions)
                .await
            {
                Ok(links) => links,
                Err(e) => {
                    report.fail(format!("listing {} unreachable: {}", url, e));
                    self.notify_stage(date, Stage::Failed).await;
                    self.write_metadata(&report, &dir).await;
                    return report;
                }
            };
            report.counts.discovered = links.len();

            self.enter(&mut report, Stage::Filter).await;
            let selected = self.select(links);
            report.counts.candidates = selected.len();
            info!(
                "Selected {} of {} links for {}",
                selected.len(),
                report.counts.discovered,
                date
            );

            self.enter(&mut report, Stage::Download).await;
            self.prepare_downloads(ctx, &selected, &dir).await;
            report.documents = self.download_all(ctx, selected, &dir, date).await;
        } else {
            self.enter(&mut report, Stage::Download).await;
            self.collect_existing(&mut report, &dir).await;
        }
        report.count_downloads();

        if self.config.process {
            self.process_documents(&mut report, court_id).await;
        }

        report.finish();
        self.notify_stage(date, Stage::Done).await;
        self.write_metadata(&report, &dir).await;
        report
    }

    fn select(&self, links: Vec<ListingLink>) -> Vec<(ListingLink, Classification)> {
        links
            .into_iter()
            .filter_map(|link| {
                let verdict =
                    self.classifier
                        .classify(&link.url, &link.text, link.content_type.as_deref());
                verdict
                    .passes(self.config.min_confidence)
                    .then_some((link, verdict))
            })
            .collect()
    }

    /// Register files from earlier runs and assign paths in listing order
    async fn prepare_downloads(
        &self,
        ctx: &RunContext,
        selected: &[(ListingLink, Classification)],
        dir: &Path,
    ) {
        if let Err(e) = self
            .fetcher
            .register_existing(ctx, dir, &self.profile.document_extensions)
            .await
        {
            warn!("Cannot index existing documents in {}: {}", dir.display(), e);
        }
        for (link, _) in selected {
            self.fetcher.reserve(ctx, &link.url, dir).await;
        }
    }

    async fn download_all(
        &self,
        ctx: &RunContext,
        selected: Vec<(ListingLink, Classification)>,
        dir: &Path,
        date: NaiveDate,
    ) -> Vec<DocumentOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.config.download_concurrency()));

        let tasks = selected.into_iter().map(|(link, verdict)| {
            let semaphore = Arc::clone(&semaphore);
            let fetcher = self.fetcher.clone();
            let ctx = ctx.clone();
            let dir = dir.to_path_buf();

            tokio::spawn(async move {
                let _permit = semaphore.acquire().await;
                let result = fetcher.download(&ctx, &link.url, &dir).await;
                (link, verdict, result)
            })
        });

        let mut outcomes = Vec::new();
        for joined in future::join_all(tasks).await {
            let outcome = match joined {
                Ok((link, verdict, result)) => {
                    let outcome = DocumentOutcome::selected(&link, &verdict);
                    match result {
                        Ok(DownloadOutcome::Downloaded(record))
                        | Ok(DownloadOutcome::Reused(record)) => outcome.with_record(&record),
                        Ok(DownloadOutcome::AlreadySeen) => {
                            outcome.skip("already handled in this run")
                        }
                        Ok(DownloadOutcome::DuplicateContent { duplicate_of }) => outcome.skip(
                            format!("duplicate content of {}", duplicate_of.display()),
                        ),
                        Err(e) => {
                            warn!("Download failed for {}: {}", link.url, e);
                            let mut outcome = outcome;
                            outcome.fail(Stage::Download, e.to_string());
                            outcome
                        }
                    }
                }
                Err(e) => {
                    error!("Download worker panicked: {}", e);
                    let mut outcome = DocumentOutcome::default();
                    outcome.fail(Stage::Download, format!("worker failed: {}", e));
                    outcome
                }
            };
            self.notify_document(date, &outcome).await;
            outcomes.push(outcome);
        }
        outcomes
    }

    async fn collect_existing(&self, report: &mut DateReport, dir: &Path) {
        match existing_documents(dir, &self.profile.document_extensions).await {
            Ok(paths) => {
                info!("Found {} documents in {}", paths.len(), dir.display());
                report.counts.discovered = paths.len();
                report.counts.candidates = paths.len();
                report.documents = paths.iter().map(|p| DocumentOutcome::existing(p)).collect();
            }
            Err(e) => warn!("Cannot read {}: {}", dir.display(), e),
        }
        report.count_downloads();
    }

    async fn process_documents(&self, report: &mut DateReport, court_id: Option<i64>) {
        let date = report.date;

        self.enter(report, Stage::Structure).await;
        let usable: Vec<(usize, PathBuf)> = report
            .documents
            .iter()
            .enumerate()
            .filter(|(_, d)| d.is_usable())
            .filter_map(|(i, d)| d.path.clone().map(|p| (i, p)))
            .collect();

        let semaphore = Arc::new(Semaphore::new(self.config.processing_concurrency()));
        let indices: Vec<usize> = usable.iter().map(|(index, _)| *index).collect();
        let tasks = usable.into_iter().map(|(_, path)| {
            let semaphore = Arc::clone(&semaphore);
            let structurer = Arc::clone(&self.structurer);

            tokio::spawn(async move {
                let _permit = semaphore.acquire().await;
                structurer.structure(&path).await
            })
        });

        let mut structured: Vec<(usize, Structured)> = Vec::new();
        let results = future::join_all(tasks).await;
        for (index, joined) in indices.into_iter().zip(results) {
            match joined {
                Ok(Ok(doc)) => {
                    let outcome = &mut report.documents[index];
                    outcome.stage = Some(Stage::Structure);
                    outcome.list_date = Some(doc.list_date);
                    outcome.bench = Some(doc.doc.bench_label.clone());
                    outcome.cases_extracted = doc.doc.cases.len();
                    structured.push((index, doc));
                }
                Ok(Err(failure)) => {
                    record_structure_failure(&mut report.documents[index], &failure);
                }
                Err(e) => {
                    error!("Structuring worker panicked: {}", e);
                    report.documents[index]
                        .fail(Stage::Structure, format!("worker failed: {}", e));
                }
            }
        }
        structured.sort_by_key(|(index, _)| *index);
        report.counts.structured = structured.len();

        self.enter(report, Stage::Store).await;
        for (index, doc) in &structured {
            report.counts.persist_attempts += 1;
            let outcome = &mut report.documents[*index];

            let result = match court_id {
                Some(court_id) => self.store_document(court_id, outcome, doc).await,
                None => Err(DbError::NotFound(format!("court {}", self.profile.code))),
            };
            match result {
                Ok(stored) => {
                    outcome.stage = Some(Stage::Store);
                    outcome.cases_stored = stored;
                    report.counts.persisted += 1;
                }
                Err(e) => {
                    warn!(
                        "Failed to persist {}: {}",
                        outcome.filename.as_deref().unwrap_or_default(),
                        e
                    );
                    outcome.fail(Stage::Store, e.to_string());
                    report.counts.persist_failures += 1;
                }
            }
            self.notify_document(date, &report.documents[*index]).await;
        }

        report.counts.failures = report.documents.iter().filter(|d| d.error.is_some()).count();
    }

    /// Persist one structured document; returns the number of cases stored
    async fn store_document(
        &self,
        court_id: i64,
        outcome: &DocumentOutcome,
        structured: &Structured,
    ) -> Result<usize, DbError> {
        let doc = &structured.doc;
        let bench_id = self
            .repo
            .get_or_create_bench(court_id, &doc.bench_label, doc.judges_opt())
            .await?;

        let list_type = doc.list_type(&self.profile.default_list_type);
        let path = outcome.path.as_ref().map(|p| p.to_string_lossy().into_owned());
        let cause_list_id = self
            .repo
            .create_or_update_cause_list(
                court_id,
                bench_id,
                structured.list_date,
                &list_type,
                outcome.url.as_deref(),
                path.as_deref(),
            )
            .await?;

        let mut stored = 0;
        let mut last_error = None;
        for case in &doc.cases {
            match self.repo.create_case(cause_list_id, &NewCase::from(case)).await {
                Ok(_) => stored += 1,
                Err(e) => {
                    warn!("Failed to store case {}: {}", case.case_number, e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if stored == 0 => Err(e),
            _ => {
                debug!(
                    "Stored {} of {} cases in cause list {}",
                    stored,
                    doc.cases.len(),
                    cause_list_id
                );
                Ok(stored)
            }
        }
    }

    async fn seed_court(&self) -> Option<i64> {
        match self.repo.seed_court(&self.profile).await {
            Ok(id) => Some(id),
            Err(e) => {
                error!("Cannot seed court {}: {}", self.profile.code, e);
                None
            }
        }
    }

    async fn enter(&self, report: &mut DateReport, stage: Stage) {
        report.advance(stage);
        self.notify_stage(report.date, stage).await;
    }

    async fn notify_stage(&self, date: NaiveDate, stage: Stage) {
        if let Some(progress) = &self.progress {
            let _ = progress.send(ProgressEvent::Stage { date, stage }).await;
        }
    }

    async fn notify_document(&self, date: NaiveDate, outcome: &DocumentOutcome) {
        if let Some(progress) = &self.progress {
            let name = outcome
                .filename
                .clone()
                .or_else(|| outcome.url.clone())
                .unwrap_or_default();
            let _ = progress.send(ProgressEvent::Document { date, name }).await;
        }
    }

    async fn write_metadata(&self, report: &DateReport, dir: &Path) {
        match report.write_metadata(dir).await {
            Ok(path) => debug!("Wrote {}", path.display()),
            Err(e) => warn!("Failed to write metadata in {}: {}", dir.display(), e),
        }
    }
}

fn record_structure_failure(outcome: &mut DocumentOutcome, failure: &StructureFailure) {
    warn!(
        file = %failure.file.display(),
        stage = %failure.stage,
        "Structuring failed: {}",
        failure.message
    );
    outcome.fail(Stage::Structure, failure.to_string());
}

/// Documents with an accepted extension in `dir`, sorted by name
async fn existing_documents(dir: &Path, extensions: &[String]) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_lowercase();
        let accepted = extensions.iter().any(|ext| name.ends_with(&ext.to_lowercase()));
        if accepted && entry.file_type().await?.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{ExtractError, MockExtractor};
    use crate::fetcher::FetcherConfig;
    use std::time::Duration;
    use tempfile::TempDir;

    const DOC_ONE: &str = "COURT NO. 1\n\nHON'BLE MR. JUSTICE A\n\n1. **W.P.(C) 1/2024**\n   * ACME LTD. Vs. UNION OF INDIA\n\n2. **FAO 2/2024**\n   * RAM Vs. SHYAM\n";
    const DOC_TWO: &str = "COURT NO. 2\n\nHON'BLE MS. JUSTICE B\n\n1. **CRL.A. 3/2024**\n   * STATE Vs. X\n";

    fn listing_html() -> String {
        r#"<html><body>
            <a href="/files/court1_12.06.2024.pdf">Cause List Court 1</a>
            <a href="/files/court2_12.06.2024.pdf">Cause List Court 2</a>
            <a href="/files/court2_copy.pdf">Daily List Court 2 (copy)</a>
            <a href="/files/broken.pdf">Cause List Court 9</a>
            <a href="/files/vc_sop.pdf">Video Conferencing SOP</a>
            <a href="/notice">Notice Board</a>
        </body></html>"#
            .to_string()
    }

    fn profile_for(server: &mockito::Server) -> CourtProfile {
        CourtProfile {
            listing_url: format!("{}/current", server.url()),
            ..CourtProfile::delhi_high_court()
        }
    }

    fn fetcher() -> Fetcher {
        Fetcher::new(
            FetcherConfig::builder()
                .backoff_base(Duration::from_millis(5))
                .max_retries(1)
                .requests_per_second(1000.0)
                .probe_content_type(false)
                .build(),
        )
        .unwrap()
    }

    async fn mock_site(server: &mut mockito::Server) {
        server
            .mock("GET", "/current")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body(listing_html())
            .create_async()
            .await;
        for (path, body) in [
            ("/files/court1_12.06.2024.pdf", DOC_ONE),
            ("/files/court2_12.06.2024.pdf", DOC_TWO),
            ("/files/court2_copy.pdf", DOC_TWO),
        ] {
            server
                .mock("GET", path)
                .with_status(200)
                .with_header("content-type", "application/pdf")
                .with_body(body)
                .create_async()
                .await;
        }
        server
            .mock("GET", "/files/broken.pdf")
            .with_status(404)
            .create_async()
            .await;
    }

    async fn pipeline(
        server: &mockito::Server,
        extractor: MockExtractor,
        config: PipelineConfig,
    ) -> (Pipeline<MockExtractor>, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::new_from_path(dir.path().join("docket.db").to_str().unwrap())
            .await
            .unwrap();
        let config = PipelineConfig {
            output_dir: dir.path().join("data"),
            ..config
        };
        let pipeline = Pipeline::new(profile_for(server), fetcher(), extractor, repo, config);
        (pipeline, dir)
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 12).unwrap()
    }

    #[tokio::test]
    async fn test_full_run_and_idempotent_rerun() {
        let mut server = mockito::Server::new_async().await;
        mock_site(&mut server).await;
        let (pipeline, _dir) = pipeline(&server, MockExtractor::new(), PipelineConfig::default()).await;

        let report = pipeline.run(&[day()]).await;
        let date = &report.dates[0];

        assert_eq!(date.stage, Stage::Done);
        assert_eq!(date.counts.discovered, 6);
        assert_eq!(date.counts.candidates, 4);
        assert_eq!(date.counts.downloaded, 2);
        assert_eq!(date.counts.duplicates, 1);
        assert_eq!(date.counts.structured, 2);
        assert_eq!(date.counts.persisted, 2);
        assert_eq!(date.counts.failures, 1);
        assert!(report.is_success());

        let counts = pipeline.repo.table_counts().await.unwrap();
        assert_eq!(counts.cause_lists, 2);
        assert_eq!(counts.cases, 3);
        assert!(pipeline.layout.date_dir(day()).join("metadata.json").exists());

        let rerun = pipeline.run(&[day()]).await;
        assert_eq!(rerun.dates[0].counts.persisted, 2);
        assert_eq!(pipeline.repo.table_counts().await.unwrap(), counts);

        let lists = pipeline
            .repo
            .get_cause_lists_by_date("delhi_hc", day())
            .await
            .unwrap();
        assert_eq!(lists[0].bench_label, "COURT NO. 1");
        assert_eq!(lists[0].judges.as_deref(), Some("HON'BLE MR. JUSTICE A"));
        assert!(lists[0].pdf_url.as_deref().unwrap().ends_with("court1_12.06.2024.pdf"));
        assert_eq!(lists[0].cases.len(), 2);
    }

    #[tokio::test]
    async fn test_sequential_matches_parallel() {
        let mut server = mockito::Server::new_async().await;
        mock_site(&mut server).await;
        let config = PipelineConfig::builder().parallel(false).build();
        let (pipeline, _dir) = pipeline(&server, MockExtractor::new(), config).await;

        let report = pipeline.run(&[day()]).await;
        assert_eq!(report.dates[0].counts.persisted, 2);
        assert_eq!(pipeline.repo.table_counts().await.unwrap().cases, 3);
    }

    #[tokio::test]
    async fn test_unreachable_listing_fails_date() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/current")
            .with_status(503)
            .expect(2)
            .create_async()
            .await;
        let (pipeline, _dir) = pipeline(&server, MockExtractor::new(), PipelineConfig::default()).await;

        let report = pipeline.run(&[day()]).await;

        assert_eq!(report.dates[0].stage, Stage::Failed);
        assert!(report.has_failed_date());
        assert!(!report.is_success());
        assert!(pipeline.layout.date_dir(day()).join("metadata.json").exists());
    }

    #[tokio::test]
    async fn test_extraction_failure_is_per_document() {
        let mut server = mockito::Server::new_async().await;
        mock_site(&mut server).await;
        let extractor = MockExtractor::new().with_markdown(|text| {
            if text.contains("COURT NO. 2") {
                Err(ExtractError::Timeout)
            } else {
                Ok(text.to_string())
            }
        });
        let (pipeline, _dir) = pipeline(&server, extractor, PipelineConfig::default()).await;

        let report = pipeline.run(&[day()]).await;
        let date = &report.dates[0];

        assert_eq!(date.stage, Stage::Done);
        assert_eq!(date.counts.structured, 1);
        assert_eq!(date.counts.persisted, 1);
        assert_eq!(date.counts.failures, 2);
        let failed: Vec<_> = date
            .documents
            .iter()
            .filter(|d| d.stage == Some(Stage::Structure) && d.error.is_some())
            .collect();
        assert_eq!(failed.len(), 1);
    }

    #[tokio::test]
    async fn test_process_existing_directory() {
        let server = mockito::Server::new_async().await;
        let config = PipelineConfig::builder().auto_tag(true).build();
        let (pipeline, _dir) = pipeline(&server, MockExtractor::new(), config).await;

        let date_dir = pipeline.layout.date_dir(day());
        std::fs::create_dir_all(&date_dir).unwrap();
        std::fs::write(date_dir.join("court1.pdf"), DOC_ONE).unwrap();
        std::fs::write(date_dir.join("notes.txt"), "ignored").unwrap();

        let report = pipeline.process_directory(&date_dir).await;
        let date = &report.dates[0];

        assert_eq!(date.date, day());
        assert_eq!(date.counts.discovered, 1);
        assert_eq!(date.counts.persisted, 1);
        assert_eq!(date.documents[0].list_date, Some(day()));
        assert!(report.tagging.unwrap().tags_added > 0);
        assert_eq!(
            pipeline.repo.get_available_dates("delhi_hc").await.unwrap(),
            vec![day()]
        );
    }

    #[tokio::test]
    async fn test_progress_events() {
        let mut server = mockito::Server::new_async().await;
        mock_site(&mut server).await;
        let (tx, mut rx) = mpsc::channel(64);
        let (pipeline, _dir) = pipeline(&server, MockExtractor::new(), PipelineConfig::default()).await;
        let pipeline = pipeline.with_progress(tx);

        pipeline.run(&[day()]).await;
        drop(pipeline);

        let mut stages = Vec::new();
        while let Some(event) = rx.recv().await {
            if let ProgressEvent::Stage { stage, .. } = event {
                stages.push(stage);
            }
        }
        assert_eq!(
            stages,
            vec![
                Stage::Discover,
                Stage::Filter,
                Stage::Download,
                Stage::Structure,
                Stage::Store,
                Stage::Done
            ]
        );
    }

    fn pdf_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.ends_with(".pdf"))
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_same_file_name_on_two_urls_stores_both_lists() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/current")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body(
                r#"<html><body>
                    <a href="/court1/causelist.pdf">Cause List Court 1</a>
                    <a href="/court2/causelist.pdf">Cause List Court 2</a>
                </body></html>"#,
            )
            .create_async()
            .await;
        for (path, body) in [("/court1/causelist.pdf", DOC_ONE), ("/court2/causelist.pdf", DOC_TWO)] {
            server
                .mock("GET", path)
                .with_status(200)
                .with_header("content-type", "application/pdf")
                .with_body(body)
                .create_async()
                .await;
        }
        let (pipeline, _dir) = pipeline(&server, MockExtractor::new(), PipelineConfig::default()).await;

        let report = pipeline.run(&[day()]).await;
        let date = &report.dates[0];
        assert_eq!(date.counts.downloaded, 2);
        assert_eq!(date.counts.persisted, 2);
        assert_eq!(pdf_files(&pipeline.layout.date_dir(day())).len(), 2);

        let counts = pipeline.repo.table_counts().await.unwrap();
        assert_eq!(counts.cause_lists, 2);
        assert_eq!(counts.cases, 3);

        let rerun = pipeline.run(&[day()]).await;
        assert_eq!(rerun.dates[0].counts.persisted, 2);
        assert_eq!(pipeline.repo.table_counts().await.unwrap(), counts);
        assert_eq!(pdf_files(&pipeline.layout.date_dir(day())).len(), 2);
    }

    #[tokio::test]
    async fn test_rerun_keeps_one_file_per_content() {
        let mut server = mockito::Server::new_async().await;
        mock_site(&mut server).await;
        let (pipeline, _dir) = pipeline(&server, MockExtractor::new(), PipelineConfig::default()).await;

        // Left by an earlier run
        let date_dir = pipeline.layout.date_dir(day());
        std::fs::create_dir_all(&date_dir).unwrap();
        std::fs::write(date_dir.join("court2_12.06.2024.pdf"), DOC_TWO).unwrap();

        let report = pipeline.run(&[day()]).await;
        let date = &report.dates[0];

        assert_eq!(date.counts.duplicates, 1);
        assert_eq!(
            pdf_files(&date_dir),
            vec!["court1_12.06.2024.pdf", "court2_12.06.2024.pdf"]
        );
        let copy = date
            .documents
            .iter()
            .find(|d| d.url.as_deref().is_some_and(|u| u.ends_with("court2_copy.pdf")))
            .unwrap();
        assert!(copy.skipped.is_some());
    }

    #[tokio::test]
    async fn test_panicked_structuring_worker_marks_document_failed() {
        let mut server = mockito::Server::new_async().await;
        mock_site(&mut server).await;
        let extractor = MockExtractor::new().with_markdown(|text| {
            if text.contains("COURT NO. 2") {
                panic!("extractor crashed");
            }
            Ok(text.to_string())
        });
        let (pipeline, _dir) = pipeline(&server, extractor, PipelineConfig::default()).await;

        let report = pipeline.run(&[day()]).await;
        let date = &report.dates[0];

        assert_eq!(date.stage, Stage::Done);
        assert_eq!(date.counts.structured, 1);
        assert_eq!(date.counts.failures, 2);
        let crashed = date
            .documents
            .iter()
            .find(|d| d.stage == Some(Stage::Structure) && d.error.is_some())
            .unwrap();
        assert!(crashed.error.as_deref().unwrap().contains("worker failed"));
    }

    #[tokio::test]
    async fn test_connect_builds_gemini_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let database = dir.path().join("docket.db");
        let gemini = GeminiConfig::builder().api_key("test-key").build();

        let pipeline = Pipeline::connect(
            CourtProfile::default(),
            FetcherConfig::default(),
            gemini,
            database.to_str().unwrap(),
            PipelineConfig::default(),
        )
        .await
        .unwrap();
        assert!(pipeline.repo.court_id("delhi_hc").await.unwrap().is_none());
        assert!(database.exists());
    }

    #[tokio::test]
    async fn test_connect_reports_missing_api_key_as_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let database = dir.path().join("docket.db");

        let err = Pipeline::connect(
            CourtProfile::default(),
            FetcherConfig::default(),
            GeminiConfig::default(),
            database.to_str().unwrap(),
            PipelineConfig::default(),
        )
        .await
        .err()
        .unwrap();
        assert!(matches!(err, crate::Error::Config(_)));
    }

    #[tokio::test]
    async fn test_connect_reports_unopenable_database() {
        let dir = tempfile::tempdir().unwrap();
        let database = dir.path().join("missing").join("nested").join("docket.db");
        let gemini = GeminiConfig::builder().api_key("test-key").build();

        let err = Pipeline::connect(
            CourtProfile::default(),
            FetcherConfig::default(),
            gemini,
            database.to_str().unwrap(),
            PipelineConfig::default(),
        )
        .await
        .err()
        .unwrap();
        assert!(matches!(err, crate::Error::Database(_)));
    }
}
