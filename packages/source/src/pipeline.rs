//! Per-court retrieval pipeline.
//!
//! A run bootstraps the session on the portal homepage, fetches the court
//! list, then walks the courts strictly one at a time:
//!
//! 1. `GET` the court's search page for the hearing date
//! 2. extract the hidden form state and challenge site key
//! 3. solve the challenge against the page's final URL
//! 4. `POST` the search form with the token
//! 5. extract the results table and hand it to the sink
//!
//! A failure in any step skips that court only. Failures before the court
//! loop abort the run.

use std::sync::Arc;

use causelist_captcha::ChallengeSolver;
use causelist_scraper::executor::RequestExecutor;
use causelist_scraper::expression::Expression;
use causelist_scraper::form_state::{FormStateExpressions, extract_form_state};
use causelist_scraper::html_table::extract_table;
use causelist_scraper::session::{HttpRequest, HttpResponse, Session};
use causelist_scraper::{ExtractError, FetchError};
use causelist_source_models::{
    Court, CourtList, CourtOutcome, CourtReport, CourtStage, RunReport,
};
use chrono::NaiveDate;

use crate::config::SourceConfig;
use crate::payload::SubmissionPayload;
use crate::progress::ProgressCallback;
use crate::sink::RecordSink;
use crate::{CourtError, CourtFailure, RunError};

/// Parser role of the table header expression.
pub const TABLE_HEADERS_ROLE: &str = "table_headers";

/// Parser role of the table row expression.
pub const TABLE_ROWS_ROLE: &str = "table_rows";

/// The portal side of a run: where to go and how to talk to it.
pub struct Portal<'a> {
    /// Source name, for logging.
    pub name: &'a str,
    /// The portal being scraped.
    pub source: &'a SourceConfig,
    /// Cookie-keeping session shared by every request of the run.
    pub session: &'a dyn Session,
    /// Retry and throttle policy.
    pub executor: &'a RequestExecutor,
}

impl Portal<'_> {
    /// `GET`s `url` with the navigation headers.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] once the executor gives up.
    pub async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        let request = HttpRequest::get(url).with_headers(&self.source.headers);
        self.executor.execute(self.session, &request).await
    }
}

/// Everything a run needs, built once by the caller and borrowed by every
/// step.
pub struct RunContext<'a> {
    /// Portal, session, and request policy.
    pub portal: Portal<'a>,
    /// Challenge solver.
    pub solver: &'a dyn ChallengeSolver,
    /// Where extracted tables go.
    pub sink: &'a dyn RecordSink,
    /// Hearing date to search for.
    pub hearing_date: NaiveDate,
    /// Per-court progress reporting.
    pub progress: Arc<dyn ProgressCallback>,
}

/// Narrows which courts a run processes.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Only process courts with these IDs.
    pub court_ids: Option<Vec<String>>,
    /// Process at most this many courts.
    pub limit: Option<usize>,
}

impl RunOptions {
    /// Applies the ID filter, then the limit, preserving list order.
    #[must_use]
    pub fn select(&self, courts: Vec<Court>) -> Vec<Court> {
        courts
            .into_iter()
            .filter(|court| {
                self.court_ids
                    .as_ref()
                    .is_none_or(|ids| ids.iter().any(|id| *id == court.id))
            })
            .take(self.limit.unwrap_or(usize::MAX))
            .collect()
    }
}

/// Runs the whole pipeline for one source.
///
/// Returns a report with one entry per attempted court. Skipped courts
/// are not errors.
///
/// # Errors
///
/// * [`RunError::Bootstrap`] if the homepage cannot be fetched.
/// * [`RunError::CourtList`] if the court list cannot be fetched.
/// * [`RunError::CourtListParse`] if the court list is not valid JSON.
pub async fn run(ctx: &RunContext<'_>, options: &RunOptions) -> Result<RunReport, RunError> {
    let mut report = RunReport::new(ctx.hearing_date);
    let portal = &ctx.portal;
    log::info!(
        "{}: search by hearing date {}",
        portal.name,
        ctx.hearing_date.format("%Y-%m-%d")
    );

    bootstrap(portal).await?;

    let courts = fetch_courts(portal).await?;
    if courts.is_empty() {
        log::warn!("{}: court list is empty", portal.name);
        return Ok(report);
    }

    let total = courts.len();
    let courts = options.select(courts);
    if courts.is_empty() {
        log::warn!("{}: no courts match the filter ({total} listed)", portal.name);
        return Ok(report);
    }

    log::info!(
        "{}: processing {} of {total} court(s)",
        portal.name,
        courts.len()
    );
    ctx.progress.set_total(courts.len() as u64);

    for court in courts {
        ctx.progress.set_message(court.name.clone());
        log::info!("[{}] Processing court (ID: {})", court.name, court.id);

        let outcome = match process_court(ctx, &court).await {
            Ok(outcome) => outcome,
            Err(failure) => {
                log::error!(
                    "[{}] Skipping court {} ({}) at {}: {}",
                    court.name,
                    court.id,
                    court_url(&portal.source.court_url, &court.id, ctx.hearing_date)
                        .unwrap_or_else(|_| portal.source.court_url.clone()),
                    failure.stage,
                    failure.error
                );
                CourtOutcome::Skipped {
                    stage: failure.stage,
                    reason: failure.error.to_string(),
                }
            }
        };

        report.courts.push(CourtReport { court, outcome });
        ctx.progress.inc(1);
    }

    ctx.progress.finish(format!(
        "{} saved, {} skipped",
        report.saved_count(),
        report.skipped_count()
    ));

    Ok(report)
}

/// Fetches the homepage to establish session cookies.
///
/// # Errors
///
/// Returns [`RunError::Bootstrap`] if every attempt fails.
pub async fn bootstrap(portal: &Portal<'_>) -> Result<(), RunError> {
    portal
        .get(&portal.source.homepage)
        .await
        .map_err(RunError::Bootstrap)?;
    log::debug!("{}: session bootstrapped", portal.name);
    Ok(())
}

/// Fetches and parses the court list.
///
/// # Errors
///
/// * [`RunError::CourtList`] if every attempt fails.
/// * [`RunError::CourtListParse`] if the body is not the expected JSON.
pub async fn fetch_courts(portal: &Portal<'_>) -> Result<Vec<Court>, RunError> {
    let response = portal
        .get(&portal.source.causelist_api)
        .await
        .map_err(RunError::CourtList)?;

    let list: CourtList = serde_json::from_slice(&response.body)?;
    log::info!("{}: {} court(s) listed", portal.name, list.courts.len());
    Ok(list.courts)
}

/// Processes a single court from page fetch to sink.
///
/// # Errors
///
/// Returns a [`CourtFailure`] naming the stage that failed.
pub async fn process_court(
    ctx: &RunContext<'_>,
    court: &Court,
) -> Result<CourtOutcome, CourtFailure> {
    let portal = &ctx.portal;
    let source = portal.source;

    let url = court_url(&source.court_url, &court.id, ctx.hearing_date)
        .map_err(CourtFailure::at(CourtStage::PageFetch))?;

    // Resolve every expression before anything is fetched or solved.
    let form_expressions = FormStateExpressions::from_parser(&source.parser)
        .map_err(CourtFailure::at(CourtStage::FormExtraction))?;
    let header_expression = table_expression(&source.parser, TABLE_HEADERS_ROLE)
        .map_err(CourtFailure::at(CourtStage::TableExtraction))?;
    let row_expression = table_expression(&source.parser, TABLE_ROWS_ROLE)
        .map_err(CourtFailure::at(CourtStage::TableExtraction))?;

    // ── Fetch court page ────────────────────────────────────────────
    let page = portal
        .get(&url)
        .await
        .map_err(CourtFailure::at(CourtStage::PageFetch))?;

    // ── Extract form state ──────────────────────────────────────────
    let form_state = extract_form_state(&page.body, &form_expressions)
        .map_err(CourtFailure::at(CourtStage::FormExtraction))?;

    // ── Solve challenge ─────────────────────────────────────────────
    let token = ctx
        .solver
        .solve(&form_state.site_key, &page.url)
        .await
        .ok_or(CourtFailure {
            stage: CourtStage::ChallengeSolve,
            error: CourtError::NoToken,
        })?;
    log::debug!("[{}] challenge token received ({} chars)", court.name, token.len());

    // ── Submit search ───────────────────────────────────────────────
    let payload = SubmissionPayload::new(&source.api_payload)
        .with_form_state(&form_state)
        .with_token(&token)
        .build();
    let response = portal
        .executor
        .execute(
            portal.session,
            &HttpRequest::post(&url)
                .with_headers(&source.api_headers)
                .with_form(payload),
        )
        .await
        .map_err(CourtFailure::at(CourtStage::Submission))?;

    // ── Extract table ───────────────────────────────────────────────
    log::info!("[{}] Parsing table data", court.name);
    let table = extract_table(&response.body, &header_expression, &row_expression);
    if table.records.is_empty() {
        log::warn!(
            "[{}] results table has no rows matching '{}'",
            court.name,
            row_expression.as_str()
        );
    }

    // ── Save ────────────────────────────────────────────────────────
    let path = ctx
        .sink
        .save(&court.name, &table)
        .map_err(CourtFailure::at(CourtStage::Save))?;

    Ok(CourtOutcome::Saved {
        path,
        rows: table.records.len(),
    })
}

/// Builds the search URL for `court_id` on `hearing_date`.
///
/// # Errors
///
/// Returns [`CourtError::InvalidUrl`] if `base` is not a valid URL.
pub fn court_url(
    base: &str,
    court_id: &str,
    hearing_date: NaiveDate,
) -> Result<String, CourtError> {
    let date = hearing_date.format("%Y-%m-%d").to_string();
    reqwest::Url::parse_with_params(base, &[("CourtID", court_id), ("Date", date.as_str())])
        .map(String::from)
        .map_err(|e| CourtError::InvalidUrl {
            url: base.to_owned(),
            message: e.to_string(),
        })
}

fn table_expression(
    parser: &std::collections::BTreeMap<String, String>,
    role: &str,
) -> Result<Expression, ExtractError> {
    let raw = parser
        .get(role)
        .ok_or_else(|| ExtractError::MissingExpression(role.to_owned()))?;
    Expression::parse(raw)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use causelist_scraper::delay::RecordingDelay;
    use causelist_scraper::executor::ExecutorConfig;
    use causelist_scraper::testing::ScriptedSession;
    use causelist_source_models::CauseListTable;
    use reqwest::Method;

    use super::*;
    use crate::payload::TOKEN_FIELDS;
    use crate::progress::null_progress;
    use crate::sink::SinkError;

    const HOME: &str = "https://portal.test/";
    const COURTS: &str = "https://portal.test/courts";
    const SEARCH: &str = "https://portal.test/search.aspx";

    const COURT_PAGE: &str = r#"<html><body><form>
        <input type="hidden" id="__VIEWSTATEFIELDCOUNT" value="2" />
        <input type="hidden" id="__VIEWSTATE" value="vs0" />
        <input type="hidden" id="__VIEWSTATE1" value="vs1" />
        <input type="hidden" id="__VIEWSTATEGENERATOR" value="GEN" />
        <input type="hidden" id="__EVENTVALIDATION" value="EV" />
        <div class="h-captcha" data-sitekey="site-key-1"></div>
    </form></body></html>"#;

    const RESULTS_PAGE: &str = r#"<html><body><table id="ctl00_Body_gvCauseList">
        <tr><th>Name</th><th>Time</th></tr>
        <tr><td>A. Lim</td><td>10:00</td></tr>
        <tr><td>B. Tan</td><td>11:30</td></tr>
    </table></body></html>"#;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
    }

    fn search_url(court_id: &str) -> String {
        court_url(SEARCH, court_id, date()).unwrap()
    }

    fn source() -> SourceConfig {
        let parser = [
            ("viewstate", "input#__VIEWSTATE@value"),
            ("viewstate1", "input#__VIEWSTATE1@value"),
            ("viewstate_generator", "input#__VIEWSTATEGENERATOR@value"),
            ("event_validation", "input#__EVENTVALIDATION@value"),
            ("viewstate_count", "input#__VIEWSTATEFIELDCOUNT@value"),
            (TABLE_HEADERS_ROLE, "table[id$='gvCauseList'] tr:first-child > th"),
            (TABLE_ROWS_ROLE, "table[id$='gvCauseList'] tr:not(:first-child)"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        SourceConfig {
            homepage: HOME.to_string(),
            causelist_api: COURTS.to_string(),
            court_url: SEARCH.to_string(),
            headers: BTreeMap::from([("User-Agent".to_string(), "test".to_string())]),
            api_headers: BTreeMap::from([(
                "Content-Type".to_string(),
                "application/x-www-form-urlencoded".to_string(),
            )]),
            api_payload: BTreeMap::from([("__EVENTTARGET".to_string(), String::new())]),
            parser,
        }
    }

    struct FixedSolver(Option<&'static str>);

    #[async_trait]
    impl ChallengeSolver for FixedSolver {
        async fn solve(&self, _site_key: &str, _page_url: &str) -> Option<String> {
            self.0.map(str::to_owned)
        }
    }

    #[derive(Default)]
    struct MemorySink {
        saved: Mutex<Vec<(String, CauseListTable)>>,
        fail_for: Option<&'static str>,
    }

    impl MemorySink {
        fn saved(&self) -> Vec<(String, CauseListTable)> {
            self.saved.lock().unwrap().clone()
        }
    }

    impl RecordSink for MemorySink {
        fn save(&self, court_name: &str, table: &CauseListTable) -> Result<PathBuf, SinkError> {
            if self.fail_for == Some(court_name) {
                return Err(SinkError::InvalidName(court_name.to_string()));
            }
            self.saved
                .lock()
                .unwrap()
                .push((court_name.to_string(), table.clone()));
            Ok(PathBuf::from(format!("{court_name}.csv")))
        }
    }

    fn executor() -> RequestExecutor {
        RequestExecutor::with_delay(
            ExecutorConfig {
                max_attempts: 1,
                cooldown_secs: 0..=0,
            },
            Arc::new(RecordingDelay::new()),
        )
    }

    fn bootstrapped(court_list: &str) -> ScriptedSession {
        ScriptedSession::new()
            .respond(&Method::GET, HOME, 200, "<html></html>")
            .respond(&Method::GET, COURTS, 200, court_list)
    }

    async fn run_with(
        session: &ScriptedSession,
        source: &SourceConfig,
        solver: &FixedSolver,
        sink: &MemorySink,
        options: &RunOptions,
    ) -> Result<RunReport, RunError> {
        let executor = executor();
        let ctx = RunContext {
            portal: Portal {
                name: "test",
                source,
                session,
                executor: &executor,
            },
            solver,
            sink,
            hearing_date: date(),
            progress: null_progress(),
        };
        run(&ctx, options).await
    }

    #[tokio::test]
    async fn empty_court_list_is_a_successful_no_op() {
        let session = bootstrapped(r#"{"CourtList": []}"#);
        let sink = MemorySink::default();

        let report = run_with(
            &session,
            &source(),
            &FixedSolver(Some("tok")),
            &sink,
            &RunOptions::default(),
        )
        .await
        .unwrap();

        assert!(report.courts.is_empty());
        assert!(sink.saved().is_empty());
        assert_eq!(session.requests().len(), 2);
    }

    #[tokio::test]
    async fn missing_court_list_array_is_treated_as_empty() {
        let session = bootstrapped("{}");
        let report = run_with(
            &session,
            &source(),
            &FixedSolver(Some("tok")),
            &MemorySink::default(),
            &RunOptions::default(),
        )
        .await
        .unwrap();
        assert!(report.courts.is_empty());
    }

    #[tokio::test]
    async fn null_court_list_is_a_successful_no_op() {
        let session = bootstrapped(r#"{"CourtList": null}"#);
        let report = run_with(
            &session,
            &source(),
            &FixedSolver(Some("tok")),
            &MemorySink::default(),
            &RunOptions::default(),
        )
        .await
        .unwrap();

        assert!(report.courts.is_empty());
        assert_eq!(session.requests().len(), 2);
    }

    #[tokio::test]
    async fn saves_court_table_and_posts_token_under_all_names() {
        let session = bootstrapped(r#"{"CourtList": [{"CourtID": 7, "CourtName": "High Court"}]}"#)
            .respond(&Method::GET, &search_url("7"), 200, COURT_PAGE)
            .respond(&Method::POST, &search_url("7"), 200, RESULTS_PAGE);
        let sink = MemorySink::default();

        let report = run_with(
            &session,
            &source(),
            &FixedSolver(Some("tok-xyz")),
            &sink,
            &RunOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(report.saved_count(), 1);
        assert!(matches!(
            report.courts[0].outcome,
            CourtOutcome::Saved { rows: 2, .. }
        ));

        let saved = sink.saved();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].0, "High Court");
        assert_eq!(saved[0].1.headers, vec!["Name", "Time"]);
        assert_eq!(saved[0].1.records[0].get("Name"), Some("A. Lim"));
        assert_eq!(saved[0].1.records[0].get("Time"), Some("10:00"));

        let requests = session.requests();
        let post = requests
            .iter()
            .find(|r| r.method == Method::POST)
            .unwrap();
        assert_eq!(post.headers, source().api_headers);
        let form = post.form.as_ref().unwrap();
        for name in TOKEN_FIELDS {
            assert_eq!(form[name], "tok-xyz");
        }
        assert_eq!(form["__VIEWSTATE"], "vs0");
        assert_eq!(form["__VIEWSTATE1"], "vs1");
        assert_eq!(form["__VIEWSTATEGENERATOR"], "GEN");
        assert_eq!(form["__EVENTVALIDATION"], "EV");
        assert_eq!(form["__VIEWSTATEFIELDCOUNT"], "2");
        assert_eq!(form["__EVENTTARGET"], "");
    }

    #[tokio::test]
    async fn missing_form_field_skips_only_that_court() {
        let broken = COURT_PAGE.replace(r#"id="__EVENTVALIDATION""#, r#"id="gone""#);
        let session = bootstrapped(
            r#"{"CourtList": [
                {"CourtID": "1", "CourtName": "Broken Court"},
                {"CourtID": "2", "CourtName": "Working Court"}
            ]}"#,
        )
        .respond(&Method::GET, &search_url("1"), 200, &broken)
        .respond(&Method::GET, &search_url("2"), 200, COURT_PAGE)
        .respond(&Method::POST, &search_url("2"), 200, RESULTS_PAGE);
        let sink = MemorySink::default();

        let report = run_with(
            &session,
            &source(),
            &FixedSolver(Some("tok")),
            &sink,
            &RunOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(report.courts.len(), 2);
        assert!(matches!(
            report.courts[0].outcome,
            CourtOutcome::Skipped { stage: CourtStage::FormExtraction, .. }
        ));
        assert_eq!(report.saved_count(), 1);
        assert_eq!(sink.saved()[0].0, "Working Court");
    }

    #[tokio::test]
    async fn unsolved_challenge_skips_without_submitting() {
        let session = bootstrapped(r#"{"CourtList": [{"CourtID": "1", "CourtName": "A"}]}"#)
            .respond(&Method::GET, &search_url("1"), 200, COURT_PAGE);

        let report = run_with(
            &session,
            &source(),
            &FixedSolver(None),
            &MemorySink::default(),
            &RunOptions::default(),
        )
        .await
        .unwrap();

        assert!(matches!(
            report.courts[0].outcome,
            CourtOutcome::Skipped { stage: CourtStage::ChallengeSolve, .. }
        ));
        assert!(session.requests().iter().all(|r| r.method == Method::GET));
    }

    #[tokio::test]
    async fn unreachable_homepage_is_fatal() {
        let session = ScriptedSession::new().respond(&Method::GET, HOME, 503, "down");

        let err = run_with(
            &session,
            &source(),
            &FixedSolver(Some("tok")),
            &MemorySink::default(),
            &RunOptions::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, RunError::Bootstrap(_)));
        assert_eq!(session.requests().len(), 1);
    }

    #[tokio::test]
    async fn unparseable_court_list_is_fatal() {
        let session = bootstrapped("<html>maintenance</html>");

        let err = run_with(
            &session,
            &source(),
            &FixedSolver(Some("tok")),
            &MemorySink::default(),
            &RunOptions::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, RunError::CourtListParse(_)));
    }

    #[tokio::test]
    async fn failed_court_list_fetch_is_fatal() {
        let session = ScriptedSession::new()
            .respond(&Method::GET, HOME, 200, "<html></html>")
            .respond(&Method::GET, COURTS, 503, "busy");

        let err = run_with(
            &session,
            &source(),
            &FixedSolver(Some("tok")),
            &MemorySink::default(),
            &RunOptions::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, RunError::CourtList(_)));
        assert_eq!(session.requests().len(), 2);
    }

    #[tokio::test]
    async fn failed_page_fetch_skips_without_solving() {
        let session = bootstrapped(r#"{"CourtList": [{"CourtID": "1", "CourtName": "A"}]}"#)
            .respond(&Method::GET, &search_url("1"), 500, "error");

        let report = run_with(
            &session,
            &source(),
            &FixedSolver(Some("tok")),
            &MemorySink::default(),
            &RunOptions::default(),
        )
        .await
        .unwrap();

        assert!(matches!(
            report.courts[0].outcome,
            CourtOutcome::Skipped { stage: CourtStage::PageFetch, .. }
        ));
        assert!(session.requests().iter().all(|r| r.method == Method::GET));
    }

    #[tokio::test]
    async fn failed_submission_skips_and_continues() {
        let session = bootstrapped(
            r#"{"CourtList": [
                {"CourtID": "1", "CourtName": "A"},
                {"CourtID": "2", "CourtName": "B"}
            ]}"#,
        )
        .respond(&Method::GET, &search_url("1"), 200, COURT_PAGE)
        .respond(&Method::POST, &search_url("1"), 503, "busy")
        .respond(&Method::GET, &search_url("2"), 200, COURT_PAGE)
        .respond(&Method::POST, &search_url("2"), 200, RESULTS_PAGE);
        let sink = MemorySink::default();

        let report = run_with(
            &session,
            &source(),
            &FixedSolver(Some("tok")),
            &sink,
            &RunOptions::default(),
        )
        .await
        .unwrap();

        assert!(matches!(
            report.courts[0].outcome,
            CourtOutcome::Skipped { stage: CourtStage::Submission, .. }
        ));
        assert_eq!(report.saved_count(), 1);
        assert_eq!(sink.saved().len(), 1);
        assert_eq!(sink.saved()[0].0, "B");
    }

    #[tokio::test]
    async fn sink_failure_skips_and_continues() {
        let session = bootstrapped(
            r#"{"CourtList": [
                {"CourtID": "1", "CourtName": "A"},
                {"CourtID": "2", "CourtName": "B"}
            ]}"#,
        )
        .respond(&Method::GET, &search_url("1"), 200, COURT_PAGE)
        .respond(&Method::POST, &search_url("1"), 200, RESULTS_PAGE)
        .respond(&Method::GET, &search_url("2"), 200, COURT_PAGE)
        .respond(&Method::POST, &search_url("2"), 200, RESULTS_PAGE);
        let sink = MemorySink {
            fail_for: Some("A"),
            ..MemorySink::default()
        };

        let report = run_with(
            &session,
            &source(),
            &FixedSolver(Some("tok")),
            &sink,
            &RunOptions::default(),
        )
        .await
        .unwrap();

        assert!(matches!(
            report.courts[0].outcome,
            CourtOutcome::Skipped { stage: CourtStage::Save, .. }
        ));
        assert_eq!(report.saved_count(), 1);
        assert_eq!(sink.saved()[0].0, "B");
    }

    #[tokio::test]
    async fn missing_table_expression_skips_before_fetching() {
        let mut source = source();
        source.parser.remove(TABLE_ROWS_ROLE);
        let session = bootstrapped(r#"{"CourtList": [{"CourtID": "1", "CourtName": "A"}]}"#);

        let report = run_with(
            &session,
            &source,
            &FixedSolver(Some("tok")),
            &MemorySink::default(),
            &RunOptions::default(),
        )
        .await
        .unwrap();

        assert!(matches!(
            report.courts[0].outcome,
            CourtOutcome::Skipped { stage: CourtStage::TableExtraction, .. }
        ));
        assert_eq!(session.requests().len(), 2);
    }

    #[tokio::test]
    async fn options_filter_and_limit_courts() {
        let session = bootstrapped(
            r#"{"CourtList": [
                {"CourtID": "1", "CourtName": "A"},
                {"CourtID": "2", "CourtName": "B"},
                {"CourtID": "3", "CourtName": "C"}
            ]}"#,
        )
        .respond(&Method::GET, &search_url("2"), 200, "<html></html>");
        let options = RunOptions {
            court_ids: Some(vec!["3".to_string(), "2".to_string()]),
            limit: Some(1),
        };

        let report = run_with(
            &session,
            &source(),
            &FixedSolver(Some("tok")),
            &MemorySink::default(),
            &options,
        )
        .await
        .unwrap();

        assert_eq!(report.courts.len(), 1);
        assert_eq!(report.courts[0].court.id, "2");
    }

    #[test]
    fn court_url_appends_id_and_date() {
        assert_eq!(
            court_url(SEARCH, "12", date()).unwrap(),
            "https://portal.test/search.aspx?CourtID=12&Date=2024-03-05"
        );
        assert!(matches!(
            court_url("not a url", "12", date()),
            Err(CourtError::InvalidUrl { .. })
        ));
    }
}
