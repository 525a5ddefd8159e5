//! Seat availability polling.
//!
//! Every cycle POSTs the same department search to the course-selection form
//! and reports target sections whose selection checkbox is enabled. The loop
//! runs until cancelled or until an optional cycle limit is hit.

pub mod delay;

use chrono::{DateTime, Local};
use std::collections::BTreeSet;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::portal::html::Document;
use crate::portal::{
    AvailableCourse, CatalogMap, EnrollmentEntry, PortalError, PortalSession, TargetCourseSet,
};
use crate::utils::fmt_duration;

pub use delay::{DelaySource, FixedDelay, UniformDelay};

/// Visible text of the enrollment-page link to course selection.
pub const SELECT_COURSES_LINK_TEXT: &str = "选择课程";
/// `id` of the department search form on the course-selection page.
pub const SELECTION_FORM_ID: &str = "regfrm2";

const SEARCH_FLAG: (&str, &str) = ("sb", "0");
const DEPARTMENT_FIELD: &str = "deptIds";

const RESULT_ROW_CELLS: usize = 13;
const CHECKBOX_CELL: usize = 0;
const CODE_CELL: usize = 3;
const CAPACITY_CELL: usize = 4;
const SECTION_CHECKBOX_NAME: &str = "sids";

/// Search payload: the flag field plus one `deptIds` per distinct department
/// of the resolvable targets.
pub fn build_payload(
    catalog: &CatalogMap,
    targets: &TargetCourseSet,
) -> Result<Vec<(String, String)>, PortalError> {
    let mut departments = BTreeSet::new();
    for code in targets.iter() {
        match catalog.get(code) {
            Some(info) => {
                debug!(
                    code,
                    name = info.name.as_str(),
                    department = info.department_id.as_str(),
                    "Watching course"
                );
                departments.insert(info.department_id.as_str());
            }
            None => warn!(code, "Target course not in catalog, ignoring"),
        }
    }

    if departments.is_empty() {
        return Err(PortalError::NoResolvableTargets);
    }

    let mut payload = vec![(SEARCH_FLAG.0.to_string(), SEARCH_FLAG.1.to_string())];
    payload.extend(
        departments
            .into_iter()
            .map(|id| (DEPARTMENT_FIELD.to_string(), id.to_string())),
    );
    Ok(payload)
}

/// Sections of target courses that can currently be selected.
pub fn parse_available(body: &str, targets: &TargetCourseSet) -> Vec<AvailableCourse> {
    let doc = Document::parse(body);
    doc
        .rows_matching(|row| {
            row.len() == RESULT_ROW_CELLS
                && row
                    .text(CODE_CELL)
                    .is_some_and(|code| targets.contains(&code))
        })
        .filter_map(|row| {
            let checkbox = row.checkbox(CHECKBOX_CELL, SECTION_CHECKBOX_NAME)?;
            if checkbox.disabled {
                return None;
            }
            Some(AvailableCourse {
                section_id: checkbox.value,
                capacity_label: row.text(CAPACITY_CELL).unwrap_or_default(),
            })
        })
        .collect()
}

fn parse_selection_action(body: &str) -> Result<String, PortalError> {
    Document::parse(body)
        .form(SELECTION_FORM_ID)
        .and_then(|form| form.action)
        .ok_or_else(|| PortalError::missing(format!("action of form#{SELECTION_FORM_ID}")))
}

/// Outcome of one poll cycle.
#[derive(Debug, Clone)]
pub struct PollReport {
    pub at: DateTime<Local>,
    pub available: Vec<AvailableCourse>,
    /// Sections not available in the previous successful cycle.
    pub newly_available: Vec<AvailableCourse>,
}

impl PollReport {
    /// Human-readable summary, e.g. `[14:03:12] available: 101_3/40, 102_1/30`.
    pub fn summary_line(&self) -> String {
        let listed = if self.available.is_empty() {
            "none".to_string()
        } else {
            self.available
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!("[{}] available: {}", self.at.format("%H:%M:%S"), listed)
    }
}

/// Totals for a finished polling run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub cycles: u64,
    pub failures: u64,
}

pub struct AvailabilityPoller<'s, D> {
    session: &'s PortalSession,
    selection_url: Url,
    payload: Vec<(String, String)>,
    targets: TargetCourseSet,
    delay: D,
    max_cycles: Option<u64>,
    previous: BTreeSet<AvailableCourse>,
}

impl<'s, D: DelaySource> AvailabilityPoller<'s, D> {
    pub fn new(
        session: &'s PortalSession,
        selection_url: Url,
        payload: Vec<(String, String)>,
        targets: TargetCourseSet,
        delay: D,
    ) -> Self {
        Self {
            session,
            selection_url,
            payload,
            targets,
            delay,
            max_cycles: None,
            previous: BTreeSet::new(),
        }
    }

    /// Open the course-selection page and prepare the search for `targets`.
    pub async fn setup(
        session: &'s PortalSession,
        entry: &EnrollmentEntry,
        catalog: &CatalogMap,
        targets: TargetCourseSet,
        delay: D,
    ) -> Result<Self, PortalError> {
        let payload = build_payload(catalog, &targets)?;
        let manage_url = entry.link(session, SELECT_COURSES_LINK_TEXT)?;
        let body = session.get(&manage_url).await?;
        let selection_url = session.resolve(&parse_selection_action(&body)?)?;
        info!(
            url = %selection_url,
            targets = targets.len(),
            departments = payload.len() - 1,
            "Course selection search ready"
        );
        Ok(Self::new(session, selection_url, payload, targets, delay))
    }

    /// Stop after `max` cycles instead of running until cancelled.
    pub fn with_max_cycles(mut self, max: Option<u64>) -> Self {
        self.max_cycles = max;
        self
    }

    pub fn payload(&self) -> &[(String, String)] {
        &self.payload
    }

    /// Run a single search and diff it against the previous cycle.
    pub async fn poll_once(&mut self) -> Result<PollReport, PortalError> {
        let body = self
            .session
            .post_form(&self.selection_url, &self.payload)
            .await?;
        let available = parse_available(&body, &self.targets);

        let newly_available = available
            .iter()
            .filter(|course| !self.previous.contains(*course))
            .cloned()
            .collect();
        self.previous = available.iter().cloned().collect();

        Ok(PollReport {
            at: Local::now(),
            available,
            newly_available,
        })
    }

    /// Poll until `cancel` fires, the cycle limit is reached, or a
    /// non-recoverable error occurs.
    ///
    /// Recoverable failures are logged and retried after the normal delay.
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<PollSummary, PortalError> {
        let mut summary = PollSummary::default();
        let mut streak = 0u32;

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let result = tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.poll_once() => result,
            };
            summary.cycles += 1;

            match result {
                Ok(report) => {
                    streak = 0;
                    let newly = report
                        .newly_available
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", ");
                    info!(
                        cycle = summary.cycles,
                        newly_available = newly.as_str(),
                        "{}",
                        report.summary_line()
                    );
                }
                Err(e) if e.is_recoverable() => {
                    streak += 1;
                    summary.failures += 1;
                    warn!(
                        cycle = summary.cycles,
                        consecutive_failures = streak,
                        error = ?e,
                        "Poll cycle failed, will retry after delay"
                    );
                }
                Err(e) => return Err(e),
            }

            if self.max_cycles.is_some_and(|max| summary.cycles >= max) {
                debug!(cycles = summary.cycles, "Cycle limit reached");
                break;
            }

            let pause = self.delay.next_delay();
            debug!(delay = fmt_duration(pause), "Waiting for next poll cycle");
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = time::sleep(pause) => {}
            }
        }

        info!(
            cycles = summary.cycles,
            failures = summary.failures,
            "Poller stopped"
        );
        Ok(summary)
    }
}
