use std::time::Duration;
use tracing::{error, info, warn};

use crate::Error;
use crate::migration::budget::TimeBudget;
use crate::migration::pager::{MAX_PAGE_SIZE, Pager};
use crate::migration::retrier::{RetryConfig, RetryOutcome, Retrier};
use crate::migration::writer::Writer;
use crate::migration::{FailureReport, MigrationRequest, MigrationResponse};
use crate::store::{Item, TableStore};

/// Tuning knobs for one migration invocation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MigrationOptions {
    /// Items per page, clamped to `1..=MAX_PAGE_SIZE`
    pub page_size: usize,
    /// Remaining budget at or below which the invocation yields a continuation
    pub safety_margin: Duration,
    /// Backoff policy for unprocessed items
    pub retry: RetryConfig,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            page_size: MAX_PAGE_SIZE,
            safety_margin: Duration::from_millis(100),
            retry: RetryConfig::default(),
        }
    }
}

/// Where an invocation left the migration
#[must_use = "a continuing outcome must be resumed and a failed one reported"]
#[derive(Debug)]
pub enum Outcome {
    /// Out of time; re-invoke with the carried request unchanged
    Continuing(MigrationRequest),
    /// Every source item is in the target
    Completed(MigrationRequest),
    /// Stopped on a fatal error; the cursor is still the last good page boundary
    Failed {
        /// Request as of the failure
        request: MigrationRequest,
        /// What went wrong
        error: Error,
    },
}

impl Outcome {
    /// Request carried by this outcome
    pub fn request(&self) -> &MigrationRequest {
        match self {
            Outcome::Continuing(request) | Outcome::Completed(request) => request,
            Outcome::Failed { request, .. } => request,
        }
    }

    /// True when the caller has to resume the migration
    pub fn should_continue(&self) -> bool {
        matches!(self, Outcome::Continuing(_))
    }

    /// True for a successful terminal state
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }

    /// Error of a failed outcome
    pub fn error(&self) -> Option<&Error> {
        match self {
            Outcome::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Invocation output for the orchestrator
    pub fn into_response(self) -> MigrationResponse {
        match self {
            Outcome::Continuing(request) => MigrationResponse {
                request,
                should_continue: true,
                handed_off: false,
                error: None,
            },
            Outcome::Completed(request) => MigrationResponse {
                request,
                should_continue: false,
                handed_off: false,
                error: None,
            },
            Outcome::Failed { request, error } => MigrationResponse {
                request,
                should_continue: false,
                handed_off: false,
                error: Some(FailureReport::from(&error)),
            },
        }
    }
}

/// Checkpoint controller: pages, writes and retries until the source is
/// exhausted, a fatal error occurs, or the time budget runs low
#[derive(Debug)]
pub struct Migrator<'a, S> {
    store: &'a S,
    options: MigrationOptions,
}

impl<'a, S: TableStore> Migrator<'a, S> {
    /// Controller over `store`
    pub fn new(store: &'a S, options: MigrationOptions) -> Self {
        Self { store, options }
    }

    /// Options in use
    pub fn options(&self) -> &MigrationOptions {
        &self.options
    }

    /// Run one invocation
    ///
    /// The budget is checked before every page. The cursor only advances
    /// once a page is fully written, retries included, so any returned
    /// request resumes at a page boundary with every earlier item durable in
    /// the target.
    pub async fn run<B>(&self, mut request: MigrationRequest, budget: &B) -> Outcome
    where
        B: TimeBudget + ?Sized,
    {
        if let Err(error) = request.validate() {
            return fail(request, error);
        }

        if request.progress.is_finished() {
            warn!(
                source_table = %request.source_table,
                target_table = %request.target_table,
                items_copied = request.progress.items_copied,
                "retrying failed migration from its last checkpoint"
            );
            request.progress.reopen();
        }

        let source = request.source_table.clone();
        let target = request.target_table.clone();

        info!(
            source_table = %source,
            target_table = %target,
            resumed = request.cursor.is_some(),
            items_copied = request.progress.items_copied,
            "migration invocation started"
        );

        let pager = Pager::new(self.store, &source, self.options.page_size);
        let writer = Writer::new(self.store);
        let retrier = Retrier::new(&writer, self.options.retry.clone());

        loop {
            let remaining = budget.remaining();
            if remaining <= self.options.safety_margin {
                info!(
                    source_table = %source,
                    target_table = %target,
                    items_copied = request.progress.items_copied,
                    remaining_ms = remaining.as_millis() as u64,
                    "time budget nearly spent, yielding continuation"
                );
                return Outcome::Continuing(request);
            }

            let page = match pager.next_page(request.cursor.as_ref()).await {
                Ok(page) => page,
                Err(error) => return fail(request, error),
            };

            let copied = page.items.len();
            if copied > 0 {
                if let Err(error) = copy_page(&writer, &retrier, page.items, &target).await {
                    return fail(request, error);
                }

                request.progress.record(copied);
                info!(
                    source_table = %source,
                    target_table = %target,
                    page_items = copied,
                    items_copied = request.progress.items_copied,
                    "page copied"
                );
            }

            match page.next_cursor {
                Some(cursor) => request.cursor = Some(cursor),
                None => {
                    request.cursor = None;
                    request.progress.finish(true);
                    info!(
                        source_table = %source,
                        target_table = %target,
                        items_copied = request.progress.items_copied,
                        "migration completed"
                    );
                    return Outcome::Completed(request);
                }
            }
        }
    }

    /// Resume in process until the migration is terminal
    ///
    /// Every invocation gets a fresh budget from `next_budget`. An invocation
    /// that yields without copying or advancing anything is returned as is,
    /// since the budget is too small to make progress.
    pub async fn drive<B, F>(&self, mut request: MigrationRequest, mut next_budget: F) -> Outcome
    where
        B: TimeBudget,
        F: FnMut() -> B,
    {
        loop {
            let cursor = request.cursor.clone();
            let copied = request.progress.items_copied;
            let budget = next_budget();

            match self.run(request, &budget).await {
                Outcome::Continuing(next)
                    if next.cursor == cursor && next.progress.items_copied == copied =>
                {
                    warn!(
                        source_table = %next.source_table,
                        "time budget too small to copy a single page"
                    );
                    return Outcome::Continuing(next);
                }
                Outcome::Continuing(next) => request = next,
                terminal => return terminal,
            }
        }
    }
}

async fn copy_page<S: TableStore>(
    writer: &Writer<'_, S>,
    retrier: &Retrier<'_, '_, S>,
    items: Vec<Item>,
    target: &str,
) -> Result<(), Error> {
    let rejected = writer.write_batch(items, target).await?;
    if rejected.is_empty() {
        return Ok(());
    }

    match retrier.drain(rejected, target).await? {
        RetryOutcome::Resolved => Ok(()),
        RetryOutcome::Exhausted(remaining) => Err(Error::RetryExhausted {
            table: target.to_string(),
            attempts: retrier.config().max_retries,
            unresolved: remaining.into_items(),
        }),
    }
}

fn fail(mut request: MigrationRequest, error: Error) -> Outcome {
    error!(
        source_table = %request.source_table,
        target_table = %request.target_table,
        items_copied = request.progress.items_copied,
        kind = ?error.kind(),
        %error,
        "migration failed"
    );
    request.progress.finish(false);
    Outcome::Failed { request, error }
}
