use std::time::Duration;

use anyhow::Result;

use crate::config::{Config, Throttle};
use crate::model::{Book, BookInfo, Highlight, RawBookmark, RawReview, ReadInfo, ReadwiseBook};
use crate::normalize::{BookContext, merge, split_reviews, to_highlight};
use crate::planner::{SkipReason, SyncDecision, SyncedBooks, plan, precheck, sanitize_title};
use crate::readwise::ReadwiseClient;
use crate::weread::WeReadSession;

/// Where annotations are read from.
#[allow(async_fn_in_trait)]
pub trait Source {
    async fn warm_up(&self) -> Result<()>;
    async fn notebooks(&self) -> Result<Vec<Book>>;
    async fn bookmarks(&self, book_id: &str) -> Result<Vec<RawBookmark>>;
    async fn reviews(&self, book_id: &str) -> Result<Vec<RawReview>>;
    async fn book_info(&self, book_id: &str) -> Result<BookInfo>;
    async fn read_info(&self, book_id: &str) -> Result<ReadInfo>;
}

/// Where highlights are written to.
#[allow(async_fn_in_trait)]
pub trait Sink {
    async fn list_books(&self) -> Result<Vec<ReadwiseBook>>;
    async fn create_highlights(&self, highlights: &[Highlight]) -> Result<()>;
}

impl Source for WeReadSession {
    async fn warm_up(&self) -> Result<()> {
        Ok(WeReadSession::warm_up(self).await?)
    }

    async fn notebooks(&self) -> Result<Vec<Book>> {
        Ok(WeReadSession::notebooks(self).await?)
    }

    async fn bookmarks(&self, book_id: &str) -> Result<Vec<RawBookmark>> {
        Ok(WeReadSession::bookmarks(self, book_id).await?)
    }

    async fn reviews(&self, book_id: &str) -> Result<Vec<RawReview>> {
        Ok(WeReadSession::reviews(self, book_id).await?)
    }

    async fn book_info(&self, book_id: &str) -> Result<BookInfo> {
        Ok(WeReadSession::book_info(self, book_id).await?)
    }

    async fn read_info(&self, book_id: &str) -> Result<ReadInfo> {
        Ok(WeReadSession::read_info(self, book_id).await?)
    }
}

impl Sink for ReadwiseClient {
    async fn list_books(&self) -> Result<Vec<ReadwiseBook>> {
        Ok(ReadwiseClient::list_books(self).await?)
    }

    async fn create_highlights(&self, highlights: &[Highlight]) -> Result<()> {
        Ok(ReadwiseClient::create_highlights(self, highlights).await?)
    }
}

pub enum BookOutcome {
    Uploaded(usize),
    Skipped(SkipReason),
    Failed,
}

impl BookOutcome {
    pub fn record(self, stats: &mut SyncStats) {
        stats.books += 1;
        match self {
            BookOutcome::Uploaded(count) => {
                stats.uploaded += 1;
                stats.highlights_sent += count;
            }
            BookOutcome::Skipped(SkipReason::NoAnnotations) => stats.skipped_empty += 1,
            BookOutcome::Skipped(SkipReason::AlreadySynced { .. }) => stats.skipped_synced += 1,
            BookOutcome::Failed => stats.failed += 1,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncStats {
    pub books: usize,
    pub uploaded: usize,
    pub highlights_sent: usize,
    pub skipped_empty: usize,
    pub skipped_synced: usize,
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub throttle: Throttle,
    pub site_url: String,
    pub source_type: String,
    pub fetch_details: bool,
}

impl SyncOptions {
    pub fn from_config(cfg: &Config) -> Self {
        SyncOptions {
            throttle: cfg.throttle.clone(),
            site_url: cfg.weread.base_url.clone(),
            source_type: cfg.readwise.source_type.clone(),
            fetch_details: cfg.weread.fetch_details,
        }
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Drives the run one book at a time. Nothing is parallelised, so the
/// throttle delays are the only pacing towards Readwise.
pub struct Syncer<S, K> {
    source: S,
    sink: K,
    options: SyncOptions,
}

impl<S: Source, K: Sink> Syncer<S, K> {
    pub fn new(source: S, sink: K, options: SyncOptions) -> Self {
        Syncer {
            source,
            sink,
            options,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub async fn run(&self) -> Result<SyncStats> {
        self.source.warm_up().await?;
        let books = self.source.notebooks().await?;
        let synced = SyncedBooks::from_books(self.sink.list_books().await?);
        tracing::info!(books = books.len(), synced_titles = synced.len(), "starting sync");
        if synced.is_empty() {
            tracing::info!("no books on readwise yet, every annotated book will be uploaded");
        }

        let mut stats = SyncStats::default();
        for book in &books {
            self.sync_book(book, &synced).await?.record(&mut stats);
        }

        tracing::info!(
            books = stats.books,
            uploaded = stats.uploaded,
            highlights_sent = stats.highlights_sent,
            skipped_empty = stats.skipped_empty,
            skipped_synced = stats.skipped_synced,
            failed = stats.failed,
            "sync finished"
        );
        Ok(stats)
    }

    async fn sync_book(&self, book: &Book, synced: &SyncedBooks) -> Result<BookOutcome> {
        if let SyncDecision::Skip(reason) = precheck(book) {
            return Ok(BookOutcome::Skipped(reason));
        }

        let title = sanitize_title(&book.title);
        let bookmarks = self.source.bookmarks(&book.book_id).await?;
        let reviews = split_reviews(self.source.reviews(&book.book_id).await?);
        if !reviews.summaries.is_empty() {
            tracing::debug!(book_id = %book.book_id, summaries = reviews.summaries.len(), "chapter summaries not uploaded");
        }
        let merged = merge(bookmarks, reviews.notes);

        if let SyncDecision::Skip(reason) = plan(&title, merged.len(), synced) {
            tracing::info!(title = %title, book_id = %book.book_id, ?reason, "skipping book");
            return Ok(BookOutcome::Skipped(reason));
        }

        if self.options.fetch_details {
            self.log_details(book).await;
        }

        let ctx = BookContext::new(book, title, &self.options.site_url, &self.options.source_type);
        let mut batch = Vec::with_capacity(merged.len());
        for annotation in &merged {
            pause(self.options.throttle.highlight_delay()).await;
            batch.push(to_highlight(annotation, &ctx));
        }

        let outcome = match self.sink.create_highlights(&batch).await {
            Ok(()) => {
                tracing::info!(title = %ctx.title, book_id = %book.book_id, highlights = batch.len(), "uploaded highlights");
                BookOutcome::Uploaded(batch.len())
            }
            Err(e) => {
                tracing::warn!(title = %ctx.title, book_id = %book.book_id, error = %format!("{:#}", e), "failed to upload highlights");
                BookOutcome::Failed
            }
        };

        pause(self.options.throttle.book_delay()).await;
        Ok(outcome)
    }

    async fn log_details(&self, book: &Book) {
        match self.source.book_info(&book.book_id).await {
            Ok(info) => tracing::debug!(book_id = %book.book_id, isbn = %info.isbn, rating = info.rating, "book info"),
            Err(e) => tracing::warn!(book_id = %book.book_id, error = %e, "failed to fetch book info"),
        }
        match self.source.read_info(&book.book_id).await {
            Ok(info) => tracing::debug!(
                book_id = %book.book_id,
                progress = info.reading_progress,
                reading_time = info.reading_time,
                finished = info.is_finished(),
                "read info"
            ),
            Err(e) => tracing::warn!(book_id = %book.book_id, error = %e, "failed to fetch read info"),
        }
    }
}
