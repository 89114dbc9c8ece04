//! Merging of bookmarks and notes into the Readwise highlight shape.

use chrono::{DateTime, FixedOffset, Offset, SecondsFormat, Utc};

use crate::codec;
use crate::model::{
    Book, DEFAULT_CHAPTER_UID, Highlight, REVIEW_TYPE_CHAPTER_SUMMARY, REVIEW_TYPE_NOTE,
    RawBookmark, RawReview,
};

/// WeRead timestamps are rendered in China Standard Time, which has no DST.
const SOURCE_UTC_OFFSET_SECS: i32 = 8 * 3600;

pub const CATEGORY_BOOKS: &str = "books";

/// A type-1 review with its commentary moved into `note`.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub review_id: String,
    pub chapter_uid: Option<i64>,
    pub range: Option<String>,
    pub create_time: i64,
    pub mark_text: String,
    pub note: String,
}

impl From<RawReview> for Note {
    fn from(review: RawReview) -> Self {
        let note = review.content.unwrap_or_default();
        let mark_text = match review.abstract_text {
            Some(text) if !text.is_empty() => text,
            _ => note.clone(),
        };
        Note {
            review_id: review.review_id,
            chapter_uid: review.chapter_uid,
            range: review.range,
            create_time: review.create_time,
            mark_text,
            note,
        }
    }
}

#[derive(Debug, Default)]
pub struct SplitReviews {
    pub summaries: Vec<RawReview>,
    pub notes: Vec<Note>,
}

/// Separates chapter summaries from position-anchored notes. Other review
/// types are dropped.
pub fn split_reviews(reviews: Vec<RawReview>) -> SplitReviews {
    let mut split = SplitReviews::default();
    for review in reviews {
        match review.review_type {
            REVIEW_TYPE_CHAPTER_SUMMARY => split.summaries.push(review),
            REVIEW_TYPE_NOTE => split.notes.push(Note::from(review)),
            other => tracing::debug!(review_id = %review.review_id, review_type = other, "ignoring review"),
        }
    }
    split
}

#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    Bookmark(RawBookmark),
    Note(Note),
}

impl Annotation {
    pub fn chapter_uid(&self) -> i64 {
        let uid = match self {
            Annotation::Bookmark(b) => b.chapter_uid,
            Annotation::Note(n) => n.chapter_uid,
        };
        uid.unwrap_or(DEFAULT_CHAPTER_UID)
    }

    pub fn range(&self) -> Option<&str> {
        match self {
            Annotation::Bookmark(b) => b.range.as_deref(),
            Annotation::Note(n) => n.range.as_deref(),
        }
    }

    pub fn mark_text(&self) -> &str {
        match self {
            Annotation::Bookmark(b) => &b.mark_text,
            Annotation::Note(n) => &n.mark_text,
        }
    }

    pub fn create_time(&self) -> i64 {
        match self {
            Annotation::Bookmark(b) => b.create_time,
            Annotation::Note(n) => n.create_time,
        }
    }

    fn sort_key(&self) -> (i64, i64) {
        (self.chapter_uid(), range_start(self.range()))
    }
}

/// Start offset of a `"start-end"` range. Missing, empty or unparseable
/// starts count as 0 so they sort first in their chapter.
pub fn range_start(range: Option<&str>) -> i64 {
    range
        .and_then(|r| r.split('-').next())
        .and_then(|start| start.trim().parse::<i64>().ok())
        .unwrap_or(0)
}

/// Concatenates bookmarks then notes and orders them by chapter and
/// position. The sort is stable, so ties keep bookmarks ahead of notes.
pub fn merge(bookmarks: Vec<RawBookmark>, notes: Vec<Note>) -> Vec<Annotation> {
    let mut merged: Vec<Annotation> = bookmarks
        .into_iter()
        .map(Annotation::Bookmark)
        .chain(notes.into_iter().map(Annotation::Note))
        .collect();
    merged.sort_by_key(Annotation::sort_key);
    merged
}

/// Renders epoch seconds as ISO-8601 in UTC+8, e.g. `2020-09-13T20:26:40+08:00`.
pub fn to_source_time(epoch_secs: i64) -> String {
    let offset = FixedOffset::east_opt(SOURCE_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix());
    DateTime::from_timestamp(epoch_secs, 0)
        .unwrap_or_default()
        .with_timezone(&offset)
        .to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Per-book values shared by every highlight of that book.
#[derive(Debug, Clone)]
pub struct BookContext {
    pub title: String,
    pub author: String,
    pub cover: String,
    pub source_url: String,
    pub source_type: String,
    pub site_url: String,
}

impl BookContext {
    pub fn new(book: &Book, title: String, site_url: &str, source_type: &str) -> Self {
        BookContext {
            title,
            author: book.author.clone(),
            cover: book.cover.clone(),
            source_url: codec::reader_url(site_url, &book.book_id),
            source_type: source_type.to_string(),
            site_url: site_url.to_string(),
        }
    }
}

pub fn to_highlight(annotation: &Annotation, ctx: &BookContext) -> Highlight {
    let (note, highlight_url) = match annotation {
        Annotation::Note(n) => (
            Some(n.note.clone()),
            Some(codec::review_url(&ctx.site_url, &n.review_id)),
        ),
        Annotation::Bookmark(_) => (None, None),
    };

    Highlight {
        text: annotation.mark_text().to_string(),
        title: ctx.title.clone(),
        author: ctx.author.clone(),
        source_type: ctx.source_type.clone(),
        category: CATEGORY_BOOKS.to_string(),
        image_url: ctx.cover.clone(),
        source_url: ctx.source_url.clone(),
        highlighted_at: to_source_time(annotation.create_time()),
        note,
        highlight_url,
    }
}
