use serde::{Deserialize, Serialize};

pub const DEFAULT_CHAPTER_UID: i64 = 1;

// ============================================================================
// WeRead payloads
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookMeta {
    pub book_id: String,
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub cover: String,
}

/// One row of `/user/notebooks`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotebookEntry {
    pub book: BookMeta,
    #[serde(default)]
    pub sort: i64,
    #[serde(default)]
    pub note_count: i64,
    #[serde(default)]
    pub review_count: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct NotebookList {
    #[serde(default)]
    pub books: Vec<NotebookEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    pub book_id: String,
    pub title: String,
    pub author: String,
    pub cover: String,
    pub sort: i64,
    pub note_count: i64,
    pub review_count: i64,
}

impl From<NotebookEntry> for Book {
    fn from(entry: NotebookEntry) -> Self {
        Book {
            book_id: entry.book.book_id,
            title: entry.book.title,
            author: entry.book.author,
            cover: entry.book.cover,
            sort: entry.sort,
            note_count: entry.note_count,
            review_count: entry.review_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBookmark {
    #[serde(default)]
    pub bookmark_id: Option<String>,
    #[serde(default)]
    pub chapter_uid: Option<i64>,
    #[serde(default)]
    pub range: Option<String>,
    pub create_time: i64,
    pub mark_text: String,
    #[serde(default)]
    pub style: Option<i64>,
    #[serde(default)]
    pub color_style: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BookmarkList {
    #[serde(default)]
    pub updated: Vec<RawBookmark>,
}

pub const REVIEW_TYPE_NOTE: i64 = 1;
pub const REVIEW_TYPE_CHAPTER_SUMMARY: i64 = 4;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReview {
    pub review_id: String,
    #[serde(rename = "type")]
    pub review_type: i64,
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub chapter_uid: Option<i64>,
    #[serde(default)]
    pub range: Option<String>,
    pub create_time: i64,
    #[serde(default)]
    pub style: Option<i64>,
    #[serde(default)]
    pub color_style: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewEntry {
    pub review: RawReview,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReviewList {
    #[serde(default)]
    pub reviews: Vec<ReviewEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBookInfo {
    #[serde(default)]
    pub isbn: String,
    #[serde(default)]
    pub new_rating: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookInfo {
    pub isbn: String,
    pub rating: f64,
}

impl From<RawBookInfo> for BookInfo {
    fn from(raw: RawBookInfo) -> Self {
        BookInfo {
            isbn: raw.isbn,
            rating: raw.new_rating as f64 / 1000.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadInfo {
    #[serde(default)]
    pub reading_progress: Option<i64>,
    #[serde(default)]
    pub reading_time: Option<i64>,
    #[serde(default)]
    pub finish_reading: Option<i64>,
    #[serde(default)]
    pub finished_date: Option<i64>,
}

impl ReadInfo {
    pub fn is_finished(&self) -> bool {
        self.finish_reading.unwrap_or(0) != 0
    }
}

/// WeRead signals API failures in-band with a non-zero `errcode`.
#[derive(Debug, Deserialize)]
pub struct ApiStatus {
    #[serde(default)]
    pub errcode: Option<i64>,
    #[serde(default)]
    pub errmsg: Option<String>,
}

// ============================================================================
// Readwise payloads
// ============================================================================

/// A highlight ready to be posted to Readwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Highlight {
    pub text: String,
    pub title: String,
    pub author: String,
    pub source_type: String,
    pub category: String,
    pub image_url: String,
    pub source_url: String,
    pub highlighted_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateHighlights<'a> {
    pub highlights: &'a [Highlight],
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReadwiseBook {
    pub title: String,
    #[serde(default)]
    pub num_highlights: usize,
}

#[derive(Debug, Deserialize)]
pub struct ReadwiseBookPage {
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub results: Vec<ReadwiseBook>,
}
