use std::collections::HashMap;

use crate::model::{Book, ReadwiseBook};

/// Strips the characters WeRead titles carry that break Readwise matching.
pub fn sanitize_title(title: &str) -> String {
    title.chars().filter(|c| !matches!(c, '/' | ':')).collect()
}

/// Highlight counts already stored on Readwise, keyed by book title.
#[derive(Debug, Default, Clone)]
pub struct SyncedBooks {
    counts: HashMap<String, usize>,
}

impl SyncedBooks {
    pub fn from_books(books: impl IntoIterator<Item = ReadwiseBook>) -> Self {
        let counts = books
            .into_iter()
            .map(|book| (book.title, book.num_highlights))
            .collect();
        SyncedBooks { counts }
    }

    pub fn highlight_count(&self, title: &str) -> Option<usize> {
        self.counts.get(title).copied()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoAnnotations,
    AlreadySynced { count: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDecision {
    Skip(SkipReason),
    Upload,
}

/// Decides from the notebook counters alone, before anything is fetched.
pub fn precheck(book: &Book) -> SyncDecision {
    if book.note_count + book.review_count == 0 {
        SyncDecision::Skip(SkipReason::NoAnnotations)
    } else {
        SyncDecision::Upload
    }
}

/// Equal counts are taken to mean the book is fully synced. Edited
/// highlights or a partial upload with a coincidentally equal count go
/// undetected.
pub fn plan(sanitized_title: &str, merged_count: usize, synced: &SyncedBooks) -> SyncDecision {
    match synced.highlight_count(sanitized_title) {
        Some(count) if count == merged_count => SyncDecision::Skip(SkipReason::AlreadySynced { count }),
        _ => SyncDecision::Upload,
    }
}
