use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use weread_readwise::config::Throttle;
use weread_readwise::model::{
    Book, BookInfo, Highlight, RawBookmark, RawReview, ReadInfo, ReadwiseBook,
};
use weread_readwise::sync::{Sink, Source, SyncOptions, SyncStats, Syncer};

#[derive(Default)]
struct FakeSource {
    books: Vec<Book>,
    bookmarks: HashMap<String, Vec<RawBookmark>>,
    reviews: HashMap<String, Vec<RawReview>>,
    failing_reviews: Option<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeSource {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Source for FakeSource {
    async fn warm_up(&self) -> Result<()> {
        self.log("warm_up".to_string());
        Ok(())
    }

    async fn notebooks(&self) -> Result<Vec<Book>> {
        self.log("notebooks".to_string());
        Ok(self.books.clone())
    }

    async fn bookmarks(&self, book_id: &str) -> Result<Vec<RawBookmark>> {
        self.log(format!("bookmarks:{}", book_id));
        Ok(self.bookmarks.get(book_id).cloned().unwrap_or_default())
    }

    async fn reviews(&self, book_id: &str) -> Result<Vec<RawReview>> {
        self.log(format!("reviews:{}", book_id));
        if self.failing_reviews.as_deref() == Some(book_id) {
            return Err(anyhow!("missing field `reviews`"));
        }
        Ok(self.reviews.get(book_id).cloned().unwrap_or_default())
    }

    async fn book_info(&self, book_id: &str) -> Result<BookInfo> {
        self.log(format!("book_info:{}", book_id));
        Ok(BookInfo {
            isbn: "9780000000000".to_string(),
            rating: 0.9,
        })
    }

    async fn read_info(&self, book_id: &str) -> Result<ReadInfo> {
        self.log(format!("read_info:{}", book_id));
        Ok(ReadInfo::default())
    }
}

#[derive(Default)]
struct FakeSink {
    existing: Vec<ReadwiseBook>,
    reject_title: Option<String>,
    posted: Mutex<Vec<Vec<Highlight>>>,
}

impl FakeSink {
    fn posted(&self) -> Vec<Vec<Highlight>> {
        self.posted.lock().unwrap().clone()
    }
}

impl Sink for FakeSink {
    async fn list_books(&self) -> Result<Vec<ReadwiseBook>> {
        Ok(self.existing.clone())
    }

    async fn create_highlights(&self, highlights: &[Highlight]) -> Result<()> {
        self.posted.lock().unwrap().push(highlights.to_vec());
        let rejected = highlights
            .first()
            .is_some_and(|h| Some(&h.title) == self.reject_title.as_ref());
        if rejected {
            return Err(anyhow!("UnexpectedStatus: /highlights/ returned 429"));
        }
        Ok(())
    }
}

fn book(book_id: &str, title: &str, note_count: i64, review_count: i64) -> Book {
    Book {
        book_id: book_id.to_string(),
        title: title.to_string(),
        author: "Author".to_string(),
        cover: format!("https://img/{}.jpg", book_id),
        sort: 0,
        note_count,
        review_count,
    }
}

fn bookmark(chapter_uid: i64, range: &str, text: &str) -> RawBookmark {
    RawBookmark {
        bookmark_id: Some(format!("bm_{}", text)),
        chapter_uid: Some(chapter_uid),
        range: Some(range.to_string()),
        create_time: 1600000000,
        mark_text: text.to_string(),
        style: Some(1),
        color_style: Some(2),
    }
}

fn review(review_id: &str, review_type: i64, chapter_uid: i64, range: &str, content: &str) -> RawReview {
    RawReview {
        review_id: review_id.to_string(),
        review_type,
        abstract_text: Some(format!("abstract of {}", review_id)),
        content: Some(content.to_string()),
        chapter_uid: Some(chapter_uid),
        range: Some(range.to_string()),
        create_time: 1600000000,
        style: None,
        color_style: None,
    }
}

fn options() -> SyncOptions {
    SyncOptions {
        throttle: Throttle::none(),
        site_url: "https://weread.qq.com".to_string(),
        source_type: "weread_app".to_string(),
        fetch_details: false,
    }
}

#[tokio::test]
async fn test_single_book_uploads_one_merged_batch() {
    let source = FakeSource {
        books: vec![book("12345", "Meditations: Book/One", 0, 1)],
        bookmarks: HashMap::from([(
            "12345".to_string(),
            vec![bookmark(2, "1-2", "later chapter"), bookmark(1, "50-60", "first chapter")],
        )]),
        reviews: HashMap::from([(
            "12345".to_string(),
            vec![
                review("r1", 1, 1, "10-20", "my note"),
                review("s1", 4, 1, "", "chapter summary"),
            ],
        )]),
        ..Default::default()
    };
    let syncer = Syncer::new(source, FakeSink::default(), options());

    let stats = syncer.run().await.unwrap();

    let posted = syncer.sink().posted();
    assert_eq!(posted.len(), 1);
    let batch = &posted[0];
    assert_eq!(batch.len(), 3);
    let texts: Vec<&str> = batch.iter().map(|h| h.text.as_str()).collect();
    assert_eq!(texts, vec!["abstract of r1", "first chapter", "later chapter"]);

    let note = &batch[0];
    assert_eq!(note.note.as_deref(), Some("my note"));
    assert_eq!(
        note.highlight_url.as_deref(),
        Some("https://weread.qq.com/review-detail?reviewid=r1&type=1")
    );
    assert!(batch[1].note.is_none());
    for highlight in batch {
        assert_eq!(highlight.title, "Meditations BookOne");
        assert_eq!(highlight.source_url, "https://weread.qq.com/web/reader/827327b043039827ccb0be7");
        assert_eq!(highlight.highlighted_at, "2020-09-13T20:26:40+08:00");
        assert_eq!(highlight.category, "books");
        assert_eq!(highlight.source_type, "weread_app");
    }

    assert_eq!(stats.uploaded, 1);
    assert_eq!(stats.highlights_sent, 3);
}

#[tokio::test]
async fn test_book_without_annotations_is_never_fetched() {
    let source = FakeSource {
        books: vec![book("empty", "Nothing Here", 0, 0), book("full", "Something", 1, 0)],
        bookmarks: HashMap::from([("full".to_string(), vec![bookmark(1, "1-2", "a")])]),
        ..Default::default()
    };
    let syncer = Syncer::new(source, FakeSink::default(), options());

    let stats = syncer.run().await.unwrap();

    let calls = syncer.source().calls();
    assert!(!calls.iter().any(|c| c.ends_with(":empty")));
    assert_eq!(
        calls,
        vec!["warm_up", "notebooks", "bookmarks:full", "reviews:full"]
    );
    assert_eq!(stats.skipped_empty, 1);
    assert_eq!(stats.uploaded, 1);
}

#[tokio::test]
async fn test_matching_count_skips_upload() {
    let source = FakeSource {
        books: vec![book("b1", "Dune: Messiah", 2, 0)],
        bookmarks: HashMap::from([(
            "b1".to_string(),
            vec![bookmark(1, "1-2", "a"), bookmark(1, "3-4", "b")],
        )]),
        ..Default::default()
    };
    let sink = FakeSink {
        existing: vec![ReadwiseBook {
            title: "Dune Messiah".to_string(),
            num_highlights: 2,
        }],
        ..Default::default()
    };
    let syncer = Syncer::new(source, sink, options());

    let stats = syncer.run().await.unwrap();

    assert!(syncer.sink().posted().is_empty());
    assert_eq!(stats.skipped_synced, 1);
    assert_eq!(stats.uploaded, 0);
}

#[tokio::test]
async fn test_count_mismatch_uploads_everything_again() {
    let source = FakeSource {
        books: vec![book("b1", "Dune", 3, 0)],
        bookmarks: HashMap::from([(
            "b1".to_string(),
            vec![bookmark(1, "1-2", "a"), bookmark(1, "3-4", "b"), bookmark(1, "5-6", "c")],
        )]),
        ..Default::default()
    };
    let sink = FakeSink {
        existing: vec![ReadwiseBook {
            title: "Dune".to_string(),
            num_highlights: 2,
        }],
        ..Default::default()
    };
    let syncer = Syncer::new(source, sink, options());

    syncer.run().await.unwrap();

    let posted = syncer.sink().posted();
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0].len(), 3);
}

#[tokio::test]
async fn test_rejected_upload_does_not_stop_the_run() {
    let source = FakeSource {
        books: vec![book("b1", "Rejected", 1, 0), book("b2", "Accepted", 1, 0)],
        bookmarks: HashMap::from([
            ("b1".to_string(), vec![bookmark(1, "1-2", "x")]),
            ("b2".to_string(), vec![bookmark(1, "1-2", "y")]),
        ]),
        ..Default::default()
    };
    let sink = FakeSink {
        reject_title: Some("Rejected".to_string()),
        ..Default::default()
    };
    let syncer = Syncer::new(source, sink, options());

    let stats = syncer.run().await.unwrap();

    assert_eq!(syncer.sink().posted().len(), 2);
    assert_eq!(
        stats,
        SyncStats {
            books: 2,
            uploaded: 1,
            highlights_sent: 1,
            skipped_empty: 0,
            skipped_synced: 0,
            failed: 1,
        }
    );
}

#[tokio::test]
async fn test_source_error_aborts_the_run() {
    let source = FakeSource {
        books: vec![book("b1", "Broken", 0, 1), book("b2", "Never Reached", 1, 0)],
        failing_reviews: Some("b1".to_string()),
        ..Default::default()
    };
    let syncer = Syncer::new(source, FakeSink::default(), options());

    let result = syncer.run().await;

    assert!(result.is_err());
    assert!(syncer.sink().posted().is_empty());
    assert!(!syncer.source().calls().contains(&"bookmarks:b2".to_string()));
}

#[tokio::test]
async fn test_details_fetched_only_when_enabled() {
    let source = FakeSource {
        books: vec![book("b1", "Dune", 1, 0)],
        bookmarks: HashMap::from([("b1".to_string(), vec![bookmark(1, "1-2", "a")])]),
        ..Default::default()
    };
    let syncer = Syncer::new(
        source,
        FakeSink::default(),
        SyncOptions {
            fetch_details: true,
            ..options()
        },
    );

    syncer.run().await.unwrap();

    let calls = syncer.source().calls();
    assert!(calls.contains(&"book_info:b1".to_string()));
    assert!(calls.contains(&"read_info:b1".to_string()));
}

#[tokio::test]
async fn test_throttle_delays_are_applied() {
    let source = FakeSource {
        books: vec![book("b1", "Dune", 2, 0)],
        bookmarks: HashMap::from([(
            "b1".to_string(),
            vec![bookmark(1, "1-2", "a"), bookmark(1, "3-4", "b")],
        )]),
        ..Default::default()
    };
    let syncer = Syncer::new(
        source,
        FakeSink::default(),
        SyncOptions {
            throttle: Throttle::new(Duration::from_millis(10), Duration::from_millis(30)),
            ..options()
        },
    );

    let started = Instant::now();
    syncer.run().await.unwrap();

    assert!(started.elapsed() >= Duration::from_millis(50));
}
