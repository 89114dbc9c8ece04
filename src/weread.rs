//! WeRead web API client.
//!
//! All state lives in [`WeReadSession`]: the cookie jar seeded from the
//! user's browser cookie and the endpoint roots. Calls are read-only.

use std::sync::Arc;

use reqwest::cookie::Jar;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

use crate::config::WeRead;
use crate::error::SourceError;
use crate::model::{
    ApiStatus, Book, BookInfo, BookmarkList, NotebookList, RawBookInfo, RawBookmark, RawReview,
    ReadInfo, ReviewList,
};

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Splits a raw `Cookie` header into name/value pairs.
pub fn parse_cookie_header(header: &str) -> Result<Vec<(String, String)>, SourceError> {
    let pairs: Vec<(String, String)> = header
        .split(';')
        .filter_map(|part| {
            let (name, value) = part.trim().split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().trim_matches('"').to_string()))
        })
        .collect();

    if pairs.is_empty() {
        return Err(SourceError::InvalidCookie);
    }
    Ok(pairs)
}

/// Parses a WeRead body, surfacing in-band `errcode` failures first.
pub fn decode<T: DeserializeOwned>(body: &str) -> Result<T, SourceError> {
    let status: ApiStatus = serde_json::from_str(body)?;
    if let Some(code) = status.errcode.filter(|code| *code != 0) {
        return Err(SourceError::Api {
            code,
            message: status.errmsg.unwrap_or_default(),
        });
    }
    Ok(serde_json::from_str(body)?)
}

fn parse_url(raw: &str) -> Result<Url, SourceError> {
    Url::parse(raw).map_err(|e| SourceError::InvalidUrl(format!("{}: {}", raw, e)))
}

pub struct WeReadSession {
    client: Client,
    base_url: Url,
    api_url: String,
}

impl WeReadSession {
    pub fn new(cfg: &WeRead, cookie_header: &str) -> Result<Self, SourceError> {
        let base_url = parse_url(&cfg.base_url)?;
        let api_root = parse_url(&cfg.api_url)?;

        let jar = Arc::new(Jar::default());
        let pairs = parse_cookie_header(cookie_header)?;
        for url in [&base_url, &api_root] {
            for (name, value) in &pairs {
                jar.add_cookie_str(&format!("{}={}; Path=/", name, value), url);
            }
        }
        tracing::debug!(cookies = pairs.len(), "seeded weread cookie jar");

        let client = Client::builder()
            .cookie_provider(jar)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(WeReadSession {
            client,
            base_url,
            api_url: cfg.api_url.trim_end_matches('/').to_string(),
        })
    }

    /// Loads the site root so the platform can refresh session cookies.
    pub async fn warm_up(&self) -> Result<(), SourceError> {
        let response = self.client.get(self.base_url.clone()).send().await?;
        tracing::debug!(status = %response.status(), "weread session warmed up");
        Ok(())
    }

    async fn get_body(
        &self,
        endpoint: &'static str,
        params: &[(&str, &str)],
    ) -> Result<Option<String>, SourceError> {
        let response = self
            .client
            .get(format!("{}{}", self.api_url, endpoint))
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(endpoint, %status, body = %body, "weread request failed");
            return Ok(None);
        }
        Ok(Some(response.text().await?))
    }

    async fn get_required<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        params: &[(&str, &str)],
    ) -> Result<T, SourceError> {
        let response = self
            .client
            .get(format!("{}{}", self.api_url, endpoint))
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status { endpoint, status });
        }
        decode(&response.text().await?)
    }

    /// Books with at least one annotation, ordered by `sort`. A failed
    /// request yields an empty list.
    pub async fn notebooks(&self) -> Result<Vec<Book>, SourceError> {
        let Some(body) = self.get_body("/user/notebooks", &[]).await? else {
            return Ok(Vec::new());
        };
        let list: NotebookList = decode(&body)?;
        let mut books: Vec<Book> = list.books.into_iter().map(Book::from).collect();
        books.sort_by_key(|book| book.sort);
        Ok(books)
    }

    /// A failed request yields an empty list.
    pub async fn bookmarks(&self, book_id: &str) -> Result<Vec<RawBookmark>, SourceError> {
        let Some(body) = self
            .get_body("/book/bookmarklist", &[("bookId", book_id)])
            .await?
        else {
            return Ok(Vec::new());
        };
        let list: BookmarkList = decode(&body)?;
        Ok(list.updated)
    }

    pub async fn reviews(&self, book_id: &str) -> Result<Vec<RawReview>, SourceError> {
        let list: ReviewList = self
            .get_required(
                "/review/list",
                &[("bookId", book_id), ("listType", "11"), ("mine", "1"), ("syncKey", "0")],
            )
            .await?;
        Ok(list.reviews.into_iter().map(|entry| entry.review).collect())
    }

    pub async fn book_info(&self, book_id: &str) -> Result<BookInfo, SourceError> {
        let raw: RawBookInfo = self.get_required("/book/info", &[("bookId", book_id)]).await?;
        Ok(BookInfo::from(raw))
    }

    pub async fn read_info(&self, book_id: &str) -> Result<ReadInfo, SourceError> {
        self.get_required(
            "/book/readinfo",
            &[
                ("bookId", book_id),
                ("readingDetail", "1"),
                ("readingBookIndex", "1"),
                ("finishedDate", "1"),
            ],
        )
        .await
    }
}
