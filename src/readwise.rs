//! Readwise v2 API client.

use reqwest::{Client, RequestBuilder, header};

use crate::config::Readwise;
use crate::error::SinkError;
use crate::model::{CreateHighlights, Highlight, ReadwiseBook, ReadwiseBookPage};
use crate::normalize::CATEGORY_BOOKS;

pub struct ReadwiseClient {
    client: Client,
    api_url: String,
    token: String,
    page_size: u32,
    source_type: String,
}

impl ReadwiseClient {
    pub fn new(cfg: &Readwise, token: &str) -> Result<Self, SinkError> {
        Ok(ReadwiseClient {
            client: Client::builder().build()?,
            api_url: cfg.api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            page_size: cfg.page_size,
            source_type: cfg.source_type.clone(),
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(header::AUTHORIZATION, format!("Token {}", self.token))
    }

    /// Every book of category `books` from this source, following `next`
    /// links until the listing is exhausted.
    pub async fn list_books(&self) -> Result<Vec<ReadwiseBook>, SinkError> {
        let page_size = self.page_size.to_string();
        let mut request = self.client.get(format!("{}/books/", self.api_url)).query(&[
            ("page_size", page_size.as_str()),
            ("category", CATEGORY_BOOKS),
            ("source", self.source_type.as_str()),
        ]);
        let mut books = Vec::new();

        loop {
            let response = self.authorized(request).send().await?;
            let status = response.status();
            let body = response.text().await?;
            if !status.is_success() {
                return Err(SinkError::Status {
                    endpoint: "/books/",
                    status,
                    body,
                });
            }

            let page: ReadwiseBookPage = serde_json::from_str(&body)?;
            tracing::debug!(total = page.count, received = page.results.len(), "listed readwise books");
            books.extend(page.results);

            match page.next {
                Some(next) => request = self.client.get(next),
                None => break,
            }
        }

        Ok(books)
    }

    pub async fn create_highlights(&self, highlights: &[Highlight]) -> Result<(), SinkError> {
        let response = self
            .authorized(self.client.post(format!("{}/highlights/", self.api_url)))
            .json(&CreateHighlights { highlights })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Status {
                endpoint: "/highlights/",
                status,
                body,
            });
        }
        Ok(())
    }
}
