//! Cursor pagination over list RPCs.
//!
//! A [`Page`] holds one server page plus the means to fetch the next one. Nothing
//! is prefetched: each page boundary costs exactly one list call, issued only
//! when the caller asks for it.
//!
//! # Design Decisions
//! - An empty-string cursor is the same as no cursor
//! - Empty pages that still carry a cursor are followed, never treated as the end
//! - A failed fetch ends [`Page::iterate_all`] after yielding the error

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::stream::{self, BoxStream, StreamExt};

use crate::error::Result;

/// Fetches the page that starts at the given cursor.
pub(crate) type PageFetcher<T> = Arc<dyn Fn(String) -> BoxFuture<'static, Result<Page<T>>> + Send + Sync>;

/// One page of a list result.
pub struct Page<T> {
    values: Vec<T>,
    next_page_token: Option<String>,
    fetcher: PageFetcher<T>,
}

impl<T: Send + 'static> Page<T> {
    pub(crate) fn new(values: Vec<T>, next_page_token: Option<String>, fetcher: PageFetcher<T>) -> Self {
        Self {
            values,
            next_page_token: next_page_token.filter(|token| !token.is_empty()),
            fetcher,
        }
    }

    /// Items of this page, in server order.
    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn into_values(self) -> Vec<T> {
        self.values
    }

    /// Cursor of the next page; `None` on the last page.
    pub fn next_page_token(&self) -> Option<&str> {
        self.next_page_token.as_deref()
    }

    pub fn has_next_page(&self) -> bool {
        self.next_page_token.is_some()
    }

    /// Fetch the next page. `Ok(None)` on the last page.
    pub async fn next_page(&self) -> Result<Option<Page<T>>> {
        match &self.next_page_token {
            Some(token) => (self.fetcher)(token.clone()).await.map(Some),
            None => Ok(None),
        }
    }

    /// Every item from this page onward, fetching further pages on demand.
    pub fn iterate_all(self) -> BoxStream<'static, Result<T>> {
        struct Cursor<T> {
            buffer: VecDeque<T>,
            next: Option<String>,
            fetcher: PageFetcher<T>,
        }

        let start = Cursor {
            buffer: self.values.into(),
            next: self.next_page_token,
            fetcher: self.fetcher,
        };

        stream::unfold(Some(start), |cursor| async move {
            let Some(mut cursor) = cursor else {
                return None;
            };
            loop {
                if let Some(item) = cursor.buffer.pop_front() {
                    return Some((Ok(item), Some(cursor)));
                }

                let Some(token) = cursor.next.take() else {
                    return None;
                };
                match (cursor.fetcher)(token).await {
                    Ok(page) => {
                        cursor.buffer = page.values.into();
                        cursor.next = page.next_page_token;
                    }
                    Err(err) => return Some((Err(err), None)),
                }
            }
        })
        .boxed()
    }
}

impl<T: fmt::Debug> fmt::Debug for Page<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("values", &self.values)
            .field("next_page_token", &self.next_page_token)
            .finish_non_exhaustive()
    }
}
