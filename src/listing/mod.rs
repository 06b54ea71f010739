//! Listing controller - the append-only post list behind "load more"
//!
//! A [`Listing`] starts from the first page of the post query and grows one
//! page at a time by following the opaque `next_page` cursor. Items are only
//! ever appended, in the order the source returns them. Duplicate uids from a
//! misbehaving source are kept as they come.
//!
//! ```text
//!   Idle ──begin──▶ Loading ──ok, cursor──▶ Idle
//!    ▲                │  │
//!    │                │  └──ok, no cursor──▶ Exhausted
//!    └──abandon───────┤
//!                     └──error──▶ Errored ──begin (retry)──▶ Loading
//! ```

use std::future::Future;

use crate::content::ListItem;
use crate::source::{ContentClient, Query, Result, ResultsPage};

/// Fields the listing needs from each post
pub const LISTING_FIELDS: [&str; 4] = ["title", "subtitle", "author", "content"];

/// Where the listing is in its paging lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingState {
    /// More pages may be loaded
    Idle,
    /// A page fetch is in flight
    Loading,
    /// The cursor ran out; nothing left to load
    Exhausted,
    /// The last fetch failed; loading again retries the same cursor
    Errored(String),
}

/// Outcome of a "load more" request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextPage {
    /// This many items were appended
    Appended(usize),
    /// No cursor left; nothing was fetched
    Exhausted,
    /// Another fetch is still in flight; nothing was fetched
    Busy,
    /// The fetch was cancelled before it completed
    Cancelled,
}

/// Ordered post list plus the cursor of the next page
#[derive(Debug, Clone)]
pub struct Listing {
    items: Vec<ListItem>,
    cursor: Option<String>,
    state: ListingState,
}

impl Listing {
    /// The query behind the listing: every document of `document_type`,
    /// `per_page` at a time
    pub fn query(document_type: &str, per_page: usize) -> Query {
        Query::document_type(document_type)
            .fetch(
                LISTING_FIELDS
                    .iter()
                    .map(|field| format!("{}.{}", document_type, field)),
            )
            .page_size(per_page)
    }

    /// Fetch the first page
    pub async fn initial_load(client: &dyn ContentClient, query: &Query) -> Result<Self> {
        let page = client.query(query).await?;
        tracing::debug!(
            "Initial listing: {} of {} posts",
            page.results.len(),
            page.total_results_size
        );
        Ok(Self::from_page(page))
    }

    /// Build a listing from an already fetched first page
    pub fn from_page(page: ResultsPage) -> Self {
        let state = if page.next_page.is_some() {
            ListingState::Idle
        } else {
            ListingState::Exhausted
        };
        Self {
            items: page.results.iter().map(ListItem::from).collect(),
            cursor: page.next_page,
            state,
        }
    }

    pub fn items(&self) -> &[ListItem] {
        &self.items
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    pub fn state(&self) -> &ListingState {
        &self.state
    }

    /// Whether another page can be requested
    pub fn has_more(&self) -> bool {
        self.cursor.is_some()
    }

    /// Message of the last failed fetch, if the listing is errored
    pub fn error(&self) -> Option<&str> {
        match &self.state {
            ListingState::Errored(message) => Some(message),
            _ => None,
        }
    }

    /// Enter `Loading` and hand out the cursor to fetch
    ///
    /// Returns `None` when exhausted or when a fetch is already in flight.
    pub fn begin_next_page(&mut self) -> Option<String> {
        match self.state {
            ListingState::Idle | ListingState::Errored(_) => match &self.cursor {
                Some(cursor) => {
                    self.state = ListingState::Loading;
                    Some(cursor.clone())
                }
                None => {
                    self.state = ListingState::Exhausted;
                    None
                }
            },
            ListingState::Loading | ListingState::Exhausted => None,
        }
    }

    /// Apply the result of the fetch started by [`begin_next_page`]
    ///
    /// On success the page's items are appended and the cursor advances. On
    /// failure items and cursor stay as they were and the error is returned.
    /// A result arriving after the fetch was abandoned is dropped.
    ///
    /// [`begin_next_page`]: Listing::begin_next_page
    pub fn complete_next_page(&mut self, result: Result<ResultsPage>) -> Result<usize> {
        if self.state != ListingState::Loading {
            tracing::debug!("Dropping page result for a fetch that is no longer in flight");
            return Ok(0);
        }

        match result {
            Ok(page) => {
                let appended = page.results.len();
                self.items.extend(page.results.iter().map(ListItem::from));
                self.cursor = page.next_page;
                self.state = if self.cursor.is_some() {
                    ListingState::Idle
                } else {
                    ListingState::Exhausted
                };
                Ok(appended)
            }
            Err(err) => {
                tracing::warn!("Failed to load next page: {}", err);
                self.state = ListingState::Errored(err.to_string());
                Err(err)
            }
        }
    }

    /// Give up on the fetch in flight without touching items or cursor
    pub fn abandon_next_page(&mut self) {
        if self.state == ListingState::Loading {
            self.state = ListingState::Idle;
        }
    }

    /// Load the next page and append it
    ///
    /// A no-op without a network request once the cursor is exhausted.
    pub async fn handle_next_page(&mut self, client: &dyn ContentClient) -> Result<NextPage> {
        if self.state == ListingState::Loading {
            return Ok(NextPage::Busy);
        }
        let Some(cursor) = self.begin_next_page() else {
            return Ok(NextPage::Exhausted);
        };

        let result = client.fetch_page(&cursor).await;
        self.complete_next_page(result).map(NextPage::Appended)
    }

    /// Like [`handle_next_page`], but gives up when `cancelled` resolves first
    ///
    /// [`handle_next_page`]: Listing::handle_next_page
    pub async fn handle_next_page_until<F>(
        &mut self,
        client: &dyn ContentClient,
        cancelled: F,
    ) -> Result<NextPage>
    where
        F: Future<Output = ()>,
    {
        if self.state == ListingState::Loading {
            return Ok(NextPage::Busy);
        }
        let Some(cursor) = self.begin_next_page() else {
            return Ok(NextPage::Exhausted);
        };

        tokio::select! {
            result = client.fetch_page(&cursor) => {
                self.complete_next_page(result).map(NextPage::Appended)
            }
            _ = cancelled => {
                self.abandon_next_page();
                Ok(NextPage::Cancelled)
            }
        }
    }
}
