//! Cursor over link-paginated collections.
//!
//! Collections advertise their next page through the `Link` response header.
//! A [`Paginator`] follows it one page per [`advance`](Paginator::advance)
//! and stops, without further requests, once a page carries no next link.
//! A [`PageDirective`] passed to `advance` restarts the walk or points it
//! somewhere else.

use std::marker::PhantomData;

use futures::Stream;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::client::{Gateway, from_payload};
use crate::transport::{HyperTransport, Transport};
use crate::{CallOptions, GatewayError, RequestDescriptor};

/// Instruction applied before fetching the next page.
#[derive(Debug, Clone, PartialEq)]
pub enum PageDirective {
    /// Go back to the initial URL and parameters.
    Reset,
    /// Fetch `url` (or the pending next URL when `None`) with exactly `params`.
    Override {
        url: Option<String>,
        params: Option<Value>,
    },
}

impl PageDirective {
    /// Fetch `url` next, without parameters.
    pub fn url<U: Into<String>>(url: U) -> Self {
        PageDirective::Override {
            url: Some(url.into()),
            params: None,
        }
    }

    /// Fetch the pending next URL with `params`.
    pub fn params(params: Value) -> Self {
        PageDirective::Override {
            url: None,
            params: Some(params),
        }
    }
}

/// Where a cursor stands.
#[derive(Debug, Clone, PartialEq)]
pub enum PageState {
    /// The next `advance` fetches `url` with `params`.
    Active { url: String, params: Option<Value> },
    /// No next page; `advance` returns `None` without a request.
    Exhausted,
}

/// A cursor over a link-paginated collection, yielding one page of `T` per step.
///
/// Created by [`Gateway::paginate`]. Each step takes `&mut self`, so a cursor
/// has a single consumer.
///
/// # Example
///
/// ```ignore
/// use masto_gateway::PageDirective;
///
/// let mut timeline = gateway.paginate::<Vec<Status>, _>("/api/v1/timelines/home", &json!({"limit": 20}))?;
///
/// while let Some(page) = timeline.advance(None).await? {
///     for status in page {
///         println!("{}", status.id);
///     }
/// }
///
/// // Start over
/// let first = timeline.advance(Some(PageDirective::Reset)).await?;
/// ```
pub struct Paginator<T, S = HyperTransport> {
    gateway: Gateway<S>,
    initial_url: String,
    initial_params: Option<Value>,
    options: CallOptions,
    state: PageState,
    _page: PhantomData<fn() -> T>,
}

impl<T, S> std::fmt::Debug for Paginator<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Paginator")
            .field("initial_url", &self.initial_url)
            .field("initial_params", &self.initial_params)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<T, S> Paginator<T, S> {
    pub(crate) fn new(
        gateway: Gateway<S>,
        url: String,
        params: Option<Value>,
        options: CallOptions,
    ) -> Self {
        Self {
            gateway,
            state: PageState::Active {
                url: url.clone(),
                params: params.clone(),
            },
            initial_url: url,
            initial_params: params,
            options,
            _page: PhantomData,
        }
    }

    /// The current state.
    pub fn state(&self) -> &PageState {
        &self.state
    }

    /// Returns true if no further page will be fetched without a directive.
    pub fn is_exhausted(&self) -> bool {
        self.state == PageState::Exhausted
    }

    fn apply(&mut self, directive: PageDirective) {
        self.state = match directive {
            PageDirective::Reset => PageState::Active {
                url: self.initial_url.clone(),
                params: self.initial_params.clone(),
            },
            PageDirective::Override { url, params } => {
                let pending = match &self.state {
                    PageState::Active { url, .. } => Some(url.clone()),
                    PageState::Exhausted => None,
                };
                match url.or(pending) {
                    Some(url) => PageState::Active { url, params },
                    None => PageState::Exhausted,
                }
            }
        };
    }
}

impl<T, S> Paginator<T, S>
where
    T: DeserializeOwned,
    S: Transport,
{
    /// Apply `directive`, then fetch the next page.
    ///
    /// Returns `Ok(None)` once the collection is exhausted. After a page is
    /// fetched, the next URL comes from its `rel="next"` link, with no
    /// parameters. A failed request leaves the cursor where it was.
    pub async fn advance(&mut self, directive: Option<PageDirective>) -> Result<Option<T>, GatewayError> {
        if let Some(directive) = directive {
            self.apply(directive);
        }

        let (url, params) = match &self.state {
            PageState::Active { url, params } => (url.clone(), params.clone()),
            PageState::Exhausted => {
                #[cfg(feature = "tracing")]
                tracing::debug!(url = %self.initial_url, "pagination exhausted");
                return Ok(None);
            }
        };

        let request = RequestDescriptor::get(url)
            .maybe_payload(params)
            .options(self.options.clone());
        let response = self.gateway.send(request).await?;

        self.state = match response.metadata().next_link() {
            Some(next) => PageState::Active {
                url: next.to_owned(),
                params: None,
            },
            None => PageState::Exhausted,
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(state = ?self.state, "page fetched");

        from_payload(response.into_inner()).map(Some)
    }

    /// Fetch the next page without a directive.
    pub async fn next_page(&mut self) -> Result<Option<T>, GatewayError> {
        self.advance(None).await
    }

    /// Adapt the cursor into a stream of pages.
    ///
    /// The stream ends when the collection is exhausted, or right after
    /// yielding the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<T, GatewayError>> {
        futures::stream::unfold(Some(self), |cursor| async move {
            let mut cursor = cursor?;
            match cursor.advance(None).await {
                Ok(Some(page)) => Some((Ok(page), Some(cursor))),
                Ok(None) => None,
                Err(err) => Some((Err(err), None)),
            }
        })
    }
}
