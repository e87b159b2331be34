//! Paginated collection views
//!
//! A view is a filtered, sorted, paginated window onto a server-side
//! collection, plus the full set of ids matching the filter (for
//! "select all matching" actions).
//!
//! ## Flow
//!
//! 1. The caller builds a [`Query`] and calls `execute`
//! 2. The page and the id snapshot are requested concurrently
//! 3. If the page vanished (collection shrank), the view falls back to page 1
//! 4. The result and ids are committed to the [`ViewStore`](crate::store::ViewStore)
//!
//! ## Usage
//!
//! ```ignore
//! let view = PageSynchronizer::new(transport, PageEndpoint::collection("channels/channels"), store);
//! let page = view.execute(Query::new().with_param("channel_group", "Sports")).await?;
//! ```

mod query;
mod synchronizer;

pub use query::{AllIdsSnapshot, Query, QueryResult, DEFAULT_PAGE_SIZE};
pub use synchronizer::{PageEndpoint, PageSynchronizer, ViewSession};
