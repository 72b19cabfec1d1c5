//! Speed limit resolution.
//!
//! The [`LimitResolver`] answers "what is the limit here?" by asking the
//! remote service through the request cache layer and falling back to the
//! geo cache when the network cannot answer:
//!
//! ```text
//! throttled? ──yes──► None (caller keeps its last answer)
//!     │
//! offline and geo cache hit? ──yes──► cached
//!     │
//! fetch (stale-while-revalidate, timeout)
//!     ├─ limit ──► convert unit, write geo cache, fresh
//!     ├─ null limit ──► no limit known
//!     └─ failure ──► geo cache exact ──► geo cache nearby ──► unknown
//! ```
//!
//! Every path returns a value; failures surface only as the `is_cached` and
//! `is_nearby` flags or an unknown limit.

mod connectivity;
mod limit_resolver;
mod types;

pub use connectivity::Connectivity;
pub use limit_resolver::LimitResolver;
pub use types::{
    LimitResolution, ResolutionOrigin, ResolverConfig, DEFAULT_RESOLVE_INTERVAL,
    DEFAULT_RESOLVE_TIMEOUT,
};
