pub use cancel::CancellationToken;
pub use refresher::{Fetch, FetchError, Refresher, RefresherSet, Schedule, Update};
pub use slot::SharedSlot;

pub mod advice;
pub mod cancel;
pub mod clock;
pub mod config;
pub mod display;
pub mod face;
pub mod feed;
pub mod http;
pub mod mock;
pub mod refresher;
pub mod shutdown;
pub mod slot;
pub mod snow;
pub mod weather;
