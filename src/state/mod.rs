pub mod keyed;
mod sweeper;

pub use self::keyed::{Builder, RateLimiter};
pub use self::sweeper::Sweeper;
