pub mod token_bucket;

pub use self::token_bucket::*;
