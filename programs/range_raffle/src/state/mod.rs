pub mod entry_range;
pub mod raffle;
pub mod randomness_request;
pub mod registry;

pub use entry_range::*;
pub use raffle::*;
pub use randomness_request::*;
pub use registry::*;
