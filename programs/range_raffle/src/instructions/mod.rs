pub mod admin;
pub mod claim;
pub mod entry;
pub mod randomness;
pub mod views;

pub use admin::*;
pub use claim::*;
pub use entry::*;
pub use randomness::*;
pub use views::*;
