pub mod backup;
pub mod cart;
pub mod common;
pub mod customer;
pub mod menu;
pub mod order;
pub mod pagination;
pub mod report;
pub mod user;

pub use backup::*;
pub use cart::*;
pub use common::*;
pub use customer::*;
pub use menu::*;
pub use order::*;
pub use pagination::*;
pub use report::*;
pub use user::*;
