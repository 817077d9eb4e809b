pub mod auth_service;
pub mod backup_service;
pub mod cart_service;
pub mod customer_service;
pub mod menu_service;
pub mod order_service;
pub mod report_service;
pub mod user_service;

pub use auth_service::*;
pub use backup_service::*;
pub use cart_service::CartService;
pub use customer_service::CustomerService;
pub use menu_service::MenuService;
pub use order_service::*;
pub use report_service::*;
pub use user_service::*;
