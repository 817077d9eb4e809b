pub mod auth;
pub mod backup;
pub mod cart;
pub mod customer;
pub mod health;
pub mod menu;
pub mod order;
pub mod report;
pub mod user;

pub use auth::auth_config;
pub use backup::backup_config;
pub use cart::cart_config;
pub use customer::customer_config;
pub use health::health;
pub use menu::menu_config;
pub use order::order_config;
pub use report::report_config;
pub use user::user_config;
