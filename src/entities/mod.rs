pub mod credit_entries;
pub mod customers;
pub mod menu_items;
pub mod order_lines;
pub mod orders;
pub mod toppings;
pub mod users;

pub use credit_entries as credit_entry_entity;
pub use customers as customer_entity;
pub use menu_items as menu_item_entity;
pub use order_lines as order_line_entity;
pub use orders as order_entity;
pub use toppings as topping_entity;
pub use users as user_entity;

pub use credit_entries::CreditEntryKind;
pub use orders::PaymentMode;
pub use users::UserRole;
