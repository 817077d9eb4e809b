pub mod code_generator;
pub mod jwt;
pub mod money;
pub mod password;
pub mod phone;

pub use code_generator::generate_password;
pub use jwt::*;
pub use money::*;
pub use password::*;
pub use phone::*;
