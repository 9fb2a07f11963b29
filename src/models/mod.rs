// Re-export all model types
pub use self::cart::*;
pub use self::category::*;
pub use self::enums::*;
pub use self::errors::*;
pub use self::menu_item::*;
pub use self::order::*;
pub use self::user::*;
pub use self::validation::*;

mod cart;
mod category;
mod enums;
mod errors;
mod menu_item;
mod order;
mod user;
mod validation;
