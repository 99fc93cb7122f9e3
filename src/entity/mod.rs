pub mod cart_on_items;
pub mod carts;
pub mod categories;
pub mod order_on_products;
pub mod orders;
pub mod products;
pub mod rents;
pub mod sea_orm_active_enums;
pub mod teams;
pub mod token_blacklist;
pub mod users;

pub use cart_on_items::Entity as CartOnItems;
pub use carts::Entity as Carts;
pub use categories::Entity as Categories;
pub use order_on_products::Entity as OrderOnProducts;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
pub use rents::Entity as Rents;
pub use sea_orm_active_enums::{OrderStatus, PaymentStatus};
pub use teams::Entity as Teams;
pub use token_blacklist::Entity as TokenBlacklist;
pub use users::Entity as Users;
