pub mod customer;
pub mod order;
pub mod product;

pub use customer::Entity as Customer;
pub use order::Entity as Order;
pub use product::Entity as Product;
