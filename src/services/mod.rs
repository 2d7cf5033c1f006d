pub mod checkout;
pub mod customers;
pub mod orders;
pub mod poller;
pub mod products;
