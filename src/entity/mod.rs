pub mod blacklist_entries;
pub mod order_events;
pub mod orders;
pub mod products;
pub mod users;

pub use blacklist_entries::Entity as BlacklistEntries;
pub use order_events::Entity as OrderEvents;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
pub use users::Entity as Users;
