pub mod auth_service;
pub mod blacklist_service;
pub mod order_service;
pub mod product_service;
