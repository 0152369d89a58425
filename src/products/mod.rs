pub mod dto;
pub mod services;

pub use dto::{Attribute, Image, ListingPayload, ListingStatus, Product};
pub use services::{catalog_list, my_listings, ProductList, ProductsApi};
