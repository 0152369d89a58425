pub mod dto;
pub mod services;

pub use dto::{format_cents, CheckoutQuote, Delivery, Order, OrderProduct, OrderRequest};
pub use services::{order_history, OrdersApi};
