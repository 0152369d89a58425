pub mod dto;
pub mod services;

pub use dto::{Blog, BlogPayload, BlogStatus, Comment, FeedbackCounts};
pub use services::{blog_list, BlogThread, BlogsApi};
