pub mod moderation;
pub mod services;

pub use moderation::{
    BlogModeration, ComplaintAction, ComplaintDesk, ListingModeration, UserAction, UserModeration, Verdict,
};
pub use services::{blog_queue, complaint_inbox, listing_queue, user_table, AdminApi};
