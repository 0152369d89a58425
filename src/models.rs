//! Wire DTOs shared across pages, gathered in one place.

pub use crate::auth::{Gender, Role, User, UserRef, UserSummary};
pub use crate::blogs::{Blog, BlogStatus, Comment};
pub use crate::complaints::{AdminReply, Complaint};
pub use crate::controllers::Resource;
pub use crate::orders::{Delivery, Order, OrderProduct};
pub use crate::products::{Attribute, Image, ListingStatus, Product};
pub use crate::reviews::Review;
