pub mod dto;
pub mod services;
pub mod session;
pub mod validation;

pub use dto::{
    AuthResponse, Gender, LoginRequest, ProfileUpdate, RegisterRequest, Role, User, UserRef, UserSummary,
};
pub use services::SessionStore;
pub use session::{SessionHandle, SessionState, SessionView};
