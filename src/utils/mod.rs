pub mod avatar;
pub mod jwt;
pub mod nickname;
pub mod notify;
pub mod session;
