// src/models/mod.rs

pub mod page;
pub mod post;
pub mod user;
