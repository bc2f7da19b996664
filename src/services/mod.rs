// src/services/mod.rs
pub mod home_content;
pub mod transcript;
