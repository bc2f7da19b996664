// src/handlers/mod.rs
pub mod ai;
pub mod appointments;
pub mod auth;
pub mod chat;
pub mod therapists;
