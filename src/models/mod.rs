// src/models/mod.rs
pub mod ai;
pub mod appointment;
pub mod auth;
pub mod chat;
pub mod therapist;
