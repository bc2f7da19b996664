// src/models/therapist.rs
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Therapist {
    pub id: i32,
    pub name: String,
    pub specialization: Option<String>,
    pub bio: Option<String>,
    pub profile_image: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
