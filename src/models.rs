use chrono::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role stored in the PostgreSQL `user_role` ENUM.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    User,
}

impl UserRole {
    pub fn to_str(&self) -> &str {
        match self {
            UserRole::Admin => "admin",
            UserRole::User => "user",
        }
    }
}

/// What a report points at, stored in the `report_target` ENUM.
///
/// A report row carries both nullable foreign keys; this tag says which one
/// is populated.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "report_target", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReportTarget {
    Project,
    Comment,
}

impl ReportTarget {
    pub fn to_str(&self) -> &str {
        match self {
            ReportTarget::Project => "project",
            ReportTarget::Comment => "comment",
        }
    }
}

/// Row of the `users` table.
///
/// Accounts start unverified; `activation_token` / `token_expires_at` drive
/// both the activation and the password-reset flows and are cleared once
/// consumed.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub mobile_phone: String,
    pub password: String,
    pub role: UserRole,
    pub verified: bool,
    pub activation_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub description: String,
}

/// Row of the `projects` table.
///
/// `slug` is unique and derived from the title with a numeric suffix on
/// collision. Derived figures (total donations, donation percentage, average
/// rating) are aggregated in queries, never stored.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Project {
    pub id: i32,
    pub title: String,
    pub details: String,
    pub category_id: i32,
    pub total_target: Decimal,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub creator_id: Uuid,
    pub is_featured: bool,
    pub is_cancelled: bool,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

/// Row of the `comments` table. `parent_id` gives one level of threading:
/// a reply always points at a top-level comment.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Comment {
    pub id: i32,
    pub project_id: i32,
    pub user_id: Uuid,
    pub content: String,
    pub parent_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

