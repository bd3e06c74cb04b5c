//! QuillPress - a multi-tenant content and SEO publishing system
//!
//! Agencies manage articles for many clients, each on a subscription tier
//! with a monthly article quota. Readers comment on, like and favorite
//! published articles; the dashboard reports trends over rolling windows.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
