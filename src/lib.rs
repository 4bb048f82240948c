//! Adscod marketplace server
//!
//! Data access for stores, campaigns, influencer applications and profiles,
//! served over a JSON API and backed by Supabase PostgREST (or memory).

pub mod app;
pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod models;
pub mod services;
pub mod util;
