//! Postdesk - post and sheet services for a blog CMS
//!
//! This library provides the post service layer: validated CRUD, counters,
//! pagination and markdown rendering over an SQLite or MySQL store.

pub mod config;
pub mod db;
pub mod models;
pub mod services;
