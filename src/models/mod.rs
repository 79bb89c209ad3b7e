// src/models/mod.rs

pub mod activity;
pub mod badge;
pub mod question;
pub mod user;
