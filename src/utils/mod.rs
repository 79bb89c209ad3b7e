// src/utils/mod.rs

pub mod avatar;
pub mod hash;
pub mod jwt;
