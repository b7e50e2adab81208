// src/handlers/mod.rs

pub mod results;
pub mod review;
pub mod submission;
