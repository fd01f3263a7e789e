#![allow(dead_code)]

pub mod config;
pub mod db;
pub mod logging;
pub mod models;
pub mod push;
pub mod queue;
pub mod services;
pub mod state;
