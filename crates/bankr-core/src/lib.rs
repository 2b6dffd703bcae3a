//! Core of the bankr client: backend API, persisted session and route guard.

pub mod api;
pub mod config;
pub mod session;
pub mod statement;
pub mod storage;
