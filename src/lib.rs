//! Client core of the travel app.
//!
//! [`network`] turns endpoint descriptions into typed results, [`lifecycle`]
//! drives the account and cache flows of the tab bar screen, and [`storage`]
//! holds the local collaborators both of them touch.

pub mod config;
pub mod lifecycle;
pub mod network;
pub mod storage;
