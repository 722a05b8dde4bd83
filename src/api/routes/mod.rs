//! API Routes
//!
//! Route handlers organized by functionality.

pub mod explore;
pub mod health;
pub mod logs;
