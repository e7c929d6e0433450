//! CloudCharge web client.
//!
//! A small server-rendered web application for the CloudCharge EV network:
//! find the nearest charging station, book a charging slot, and borrow or
//! deposit swap batteries. All business state lives in the CloudCharge
//! backend; this crate fetches it, ranks and prices it, and renders pages.

pub mod api;
pub mod config;
pub mod domain;
pub mod feed;
pub mod pricing;
pub mod rank;
pub mod session;
pub mod web;
