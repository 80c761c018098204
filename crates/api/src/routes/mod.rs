//! HTTP route handlers

pub mod control;
