//! Squad task board library
//!
//! Team task management: who can see which task, how a task's status
//! follows its checklist, and how responsibility moves between people
//! and squads while keeping an auditable history.

pub mod access;
pub mod activity;
pub mod agenda;
pub mod board;
pub mod cli;
pub mod config;
pub mod creation;
pub mod db;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod overdue;
pub mod reminders;
pub mod transfer;
pub mod types;
pub mod visibility;
pub mod workflow;
