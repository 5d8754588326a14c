// autopatch/src/lib.rs
//! # AutoPatch CLI Application
//!
//! This crate provides the command-line surface for the autopatch engine:
//! `triage` reconciles and scores a findings batch, `patch` drives the
//! remediation pipeline for the resulting auto-fix candidates.

pub mod cli;
pub mod commands;
pub mod logger;
pub mod ui;
