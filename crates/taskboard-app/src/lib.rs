//! Application layer for taskboard.
//!
//! This crate provides the task store, the mutation gateway, backend
//! boundaries with an in-process demo implementation, session handling and
//! configuration shared by every client surface.

pub mod api;
pub mod audit;
pub mod backend;
pub mod config;
pub mod demo;
pub mod demo_auth;
pub mod error;
pub mod filter_util;
pub mod gateway;
pub mod sequencer;
pub mod session;
pub mod task_patch;
pub mod task_store;

// Re-exports for convenience
pub use api::{AuthResponse, CreateTaskRequest, DEFAULT_PAGE_LIMIT, LoginRequest, Page, TaskPage, TaskQuery};
pub use audit::{AuditAction, AuditLogEntry};
pub use backend::{AuthBackend, TaskBackend};
pub use config::{DeploymentProfile, ProfilePreset, ProjectConfig};
pub use demo::{DemoBackend, DemoOptions, SimulatedLatency};
pub use demo_auth::{DEMO_PASSWORD, DemoAuthService};
pub use error::{AuthError, BackendError, TaskError};
pub use filter_util::{FilterBuildError, TaskFilterBuilder, normalize_timestamp, parse_due};
pub use gateway::{LoadReport, TaskGateway};
pub use sequencer::{LoadOutcome, RequestSeq, RequestSequencer};
pub use session::Session;
pub use task_patch::{AssigneePatch, DuePatch, SetDiff, TaskUpdate, diff_sets};
pub use task_store::{StoreChange, StoreEvent, TaskStore};
