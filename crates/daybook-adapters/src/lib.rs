//! Service adapters for Daybook: Google Calendar, Gmail, the League of
//! Legends live client, Oura, and a demo.
//!
//! Each adapter implements the [`Adapter`] trait defined in [`traits`],
//! providing a uniform interface for tool and resource discovery and
//! execution.

pub mod api;
pub mod calendar;
pub mod demo;
pub mod error;
pub mod gmail;
pub mod league;
pub mod oura;
pub mod traits;

pub use calendar::{CalendarConfig, GoogleCalendarAdapter};
pub use demo::DemoAdapter;
pub use error::{AdapterError, Result};
pub use gmail::{GmailAdapter, GmailConfig};
pub use league::{LeagueAdapter, LeagueConfig};
pub use oura::{OuraAdapter, OuraConfig};
pub use traits::{
    Adapter, AdapterType, AuthRequirement, HealthStatus, ResourceDefinition, ResourceTemplate,
    ToolDefinition, match_template,
};
