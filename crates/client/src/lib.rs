//! `outreach-client`
//!
//! **Responsibility:** Thin shell around the remote console API.
//!
//! This crate provides:
//! - The [`ConsoleApi`] trait: every remote operation the job trackers and
//!   the notification feed consume, behind one injectable interface
//! - An HTTP implementation backed by `reqwest`
//! - The toast/navigation surfaces the trackers emit user-visible signals to
//!
//! All business logic lives server-side; nothing in this crate interprets a
//! notification beyond decoding it.

pub mod api;
pub mod http;
pub mod ui;

pub use api::{
    ApiError, CampaignSnapshot, ConsoleApi, ContactType, ResearchSnapshot, StartResearchResponse,
};
pub use http::HttpConsoleApi;
pub use ui::{
    Navigator, Notifier, Toast, ToastAction, ToastVariant, TracingNavigator, TracingNotifier,
    follow_action,
};
