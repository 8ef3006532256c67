//! Client-side synchronization layer for the Anvil installer.
//!
//! The installer itself runs as a set of bus services; this crate keeps
//! an in-process mirror of their state and republishes changes to local
//! subscribers:
//!
//! - **[`InstallerClient`]** — Facade composing one client per domain
//!   over a shared [`MessageBus`] handle.
//!   [`connect()`](InstallerClient::connect) is all or nothing: every
//!   domain comes up or the whole composition fails.
//!
//! - **Domain clients** — [`NetworkClient`] mirrors the device table and
//!   connection set, [`QuestionsClient`] the pending-question queue,
//!   [`ManagerClient`] wraps status/probe/install plus progress relay,
//!   and [`IssuesClient`] aggregates [`StorageClient`] and
//!   [`SoftwareClient`] problem reports at read time.
//!
//! - **[`ServiceMonitor`]** — Watches for the installer service
//!   vanishing from the bus and reports the disconnect exactly once.
//!
//! - **[`CallbackRegistry`]** — Subscribe/notify primitive shared by
//!   every domain client; handlers may unsubscribe or resubscribe from
//!   inside a notification pass.
//!
//! Each stateful client runs one reducer task that is the sole writer
//! of its collection; readers get snapshots through `watch` channels,
//! so a caller never observes a half-applied burst of events.

pub mod client;
pub mod config;
pub mod error;
pub mod issues;
pub mod manager;
pub mod model;
pub mod monitor;
pub mod network;
pub mod questions;
pub mod registry;

mod request;

// ── Primary re-exports ──────────────────────────────────────────────
pub use anvil_bus::{BusAddress, BusError, MessageBus, Signal, SignalStream};
pub use client::InstallerClient;
pub use config::{ClientConfig, INSTALLER_SERVICE};
pub use error::ClientError;
pub use issues::{IssuesClient, SoftwareClient, StorageClient};
pub use manager::ManagerClient;
pub use monitor::{ConnectivityState, Disconnected, ServiceMonitor};
pub use network::{NetworkClient, NetworkEvent};
pub use questions::{QuestionsClient, QuestionsEvent};
pub use registry::{CallbackRegistry, Subscription};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    // Network
    Connection,
    Device,
    DeviceKind,
    IpCidr,
    LinkState,
    ParseCidrError,
    // Installer status
    InstallationPhase,
    InstallerStatus,
    Progress,
    // Issues
    Issue,
    IssueSeverity,
    IssueSource,
    // Questions
    Question,
};
