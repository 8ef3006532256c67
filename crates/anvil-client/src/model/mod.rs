// ── Domain model ──
//
// Plain data types mirroring what the installer services report. All of
// them decode leniently: optional attributes default, unknown enum
// strings become Unknown, and unmodeled payload fields survive in
// untyped form where the domain needs them.

pub mod issue;
pub mod network;
pub mod question;
pub mod status;

pub use issue::{Issue, IssueSeverity, IssueSource};
pub use network::{Connection, Device, DeviceKind, IpCidr, LinkState, ParseCidrError};
pub use question::Question;
pub use status::{InstallationPhase, InstallerStatus, Progress};
