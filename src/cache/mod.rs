//! Binary archive caches
//!
//! Two independent tiers hold zipped build outputs:
//!
//! | Tier | Key | Location |
//! |------|-----|----------|
//! | Local | `<name>@<version>.zip` | project cache directory |
//! | Remote | `(name, version)` + `<name>.zip` | package registry or `source_url` |
//!
//! Neither tier is authoritative. A miss or failure in one only moves the
//! resolver on to the next tier.

pub mod local;
pub mod remote;

pub use local::LocalCache;
pub use remote::RemoteCache;
