//! Membership Module
//!
//! Describes who is in the cluster. Nodes are identified by `NodeIdentity`
//! (`id`, `host`, `port`) and discovered through a `MembershipSource`.
//!
//! ## Sources
//! - **`StaticMembership`**: A fixed member list from configuration.
//! - **`RegistryMembership`**: Polls an HTTP registry for the current member list.
//!
//! Registration and health announcement are left to whatever runs the registry.

pub mod source;
pub mod types;
