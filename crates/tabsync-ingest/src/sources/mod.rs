//! Collaborators that turn a release page into an extraction tree

pub mod archive;
pub mod links;

pub use archive::{ArchiveFetcher, HttpArchiveFetcher};
pub use links::{HtmlLinkDiscovery, LinkDiscovery};
