//! Bringing bot sources onto the host.
//!
//! Repository-backed bots are cloned or fast-forwarded through the
//! [`ports::SourceFetcher`] port; upload-only bots receive their sources as a
//! ZIP archive expanded by [`adapters::ZipArchiveExpander`].

pub mod adapters;
pub mod domain;
pub mod ports;

#[cfg(test)]
mod tests;
