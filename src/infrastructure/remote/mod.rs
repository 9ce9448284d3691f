//! Remote object store adapters

pub mod github;

pub use github::GithubRemoteStore;
