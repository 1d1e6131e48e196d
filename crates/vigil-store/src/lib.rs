//! # vigil-store
//!
//! The Remote Store as seen by the client: record shapes, the
//! [`RemoteStore`] contract, and [`LocalStore`], a SQLite + filesystem
//! backend that also plays the server-side roles (change-feed publisher,
//! notification trigger, analysis worker).

pub mod analyses;
pub mod blob_store;
pub mod cameras;
pub mod database;
pub mod feed;
pub mod local;
pub mod migrations;
pub mod models;
pub mod notifications;
pub mod query;
pub mod remote;

mod error;

pub use blob_store::BlobStore;
pub use database::Database;
pub use error::{Result, StoreError};
pub use feed::FeedHub;
pub use local::LocalStore;
pub use models::*;
pub use query::{Filter, Order, Scope, Table};
pub use remote::{
    ChangeEvent, ChangeOp, FeedStream, ProgressFn, RemoteStore, StoredObject, SubscriptionId,
};
