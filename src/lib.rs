//! sitedesk: admin client for a small business website's content.
//!
//! DESIGN
//! ======
//! Portfolio items, the "About Us" block and client testimonials are all
//! managed the same way: list a remote collection, edit one draft at a
//! time, upsert it as multipart, delete by id, and reload to reconcile.
//! `ResourceController` implements that lifecycle once; `ResourceSpec`
//! describes what differs per resource.

pub mod config;
pub mod controller;
pub mod draft;
pub mod error;
pub mod http;
pub mod notify;
pub mod preview;
pub mod record;
pub mod resource;
pub mod transport;

pub use config::ClientConfig;
pub use controller::{ResourceController, Snapshot};
pub use draft::{Draft, LocalFile, Mode};
pub use error::ControllerError;
pub use http::HttpApi;
pub use notify::{Notice, NoticeLevel};
pub use preview::{PreviewLease, PreviewStore};
pub use record::{MediaRef, Record, RecordId};
pub use resource::{AttachmentRole, DeleteContract, DeletePolicy, FieldKind, FieldSpec, Multiplicity, ResourceSpec};
pub use transport::{CollectionApi, DeleteRequest, FormPart};
