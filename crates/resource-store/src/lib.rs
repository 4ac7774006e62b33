//! Resource store abstractions
//!
//! The datacenter controller never talks to the Kubernetes API directly. It goes
//! through two small traits so the convergence logic can be unit tested against
//! an in-memory store:
//!
//! - [`ResourceStore`]: lookup, create and update of managed Services, plus the
//!   datacenter progress indicator
//! - [`EventSink`]: best-effort operational events attached to the owning
//!   datacenter
//!
//! # Example
//!
//! ```no_run
//! use resource_store::{KubeResourceStore, ResourceStore, StoreError};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = kube::Client::try_default().await?;
//! let store = KubeResourceStore::new(client);
//!
//! match store.get_service("cass", "cluster1-dc1-service").await {
//!     Ok(service) => println!("found {:?}", service.metadata.resource_version),
//!     Err(StoreError::NotFound(_)) => println!("needs creating"),
//!     Err(e) => return Err(e.into()),
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod events;
pub mod kube_store;
#[path = "trait.rs"]
pub mod store_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use error::StoreError;
pub use events::{EventKind, EventSink, KubeEventSink};
pub use kube_store::KubeResourceStore;
pub use store_trait::ResourceStore;
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockEventSink, MockFailure, MockResourceStore, RecordedEvent, StoreCall};
