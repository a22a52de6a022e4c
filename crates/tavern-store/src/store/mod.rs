//! High-level `SessionStore` API.
//!
//! [`SessionStore`] composes the repository layer into the session-centric
//! operations the coordinator needs: join resolution, snapshot aggregation,
//! schema/sheet/inventory saves, and feed append. Mutations are serialized
//! through an in-process write lock, so no intent ever observes another's
//! partial state.

mod session_store;

pub use session_store::*;
