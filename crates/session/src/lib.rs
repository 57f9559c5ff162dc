//! Durable session storage plus the derived views built from it: the
//! completeness assessment and the oracle-facing context digest.

pub mod assess;
pub mod digest;
pub mod store;

pub use assess::{Assessment, RECOGNIZED_FEATURES, assess};
pub use digest::ContextDigest;
pub use store::SessionStore;
