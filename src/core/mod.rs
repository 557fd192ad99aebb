// Generic grid controller: the resource trait, its view models and audit stamping

pub mod audit;
pub mod traits;

pub use audit::{Auditable, stamp_insert, stamp_update};
pub use traits::{GridResource, ViewModel};
