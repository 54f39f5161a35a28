mod acl;
mod models;
pub mod repr;
mod status;

pub use acl::*;
pub use models::*;
pub use repr::ApiRepr;
pub use status::*;
