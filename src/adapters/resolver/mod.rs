//! IdpResolver adapters.

mod static_idp_resolver;

pub use static_idp_resolver::StaticIdpResolver;
