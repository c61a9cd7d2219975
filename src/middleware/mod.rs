mod internal_auth;

pub use internal_auth::*;
