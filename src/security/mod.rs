//! SSRF protection for URLs handed to the loaders.
//!
//! Every URL is validated before any fetch strategy sees it; strategies never
//! re-validate. See `url_validation` for the rules and the DNS-rebinding caveat.

mod url_validation;

pub use url_validation::{
    is_private_ip, resolve_hostname, HostResolver, ResolvedAddressSet, SystemResolver,
    UrlValidator,
};
