//! URL validation and SSRF protection.
//!
//! Validation runs in two stages:
//! - a syntactic check (no I/O): the URL parses, uses http:// or https://, has a
//!   host and stays under `MAX_URL_LENGTH`
//! - unless local fetching is enabled, the host is resolved through the system
//!   resolver and the URL is rejected if ANY resolved IPv4 or IPv6 address is
//!   private, loopback, link-local or otherwise non-public
//!
//! A host whose records mix public and private addresses is rejected.
//!
//! Known limitation: the check happens once, at validation time. The HTTP
//! client and the browser resolve the host again when they connect, so a DNS
//! rebinding attack (a record that flips to a private address between the two
//! lookups) is not caught here.

use std::collections::BTreeSet;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs};
use std::sync::Arc;

use log::{debug, warn};
use url::{Host, Url};

use crate::config::{Settings, MAX_URL_LENGTH};
use crate::error_handling::LoaderError;

/// All addresses a hostname resolved to in one lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedAddressSet {
    pub ipv4: BTreeSet<Ipv4Addr>,
    pub ipv6: BTreeSet<Ipv6Addr>,
}

impl ResolvedAddressSet {
    pub fn is_empty(&self) -> bool {
        self.ipv4.is_empty() && self.ipv6.is_empty()
    }

    /// First private address in the set, IPv4 before IPv6.
    pub fn first_private(&self) -> Option<IpAddr> {
        self.ipv4
            .iter()
            .copied()
            .find(|ip| is_private_ipv4(*ip))
            .map(IpAddr::V4)
            .or_else(|| {
                self.ipv6
                    .iter()
                    .copied()
                    .find(|ip| is_private_ipv6(*ip))
                    .map(IpAddr::V6)
            })
    }
}

impl FromIterator<IpAddr> for ResolvedAddressSet {
    fn from_iter<T: IntoIterator<Item = IpAddr>>(iter: T) -> Self {
        let mut set = ResolvedAddressSet::default();
        for ip in iter {
            match ip {
                IpAddr::V4(v4) => {
                    set.ipv4.insert(v4);
                }
                IpAddr::V6(v6) => {
                    set.ipv6.insert(v6);
                }
            }
        }
        set
    }
}

/// Resolves a hostname into its IPv4 and IPv6 addresses.
pub trait HostResolver: Send + Sync {
    fn resolve(&self, host: &str) -> std::io::Result<ResolvedAddressSet>;
}

/// Resolver backed by the system's `getaddrinfo`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl HostResolver for SystemResolver {
    fn resolve(&self, host: &str) -> std::io::Result<ResolvedAddressSet> {
        resolve_hostname(host)
    }
}

/// Resolves `host` with the system resolver.
pub fn resolve_hostname(host: &str) -> std::io::Result<ResolvedAddressSet> {
    let addrs = (host, 0u16).to_socket_addrs()?;
    Ok(addrs.map(|addr: SocketAddr| addr.ip()).collect())
}

/// Validates URLs before they reach a fetch strategy.
#[derive(Clone)]
pub struct UrlValidator {
    allow_local: bool,
    resolver: Arc<dyn HostResolver>,
}

impl std::fmt::Debug for UrlValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlValidator")
            .field("allow_local", &self.allow_local)
            .finish_non_exhaustive()
    }
}

impl UrlValidator {
    /// Validator using the system resolver. `allow_local` disables the SSRF guard.
    pub fn new(allow_local: bool) -> Self {
        Self::with_resolver(allow_local, Arc::new(SystemResolver))
    }

    pub fn with_resolver(allow_local: bool, resolver: Arc<dyn HostResolver>) -> Self {
        Self {
            allow_local,
            resolver,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.enable_local_web_fetch)
    }

    pub fn allows_local(&self) -> bool {
        self.allow_local
    }

    /// Validates a single URL.
    ///
    /// # Errors
    ///
    /// `LoaderError::InvalidUrl` when the URL is malformed or, with the SSRF
    /// guard active, cannot be resolved or resolves to any private address.
    ///
    /// # Examples
    ///
    /// ```
    /// use safe_web_loader::security::UrlValidator;
    ///
    /// let validator = UrlValidator::new(false);
    /// assert!(validator.validate("http://127.0.0.1/x").is_err());
    /// assert!(validator.validate("not a url").is_err());
    ///
    /// let permissive = UrlValidator::new(true);
    /// assert!(permissive.validate("http://127.0.0.1/x").unwrap());
    /// ```
    pub fn validate(&self, url: &str) -> Result<bool, LoaderError> {
        let parsed = check_syntax(url)?;
        if self.allow_local {
            return Ok(true);
        }

        let addresses: ResolvedAddressSet = match parsed.host() {
            Some(Host::Ipv4(ip)) => std::iter::once(IpAddr::V4(ip)).collect(),
            Some(Host::Ipv6(ip)) => std::iter::once(IpAddr::V6(ip)).collect(),
            Some(Host::Domain(domain)) => self.resolver.resolve(domain).map_err(|e| {
                LoaderError::invalid_url(url, format!("failed to resolve host '{domain}': {e}"))
            })?,
            None => return Err(LoaderError::invalid_url(url, "URL has no host component")),
        };

        if addresses.is_empty() {
            return Err(LoaderError::invalid_url(url, "host resolved to no addresses"));
        }
        if let Some(ip) = addresses.first_private() {
            return Err(LoaderError::invalid_url(
                url,
                format!("host resolves to private address {ip}"),
            ));
        }
        debug!(
            "Validated {url} ({} IPv4, {} IPv6 address(es))",
            addresses.ipv4.len(),
            addresses.ipv6.len()
        );
        Ok(true)
    }

    /// Validates every URL, failing on the first invalid one.
    pub fn validate_all<S: AsRef<str>>(&self, urls: &[S]) -> Result<bool, LoaderError> {
        for url in urls {
            self.validate(url.as_ref())?;
        }
        Ok(true)
    }

    /// Keeps the URLs that validate, silently dropping the rest. Never fails.
    pub fn filter_valid<I, S>(&self, urls: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        urls.into_iter()
            .filter_map(|url| {
                let url = url.as_ref();
                match self.validate(url) {
                    Ok(_) => Some(url.to_string()),
                    Err(e) => {
                        warn!("Skipping URL: {e}");
                        None
                    }
                }
            })
            .collect()
    }
}

/// Syntactic URL check, no I/O.
fn check_syntax(url: &str) -> Result<Url, LoaderError> {
    if url.len() > MAX_URL_LENGTH {
        let preview: String = url.chars().take(50).collect();
        return Err(LoaderError::invalid_url(
            format!("{preview}..."),
            format!("URL exceeds maximum length ({} > {MAX_URL_LENGTH})", url.len()),
        ));
    }

    let parsed = Url::parse(url.trim())
        .map_err(|e| LoaderError::invalid_url(url, format!("failed to parse URL: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(LoaderError::invalid_url(
                url,
                format!("unsupported scheme '{scheme}' (only http:// and https:// allowed)"),
            ));
        }
    }

    match parsed.host() {
        Some(Host::Domain(domain)) if domain.is_empty() => {
            Err(LoaderError::invalid_url(url, "URL has an empty host"))
        }
        Some(_) => Ok(parsed),
        None => Err(LoaderError::invalid_url(url, "URL has no host component")),
    }
}

/// Checks if an IP address is private/internal.
pub fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_ipv4(v4),
        IpAddr::V6(v6) => is_private_ipv6(v6),
    }
}

/// Checks if an IPv4 address is private/internal.
///
/// Private ranges:
/// - 10.0.0.0/8, 172.16.0.0/12, 192.168.0.0/16 (RFC 1918)
/// - 127.0.0.0/8 (loopback)
/// - 169.254.0.0/16 (link-local)
/// - 100.64.0.0/10 (shared address space)
/// - 0.0.0.0/8 (this network)
/// - 224.0.0.0/4 (multicast)
/// - 240.0.0.0/4 (reserved, includes broadcast)
fn is_private_ipv4(ip: Ipv4Addr) -> bool {
    let o = ip.octets();
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || (o[0] == 100 && (64..=127).contains(&o[1]))
        || o[0] == 0
        || (224..=239).contains(&o[0])
        || o[0] >= 240
}

/// Checks if an IPv6 address is private/internal.
///
/// Private ranges:
/// - ::1 (loopback) and :: (unspecified)
/// - fc00::/7 (unique local addresses)
/// - fe80::/10 (link-local)
/// - ff00::/8 (multicast)
/// - ::ffff:0:0/96 wrapping a private IPv4 address
fn is_private_ipv6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_private_ipv4(v4);
    }
    let s = ip.segments();
    ip.is_loopback()
        || ip.is_unspecified()
        || (s[0] & 0xfe00) == 0xfc00
        || (s[0] & 0xffc0) == 0xfe80
        || (s[0] & 0xff00) == 0xff00
}
