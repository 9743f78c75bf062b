//! Authorization policy chain.
//!
//! An ordered list of path rules compiled once at startup. Each request is
//! matched top to bottom and the first rule whose pattern matches decides the
//! outcome; later rules are never consulted.
//!
//! # Invariants
//! - Evaluation is a pure function of `(path, source address, auth state)`.
//! - The chain and the allowlist are immutable after construction.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Path pattern of a rule.
///
/// Patterns are written the usual way: `/**` matches everything,
/// `/prefix/**` matches `/prefix` and everything beneath it, and anything
/// else matches that exact path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    /// Every path.
    Any,
    /// `prefix` itself or any path below it.
    Prefix(String),
    /// Exactly this path.
    Exact(String),
}

impl PathPattern {
    #[must_use]
    pub fn parse(pattern: &str) -> Self {
        match pattern.strip_suffix("/**") {
            Some("") => Self::Any,
            Some(prefix) => Self::Prefix(prefix.to_string()),
            None => Self::Exact(pattern.to_string()),
        }
    }

    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Prefix(prefix) => path
                .strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/')),
            Self::Exact(exact) => path == exact,
        }
    }
}

impl std::fmt::Display for PathPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Any => write!(f, "/**"),
            Self::Prefix(prefix) => write!(f, "{prefix}/**"),
            Self::Exact(exact) => write!(f, "{exact}"),
        }
    }
}

/// What a matching rule requires of the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Proceed unconditionally.
    AllowAll,
    /// The source address must be in the allowlist.
    RequireAllowlistedIp,
    /// The request must carry a verified token.
    RequireAuthenticated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRule {
    pub pattern: PathPattern,
    pub policy: Policy,
}

/// Source addresses permitted by `Policy::RequireAllowlistedIp`.
///
/// Membership is exact address equality. There is no subnet matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpAllowlist {
    addresses: Vec<IpAddr>,
}

impl IpAllowlist {
    /// Build an allowlist, falling back to loopback when `addresses` is empty.
    ///
    /// Entries are folded with `IpAddr::to_canonical`, the same way source
    /// addresses are, so an IPv4-mapped entry matches its IPv4 peer.
    #[must_use]
    pub fn new(addresses: Vec<IpAddr>) -> Self {
        if addresses.is_empty() {
            return Self::loopback();
        }
        Self {
            addresses: addresses.iter().map(IpAddr::to_canonical).collect(),
        }
    }

    /// `127.0.0.1` and `::1`.
    #[must_use]
    pub fn loopback() -> Self {
        Self {
            addresses: vec![
                IpAddr::V4(Ipv4Addr::LOCALHOST),
                IpAddr::V6(Ipv6Addr::LOCALHOST),
            ],
        }
    }

    #[must_use]
    pub fn contains(&self, address: IpAddr) -> bool {
        self.addresses.contains(&address)
    }

    #[must_use]
    pub fn addresses(&self) -> &[IpAddr] {
        &self.addresses
    }
}

/// Whether the request presented a valid token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    Authenticated,
}

/// Outcome of evaluating the chain for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    /// An allowlist rule matched and the source address is not on it.
    ForbiddenBySourceIp,
    /// An authentication rule matched and no valid token was presented.
    Unauthenticated,
    /// No rule matched; denied by default.
    NoMatchingRule,
}

/// Ordered, first-match-wins rule list plus the allowlist it consults.
#[derive(Debug, Clone)]
pub struct PolicyChain {
    rules: Vec<AuthorizationRule>,
    allowlist: IpAllowlist,
}

impl PolicyChain {
    /// Exempt prefixes that bypass both the address and the token checks.
    pub const EXEMPT_PATHS: [&'static str; 3] =
        ["/admin-console/**", "/actuator/**", "/health-check/**"];

    #[must_use]
    pub fn builder(allowlist: IpAllowlist) -> PolicyChainBuilder {
        PolicyChainBuilder {
            rules: Vec::new(),
            allowlist,
        }
    }

    /// The service's rule set: exempt paths, then the gateway address gate on
    /// every other path, then a catch-all that requires authentication.
    ///
    /// The address gate matches every path, so the final rule is only
    /// reached by chains that narrow it.
    #[must_use]
    pub fn standard(allowlist: IpAllowlist) -> Self {
        let mut builder = Self::builder(allowlist);
        for exempt in Self::EXEMPT_PATHS {
            builder = builder.rule(exempt, Policy::AllowAll);
        }
        builder
            .rule("/**", Policy::RequireAllowlistedIp)
            .rule("/**", Policy::RequireAuthenticated)
            .build()
    }

    #[must_use]
    pub const fn allowlist(&self) -> &IpAllowlist {
        &self.allowlist
    }

    /// First rule whose pattern matches `path`.
    #[must_use]
    pub fn matching_rule(&self, path: &str) -> Option<&AuthorizationRule> {
        self.rules.iter().find(|rule| rule.pattern.matches(path))
    }

    /// Decide whether a request may proceed.
    ///
    /// A missing `source` never satisfies an allowlist rule.
    #[must_use]
    pub fn evaluate(&self, path: &str, source: Option<IpAddr>, auth: AuthState) -> Decision {
        let Some(rule) = self.matching_rule(path) else {
            return Decision::NoMatchingRule;
        };

        match rule.policy {
            Policy::AllowAll => Decision::Allowed,
            Policy::RequireAllowlistedIp => match source {
                Some(address) if self.allowlist.contains(address) => Decision::Allowed,
                _ => Decision::ForbiddenBySourceIp,
            },
            Policy::RequireAuthenticated => match auth {
                AuthState::Authenticated => Decision::Allowed,
                AuthState::Anonymous => Decision::Unauthenticated,
            },
        }
    }
}

/// Builder preserving rule order.
#[derive(Debug)]
pub struct PolicyChainBuilder {
    rules: Vec<AuthorizationRule>,
    allowlist: IpAllowlist,
}

impl PolicyChainBuilder {
    #[must_use]
    pub fn rule(mut self, pattern: &str, policy: Policy) -> Self {
        self.rules.push(AuthorizationRule {
            pattern: PathPattern::parse(pattern),
            policy,
        });
        self
    }

    #[must_use]
    pub fn build(self) -> PolicyChain {
        PolicyChain {
            rules: self.rules,
            allowlist: self.allowlist,
        }
    }
}
