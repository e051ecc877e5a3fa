//! Deny-lists enforced at allocation and rename time
//!
//! Reserved slugs keep operational subdomains (`admin`, `api`, `status`, …)
//! out of the tunnel namespace; blocked ports keep well-known service ports
//! off the public TCP pool.

/// Subdomain labels that can never be assigned to a tunnel.
///
/// Sorted ascending; lookups use binary search.
pub const RESERVED_SLUGS: &[&str] = &[
    "abuse",
    "account",
    "accounts",
    "ad",
    "admin",
    "administrator",
    "ads",
    "analytics",
    "api",
    "app",
    "apps",
    "assets",
    "auth",
    "autoconfig",
    "autodiscover",
    "backup",
    "beta",
    "billing",
    "blog",
    "board",
    "bot",
    "broadcasthost",
    "cache",
    "calendar",
    "cdn",
    "chat",
    "checkout",
    "clients",
    "cloud",
    "cms",
    "connect",
    "console",
    "contact",
    "cpanel",
    "css",
    "dashboard",
    "data",
    "db",
    "demo",
    "dev",
    "developer",
    "dns",
    "dns1",
    "dns2",
    "doc",
    "docs",
    "domain",
    "download",
    "email",
    "embed",
    "exchange",
    "faq",
    "files",
    "forum",
    "ftp",
    "git",
    "graphql",
    "help",
    "home",
    "host",
    "hostmaster",
    "imap",
    "img",
    "info",
    "internal",
    "intranet",
    "invoice",
    "irc",
    "js",
    "json",
    "ldap",
    "legal",
    "link",
    "local",
    "localdomain",
    "localhost",
    "log",
    "login",
    "logout",
    "mail",
    "mail1",
    "mail2",
    "manage",
    "marketing",
    "media",
    "metrics",
    "mobile",
    "monitor",
    "mx",
    "mx1",
    "my",
    "mysql",
    "net",
    "network",
    "new",
    "news",
    "newsletter",
    "noc",
    "ns",
    "ns1",
    "ns2",
    "ns3",
    "ns4",
    "ntp",
    "oauth",
    "office",
    "ops",
    "owa",
    "page",
    "pages",
    "panel",
    "partner",
    "pay",
    "payment",
    "photo",
    "photos",
    "ping",
    "pop",
    "pop3",
    "portal",
    "post",
    "postmaster",
    "press",
    "private",
    "prod",
    "production",
    "profile",
    "proxy",
    "public",
    "redis",
    "register",
    "remote",
    "root",
    "router",
    "rss",
    "sandbox",
    "search",
    "secure",
    "security",
    "server",
    "service",
    "shop",
    "signin",
    "signup",
    "site",
    "sitemap",
    "smtp",
    "sql",
    "ssh",
    "ssl",
    "stage",
    "staging",
    "static",
    "statistics",
    "stats",
    "status",
    "store",
    "support",
    "svn",
    "sysadmin",
    "system",
    "telnet",
    "test",
    "testing",
    "tools",
    "traffic",
    "upload",
    "uptime",
    "usage",
    "user",
    "users",
    "vendor",
    "video",
    "voip",
    "vpn",
    "web",
    "webmail",
    "webmaster",
    "whois",
    "wiki",
    "www",
    "wwww",
    "xml",
    "xmpp",
];

/// Well-known service ports refused for public TCP tunnels even when they
/// fall inside the configured range.
pub const BLOCKED_SERVICE_PORTS: &[u16] = &[
    1080, 1433, 1521, 1900, 2049, 3306, 3389, 5432, 5900, 6379, 8080, 8443, 9000, 9200, 27017,
];

/// Whether a slug is on the reserved list.
pub fn slug_reserved(slug: &str) -> bool {
    RESERVED_SLUGS.binary_search(&slug).is_ok()
}

/// Shape check for a user-supplied slug: 3..=20 characters from
/// `[a-z0-9-]`, not starting or ending with `-`.
pub fn slug_well_formed(slug: &str) -> bool {
    if slug.len() < 3 || slug.len() > 20 {
        return false;
    }
    if slug.starts_with('-') || slug.ends_with('-') {
        return false;
    }
    slug.bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

/// A slug is assignable when it is well formed and not reserved.
pub fn slug_valid(slug: &str) -> bool {
    slug_well_formed(slug) && !slug_reserved(slug)
}

/// Whether a port may be exposed as a public TCP tunnel endpoint.
///
/// Privileged ports below 1024 are refused except 80 and 443 (those route
/// through the HTTP ingress instead), as is everything on
/// [`BLOCKED_SERVICE_PORTS`].
pub fn port_blocked(port: u16) -> bool {
    if port < 1024 && port != 80 && port != 443 {
        return true;
    }
    BLOCKED_SERVICE_PORTS.binary_search(&port).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_list_is_sorted() {
        // binary_search depends on it
        assert!(RESERVED_SLUGS.windows(2).all(|w| w[0] < w[1]));
        assert!(BLOCKED_SERVICE_PORTS.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_reserved_slugs() {
        assert!(slug_reserved("admin"));
        assert!(slug_reserved("api"));
        assert!(slug_reserved("www"));
        assert!(slug_reserved("status"));
        assert!(slug_reserved("ping"));
        assert!(!slug_reserved("my-app"));
    }

    #[test]
    fn test_slug_shape() {
        assert!(slug_well_formed("abc"));
        assert!(slug_well_formed("my-app"));
        assert!(slug_well_formed("a2c4e6g8i0k2m4o6q8s0"));

        // too short / too long
        assert!(!slug_well_formed("ab"));
        assert!(!slug_well_formed("a2c4e6g8i0k2m4o6q8s0u"));

        // character class
        assert!(!slug_well_formed("My-App"));
        assert!(!slug_well_formed("my_app"));
        assert!(!slug_well_formed("my.app"));

        // hyphen placement
        assert!(!slug_well_formed("-app"));
        assert!(!slug_well_formed("app-"));
    }

    #[test]
    fn test_slug_valid_excludes_reserved() {
        assert!(slug_valid("my-app"));
        assert!(!slug_valid("admin"));
    }

    #[test]
    fn test_blocked_ports() {
        // privileged, except the HTTP pair
        assert!(port_blocked(22));
        assert!(port_blocked(25));
        assert!(port_blocked(1023));
        assert!(!port_blocked(80));
        assert!(!port_blocked(443));

        // explicit service ports
        assert!(port_blocked(3306));
        assert!(port_blocked(5432));
        assert!(port_blocked(8080));
        assert!(port_blocked(27017));

        // ordinary high ports
        assert!(!port_blocked(1024));
        assert!(!port_blocked(10000));
        assert!(!port_blocked(20000));
    }
}
