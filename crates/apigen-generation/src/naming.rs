//! Tool naming: vendor label, verb table, `VENDOR__RESOURCE__VERB` names and
//! display names.

use apigen_core::path;
use std::fmt;
use url::{Host, Url};

pub const UNKNOWN_VENDOR: &str = "unknown";

/// Leading host labels that never name the vendor.
const SERVICE_LABELS: [&str; 2] = ["api", "www"];

/// Second-level labels registries use under two-letter country TLDs (`co.uk`, `com.au`).
const SECOND_LEVEL_LABELS: [&str; 9] = ["ac", "co", "com", "edu", "gov", "ne", "net", "or", "org"];

/// What a tool does, derived from method and path shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Search,
    List,
    Get,
    Create,
    Update,
    Delete,
    Execute,
}

impl Verb {
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Search => "SEARCH",
            Verb::List => "LIST",
            Verb::Get => "GET",
            Verb::Create => "CREATE",
            Verb::Update => "UPDATE",
            Verb::Delete => "DELETE",
            Verb::Execute => "EXECUTE",
        }
    }

    /// `Search`, `List`, ... for display names.
    pub fn title(self) -> String {
        title_case_word(self.as_str())
    }

    /// Segment keywords win over the method table. `GET` and `HEAD` name a single
    /// item when the last segment looks like an identifier.
    pub fn derive(method: &str, endpoint_path: &str) -> Self {
        let segments: Vec<&str> = path::segments(endpoint_path).collect();

        if segments
            .iter()
            .any(|s| s.eq_ignore_ascii_case("search") || s.eq_ignore_ascii_case("find"))
        {
            return Verb::Search;
        }
        if segments.iter().any(|s| s.eq_ignore_ascii_case("list")) {
            return Verb::List;
        }

        match method.to_ascii_uppercase().as_str() {
            "GET" | "HEAD" => {
                let names_item = segments
                    .last()
                    .is_some_and(|s| path::is_identifier_segment(s));
                if names_item { Verb::Get } else { Verb::List }
            }
            "POST" => Verb::Create,
            "PUT" | "PATCH" => Verb::Update,
            "DELETE" => Verb::Delete,
            _ => Verb::Execute,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The vendor label for a server URL, lower-cased.
///
/// `https://api.example.com/v1` gives `example`; a single-label host is used as
/// is. Missing, unparseable and IP-address servers give [`UNKNOWN_VENDOR`].
pub fn vendor_label(server_url: Option<&str>) -> String {
    server_url
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(host_of)
        .and_then(|host| registrable_label(&host))
        .unwrap_or_else(|| UNKNOWN_VENDOR.to_string())
}

fn host_of(server_url: &str) -> Option<String> {
    let url = Url::parse(server_url)
        .or_else(|_| Url::parse(&format!("https://{}", server_url)))
        .ok()?;
    match url.host()? {
        Host::Domain(domain) => Some(domain.to_lowercase()),
        Host::Ipv4(_) | Host::Ipv6(_) => None,
    }
}

fn registrable_label(host: &str) -> Option<String> {
    let mut labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    if let [.., _, second, tld] = labels.as_slice()
        && tld.len() == 2
        && SECOND_LEVEL_LABELS.contains(second)
    {
        // `co.uk` acts as the TLD
        labels.truncate(labels.len() - 1);
    }
    let label = match labels.as_slice() {
        [] => return None,
        [single] => *single,
        [rest @ .., _tld] => {
            let named: Vec<&str> = rest
                .iter()
                .copied()
                .skip_while(|l| SERVICE_LABELS.contains(l))
                .collect();
            *named.last().or(rest.last())?
        }
    };
    Some(label.to_string())
}

/// Upper-case ASCII letters and digits of `part`; everything else is dropped.
pub fn sanitize_part(part: &str) -> String {
    part.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// `VENDOR__RESOURCE__VERB`, with `UNKNOWN` and `OTHER` standing in for parts
/// that sanitize to nothing.
pub fn tool_name(vendor: &str, resource: &str, verb: Verb) -> String {
    let vendor = non_empty_or(sanitize_part(vendor), "UNKNOWN");
    let resource = non_empty_or(sanitize_part(resource), "OTHER");
    format!("{}__{}__{}", vendor, resource, verb)
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

/// The first sentence of `description` when it fits in `max_len` characters,
/// otherwise `"<Verb> <Resource>"`.
pub fn display_name(description: Option<&str>, verb: Verb, resource: &str, max_len: usize) -> String {
    let sentence = description
        .and_then(|d| d.split('.').next())
        .map(str::trim)
        .filter(|s| !s.is_empty() && s.chars().count() <= max_len);

    match sentence {
        Some(sentence) => sentence.to_string(),
        None => format!("{} {}", verb.title(), title_case(resource)),
    }
}

fn title_case(text: &str) -> String {
    text.split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(title_case_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verb_table() {
        let cases = [
            ("GET", "/v1/flights/search", Verb::Search),
            ("POST", "/v1/places/find", Verb::Search),
            ("GET", "/users/list", Verb::List),
            ("GET", "/v1/bookings/{bookingId}", Verb::Get),
            ("GET", "/v1/bookings/:id", Verb::Get),
            ("GET", "/orders/42", Verb::Get),
            ("GET", "/orders/123e4567-e89b-12d3-a456-426614174000", Verb::Get),
            ("GET", "/v1/bookings", Verb::List),
            ("GET", "/users/me", Verb::List),
            ("HEAD", "/files/{id}", Verb::Get),
            ("POST", "/v1/bookings", Verb::Create),
            ("PUT", "/v1/bookings/{id}", Verb::Update),
            ("patch", "/v1/bookings/{id}", Verb::Update),
            ("DELETE", "/v1/bookings/{id}", Verb::Delete),
            ("OPTIONS", "/v1/bookings", Verb::Execute),
        ];

        for (method, path, expected) in cases {
            assert_eq!(Verb::derive(method, path), expected, "{} {}", method, path);
        }
    }

    #[test]
    fn test_vendor_label() {
        assert_eq!(vendor_label(Some("https://api.example.com/v1")), "example");
        assert_eq!(vendor_label(Some("https://www.Acme.io")), "acme");
        assert_eq!(vendor_label(Some("https://sandbox.api.stripe.com")), "stripe");
        assert_eq!(vendor_label(Some("http://localhost:8080")), "localhost");
        assert_eq!(vendor_label(Some("api.example.com")), "example");
        assert_eq!(vendor_label(Some("https://api.com")), "api");
        assert_eq!(vendor_label(Some("https://api.example.co.uk/v2")), "example");
        assert_eq!(vendor_label(Some("https://www.shop.com.au")), "shop");
        assert_eq!(vendor_label(Some("https://co.uk")), "co");
        assert_eq!(vendor_label(Some("http://127.0.0.1:3000")), UNKNOWN_VENDOR);
        assert_eq!(vendor_label(Some("  ")), UNKNOWN_VENDOR);
        assert_eq!(vendor_label(None), UNKNOWN_VENDOR);
    }

    #[test]
    fn test_tool_name() {
        assert_eq!(tool_name("example", "flights", Verb::Search), "EXAMPLE__FLIGHTS__SEARCH");
        assert_eq!(tool_name("my-vendor", "line_items", Verb::Get), "MYVENDOR__LINEITEMS__GET");
        assert_eq!(tool_name("", "---", Verb::Execute), "UNKNOWN__OTHER__EXECUTE");
    }

    #[test]
    fn test_display_name() {
        assert_eq!(
            display_name(Some("Search flights. Returns offers."), Verb::Search, "flights", 50),
            "Search flights"
        );
        assert_eq!(
            display_name(
                Some("Retrieve every booking that matches the given passenger and date filters"),
                Verb::List,
                "bookings",
                50
            ),
            "List Bookings"
        );
        assert_eq!(display_name(None, Verb::Get, "line_items", 50), "Get Line Items");
        assert_eq!(display_name(Some("  "), Verb::Create, "orders", 50), "Create Orders");
    }
}
