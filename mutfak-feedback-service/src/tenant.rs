//! Host header to tenant resolution.
//!
//! Development hosts look like `restaurant-5.localhost[:port]`, production
//! hosts like `5.mutfakyazilim.com`.

const LOCAL_PREFIX: &str = "restaurant-";

/// Derives the restaurant id encoded in the subdomain of `host`.
///
/// Returns `None` for anything that does not match one of the two layouts;
/// callers answer those requests with 404.
pub fn resolve_restaurant_id(host: &str) -> Option<i32> {
    let host = host.trim().to_ascii_lowercase();
    if host.is_empty() {
        return None;
    }

    let labels: Vec<&str> = host.split('.').collect();

    if host.contains("localhost") {
        if labels.len() < 2 || labels[0] == "localhost" {
            return None;
        }
        return parse_id(labels[0].strip_prefix(LOCAL_PREFIX)?);
    }

    if labels.len() < 3 {
        return None;
    }
    parse_id(labels[0])
}

fn parse_id(label: &str) -> Option<i32> {
    label.parse::<i32>().ok().filter(|id| *id > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_local_development_hosts() {
        assert_eq!(resolve_restaurant_id("restaurant-5.localhost"), Some(5));
        assert_eq!(resolve_restaurant_id("restaurant-12.localhost:8080"), Some(12));
        assert_eq!(resolve_restaurant_id("Restaurant-3.LOCALHOST"), Some(3));
    }

    #[test]
    fn resolves_production_hosts() {
        assert_eq!(resolve_restaurant_id("5.example.com"), Some(5));
        assert_eq!(resolve_restaurant_id("42.mutfakyazilim.com:443"), Some(42));
    }

    #[test]
    fn rejects_bare_or_malformed_hosts() {
        assert_eq!(resolve_restaurant_id(""), None);
        assert_eq!(resolve_restaurant_id("localhost"), None);
        assert_eq!(resolve_restaurant_id("localhost:8080"), None);
        assert_eq!(resolve_restaurant_id("bad.host"), None);
        assert_eq!(resolve_restaurant_id("www.example.com"), None);
        assert_eq!(resolve_restaurant_id("cafe-5.localhost"), None);
        assert_eq!(resolve_restaurant_id("restaurant-x.localhost"), None);
        assert_eq!(resolve_restaurant_id("restaurant-.localhost"), None);
    }

    #[test]
    fn rejects_non_positive_ids() {
        assert_eq!(resolve_restaurant_id("0.example.com"), None);
        assert_eq!(resolve_restaurant_id("-4.example.com"), None);
        assert_eq!(resolve_restaurant_id("restaurant--4.localhost"), None);
    }
}
