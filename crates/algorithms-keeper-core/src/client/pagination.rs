// Link header navigation for paginated GitHub endpoints

/// Navigation targets extracted from a `Link` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Links {
    /// URL of the next page.
    pub next: Option<String>,

    /// URL of the previous page.
    pub prev: Option<String>,

    /// URL of the first page.
    pub first: Option<String>,

    /// URL of the last page.
    pub last: Option<String>,
}

impl Links {
    /// Check if there are more pages.
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }
}

/// Parse a `Link` header.
///
/// GitHub returns headers like:
/// `<https://api.github.com/resource?page=2>; rel="next", <https://api.github.com/resource?page=5>; rel="last"`
///
/// Malformed entries and unknown relations are ignored.
pub fn parse_link_header(link_header: Option<&str>) -> Links {
    let mut links = Links::default();

    let Some(header) = link_header else {
        return links;
    };

    for link in header.split(',') {
        let mut parts = link.split(';');
        let Some(target) = parts.next() else {
            continue;
        };

        let target = target.trim();
        if !(target.starts_with('<') && target.ends_with('>')) {
            continue;
        }
        let url = target[1..target.len() - 1].to_string();

        for param in parts {
            let Some(rel) = param.trim().strip_prefix("rel=") else {
                continue;
            };
            match rel.trim_matches('"') {
                "next" => links.next = Some(url.clone()),
                "prev" => links.prev = Some(url.clone()),
                "first" => links.first = Some(url.clone()),
                "last" => links.last = Some(url.clone()),
                _ => {}
            }
        }
    }

    links
}

#[cfg(test)]
#[path = "pagination_tests.rs"]
mod tests;
