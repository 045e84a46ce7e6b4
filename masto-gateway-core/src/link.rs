//! `Link` response header parsing.
//!
//! Paginated collections advertise their neighbours with
//! `Link: <https://host/api/v1/timelines/home?max_id=7>; rel="next", <...>; rel="prev"`.

/// Name of the response header carrying pagination links.
pub const LINK_HEADER: &str = "link";

/// Extract the URL of the `rel="next"` relation from a `Link` header value.
///
/// Other relations are ignored. Returns `None` if there is no next relation.
///
/// # Example
///
/// ```
/// use masto_gateway_core::next_link;
///
/// let header = r#"<https://example.com/page2>; rel="next", <https://example.com/page0>; rel="prev""#;
/// assert_eq!(next_link(header), Some("https://example.com/page2"));
/// assert_eq!(next_link(""), None);
/// ```
pub fn next_link(header: &str) -> Option<&str> {
    link_relations(header)
        .find(|(_, rel)| rel.split_ascii_whitespace().any(|r| r == "next"))
        .map(|(url, _)| url)
}

/// Iterate over `(url, rel)` pairs of a `Link` header value.
///
/// URLs are delimited by `<` and `>`, so commas inside a target do not split
/// it. Entries without a `rel` parameter are skipped.
fn link_relations(header: &str) -> impl Iterator<Item = (&str, &str)> {
    let mut rest = header;
    std::iter::from_fn(move || {
        loop {
            let start = rest.find('<')?;
            let target = &rest[start + 1..];
            let end = target.find('>')?;
            let url = &target[..end];
            let tail = &target[end + 1..];
            let params_end = next_entry(tail);
            rest = &tail[params_end..];
            if let Some(rel) = rel_param(&tail[..params_end]) {
                return Some((url, rel));
            }
        }
    })
}

/// Offset of the comma that starts the next `<...>` entry, or the end.
fn next_entry(tail: &str) -> usize {
    tail.match_indices(',')
        .map(|(index, _)| index)
        .find(|&index| tail[index + 1..].trim_start().starts_with('<'))
        .unwrap_or(tail.len())
}

fn rel_param(params: &str) -> Option<&str> {
    params.split(';').find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("rel") {
            return None;
        }
        Some(value.trim().trim_matches('"'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_only() {
        assert_eq!(
            next_link(r#"<https://example.com/page1>; rel="next""#),
            Some("https://example.com/page1")
        );
    }

    #[test]
    fn test_next_among_others() {
        let header = r#"<https://example.com/api/v1/timelines/home?min_id=9>; rel="prev", <https://example.com/api/v1/timelines/home?max_id=3>; rel="next""#;
        assert_eq!(
            next_link(header),
            Some("https://example.com/api/v1/timelines/home?max_id=3")
        );
    }

    #[test]
    fn test_prev_only() {
        assert_eq!(next_link(r#"<https://example.com/p>; rel="prev""#), None);
    }

    #[test]
    fn test_unquoted_rel_and_spacing() {
        assert_eq!(
            next_link("<https://example.com/n> ;rel=next"),
            Some("https://example.com/n")
        );
    }

    #[test]
    fn test_comma_inside_url() {
        let header = r#"<https://example.com/api/v1/notifications?types[]=mention,follow&max_id=5>; rel="next", <https://example.com/api/v1/notifications?min_id=9>; rel="prev""#;
        assert_eq!(
            next_link(header),
            Some("https://example.com/api/v1/notifications?types[]=mention,follow&max_id=5")
        );

        let header = r#"<https://example.com/a,b>; rel="prev", <https://example.com/c,d>; rel="next""#;
        assert_eq!(next_link(header), Some("https://example.com/c,d"));
    }

    #[test]
    fn test_entry_without_rel_skipped() {
        let header = r#"<https://example.com/x>; title="x", <https://example.com/y>; rel="next""#;
        assert_eq!(next_link(header), Some("https://example.com/y"));
    }

    #[test]
    fn test_garbage() {
        assert_eq!(next_link("not a link header"), None);
        assert_eq!(next_link(""), None);
    }
}
