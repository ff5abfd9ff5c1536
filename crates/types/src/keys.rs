/// Derives a store name from a source endpoint URL.
///
/// Everything up to the scheme separator is dropped, each `/api/vN/` segment
/// becomes a directory separator, and every remaining `/` or `.` is mapped
/// to `-`: `https://mastodon.social/api/v1/timelines/public` ->
/// `mastodon-social/timelines-public`.
pub fn store_name_from_url(url: &str) -> String {
    let rest = match url.rfind("://") {
        Some(i) => &url[i + 3..],
        None => url,
    };
    let clean = |s: &str| s.trim_matches(|c: char| c == '/' || c == '_').replace(['/', '.'], "-");
    split_api_segments(rest)
        .into_iter()
        .map(clean)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

// Splits around every "/api/v<digits>/".
fn split_api_segments(s: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut piece_start = 0;
    let mut from = 0;
    while let Some(pos) = s[from..].find("/api/v") {
        let start = from + pos;
        let digits_at = start + "/api/v".len();
        let digits = s[digits_at..]
            .bytes()
            .take_while(u8::is_ascii_digit)
            .count();
        let slash_at = digits_at + digits;
        if s[slash_at..].starts_with('/') {
            pieces.push(&s[piece_start..start]);
            piece_start = slash_at + 1;
            from = piece_start;
        } else {
            from = digits_at;
        }
    }
    pieces.push(&s[piece_start..]);
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(
        "https://mastodon.social/api/v1/timelines/public",
        "mastodon-social/timelines-public"
    )]
    #[case("https://fosstodon.org/api/v2/search", "fosstodon-org/search")]
    #[case("https://mastodon.cloud", "mastodon-cloud")]
    #[case("mastodon.online/api/v1/", "mastodon-online")]
    #[case("http://host.example/apiv1/x", "host-example-apiv1-x")]
    #[case(
        "https://relay.example/api/v1/proxy/api/v2/timelines/home",
        "relay-example/proxy/timelines-home"
    )]
    #[case("https://host.example/api/v/streaming", "host-example/streaming")]
    fn derives_store_names(#[case] url: &str, #[case] expected: &str) {
        assert_eq!(store_name_from_url(url), expected);
    }
}
