use std::sync::LazyLock;

use regex::Regex;

static CODE_SEP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})[：:\s-]+(.+)$").unwrap());
static CODE_SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})\s+(.+)$").unwrap());

/// Split `"2024：Title"` into `("2024", "Title")`. Titles without a leading
/// 4-digit code come back whole with an empty code.
pub fn parse_title(raw: &str) -> (String, String) {
    [&*CODE_SEP_RE, &*CODE_SPACE_RE]
        .iter()
        .find_map(|re| re.captures(raw))
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .unwrap_or_else(|| (String::new(), raw.to_string()))
}
