/// A single `name=value` pair taken from a `Cookie:` style header string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookiePair {
    pub name: String,
    pub value: String,
}

/// Split a header-style cookie string (`a=1; b=2`) into pairs.
///
/// Segments are trimmed and split on the first `=`; a segment without `=`
/// becomes a pair with an empty value. Empty segments are dropped.
pub fn parse_cookie_string(raw: &str) -> Vec<CookiePair> {
    raw.split(';')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(|segment| match segment.split_once('=') {
            Some((name, value)) => CookiePair {
                name: name.to_string(),
                value: value.to_string(),
            },
            None => CookiePair {
                name: segment.to_string(),
                value: String::new(),
            },
        })
        .collect()
}
