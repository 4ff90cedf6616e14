/// The part of a stored filename after its last `.`.
/// A name without a dot yields `None`, as does a trailing dot.
pub fn file_extension(filename: &str) -> Option<&str> {
    filename
        .rfind('.')
        .map(|i| &filename[i + 1..])
        .filter(|ext| !ext.is_empty())
}

/// Public browsing domain of an API endpoint, e.g. `api.rule34.xxx` -> `rule34.xxx`.
pub fn public_domain(endpoint: &str) -> &str {
    endpoint.strip_prefix("api.").unwrap_or(endpoint)
}

/// Percent-encode every term of a `+`-joined tag expression, keeping the `+` separators intact.
pub fn encode_tag_expression(expression: &str) -> String {
    expression
        .split('+')
        .map(|term| urlencoding::encode(term).into_owned())
        .collect::<Vec<_>>()
        .join("+")
}

/// Percent-encode a single path or query component.
pub fn encode_component(component: &str) -> String {
    urlencoding::encode(component).into_owned()
}

/// Join key-value pairs into a query string, encoding both sides.
pub fn encode_query_pairs(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("abc.def.png"), Some("png"));
        assert_eq!(file_extension("noext"), None);
        assert_eq!(file_extension("trailing."), None);
    }

    #[test]
    fn test_public_domain() {
        assert_eq!(public_domain("api.rule34.xxx"), "rule34.xxx");
        assert_eq!(public_domain("safebooru.org"), "safebooru.org");
    }

    #[test]
    fn test_encode_tag_expression() {
        assert_eq!(encode_tag_expression("cat+-dog"), "cat+-dog");
        assert_eq!(encode_tag_expression("rating:safe+a&b"), "rating%3Asafe+a%26b");
    }

    #[test]
    fn test_encode_query_pairs() {
        let pairs = vec![
            ("pid".to_string(), "0".to_string()),
            ("api_key".to_string(), "a b/c".to_string()),
        ];
        assert_eq!(encode_query_pairs(&pairs), "pid=0&api_key=a%20b%2Fc");
        assert_eq!(encode_component("a/b"), "a%2Fb");
    }
}
