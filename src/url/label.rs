use url::Url;

/// Derives the human-readable page label used as a section heading
///
/// When every configured locator parameter is present in the query, the label
/// is built from them in configuration order (`kalash=1&vishram=2` becomes
/// `Kalash 1 / Vishram 2`). Otherwise the URL path is used, and the full URL
/// when the path is empty.
///
/// # Examples
///
/// ```
/// use pagechain::url::page_label;
/// use url::Url;
///
/// let url = Url::parse("https://example.com/book/index.php?vishram=2&kalash=1").unwrap();
/// let params = vec!["kalash".to_string(), "vishram".to_string()];
/// assert_eq!(page_label(&url, &params), "Kalash 1 / Vishram 2");
/// ```
pub fn page_label(url: &Url, label_params: &[String]) -> String {
    if !label_params.is_empty() {
        let parts: Option<Vec<String>> = label_params
            .iter()
            .map(|name| {
                url.query_pairs()
                    .find(|(key, value)| key == name.as_str() && !value.is_empty())
                    .map(|(_, value)| format!("{} {}", capitalize(name), value))
            })
            .collect();

        if let Some(parts) = parts {
            return parts.join(" / ");
        }
    }

    let path = url.path().trim_matches('/');
    if path.is_empty() {
        url.as_str().to_string()
    } else {
        path.to_string()
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
