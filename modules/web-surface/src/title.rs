use scraper::{Html, Selector};

/// Text of the first `<title>` element, trimmed. Empty when there is none.
pub fn extract_title(body: &str) -> String {
    let document = Html::parse_document(body);
    let Ok(selector) = Selector::parse("title") else {
        return String::new();
    };
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}
