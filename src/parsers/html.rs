use scraper::{Html, Selector};
use url::Url;

/// Extracts the `src` of every `<img>` in document order
///
/// Relative sources are resolved against `base` the way the browser resolves them. Empty or
/// whitespace-only sources are dropped. Sources that cannot be resolved are kept verbatim so the
/// downloader can count them as invalid.
pub fn image_sources(html: &str, base: Option<&Url>) -> Vec<String> {
    let doc = Html::parse_document(html);

    let img_selector = Selector::parse("img[src]").unwrap();
    let sources = doc
        .select(&img_selector)
        .filter_map(|e| e.value().attr("src"))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|src| resolve(src, base))
        .collect::<Vec<String>>();

    ::log::debug!("HTML parser found {} image sources", sources.len());
    if !sources.is_empty() {
        ::log::trace!(
            "First few sources: {:?}",
            sources.iter().take(5).collect::<Vec<_>>()
        );
    }

    sources
}

fn resolve(src: &str, base: Option<&Url>) -> String {
    match base {
        Some(base) => base
            .join(src)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| src.to_string()),
        None => src.to_string(),
    }
}
