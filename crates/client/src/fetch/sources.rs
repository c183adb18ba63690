//! Ordered icon source templates.

/// Candidate icon sources, highest trust first.
///
/// The site's own favicon outranks the aggregator services; among the
/// aggregators, order follows observed reliability.
const SOURCE_TEMPLATES: [&str; 4] = [
    "https://{domain}/favicon.ico",
    "https://www.google.com/s2/favicons?domain={domain}&sz=64",
    "https://icons.duckduckgo.com/ip3/{domain}.ico",
    "https://favicon.yandex.net/favicon/{domain}",
];

/// Expand the source templates for a normalized domain, in priority order.
pub fn source_urls(domain: &str) -> Vec<String> {
    SOURCE_TEMPLATES
        .iter()
        .map(|template| template.replace("{domain}", domain))
        .collect()
}
