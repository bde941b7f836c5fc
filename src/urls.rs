use crate::Result;
use itertools::Itertools;
use std::{collections::BTreeMap, path::Path};
use tracing::{info, warn};
use url::Url;

/// Reads target URLs, one per line. Blank lines and `#` comments are
/// skipped, as is anything without both a scheme and a host.
pub fn load_urls<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let urls = parse_urls(&content);
    info!("Loaded {} URLs from {}", urls.len(), path.display());
    Ok(urls)
}

pub fn parse_urls(content: &str) -> Vec<String> {
    content
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|(line_num, line)| {
            if is_valid_url(line) {
                Some(line.to_string())
            } else {
                warn!("Invalid URL on line {}: {}", line_num, line);
                None
            }
        })
        .collect()
}

pub fn is_valid_url(s: &str) -> bool {
    Url::parse(s).map_or(false, |url| url.has_host())
}

/// Number of URLs per host.
pub fn domain_stats<S: AsRef<str>>(urls: &[S]) -> BTreeMap<String, usize> {
    let mut stats = BTreeMap::new();
    for host in urls.iter().filter_map(|u| host_of(u.as_ref())) {
        *stats.entry(host).or_insert(0) += 1;
    }
    stats
}

/// URLs whose host contains `domain`, ignoring case.
pub fn filter_by_domain<S: AsRef<str>>(urls: &[S], domain: &str) -> Vec<String> {
    let domain = domain.to_lowercase();
    urls.iter()
        .map(|u| u.as_ref())
        .filter(|u| host_of(u).map_or(false, |host| host.to_lowercase().contains(&domain)))
        .map(ToString::to_string)
        .collect()
}

/// Renders a URL list in the format `load_urls` reads.
pub fn format_url_list<S: AsRef<str>>(urls: &[S]) -> String {
    let header = "# URLs to scrape\n# One URL per line\n# Lines starting with # are ignored\n\n";
    format!(
        "{}{}\n",
        header,
        urls.iter().map(|u| u.as_ref()).join("\n")
    )
}

fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(ToString::to_string))
}
