//! EarthCam network crawler.
//!
//! The network index lists one link per country and per US state. Each of
//! those location pages renders its featured cameras client side, so the
//! crawler waits for `#featuredCamText` before reading them.
//!
//! # Link shapes
//!
//! | Index href | Label | Location page |
//! |------------|-------|---------------|
//! | `index.php?page=world&country=france` | `france` | `?country=france` |
//! | `index.php?country=us&page=newyork` | `newyork, United States` | `?page=newyork&country=us` |
//!
//! The empty `country=` link and Russia (a nested listing of its own) are
//! skipped.

use super::fetch::{PageFetcher, RelaunchingFetcher};
use crate::config::CrawlConfig;
use crate::error::{CrawlError, FetchError};
use crate::models::RawLocation;
use crate::utils::collapse_whitespace;
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// Element every location page shows once its camera list has rendered.
pub const RENDERED_MARKER: &str = "#featuredCamText";

static LOCATION_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.locationLink[href]").expect("static selector"));
static FEATURED_CITY: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.featuredCity").expect("static selector"));
static FEATURED_TITLE_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.featuredTitleLink").expect("static selector"));

/// One country or US state page to crawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationPage {
    /// Appended to every camera name on the page, e.g. `"France"`.
    pub label: String,
    pub url: Url,
}

fn classify_link(index_url: &Url, href: &str) -> Option<LocationPage> {
    let link = index_url.join(href).ok()?;
    let mut country = None;
    let mut page = None;
    for (key, value) in link.query_pairs() {
        match key.as_ref() {
            "country" => country = Some(value.trim().to_string()),
            "page" => page = Some(value.trim().to_string()),
            _ => {}
        }
    }
    let country = country.filter(|c| !c.is_empty())?;
    if country.eq_ignore_ascii_case("russia") {
        return None;
    }

    let mut url = index_url.clone();
    url.set_query(None);
    url.set_fragment(None);

    match page {
        Some(state) if country.eq_ignore_ascii_case("us") && !state.is_empty() => {
            url.query_pairs_mut()
                .append_pair("page", &state)
                .append_pair("country", &country);
            Some(LocationPage {
                label: format!("{state}, United States"),
                url,
            })
        }
        _ if country.eq_ignore_ascii_case("us") => None,
        _ => {
            url.query_pairs_mut().append_pair("country", &country);
            Some(LocationPage {
                label: country,
                url,
            })
        }
    }
}

/// Location pages listed on the network index, deduplicated, in page order.
pub fn parse_index(html: &str, index_url: &Url) -> Vec<LocationPage> {
    let document = Html::parse_document(html);
    document
        .select(&LOCATION_LINK)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| {
            let page = classify_link(index_url, href);
            if page.is_none() {
                debug!(%href, "Skipping index link");
            }
            page
        })
        .unique_by(|page| page.url.clone())
        .collect()
}

/// Cameras featured on one location page.
///
/// City names and title links are paired up by position; if one list is
/// longer the extras are ignored. A title link without an `href` drops its
/// own camera only.
pub fn parse_location_page(html: &str, page: &LocationPage) -> Vec<RawLocation> {
    let document = Html::parse_document(html);
    let cities = document
        .select(&FEATURED_CITY)
        .map(|element| collapse_whitespace(&element.text().collect::<String>()));
    let hrefs = document
        .select(&FEATURED_TITLE_LINK)
        .map(|element| element.value().attr("href"));

    cities
        .zip(hrefs)
        .filter_map(|(city, href)| {
            let Some(href) = href else {
                debug!(%city, "Featured camera has no feed link");
                return None;
            };
            let feed_url = page
                .url
                .join(href)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| href.to_string());
            Some(RawLocation::new(format!("{city}, {}", page.label), feed_url))
        })
        .collect()
}

/// Crawl the whole network: index first, then every location page in turn.
///
/// The fetcher is wrapped so that a crash relaunches it and retries the same
/// page. A page that times out aborts the crawl and everything collected so
/// far is discarded.
#[instrument(level = "info", skip_all, fields(index_url = %config.index_url))]
pub async fn crawl<F: PageFetcher>(
    fetcher: F,
    config: &CrawlConfig,
) -> Result<Vec<RawLocation>, CrawlError> {
    let mut fetcher = RelaunchingFetcher::new(fetcher, config.max_relaunches);
    crawl_with(&mut fetcher, config).await
}

pub(crate) async fn crawl_with<F: PageFetcher>(
    fetcher: &mut RelaunchingFetcher<F>,
    config: &CrawlConfig,
) -> Result<Vec<RawLocation>, CrawlError> {
    let index_url = Url::parse(&config.index_url).map_err(|source| CrawlError::Url {
        url: config.index_url.clone(),
        source,
    })?;

    let index_html = fetcher
        .fetch_rendered_page(index_url.as_str(), None)
        .await
        .map_err(|source| CrawlError::Index {
            url: index_url.to_string(),
            source,
        })?;
    let pages = parse_index(&index_html, &index_url);
    info!(count = pages.len(), "Found countries and states");

    let total = pages.len();
    let mut locations = Vec::new();
    for (i, page) in pages.iter().enumerate() {
        info!(searched = i, total, label = %page.label, "Locations searched: {i}/{total}");
        let html = match fetcher
            .fetch_rendered_page(page.url.as_str(), Some(RENDERED_MARKER))
            .await
        {
            Ok(html) => html,
            Err(source @ FetchError::Timeout { .. }) => {
                error!(url = %page.url, error = %source, "Request timeout detected; abandoning crawl");
                return Err(CrawlError::Timeout(source));
            }
            Err(FetchError::Exhausted { attempts, source, .. }) => {
                error!(url = %page.url, attempts, error = %source, "Fetcher kept crashing; abandoning crawl");
                return Err(CrawlError::RetriesExhausted {
                    attempts,
                    source: *source,
                });
            }
            Err(source) => {
                error!(url = %page.url, error = %source, "Fetcher failed; abandoning crawl");
                return Err(CrawlError::RetriesExhausted { attempts: 1, source });
            }
        };

        let found = parse_location_page(&html, page);
        if found.is_empty() {
            warn!(url = %page.url, "Location page listed no cameras");
        }
        debug!(url = %page.url, count = found.len(), "Parsed location page");
        locations.extend(found);
    }

    info!(count = locations.len(), pages = total, "Crawl complete");
    Ok(locations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::fetch::tests::{FakeFetcher, timeout, transient};
    use std::time::Duration as StdDuration;

    const INDEX_URL: &str = "https://www.earthcam.com/network/";

    const INDEX_HTML: &str = r#"
        <html><body>
          <a class="locationLink" href="index.php?page=world&country=france">France</a>
          <a class="locationLink" href="index.php?page=world&country=">Nowhere</a>
          <a class="locationLink" href="index.php?page=world&country=russia">Russia</a>
          <a class="locationLink" href="index.php?country=us&page=newyork">New York</a>
          <a class="locationLink" href="index.php?page=world&country=france">France again</a>
          <a class="otherLink" href="index.php?page=world&country=japan">Japan</a>
        </body></html>
    "#;

    fn france_html() -> String {
        r#"
        <div id="featuredCamText">Featured</div>
        <div class="featuredCity">
            Paris
        </div>
        <a class="featuredTitleLink" href="https://www.earthcam.com/world/france/paris/">Eiffel</a>
        <div class="featuredCity">Nice</div>
        <a class="featuredTitleLink" href="/world/france/nice/">Nice beach</a>
        <div class="featuredCity">Lyon</div>
        "#
        .to_string()
    }

    fn new_york_html() -> String {
        r#"
        <div id="featuredCamText">Featured</div>
        <div class="featuredCity">New York City</div>
        <a class="featuredTitleLink" href="/usa/newyork/timessquare/">Times Square</a>
        "#
        .to_string()
    }

    fn index() -> Url {
        Url::parse(INDEX_URL).unwrap()
    }

    #[test]
    fn test_parse_index_classifies_links() {
        let pages = parse_index(INDEX_HTML, &index());
        let labels: Vec<&str> = pages.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["france", "newyork, United States"]);
        assert_eq!(pages[0].url.as_str(), "https://www.earthcam.com/network/?country=france");
        assert_eq!(
            pages[1].url.as_str(),
            "https://www.earthcam.com/network/?page=newyork&country=us"
        );
    }

    #[test]
    fn test_parse_location_page_zips_shorter_list() {
        let page = LocationPage {
            label: "France".to_string(),
            url: Url::parse("https://www.earthcam.com/network/?country=france").unwrap(),
        };
        let cams = parse_location_page(&france_html(), &page);
        assert_eq!(
            cams,
            vec![
                RawLocation::new("Paris, France", "https://www.earthcam.com/world/france/paris/"),
                RawLocation::new("Nice, France", "https://www.earthcam.com/world/france/nice/"),
            ]
        );
    }

    #[test]
    fn test_link_without_href_does_not_shift_feeds() {
        let page = LocationPage {
            label: "France".to_string(),
            url: Url::parse("https://www.earthcam.com/network/?country=france").unwrap(),
        };
        let html = r#"
            <div class="featuredCity">Paris</div>
            <a class="featuredTitleLink">Eiffel (offline)</a>
            <div class="featuredCity">Nice</div>
            <a class="featuredTitleLink" href="/nice/">Nice beach</a>
        "#;
        assert_eq!(
            parse_location_page(html, &page),
            vec![RawLocation::new("Nice, France", "https://www.earthcam.com/nice/")]
        );
    }

    fn scripted() -> FakeFetcher {
        let mut fetcher = FakeFetcher::default();
        fetcher.respond(INDEX_URL, Ok(INDEX_HTML.to_string()));
        fetcher
    }

    async fn run(fetcher: FakeFetcher) -> (Result<Vec<RawLocation>, CrawlError>, FakeFetcher) {
        let config = CrawlConfig {
            index_url: INDEX_URL.to_string(),
            ..CrawlConfig::default()
        };
        let mut wrapped = RelaunchingFetcher::new(fetcher, config.max_relaunches)
            .with_backoff(StdDuration::ZERO, 0);
        let result = crawl_with(&mut wrapped, &config).await;
        (result, wrapped.into_inner())
    }

    const FRANCE_URL: &str = "https://www.earthcam.com/network/?country=france";
    const NEW_YORK_URL: &str = "https://www.earthcam.com/network/?page=newyork&country=us";

    #[tokio::test]
    async fn test_crawl_collects_in_discovery_order() {
        let mut fetcher = scripted();
        fetcher.respond(FRANCE_URL, Ok(france_html()));
        fetcher.respond(NEW_YORK_URL, Ok(new_york_html()));

        let (result, _) = run(fetcher).await;
        let names: Vec<String> = result
            .unwrap()
            .into_iter()
            .map(|loc| loc.display_name)
            .collect();
        assert_eq!(
            names,
            vec![
                "Paris, france",
                "Nice, france",
                "New York City, newyork, United States"
            ]
        );
    }

    #[tokio::test]
    async fn test_crash_relaunches_and_retries_same_page() {
        let mut fetcher = scripted();
        fetcher.respond(FRANCE_URL, Err(transient(FRANCE_URL)));
        fetcher.respond(FRANCE_URL, Ok(france_html()));
        fetcher.respond(NEW_YORK_URL, Ok(new_york_html()));

        let (result, fetcher) = run(fetcher).await;
        assert_eq!(result.unwrap().len(), 3);
        assert_eq!(fetcher.relaunches, 1);
        assert_eq!(
            fetcher.fetches,
            vec![INDEX_URL, FRANCE_URL, FRANCE_URL, NEW_YORK_URL]
        );
    }

    #[tokio::test]
    async fn test_timeout_aborts_the_crawl() {
        let mut fetcher = scripted();
        fetcher.respond(FRANCE_URL, Err(timeout(FRANCE_URL)));
        fetcher.respond(NEW_YORK_URL, Ok(new_york_html()));

        let (result, fetcher) = run(fetcher).await;
        assert!(matches!(result, Err(CrawlError::Timeout(_))));
        assert_eq!(fetcher.fetches, vec![INDEX_URL, FRANCE_URL]);
    }

    #[tokio::test]
    async fn test_repeated_crash_is_bounded() {
        let mut fetcher = scripted();
        fetcher.respond(FRANCE_URL, Err(transient(FRANCE_URL)));
        fetcher.respond(FRANCE_URL, Err(transient(FRANCE_URL)));

        let (result, _) = run(fetcher).await;
        assert!(matches!(
            result,
            Err(CrawlError::RetriesExhausted { attempts: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_failed_relaunch_counts_real_attempts() {
        let mut fetcher = scripted();
        fetcher.relaunch_fails = true;
        fetcher.respond(FRANCE_URL, Err(transient(FRANCE_URL)));
        fetcher.respond(FRANCE_URL, Ok(france_html()));

        let (result, fetcher) = run(fetcher).await;
        assert!(matches!(
            result,
            Err(CrawlError::RetriesExhausted { attempts: 1, .. })
        ));
        assert_eq!(fetcher.fetches, vec![INDEX_URL, FRANCE_URL]);
    }

    #[tokio::test]
    async fn test_index_failure_is_reported() {
        let (result, _) = run(FakeFetcher::default()).await;
        assert!(matches!(result, Err(CrawlError::Index { .. })));
    }
}
