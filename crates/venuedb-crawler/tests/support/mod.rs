//! In-memory browser used by the integration tests.
//!
//! Pages are plain HTML strings keyed by URL (query ignored). Element
//! queries run real CSS selectors against the current page through
//! `scraper`, so the crawler sees the same markup it would in Chrome.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use scraper::{Html, Selector};
use tokio_util::sync::CancellationToken;
use venuedb_core::{Selectors, Timing};
use venuedb_crawler::{BrowserSession, CrawlError, CrawlSettings, PageHandle};

pub const BASE_URL: &str = "https://maps.test/maps";

pub fn venue_url(i: usize) -> String {
    format!("{BASE_URL}/org/venue_{i}/{}/", 1000 + i)
}

pub fn reviews_url(i: usize) -> String {
    format!("{BASE_URL}/org/venue_{i}/{}/reviews", 1000 + i)
}

pub fn settings() -> CrawlSettings {
    CrawlSettings {
        base_url: BASE_URL.to_string(),
        selectors: Selectors::default(),
        timing: Timing::immediate(),
        listing_scroll_px: 100,
        review_scroll_px: 25,
    }
}

pub fn search_page(with_input: bool, anchors: &[String]) -> String {
    let input = if with_input {
        r#"<div class="search-form-view__input"><input type="text"></div>"#
    } else {
        ""
    };
    let links: String = anchors
        .iter()
        .map(|a| format!(r#"<a class="link-overlay" href="{a}"></a>"#))
        .collect();
    format!(
        r#"<html><body>{input}
        <button class="small-search-form-view__button">Найти</button>
        <div class="scroll__scrollbar-thumb"></div>
        <ul>{links}</ul></body></html>"#
    )
}

/// A detail page with every field present. `rating: None` drops the badge.
pub fn detail_page(name: &str, rating: Option<&str>, with_menu: bool) -> String {
    let badge: String = rating
        .map(|r| {
            r.chars()
                .map(|c| {
                    format!(
                        r#"<span class="business-summary-rating-badge-view__rating-text">{c}</span>"#
                    )
                })
                .collect()
        })
        .unwrap_or_default();
    let panel = if with_menu {
        r#"<div class="card-feature-view__main-content">Меню · 12 позиций</div>"#
    } else {
        r#"<div class="card-feature-view__main-content">Фото и видео</div>"#
    };
    format!(
        r#"<html><head>
        <meta itemprop="openingHours" content="Mo 12:00-23:00">
        <meta itemprop="openingHours" content="Tu 12:00-23:00">
        </head><body>
        <a class="breadcrumbs-view__breadcrumb _outline">Ресторан</a>
        <h1 class="orgpage-header-view__header">{name}</h1>
        <a class="business-contacts-view__address-link">Тверская ул., 1</a>
        <span class="business-urls-view__text">{name}.ru</span>
        {badge}
        {panel}
        </body></html>"#
    )
}

/// `detail_page` after the offerings panel was opened.
pub fn expanded_page(name: &str, rating: Option<&str>) -> String {
    detail_page(name, rating, true).replace(
        "</body>",
        r#"<div class="related-item-photo-view__title">Хинкали</div>
        <span class="related-product-view__price">90 ₽</span>
        <div class="related-item-list-view__title">Лимонад</div>
        <div class="related-item-list-view__price">250 ₽</div>
        <div class="related-item-list-view__title">Без цены</div>
        </body>"#,
    )
}

pub fn reviews_page(counter: &str, reviews: &[&str]) -> String {
    let spans: String = reviews
        .iter()
        .map(|r| format!(r#"<span class="spoiler-view__text-container">{r}</span>"#))
        .collect();
    format!(
        r#"<html><body>
        <div class="tabs-select-view__counter">Обзор</div>
        <div class="tabs-select-view__counter">{counter}</div>
        <div class="scroll__scrollbar-thumb"></div>
        <span class="business-review-view__expand">ещё</span>
        {spans}
        </body></html>"#
    )
}

#[derive(Debug, Default)]
pub struct Stats {
    /// Calls to `open_detail_tab`, successful or not.
    pub open_attempts: usize,
    /// Tabs handed to the crawler.
    pub tabs_opened: usize,
    pub tabs_closed: usize,
    pub listing_drags: usize,
    /// Listing drag count at each anchor refresh, i.e. the item index.
    pub refreshed_at: Vec<usize>,
    /// Drags per reviews page URL.
    pub review_drags: HashMap<String, u32>,
    pub expand_clicks: usize,
    pub typed: Vec<String>,
    pub shut_down: bool,
}

#[derive(Default)]
pub struct FakeWeb {
    pub search_has_input: bool,
    /// Loading the map root fails.
    pub root_unreachable: bool,
    pub anchors: Vec<String>,
    /// Append `?r=<refresh number>` to anchors so tests can see which
    /// refresh an item came from.
    pub tag_refreshes: bool,
    pub pages: HashMap<String, String>,
    pub expanded: HashMap<String, String>,
    /// Detail URLs whose tab fails to open.
    pub broken: Vec<String>,
    /// Pages that open but whose DOM and URL cannot be read.
    pub unreadable: Vec<String>,
    /// Pages on which every DOM query reports the browser gone.
    pub lose_session_on: Vec<String>,
    /// The first review drag on every reviews page lands out of bounds.
    pub oob_first_review_drag: bool,
    /// The n-th open attempt (1-based) reports the browser gone.
    pub lose_session_on_open: Option<usize>,
    /// The n-th open attempt (1-based) cancels this token.
    pub cancel_on_open: Option<(usize, CancellationToken)>,
}

impl FakeWeb {
    /// Search page plus `n` well-formed venues with reviews.
    pub fn with_venues(n: usize) -> Self {
        let anchors: Vec<String> = (0..n).map(venue_url).collect();
        let mut web = Self {
            search_has_input: true,
            anchors,
            ..Self::default()
        };
        for i in 0..n {
            let name = format!("Заведение {i}");
            web.pages
                .insert(venue_url(i), detail_page(&name, Some("4,8"), false));
            web.pages.insert(
                reviews_url(i),
                reviews_page("87", &["Отлично", "Вкусно"]),
            );
        }
        web
    }

    pub fn into_session(self) -> (FakeSession, Arc<Mutex<Stats>>) {
        let stats = Arc::new(Mutex::new(Stats::default()));
        let web = Arc::new(self);
        let primary = FakePage::new(Arc::clone(&web), Arc::clone(&stats), true);
        (
            FakeSession {
                web,
                stats: Arc::clone(&stats),
                primary,
            },
            stats,
        )
    }
}

fn strip_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

struct Match {
    text: String,
    attrs: HashMap<String, String>,
}

fn query(html: &str, selector: &str) -> Vec<Match> {
    let Ok(sel) = Selector::parse(selector) else {
        return Vec::new();
    };
    Html::parse_document(html)
        .select(&sel)
        .map(|el| Match {
            text: el.text().collect::<String>(),
            attrs: el
                .value()
                .attrs()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        })
        .collect()
}

pub struct FakePage {
    web: Arc<FakeWeb>,
    stats: Arc<Mutex<Stats>>,
    primary: bool,
    url: Mutex<String>,
    expanded: Mutex<bool>,
}

impl FakePage {
    fn new(web: Arc<FakeWeb>, stats: Arc<Mutex<Stats>>, primary: bool) -> Self {
        Self {
            web,
            stats,
            primary,
            url: Mutex::new("about:blank".to_string()),
            expanded: Mutex::new(false),
        }
    }

    fn url(&self) -> String {
        self.url.lock().unwrap().clone()
    }

    fn key_in(&self, urls: &[String]) -> bool {
        let url = self.url();
        urls.iter().any(|u| u == strip_query(&url))
    }

    fn read_check(&self) -> Result<(), CrawlError> {
        if self.key_in(&self.web.lose_session_on) {
            return Err(CrawlError::SessionLost("browser process exited".to_string()));
        }
        if self.key_in(&self.web.unreadable) {
            return Err(CrawlError::Protocol("Execution context was destroyed".to_string()));
        }
        Ok(())
    }

    fn current_html(&self) -> String {
        let url = self.url();
        if url == BASE_URL {
            return search_page(self.web.search_has_input, &self.web.anchors);
        }
        let key = strip_query(&url);
        if *self.expanded.lock().unwrap() {
            if let Some(html) = self.web.expanded.get(key) {
                return html.clone();
            }
        }
        self.web.pages.get(key).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl PageHandle for FakePage {
    async fn navigate(&self, url: &str) -> Result<(), CrawlError> {
        if url == BASE_URL && self.web.root_unreachable {
            return Err(CrawlError::NavigationTimeout {
                url: url.to_string(),
                timeout_secs: 30,
            });
        }
        if url != BASE_URL && !self.web.pages.contains_key(strip_query(url)) {
            return Err(CrawlError::Navigation {
                url: url.to_string(),
                reason: "404".to_string(),
            });
        }
        *self.url.lock().unwrap() = url.to_string();
        *self.expanded.lock().unwrap() = false;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, CrawlError> {
        self.read_check()?;
        Ok(self.url())
    }

    async fn html(&self) -> Result<String, CrawlError> {
        self.read_check()?;
        Ok(self.current_html())
    }

    async fn exists(&self, selector: &str) -> Result<bool, CrawlError> {
        if self.key_in(&self.web.lose_session_on) {
            return Err(CrawlError::SessionLost("browser process exited".to_string()));
        }
        Ok(!query(&self.current_html(), selector).is_empty())
    }

    async fn text_of(&self, selector: &str) -> Result<Option<String>, CrawlError> {
        Ok(query(&self.current_html(), selector)
            .into_iter()
            .next()
            .map(|m| m.text.trim().to_string())
            .filter(|t| !t.is_empty()))
    }

    async fn attribute_of(
        &self,
        selector: &str,
        name: &str,
    ) -> Result<Option<String>, CrawlError> {
        Ok(query(&self.current_html(), selector)
            .into_iter()
            .next()
            .and_then(|m| m.attrs.get(name).cloned()))
    }

    async fn hrefs(&self, selector: &str) -> Result<Vec<String>, CrawlError> {
        let hrefs: Vec<String> = query(&self.current_html(), selector)
            .into_iter()
            .filter_map(|m| m.attrs.get("href").cloned())
            .collect();
        let mut stats = self.stats.lock().unwrap();
        let refresh = stats.refreshed_at.len();
        let index = stats.listing_drags.saturating_sub(1);
        stats.refreshed_at.push(index);
        if self.web.tag_refreshes {
            return Ok(hrefs.into_iter().map(|h| format!("{h}?r={refresh}")).collect());
        }
        Ok(hrefs)
    }

    async fn click_first(&self, selector: &str) -> Result<bool, CrawlError> {
        if query(&self.current_html(), selector).is_empty() {
            return Ok(false);
        }
        let selectors = Selectors::default();
        if selector == selectors.feature_panel {
            *self.expanded.lock().unwrap() = true;
        } else if selector == selectors.review_expand {
            self.stats.lock().unwrap().expand_clicks += 1;
        }
        Ok(true)
    }

    async fn type_into(&self, selector: &str, text: &str) -> Result<(), CrawlError> {
        if query(&self.current_html(), selector).is_empty() {
            return Err(CrawlError::ElementMissing {
                selector: selector.to_string(),
            });
        }
        self.stats.lock().unwrap().typed.push(text.to_string());
        Ok(())
    }

    async fn press_enter(&self, _selector: &str) -> Result<(), CrawlError> {
        Ok(())
    }

    async fn drag_thumb(&self, selector: &str, dy: f64) -> Result<(), CrawlError> {
        if query(&self.current_html(), selector).is_empty() {
            return Err(CrawlError::ElementMissing {
                selector: selector.to_string(),
            });
        }
        let mut stats = self.stats.lock().unwrap();
        if self.primary {
            stats.listing_drags += 1;
            return Ok(());
        }
        let drags = stats.review_drags.entry(self.url()).or_insert(0);
        *drags += 1;
        if self.web.oob_first_review_drag && *drags == 1 {
            return Err(CrawlError::DragOutOfBounds {
                target_y: 900.0 + dy,
                track_height: 900.0,
            });
        }
        Ok(())
    }

    async fn close(self) -> Result<(), CrawlError> {
        self.stats.lock().unwrap().tabs_closed += 1;
        Ok(())
    }
}

pub struct FakeSession {
    web: Arc<FakeWeb>,
    stats: Arc<Mutex<Stats>>,
    primary: FakePage,
}

#[async_trait]
impl BrowserSession for FakeSession {
    type Page = FakePage;

    fn primary(&self) -> &FakePage {
        &self.primary
    }

    async fn open_detail_tab(&self, url: &str) -> Result<FakePage, CrawlError> {
        let attempt = {
            let mut stats = self.stats.lock().unwrap();
            stats.open_attempts += 1;
            stats.open_attempts
        };
        if let Some((n, token)) = &self.web.cancel_on_open {
            if attempt == *n {
                token.cancel();
            }
        }
        if self.web.lose_session_on_open == Some(attempt) {
            return Err(CrawlError::SessionLost("browser process exited".to_string()));
        }
        if self.web.broken.iter().any(|b| b == strip_query(url)) {
            return Err(CrawlError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_CONNECTION_RESET".to_string(),
            });
        }
        let tab = FakePage::new(Arc::clone(&self.web), Arc::clone(&self.stats), false);
        tab.navigate(url).await?;
        self.stats.lock().unwrap().tabs_opened += 1;
        Ok(tab)
    }

    async fn shutdown(self) -> Result<(), CrawlError> {
        self.stats.lock().unwrap().shut_down = true;
        Ok(())
    }
}
