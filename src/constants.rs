use crate::sitemap::ChangeFreq;

pub const SITE_URL_ENV_NAME: &str = "AITOONIC_SITE_URL";
pub const STORE_URL_ENV_NAME: &str = "AITOONIC_STORE_URL";
pub const STORE_KEY_ENV_NAME: &str = "AITOONIC_STORE_KEY";

pub const DEFAULT_SITE_URL: &str = "https://aitoonic.com";

/// Where the prerender build step expects the generated route module.
pub const DEFAULT_ROUTES_MODULE_PATH: &str = "src/prerender-routes.js";
pub const ROUTES_EXPORT_NAME: &str = "routes";

/// Upper bound on tool routes handed to the prerenderer.
pub const TOOL_ROUTE_LIMIT: usize = 500;
/// Upper bound on popular searches listed in the search sitemap.
pub const SEARCH_TERM_LIMIT: usize = 1000;

pub const DEFAULT_STORE_TIMEOUT_SECS: u64 = 30;

/// A fixed page of the site, with its sitemap policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticPage {
    pub path: &'static str,
    pub changefreq: ChangeFreq,
    pub priority: f32,
}

const fn page(path: &'static str, changefreq: ChangeFreq, priority: f32) -> StaticPage {
    StaticPage {
        path,
        changefreq,
        priority,
    }
}

pub const STATIC_PAGES: [StaticPage; 10] = [
    page("/", ChangeFreq::Daily, 1.0),
    page("/categories", ChangeFreq::Daily, 0.9),
    page("/ai-agent", ChangeFreq::Daily, 0.9),
    page("/about", ChangeFreq::Monthly, 0.7),
    page("/contact", ChangeFreq::Monthly, 0.6),
    page("/advertise", ChangeFreq::Monthly, 0.6),
    page("/affiliate", ChangeFreq::Monthly, 0.6),
    page("/sitemap", ChangeFreq::Weekly, 0.5),
    page("/terms", ChangeFreq::Monthly, 0.5),
    page("/privacy", ChangeFreq::Monthly, 0.5),
];

pub(crate) const TOOL_CHANGEFREQ: ChangeFreq = ChangeFreq::Weekly;
pub(crate) const TOOL_PRIORITY: f32 = 0.9;
pub(crate) const CATEGORY_CHANGEFREQ: ChangeFreq = ChangeFreq::Weekly;
pub(crate) const CATEGORY_PRIORITY: f32 = 0.8;
pub(crate) const AGENT_CHANGEFREQ: ChangeFreq = ChangeFreq::Weekly;
pub(crate) const AGENT_PRIORITY: f32 = 0.8;
pub(crate) const SEARCH_CHANGEFREQ: ChangeFreq = ChangeFreq::Weekly;
pub(crate) const SEARCH_PRIORITY: f32 = 0.6;

pub(crate) const WHITESPACE_RUN: &str = r"\s+";
