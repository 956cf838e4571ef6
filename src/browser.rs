use anyhow::{Context, Result};
use headless_chrome::{util::Timeout, Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use url::Url;

use crate::category::{CategorySource, LookupError, LookupOutcome, LookupStage};

const CONFIRM_XPATH: &str = "/html/body/div[1]/div[3]/div[2]/div[2]/div/div/div/div[2]/div[1]/div/form[1]/table/tbody/tr[4]/td/div/input";
const RESULTS_XPATH: &str = "/html/body/div[1]/div[3]/div[2]/div[2]/div/div/div/div[2]/div[1]/div/form[2]/table/tbody/tr[2]/td[4]";

// The operator prompt can block for a long time; the browser must outlive it.
const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub lookup_url: Url,
    pub wait: Duration,
    pub headless: bool,
}

/// Category lookups driven through a single Chrome tab.
pub struct ChromeCategorizer {
    // Dropping the browser kills the Chrome process.
    _browser: Browser,
    tab: Arc<Tab>,
    lookup_url: Url,
    wait: Duration,
}

impl ChromeCategorizer {
    pub fn launch(options: BrowserOptions) -> Result<Self> {
        let start_time = Instant::now();
        info!(action = "start", component = "browser", headless = options.headless, "Launching Chrome");

        let is_container = std::env::var("TRANCO_CATEGORIZER_CONTAINER").is_ok()
            || std::path::Path::new("/.dockerenv").exists();

        let launch_options = LaunchOptions::default_builder()
            .headless(options.headless)
            .sandbox(!is_container)
            .window_size(Some((1920, 1080)))
            .idle_browser_timeout(IDLE_BROWSER_TIMEOUT)
            .args(vec![OsStr::new("--disable-blink-features=AutomationControlled")])
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build Chrome launch options: {}", e))?;

        let browser = Browser::new(launch_options).context("Failed to launch Chrome")?;
        let tab = browser.new_tab().context("Failed to open browser tab")?;

        info!(
            action = "complete",
            component = "browser",
            duration_ms = start_time.elapsed().as_millis(),
            "Chrome ready"
        );

        Ok(Self {
            _browser: browser,
            tab,
            lookup_url: options.lookup_url,
            wait: options.wait,
        })
    }
}

/// Browser primitives a category lookup is built from.
pub trait LookupPage {
    fn navigate(&self, url: &str) -> Result<()>;
    /// Blocks until the document requested by `navigate` has loaded.
    fn wait_for_load(&self) -> Result<()>;
    fn click_xpath(&self, xpath: &str, timeout: Duration) -> Result<()>;
    fn xpath_text(&self, xpath: &str, timeout: Duration) -> Result<String>;
}

impl LookupPage for Tab {
    fn navigate(&self, url: &str) -> Result<()> {
        self.navigate_to(url)?;
        Ok(())
    }

    fn wait_for_load(&self) -> Result<()> {
        self.wait_until_navigated()?;
        Ok(())
    }

    fn click_xpath(&self, xpath: &str, timeout: Duration) -> Result<()> {
        self.wait_for_xpath_with_custom_timeout(xpath, timeout)?.click()?;
        Ok(())
    }

    fn xpath_text(&self, xpath: &str, timeout: Duration) -> Result<String> {
        self.wait_for_xpath_with_custom_timeout(xpath, timeout)?
            .get_inner_text()
    }
}

fn element_error(e: anyhow::Error, stage: LookupStage, timeout: Duration) -> LookupError {
    if e.is::<Timeout>() {
        LookupError::TimedOut { stage, timeout }
    } else {
        LookupError::Interaction {
            stage,
            message: e.to_string(),
        }
    }
}

/// Opens the lookup page for `domain`, confirms, and reads the results cell.
/// The element waits only start once the new document has loaded, so a
/// previous domain's results page can never answer for this one.
pub fn read_categories<P: LookupPage + ?Sized>(
    page: &P,
    base: &Url,
    domain: &str,
    wait: Duration,
) -> Result<LookupOutcome, LookupError> {
    let url = lookup_url(base, domain);
    let navigation_error = |e: anyhow::Error| LookupError::Navigation {
        url: url.to_string(),
        message: e.to_string(),
    };

    page.navigate(url.as_str()).map_err(navigation_error)?;
    page.wait_for_load().map_err(navigation_error)?;

    page.click_xpath(CONFIRM_XPATH, wait)
        .map_err(|e| element_error(e, LookupStage::Confirm, wait))?;

    let text = page
        .xpath_text(RESULTS_XPATH, wait)
        .map_err(|e| element_error(e, LookupStage::Results, wait))?;

    Ok(LookupOutcome::from_result_text(&text))
}

impl CategorySource for ChromeCategorizer {
    fn lookup(&mut self, domain: &str) -> LookupOutcome {
        match read_categories(&*self.tab, &self.lookup_url, domain, self.wait) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(action = "lookup", component = "browser", domain = domain, error = %e, "Category lookup failed");
                LookupOutcome::Failed(e)
            }
        }
    }
}

/// Lookup page URL for `domain`, passed as the `url` query argument.
pub fn lookup_url(base: &Url, domain: &str) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut().append_pair("url", domain);
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::DEFAULT_LOOKUP_URL;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingPage {
        calls: RefCell<Vec<String>>,
        load_fails: bool,
        confirm_times_out: bool,
        results_text: String,
    }

    impl LookupPage for RecordingPage {
        fn navigate(&self, url: &str) -> Result<()> {
            self.calls.borrow_mut().push(format!("navigate {}", url));
            Ok(())
        }

        fn wait_for_load(&self) -> Result<()> {
            self.calls.borrow_mut().push("load".to_string());
            if self.load_fails {
                anyhow::bail!("net::ERR_NAME_NOT_RESOLVED");
            }
            Ok(())
        }

        fn click_xpath(&self, xpath: &str, _timeout: Duration) -> Result<()> {
            assert_eq!(xpath, CONFIRM_XPATH);
            self.calls.borrow_mut().push("click".to_string());
            if self.confirm_times_out {
                return Err(Timeout.into());
            }
            Ok(())
        }

        fn xpath_text(&self, xpath: &str, _timeout: Duration) -> Result<String> {
            assert_eq!(xpath, RESULTS_XPATH);
            self.calls.borrow_mut().push("text".to_string());
            Ok(self.results_text.clone())
        }
    }

    fn base() -> Url {
        Url::parse("https://lookup.test/check").unwrap()
    }

    #[test]
    fn test_elements_are_read_only_after_page_load() {
        let page = RecordingPage {
            results_text: "- Business\n- Shopping\n".to_string(),
            ..Default::default()
        };

        let outcome = read_categories(&page, &base(), "b.com", Duration::from_secs(10)).unwrap();
        match outcome {
            LookupOutcome::Categorized(labels) => assert_eq!(labels, vec!["Business", "Shopping", ""]),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(
            *page.calls.borrow(),
            vec![
                "navigate https://lookup.test/check?url=b.com".to_string(),
                "load".to_string(),
                "click".to_string(),
                "text".to_string(),
            ]
        );
    }

    #[test]
    fn test_failed_load_is_a_navigation_error() {
        let page = RecordingPage {
            load_fails: true,
            ..Default::default()
        };

        let err = read_categories(&page, &base(), "gone.com", Duration::from_secs(10)).unwrap_err();
        assert!(matches!(err, LookupError::Navigation { .. }));
        assert_eq!(page.calls.borrow().len(), 2);
    }

    #[test]
    fn test_missing_confirm_button_times_out() {
        let page = RecordingPage {
            confirm_times_out: true,
            ..Default::default()
        };

        let err = read_categories(&page, &base(), "a.com", Duration::from_secs(3)).unwrap_err();
        match err {
            LookupError::TimedOut { stage, timeout } => {
                assert_eq!(stage, LookupStage::Confirm);
                assert_eq!(timeout, Duration::from_secs(3));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!page.calls.borrow().contains(&"text".to_string()));
    }

    #[test]
    fn test_lookup_url_keeps_existing_query() {
        let base = Url::parse(DEFAULT_LOOKUP_URL).unwrap();
        let url = lookup_url(&base, "example.com");
        assert_eq!(
            url.as_str(),
            "https://sitelookup.mcafee.com/en/feedback/url?action=checksingle&url=example.com"
        );
    }

    #[test]
    fn test_lookup_url_encodes_domain() {
        let base = Url::parse("https://lookup.test/check").unwrap();
        let url = lookup_url(&base, "a b&c.com");
        assert_eq!(url.as_str(), "https://lookup.test/check?url=a+b%26c.com");
    }
}
