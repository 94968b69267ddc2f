//! Interstitials that stand between a navigation and the page: cookie
//! consent walls and CAPTCHA challenges.
use std::time::Duration;

use pilot_config::Limits;
use pilot_drivers::{Locator, Page};
use tracing::{debug, info, warn};

/// Hosts whose consent wall is dismissed automatically.
const CONSENT_HOSTS: [&str; 1] = ["google."];

const CAPTCHA_TEXTS: [&str; 5] = [
    "I'm not a robot",
    "unusual traffic",
    "verify you are human",
    "complete a quick verification",
    "Press & hold",
];

const CAPTCHA_SELECTORS: [&str; 5] = [
    "iframe[title*='reCAPTCHA']",
    "iframe[src*='recaptcha']",
    "iframe[src*='challenges']",
    "#g-recaptcha",
    ".hcaptcha-box",
];

fn consent_candidates() -> [Locator; 5] {
    [
        Locator::button("I agree", false),
        Locator::button("Accept all", false),
        Locator::button("Accept", false),
        Locator::button("I agree", true),
        Locator::button("Accept all", true),
    ]
}

/// Click through a consent dialog if the current host is known to show one.
/// Returns whether something was clicked.
pub async fn handle_consent(page: &dyn Page, limits: &Limits) -> bool {
    let url = page.current_url().await.unwrap_or_default();
    if !CONSENT_HOSTS.iter().any(|h| url.contains(h)) {
        return false;
    }
    let timeout = Duration::from_millis(limits.consent_timeout_ms);
    for locator in consent_candidates() {
        if !page.wait_visible(&locator, timeout).await.unwrap_or(false) {
            continue;
        }
        match page.click(&locator).await {
            Ok(()) => {
                info!(target: "pilot.gate", control = %locator, "consent.accepted");
                return true;
            }
            Err(e) => debug!(target: "pilot.gate", control = %locator, error = %e, "consent.click_failed"),
        }
    }
    false
}

/// Whether a challenge is showing. Lookup errors count as "no".
pub async fn captcha_present(page: &dyn Page) -> bool {
    for text in CAPTCHA_TEXTS {
        if page.count(&Locator::text(text)).await.unwrap_or(0) > 0 {
            return true;
        }
    }
    for selector in CAPTCHA_SELECTORS {
        if page.count(&Locator::css(selector)).await.unwrap_or(0) > 0 {
            return true;
        }
    }
    false
}

/// Poll until the challenge is gone or the budget runs out. `true` means the
/// page is clear.
pub async fn wait_out_captcha(page: &dyn Page, limits: &Limits) -> bool {
    if !captcha_present(page).await {
        return true;
    }
    warn!(target: "pilot.gate", budget_ms = limits.captcha_budget_ms, "captcha.detected");
    let poll = Duration::from_millis(limits.captcha_poll_ms.max(1));
    let mut waited = 0u64;
    while waited < limits.captcha_budget_ms {
        tokio::time::sleep(poll).await;
        waited += limits.captcha_poll_ms.max(1);
        if !captcha_present(page).await {
            info!(target: "pilot.gate", waited_ms = waited, "captcha.cleared");
            return true;
        }
    }
    warn!(target: "pilot.gate", waited_ms = waited, "captcha.unsolved");
    false
}
