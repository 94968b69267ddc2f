//! Driver layer for browser automation.
//!
//! The rest of the workspace talks to a browser only through the [`Page`]
//! trait: navigation, CSS/XPath/text locators, keyboard and mouse
//! injection, in-page script evaluation and tabs. The WebDriver-backed
//! implementation lives here too.
//!
//! - [`browser::page::Page`]: engine capability surface
//! - [`browser::page::Locator`]: CSS, XPath and visible-text locators
//! - [`browser::driver::FantocciniPage`]: `fantoccini` implementation
//! - [`browser::driver::WebDriverLauncher`]: connects with retries
//! - [`browser::behavioral::BehavioralEngine`]: keystroke cadence
//! - [`browser::stealth`]: Chrome arguments and JS evasions
pub mod browser;

pub use browser::keys::KeyChord;
pub use browser::page::{Locator, Page, PageLauncher, SharedPage};
