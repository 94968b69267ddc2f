use pilot_common::StealthLevel;

use super::fingerprint::UserAgentProfile;

/// Chrome command-line arguments for a stealth level and fingerprint.
pub fn build_stealth_arguments(level: StealthLevel, user_profile: &UserAgentProfile) -> Vec<String> {
    let mut args = vec![
        "--disable-blink-features=AutomationControlled".to_string(),
        "--disable-infobars".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
        format!("--lang={}", user_profile.languages.join(",")),
        format!(
            "--window-size={},{}",
            user_profile.viewport.0, user_profile.viewport.1
        ),
    ];
    if level != StealthLevel::Lightweight {
        args.push(format!("--user-agent={}", user_profile.user_agent));
    }
    if level == StealthLevel::Maximum {
        args.push("--disable-extensions".to_string());
        args.push("--disable-plugins-discovery".to_string());
    }
    args
}

/// Scripts evaluated after each navigation for a stealth level.
pub fn evasions_for(level: StealthLevel) -> Vec<&'static str> {
    match level {
        StealthLevel::Lightweight => vec![CORE_EVASIONS],
        StealthLevel::Balanced => vec![CORE_EVASIONS, CANVAS_EVASIONS],
        StealthLevel::Maximum => vec![CORE_EVASIONS, CANVAS_EVASIONS, WEBGL_EVASIONS],
    }
}

pub const CORE_EVASIONS: &str = r#"
    Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
    Object.defineProperty(navigator, 'languages', { get: () => ['en-US', 'en'] });
    if (!window.chrome) window.chrome = { runtime: {} };
"#;

pub const WEBGL_EVASIONS: &str = r#"
    const getParameter = WebGLRenderingContext.prototype.getParameter;
    WebGLRenderingContext.prototype.getParameter = function(parameter) {
        if (parameter === 37445) return 'Intel Inc.';
        if (parameter === 37446) return 'Intel Iris OpenGL Engine';
        return getParameter.call(this, parameter);
    };
"#;

pub const CANVAS_EVASIONS: &str = r#"
    const getContext = HTMLCanvasElement.prototype.getContext;
    HTMLCanvasElement.prototype.getContext = function(type, ...args) {
        const ctx = getContext.call(this, type, ...args);
        if (type === '2d' && ctx && !this.__pilotPatched) {
            this.__pilotPatched = true;
            const toDataURL = this.toDataURL;
            this.toDataURL = function(...a) {
                const img = ctx.getImageData(0, 0, this.width, this.height);
                for (let i = 0; i < img.data.length; i += 4) {
                    if (Math.random() < 0.001) img.data[i] += Math.random() < 0.5 ? -1 : 1;
                }
                ctx.putImageData(img, 0, 0);
                return toDataURL.call(this, ...a);
            };
        }
        return ctx;
    };
"#;
