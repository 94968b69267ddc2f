use anyhow::Result;
use fantoccini::elements::Element;
use rand::rngs::OsRng;
use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug, Clone)]
/// Keystroke cadence for simulated typing and navigation pauses.
pub struct BehavioralEngine {
    /// Random pause before each navigation, in milliseconds. `(0, 0)` disables it.
    pub navigation_pause: (u64, u64),
}

impl Default for BehavioralEngine {
    fn default() -> Self {
        Self {
            navigation_pause: (0, 0),
        }
    }
}

impl BehavioralEngine {
    pub fn new(navigation_pause: (u64, u64)) -> Self {
        Self { navigation_pause }
    }

    /// Sleep for a random duration between `min` and `max` milliseconds.
    pub async fn random_delay(&self, min: u64, max: u64) {
        if max == 0 {
            return;
        }
        let ms = OsRng.gen_range(min..=max.max(min));
        sleep(Duration::from_millis(ms)).await;
    }

    pub async fn before_navigation(&self) {
        let (min, max) = self.navigation_pause;
        self.random_delay(min, max).await;
    }

    /// Send `text` to `element`. A zero `delay` sends it in one call;
    /// otherwise one character at a time with `delay` between them.
    pub async fn type_into(&self, element: &Element, text: &str, delay: Duration) -> Result<()> {
        if delay.is_zero() {
            element.send_keys(text).await?;
            return Ok(());
        }
        let mut buf = [0u8; 4];
        for ch in text.chars() {
            element.send_keys(ch.encode_utf8(&mut buf)).await?;
            sleep(delay).await;
        }
        Ok(())
    }
}
