use anyhow::Result;

pub const NO_SOURCE_TIP: &str = "Drink plenty of water today for glowing skin!";
pub const EMPTY_TIP: &str = "Smile, it's the best face yoga!";
pub const FALLBACK_TIP: &str = "Consistency is the key to natural beauty.";

/// External text source for the daily motivational tip.
pub trait TipSource: Send + Sync {
    fn fetch_tip(&self) -> Result<String>;
}

/// Tip source that always returns the same text.
#[derive(Debug, Clone)]
pub struct StaticTip(pub String);

impl TipSource for StaticTip {
    fn fetch_tip(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

pub fn resolve_tip(source: Option<&dyn TipSource>) -> String {
    let Some(source) = source else {
        return NO_SOURCE_TIP.to_string();
    };
    match source.fetch_tip() {
        Ok(text) if text.trim().is_empty() => EMPTY_TIP.to_string(),
        Ok(text) => text.trim().to_string(),
        Err(err) => {
            tracing::warn!(%err, "tip source unavailable");
            FALLBACK_TIP.to_string()
        }
    }
}
