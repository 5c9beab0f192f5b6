//! Domain primitives: ModelId, TimeMs, Currency, Platform.

use serde::{Deserialize, Serialize};

/// Time in milliseconds since Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeMs(pub i64);

impl TimeMs {
    pub fn new(ms: i64) -> Self {
        TimeMs(ms)
    }

    pub fn as_ms(&self) -> i64 {
        self.0
    }

    /// Current wall-clock time. Only called at the edges (handlers, main);
    /// engine code always receives time as a parameter.
    pub fn now() -> Self {
        TimeMs(chrono::Utc::now().timestamp_millis())
    }
}

/// Identifier of a model (performer) as issued by the account system.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModelId(pub String);

impl ModelId {
    pub fn new(id: String) -> Self {
        ModelId(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Currency a platform reports earnings in.
///
/// USD is the reporting currency; EUR and GBP are foreign and must be
/// converted before any fee multiplier applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    Usd,
    Eur,
    Gbp,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usd => "usd",
            Currency::Eur => "eur",
            Currency::Gbp => "gbp",
        }
    }

    /// Parse a currency slug, case-insensitively.
    pub fn parse(s: &str) -> Option<Currency> {
        match s.to_ascii_lowercase().as_str() {
            "usd" => Some(Currency::Usd),
            "eur" => Some(Currency::Eur),
            "gbp" => Some(Currency::Gbp),
            _ => None,
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Webcam platform a model earns on.
///
/// Closed set of platforms the agency works with, plus an explicit
/// fallback for anything unrecognized. The fallback keeps its original
/// slug so unknown platforms still archive under a stable key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Platform {
    Chaturbate,
    Stripchat,
    BongaCams,
    LiveJasmin,
    CamSoda,
    Flirt4Free,
    Other(String),
}

impl Platform {
    pub fn from_slug(s: &str) -> Platform {
        match s.to_ascii_lowercase().as_str() {
            "chaturbate" => Platform::Chaturbate,
            "stripchat" => Platform::Stripchat,
            "bongacams" => Platform::BongaCams,
            "livejasmin" => Platform::LiveJasmin,
            "camsoda" => Platform::CamSoda,
            "flirt4free" => Platform::Flirt4Free,
            other => Platform::Other(other.to_string()),
        }
    }

    pub fn slug(&self) -> &str {
        match self {
            Platform::Chaturbate => "chaturbate",
            Platform::Stripchat => "stripchat",
            Platform::BongaCams => "bongacams",
            Platform::LiveJasmin => "livejasmin",
            Platform::CamSoda => "camsoda",
            Platform::Flirt4Free => "flirt4free",
            Platform::Other(slug) => slug.as_str(),
        }
    }
}

impl From<String> for Platform {
    fn from(s: String) -> Self {
        Platform::from_slug(&s)
    }
}

impl From<Platform> for String {
    fn from(p: Platform) -> Self {
        p.slug().to_string()
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.slug())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_slug_roundtrip() {
        for slug in [
            "chaturbate",
            "stripchat",
            "bongacams",
            "livejasmin",
            "camsoda",
            "flirt4free",
        ] {
            let p = Platform::from_slug(slug);
            assert!(!matches!(p, Platform::Other(_)), "{} parsed as Other", slug);
            assert_eq!(p.slug(), slug);
        }
    }

    #[test]
    fn test_platform_unknown_keeps_slug() {
        let p = Platform::from_slug("MyFreeCams");
        assert_eq!(p, Platform::Other("myfreecams".to_string()));
        assert_eq!(p.slug(), "myfreecams");
    }

    #[test]
    fn test_platform_serde_as_slug() {
        let json = serde_json::to_string(&Platform::Stripchat).unwrap();
        assert_eq!(json, "\"stripchat\"");
        let back: Platform = serde_json::from_str("\"stripchat\"").unwrap();
        assert_eq!(back, Platform::Stripchat);
    }

    #[test]
    fn test_currency_parse() {
        assert_eq!(Currency::parse("USD"), Some(Currency::Usd));
        assert_eq!(Currency::parse("eur"), Some(Currency::Eur));
        assert_eq!(Currency::parse("cop"), None);
    }

    #[test]
    fn test_currency_serde_lowercase() {
        let json = serde_json::to_string(&Currency::Gbp).unwrap();
        assert_eq!(json, "\"gbp\"");
    }

    #[test]
    fn test_timems_ordering() {
        assert!(TimeMs::new(1000) < TimeMs::new(2000));
    }
}
