use chrono::{DateTime, Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scrapers emit identifiers and prices as either strings or numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Str(String),
    Int(i64),
    Float(f64),
}

impl From<Scalar> for String {
    fn from(value: Scalar) -> Self {
        match value {
            Scalar::Str(s) => s,
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Scalar> = Option::deserialize(deserializer)?;
    Ok(value.map(String::from))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SentimentLabel {
    Positive,
    Negative,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "POSITIVE",
            SentimentLabel::Negative => "NEGATIVE",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifier output. Stored flattened into a review as `sentiment` + `confidence`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    #[serde(rename = "sentiment")]
    pub label: SentimentLabel,
    #[serde(rename = "confidence")]
    pub score: f64,
}

impl Sentiment {
    pub fn new(label: SentimentLabel, score: f64) -> Self {
        Sentiment { label, score }
    }

    /// Clamps the score to `[0, 1]` and rounds it to 4 decimal places.
    pub fn normalized(self) -> Self {
        let clamped = if self.score.is_finite() {
            self.score.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Sentiment {
            label: self.label,
            score: (clamped * 10_000.0).round() / 10_000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub price: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Product {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ReviewRecord")]
pub struct Review {
    pub id: Option<String>,
    pub product_id: Option<String>,
    pub text: String,
    pub rating: Option<u8>,
    pub date: Option<String>,
    #[serde(flatten)]
    pub sentiment: Option<Sentiment>,
}

/// Review as scrapers write it. Older scrapes use `product`, `body`,
/// `month` or `timestamp`; when a record carries both spellings the
/// canonical key wins.
#[derive(Deserialize)]
struct ReviewRecord {
    #[serde(default, deserialize_with = "string_or_number")]
    id: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    product_id: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    product: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    rating: Option<u8>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    month: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(flatten)]
    sentiment: Option<Sentiment>,
}

impl From<ReviewRecord> for Review {
    fn from(raw: ReviewRecord) -> Self {
        Review {
            id: raw.id,
            product_id: raw.product_id.or(raw.product),
            text: raw.text.or(raw.body).unwrap_or_default(),
            rating: raw.rating,
            date: raw.date.or(raw.month).or(raw.timestamp),
            sentiment: raw.sentiment,
        }
    }
}

impl Review {
    pub fn has_body(&self) -> bool {
        !self.text.trim().is_empty()
    }

    /// Calendar month of the review date, if the date is present and parseable.
    pub fn month(&self) -> Option<YearMonth> {
        self.date.as_deref().and_then(YearMonth::from_date_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Testimonial {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub rating: Option<u8>,
}

impl Testimonial {
    pub fn display_author(&self) -> &str {
        self.author
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .unwrap_or("Anonymous")
    }

    pub fn stars(&self) -> u8 {
        self.rating.unwrap_or(5).min(5)
    }
}

/// A calendar month, rendered as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(YearMonth { year, month })
    }

    /// Accepts `YYYY-MM-DD`, `YYYY-MM` and RFC 3339 timestamps.
    pub fn from_date_str(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return YearMonth::new(date.year(), date.month());
        }
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return YearMonth::new(ts.year(), ts.month());
        }
        raw.parse().ok()
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let date = NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d")
            .map_err(|e| anyhow::anyhow!("invalid month '{}' (expected YYYY-MM): {}", s, e))?;
        YearMonth::new(date.year(), date.month())
            .ok_or_else(|| anyhow::anyhow!("invalid month '{}'", s))
    }
}

impl Serialize for YearMonth {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
