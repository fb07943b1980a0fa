use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(CourseId);
id_newtype!(ReviewId);

pub const RATING_SCALE_MAX: f64 = 5.0;
pub const MIN_YEAR_LEVEL: u8 = 1;
pub const MAX_YEAR_LEVEL: u8 = 9;

/// Filter categories in the order descriptors and query pairs list them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterCategory {
    Subject,
    RatingMin,
    PriceMax,
    Level,
    Availability,
}

impl FilterCategory {
    pub const ALL: [FilterCategory; 5] = [
        FilterCategory::Subject,
        FilterCategory::RatingMin,
        FilterCategory::PriceMax,
        FilterCategory::Level,
        FilterCategory::Availability,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FilterCategory::Subject => "subject",
            FilterCategory::RatingMin => "rating_min",
            FilterCategory::PriceMax => "price_max",
            FilterCategory::Level => "level",
            FilterCategory::Availability => "availability",
        }
    }
}

impl fmt::Display for FilterCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Term {
    Summer,
    T1,
    T2,
    T3,
}

impl Term {
    pub fn as_str(self) -> &'static str {
        match self {
            Term::Summer => "summer",
            Term::T1 => "t1",
            Term::T2 => "t2",
            Term::T3 => "t3",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "summer" | "u1" => Some(Term::Summer),
            "t1" | "term1" => Some(Term::T1),
            "t2" | "term2" => Some(Term::T2),
            "t3" | "term3" => Some(Term::T3),
            _ => None,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upper-case subject prefix of a course code, e.g. `COMP` in `COMP1511`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubjectCode(String);

impl SubjectCode {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if !(2..=8).contains(&trimmed.len()) || !trimmed.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return None;
        }
        Some(Self(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SubjectCode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid subject code '{value}'"))
    }
}

impl From<SubjectCode> for String {
    fn from(value: SubjectCode) -> Self {
        value.0
    }
}

impl fmt::Display for SubjectCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Minimum average rating, finite and within `0..=RATING_SCALE_MAX`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct RatingThreshold(f64);

impl RatingThreshold {
    pub fn new(value: f64) -> Option<Self> {
        (value.is_finite() && (0.0..=RATING_SCALE_MAX).contains(&value)).then_some(Self(value))
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for RatingThreshold {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("{value} is outside 0..={RATING_SCALE_MAX}"))
    }
}

impl From<RatingThreshold> for f64 {
    fn from(value: RatingThreshold) -> Self {
        value.0
    }
}

/// Maximum price, finite and non-negative.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct PriceLimit(f64);

impl PriceLimit {
    pub fn new(value: f64) -> Option<Self> {
        (value.is_finite() && value >= 0.0).then_some(Self(value))
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for PriceLimit {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("{value} is not a non-negative price"))
    }
}

impl From<PriceLimit> for f64 {
    fn from(value: PriceLimit) -> Self {
        value.0
    }
}

/// Inclusive range of course year levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct LevelRange {
    from: u8,
    to: u8,
}

impl LevelRange {
    pub fn new(from: u8, to: u8) -> Option<Self> {
        let valid = (MIN_YEAR_LEVEL..=MAX_YEAR_LEVEL).contains(&from)
            && (MIN_YEAR_LEVEL..=MAX_YEAR_LEVEL).contains(&to)
            && from <= to;
        valid.then_some(Self { from, to })
    }

    pub fn single(level: u8) -> Option<Self> {
        Self::new(level, level)
    }

    pub fn from(&self) -> u8 {
        self.from
    }

    pub fn to(&self) -> u8 {
        self.to
    }

    pub fn contains(&self, level: u8) -> bool {
        (self.from..=self.to).contains(&level)
    }
}

impl<'de> Deserialize<'de> for LevelRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Bounds {
            from: u8,
            to: u8,
        }

        let Bounds { from, to } = Bounds::deserialize(deserializer)?;
        Self::new(from, to).ok_or_else(|| {
            de::Error::custom(format!(
                "{from}..={to} is not within year levels {MIN_YEAR_LEVEL}..={MAX_YEAR_LEVEL}"
            ))
        })
    }
}

impl fmt::Display for LevelRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.from == self.to {
            write!(f, "{}", self.from)
        } else {
            write!(f, "{}-{}", self.from, self.to)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseSummary {
    pub course_id: CourseId,
    pub code: String,
    pub subject: SubjectCode,
    pub title: String,
    pub level: u8,
    pub price: f64,
    pub terms: Vec<Term>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    pub review_count: usize,
}
