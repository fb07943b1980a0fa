use shared::{
    domain::{
        FilterCategory, LevelRange, PriceLimit, RatingThreshold, SubjectCode, Term,
        RATING_SCALE_MAX,
    },
    protocol::{CriterionInput, RawValue},
};

use crate::FilterError;

/// A single accepted filter predicate.
///
/// Every payload type can only be built through its checked constructor, so a
/// criterion is valid however it was put together.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterCriterion {
    Subject(SubjectCode),
    RatingMin(RatingThreshold),
    PriceMax(PriceLimit),
    Level(LevelRange),
    Availability(Term),
}

impl FilterCriterion {
    pub fn subject(raw: &str) -> Result<Self, FilterError> {
        SubjectCode::parse(raw).map(Self::Subject).ok_or_else(|| {
            FilterError::invalid(
                FilterCategory::Subject,
                format!("'{raw}' is not a subject code"),
            )
        })
    }

    pub fn rating_min(value: f64) -> Result<Self, FilterError> {
        RatingThreshold::new(value).map(Self::RatingMin).ok_or_else(|| {
            FilterError::invalid(
                FilterCategory::RatingMin,
                format!("{value} is outside 0..={RATING_SCALE_MAX}"),
            )
        })
    }

    pub fn price_max(value: f64) -> Result<Self, FilterError> {
        PriceLimit::new(value).map(Self::PriceMax).ok_or_else(|| {
            FilterError::invalid(
                FilterCategory::PriceMax,
                format!("{value} is not a non-negative price"),
            )
        })
    }

    pub fn level(from: u8, to: u8) -> Result<Self, FilterError> {
        LevelRange::new(from, to).map(Self::Level).ok_or_else(|| {
            FilterError::invalid(
                FilterCategory::Level,
                format!("{from}..={to} is not a valid year level range"),
            )
        })
    }

    pub fn availability(term: Term) -> Self {
        Self::Availability(term)
    }

    pub fn category(&self) -> FilterCategory {
        match self {
            FilterCriterion::Subject(_) => FilterCategory::Subject,
            FilterCriterion::RatingMin(_) => FilterCategory::RatingMin,
            FilterCriterion::PriceMax(_) => FilterCategory::PriceMax,
            FilterCriterion::Level(_) => FilterCategory::Level,
            FilterCriterion::Availability(_) => FilterCategory::Availability,
        }
    }

    pub fn from_input(input: CriterionInput) -> Result<Self, FilterError> {
        let CriterionInput { category, value } = input;
        match category {
            FilterCategory::Subject => match &value {
                RawValue::Text(text) => Self::subject(text),
                other => Err(mismatch(category, other)),
            },
            FilterCategory::RatingMin => Self::rating_min(number(category, &value)?),
            FilterCategory::PriceMax => Self::price_max(number(category, &value)?),
            FilterCategory::Level => {
                let (from, to) = level_bounds(&value)?;
                Self::level(from, to)
            }
            FilterCategory::Availability => match &value {
                RawValue::Text(text) => Term::parse(text).map(Self::Availability).ok_or_else(|| {
                    FilterError::invalid(category, format!("'{text}' is not a known term"))
                }),
                other => Err(mismatch(category, other)),
            },
        }
    }
}

/// Anything the engine can turn into a checked criterion.
pub trait IntoCriterion {
    fn into_criterion(self) -> Result<FilterCriterion, FilterError>;
}

impl IntoCriterion for FilterCriterion {
    fn into_criterion(self) -> Result<FilterCriterion, FilterError> {
        Ok(self)
    }
}

impl IntoCriterion for CriterionInput {
    fn into_criterion(self) -> Result<FilterCriterion, FilterError> {
        FilterCriterion::from_input(self)
    }
}

impl IntoCriterion for (FilterCategory, RawValue) {
    fn into_criterion(self) -> Result<FilterCriterion, FilterError> {
        FilterCriterion::from_input(CriterionInput {
            category: self.0,
            value: self.1,
        })
    }
}

fn mismatch(category: FilterCategory, value: &RawValue) -> FilterError {
    let shape = match value {
        RawValue::Number(_) => "a number",
        RawValue::Text(_) => "text",
        RawValue::Range { .. } => "a range",
    };
    FilterError::invalid(category, format!("expected a different value shape, got {shape}"))
}

// Query strings deliver numbers as text, so numeric text is accepted here.
fn number(category: FilterCategory, value: &RawValue) -> Result<f64, FilterError> {
    match value {
        RawValue::Number(n) => Ok(*n),
        RawValue::Text(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| FilterError::invalid(category, format!("'{text}' is not a number"))),
        other => Err(mismatch(category, other)),
    }
}

fn level_bounds(value: &RawValue) -> Result<(u8, u8), FilterError> {
    let category = FilterCategory::Level;
    match value {
        RawValue::Number(n) => {
            let level = whole_level(*n)?;
            Ok((level, level))
        }
        RawValue::Range { min, max } => Ok((whole_level(*min)?, whole_level(*max)?)),
        RawValue::Text(text) => {
            let text = text.trim();
            let parse = |part: &str| {
                part.trim()
                    .parse::<u8>()
                    .map_err(|_| FilterError::invalid(category, format!("'{text}' is not a level")))
            };
            match text.split_once('-') {
                Some((from, to)) => Ok((parse(from)?, parse(to)?)),
                None => {
                    let level = parse(text)?;
                    Ok((level, level))
                }
            }
        }
    }
}

fn whole_level(n: f64) -> Result<u8, FilterError> {
    if n.fract() != 0.0 || !(0.0..=f64::from(u8::MAX)).contains(&n) {
        return Err(FilterError::invalid(
            FilterCategory::Level,
            format!("{n} is not a whole year level"),
        ));
    }
    Ok(n as u8)
}
