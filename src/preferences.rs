use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PreferenceError {
    #[error("Unknown {field} value: '{value}'")]
    UnknownValue { field: &'static str, value: String },
    #[error("Unknown preference field: '{0}'")]
    UnknownField(String),
    #[error("Invalid prep time '{0}': expected minutes between 15 and 120")]
    InvalidPrepTime(String),
}

/// An enumerated preference value with a wire form (sent to the assistant)
/// and a display label (shown in the form).
pub trait Choice: Copy + PartialEq + Sized + 'static {
    const FIELD: &'static str;
    const ALL: &'static [Self];

    fn wire(self) -> &'static str;

    fn label(self) -> &'static str {
        self.wire()
    }
}

/// Parse a wire value or label, case-insensitively. Empty input means "no preference".
pub fn parse_choice<T: Choice>(input: &str) -> Result<Option<T>, PreferenceError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    T::ALL
        .iter()
        .copied()
        .find(|c| c.wire().eq_ignore_ascii_case(input) || c.label().eq_ignore_ascii_case(input))
        .map(Some)
        .ok_or_else(|| PreferenceError::UnknownValue {
            field: T::FIELD,
            value: input.to_string(),
        })
}

/// Step through `[unset, ALL...]`, wrapping at both ends.
pub fn cycle_choice<T: Choice>(current: Option<T>, forward: bool) -> Option<T> {
    let len = T::ALL.len() + 1;
    let index = match current {
        None => 0,
        Some(value) => T::ALL.iter().position(|c| *c == value).map_or(0, |i| i + 1),
    };
    let next = if forward { (index + 1) % len } else { (index + len - 1) % len };
    if next == 0 {
        None
    } else {
        Some(T::ALL[next - 1])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Country {
    Canada,
    #[serde(rename = "UK")]
    Uk,
    #[serde(rename = "US")]
    Us,
}

impl Choice for Country {
    const FIELD: &'static str = "country";
    const ALL: &'static [Self] = &[Country::Canada, Country::Uk, Country::Us];

    fn wire(self) -> &'static str {
        match self {
            Country::Canada => "Canada",
            Country::Uk => "UK",
            Country::Us => "US",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Diet {
    Veg,
    Egg,
    Chicken,
    Vegan,
}

impl Choice for Diet {
    const FIELD: &'static str = "diet";
    const ALL: &'static [Self] = &[Diet::Veg, Diet::Egg, Diet::Chicken, Diet::Vegan];

    fn wire(self) -> &'static str {
        match self {
            Diet::Veg => "Veg",
            Diet::Egg => "Egg",
            Diet::Chicken => "Chicken",
            Diet::Vegan => "Vegan",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Diet::Veg => "Vegetarian",
            Diet::Egg => "Egg (Vegetarian + Eggs)",
            Diet::Chicken => "Chicken",
            Diet::Vegan => "Vegan",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BudgetLevel {
    Low,
    Medium,
    High,
}

impl Choice for BudgetLevel {
    const FIELD: &'static str = "budget";
    const ALL: &'static [Self] = &[BudgetLevel::Low, BudgetLevel::Medium, BudgetLevel::High];

    fn wire(self) -> &'static str {
        match self {
            BudgetLevel::Low => "Low",
            BudgetLevel::Medium => "Medium",
            BudgetLevel::High => "High",
        }
    }

    fn label(self) -> &'static str {
        match self {
            BudgetLevel::Low => "Low ($20-30/week)",
            BudgetLevel::Medium => "Medium ($30-50/week)",
            BudgetLevel::High => "High ($50+/week)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Store {
    Walmart,
    Target,
    Freshco,
    NoFrills,
}

impl Choice for Store {
    const FIELD: &'static str = "store";
    const ALL: &'static [Self] = &[Store::Walmart, Store::Target, Store::Freshco, Store::NoFrills];

    fn wire(self) -> &'static str {
        match self {
            Store::Walmart => "Walmart",
            Store::Target => "Target",
            Store::Freshco => "Freshco",
            Store::NoFrills => "NoFrills",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Store::NoFrills => "No Frills",
            other => other.wire(),
        }
    }
}

macro_rules! impl_choice_from_str {
    ($($ty:ty),*) => {
        $(
            impl FromStr for $ty {
                type Err = PreferenceError;

                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    parse_choice::<$ty>(s)?.ok_or_else(|| PreferenceError::UnknownValue {
                        field: <$ty as Choice>::FIELD,
                        value: String::new(),
                    })
                }
            }

            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.wire())
                }
            }
        )*
    };
}

impl_choice_from_str!(Country, Diet, BudgetLevel, Store);

/// Prep time in minutes, always within `[MIN, MAX]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "u16", into = "u16")]
pub struct PrepTime(u16);

impl PrepTime {
    pub const MIN: u16 = 15;
    pub const MAX: u16 = 120;
    pub const STEP: u16 = 15;
    pub const DEFAULT: u16 = 30;

    /// Out-of-range values are clamped.
    pub fn new(minutes: u16) -> Self {
        Self(minutes.clamp(Self::MIN, Self::MAX))
    }

    pub fn minutes(self) -> u16 {
        self.0
    }

    pub fn step_up(self) -> Self {
        Self::new(self.0.saturating_add(Self::STEP))
    }

    pub fn step_down(self) -> Self {
        Self::new(self.0.saturating_sub(Self::STEP))
    }
}

impl Default for PrepTime {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl From<u16> for PrepTime {
    fn from(minutes: u16) -> Self {
        Self::new(minutes)
    }
}

impl From<PrepTime> for u16 {
    fn from(prep: PrepTime) -> Self {
        prep.0
    }
}

impl FromStr for PrepTime {
    type Err = PreferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_suffix("minutes")
            .or_else(|| trimmed.strip_suffix("min"))
            .unwrap_or(trimmed)
            .trim();
        digits
            .parse::<u16>()
            .map(PrepTime::new)
            .map_err(|_| PreferenceError::InvalidPrepTime(s.to_string()))
    }
}

impl fmt::Display for PrepTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} minutes", self.0)
    }
}

/// The five user-selectable settings. `None` means "no preference".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub country: Option<Country>,
    pub diet: Option<Diet>,
    pub budget_level: Option<BudgetLevel>,
    pub prep_time: Option<PrepTime>,
    pub preferred_store: Option<Store>,
}

impl Preferences {
    /// What a fresh session starts with: everything unset except a 30 minute prep time.
    pub fn session_default() -> Self {
        Self {
            prep_time: Some(PrepTime::default()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply a change, returning whether anything actually changed.
    pub fn apply(&mut self, change: PreferenceChange) -> bool {
        let before = self.clone();
        match change {
            PreferenceChange::Country(v) => self.country = v,
            PreferenceChange::Diet(v) => self.diet = v,
            PreferenceChange::BudgetLevel(v) => self.budget_level = v,
            PreferenceChange::PrepTime(v) => self.prep_time = v,
            PreferenceChange::PreferredStore(v) => self.preferred_store = v,
        }
        *self != before
    }

    /// The change that moves `field` one step forward or backward.
    ///
    /// Enumerated fields cycle through "unset" and every value. Prep time moves
    /// in 15 minute steps and stays within bounds; an unset prep time starts at
    /// the default.
    pub fn step(&self, field: PreferenceField, forward: bool) -> PreferenceChange {
        match field {
            PreferenceField::Country => PreferenceChange::Country(cycle_choice(self.country, forward)),
            PreferenceField::Diet => PreferenceChange::Diet(cycle_choice(self.diet, forward)),
            PreferenceField::BudgetLevel => {
                PreferenceChange::BudgetLevel(cycle_choice(self.budget_level, forward))
            }
            PreferenceField::PrepTime => {
                let next = match self.prep_time {
                    None => PrepTime::default(),
                    Some(prep) if forward => prep.step_up(),
                    Some(prep) => prep.step_down(),
                };
                PreferenceChange::PrepTime(Some(next))
            }
            PreferenceField::PreferredStore => {
                PreferenceChange::PreferredStore(cycle_choice(self.preferred_store, forward))
            }
        }
    }

    /// Human-facing value for a form control, e.g. "Low ($20-30/week)" or "Select Budget".
    pub fn display_value(&self, field: PreferenceField) -> String {
        let value = match field {
            PreferenceField::Country => self.country.map(|c| c.label().to_string()),
            PreferenceField::Diet => self.diet.map(|d| d.label().to_string()),
            PreferenceField::BudgetLevel => self.budget_level.map(|b| b.label().to_string()),
            PreferenceField::PrepTime => self.prep_time.map(|p| p.to_string()),
            PreferenceField::PreferredStore => self.preferred_store.map(|s| s.label().to_string()),
        };
        value.unwrap_or_else(|| field.placeholder().to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreferenceField {
    Country,
    Diet,
    BudgetLevel,
    PrepTime,
    PreferredStore,
}

impl PreferenceField {
    pub const ALL: [PreferenceField; 5] = [
        PreferenceField::Country,
        PreferenceField::Diet,
        PreferenceField::BudgetLevel,
        PreferenceField::PrepTime,
        PreferenceField::PreferredStore,
    ];

    /// Form label.
    pub fn label(self) -> &'static str {
        match self {
            PreferenceField::Country => "Country",
            PreferenceField::Diet => "Diet",
            PreferenceField::BudgetLevel => "Budget Level",
            PreferenceField::PrepTime => "Prep Time",
            PreferenceField::PreferredStore => "Preferred Store",
        }
    }

    pub fn placeholder(self) -> &'static str {
        match self {
            PreferenceField::Country => "Select Country",
            PreferenceField::Diet => "Select Diet",
            PreferenceField::BudgetLevel => "Select Budget",
            PreferenceField::PrepTime => "Any",
            PreferenceField::PreferredStore => "Select Store",
        }
    }

    /// Name used in web forms and `/set` commands.
    pub fn key(self) -> &'static str {
        match self {
            PreferenceField::Country => "country",
            PreferenceField::Diet => "diet",
            PreferenceField::BudgetLevel => "budget",
            PreferenceField::PrepTime => "prep_time",
            PreferenceField::PreferredStore => "store",
        }
    }

    /// `(wire value, label)` pairs for enumerated fields; empty for prep time.
    pub fn options(self) -> Vec<(&'static str, &'static str)> {
        fn pairs<T: Choice>() -> Vec<(&'static str, &'static str)> {
            T::ALL.iter().map(|c| (c.wire(), c.label())).collect()
        }
        match self {
            PreferenceField::Country => pairs::<Country>(),
            PreferenceField::Diet => pairs::<Diet>(),
            PreferenceField::BudgetLevel => pairs::<BudgetLevel>(),
            PreferenceField::PrepTime => Vec::new(),
            PreferenceField::PreferredStore => pairs::<Store>(),
        }
    }
}

impl FromStr for PreferenceField {
    type Err = PreferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "country" => Ok(PreferenceField::Country),
            "diet" => Ok(PreferenceField::Diet),
            "budget" | "budget_level" => Ok(PreferenceField::BudgetLevel),
            "prep" | "prep_time" => Ok(PreferenceField::PrepTime),
            "store" | "preferred_store" => Ok(PreferenceField::PreferredStore),
            _ => Err(PreferenceError::UnknownField(s.to_string())),
        }
    }
}

/// A single edit to one preference field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferenceChange {
    Country(Option<Country>),
    Diet(Option<Diet>),
    BudgetLevel(Option<BudgetLevel>),
    PrepTime(Option<PrepTime>),
    PreferredStore(Option<Store>),
}

impl PreferenceChange {
    /// Parse a raw form/command value for `field`. Empty input clears the field.
    pub fn parse(field: PreferenceField, value: &str) -> Result<Self, PreferenceError> {
        Ok(match field {
            PreferenceField::Country => PreferenceChange::Country(parse_choice(value)?),
            PreferenceField::Diet => PreferenceChange::Diet(parse_choice(value)?),
            PreferenceField::BudgetLevel => PreferenceChange::BudgetLevel(parse_choice(value)?),
            PreferenceField::PrepTime => {
                if value.trim().is_empty() {
                    PreferenceChange::PrepTime(None)
                } else {
                    PreferenceChange::PrepTime(Some(value.parse()?))
                }
            }
            PreferenceField::PreferredStore => PreferenceChange::PreferredStore(parse_choice(value)?),
        })
    }

    pub fn clear(field: PreferenceField) -> Self {
        match field {
            PreferenceField::Country => PreferenceChange::Country(None),
            PreferenceField::Diet => PreferenceChange::Diet(None),
            PreferenceField::BudgetLevel => PreferenceChange::BudgetLevel(None),
            PreferenceField::PrepTime => PreferenceChange::PrepTime(None),
            PreferenceField::PreferredStore => PreferenceChange::PreferredStore(None),
        }
    }

    pub fn field(&self) -> PreferenceField {
        match self {
            PreferenceChange::Country(_) => PreferenceField::Country,
            PreferenceChange::Diet(_) => PreferenceField::Diet,
            PreferenceChange::BudgetLevel(_) => PreferenceField::BudgetLevel,
            PreferenceChange::PrepTime(_) => PreferenceField::PrepTime,
            PreferenceChange::PreferredStore(_) => PreferenceField::PreferredStore,
        }
    }
}

/// Holds the session's preferences and notifies subscribers on change.
#[derive(Debug)]
pub struct PreferenceStore {
    tx: watch::Sender<Preferences>,
}

impl PreferenceStore {
    pub fn new(initial: Preferences) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn snapshot(&self) -> Preferences {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Preferences> {
        self.tx.subscribe()
    }

    // Subscribers are only woken when the value actually changed.
    pub(crate) fn apply(&self, change: PreferenceChange) -> bool {
        self.tx.send_if_modified(|prefs| prefs.apply(change))
    }
}

impl Default for PreferenceStore {
    fn default() -> Self {
        Self::new(Preferences::session_default())
    }
}
