use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::types::{NewsItem, TimeError};
use crate::utils::{text, time};

/// The TYPE column of a trigger definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerKind {
    Title,
    Description,
    After,
    Before,
    Not,
    And,
    Or,
}

impl TriggerKind {
    /// Number of arguments a definition of this kind takes.
    pub fn arity(&self) -> usize {
        match self {
            TriggerKind::And | TriggerKind::Or => 2,
            _ => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::Title => "TITLE",
            TriggerKind::Description => "DESCRIPTION",
            TriggerKind::After => "AFTER",
            TriggerKind::Before => "BEFORE",
            TriggerKind::Not => "NOT",
            TriggerKind::And => "AND",
            TriggerKind::Or => "OR",
        }
    }

    /// Whether the arguments name other triggers rather than carry values.
    pub fn is_composite(&self) -> bool {
        matches!(self, TriggerKind::Not | TriggerKind::And | TriggerKind::Or)
    }
}

impl FromStr for TriggerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TITLE" => Ok(TriggerKind::Title),
            "DESCRIPTION" => Ok(TriggerKind::Description),
            "AFTER" => Ok(TriggerKind::After),
            "BEFORE" => Ok(TriggerKind::Before),
            "NOT" => Ok(TriggerKind::Not),
            "AND" => Ok(TriggerKind::And),
            "OR" => Ok(TriggerKind::Or),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A boolean rule over a news item.
///
/// Composite variants own their children, so a trigger is a plain tree that
/// can be cloned, shared read-only across threads and evaluated any number
/// of times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Phrase appears as whole words in the title. Stored lowercase.
    Title(String),
    /// Phrase appears as whole words in the description. Stored lowercase.
    Description(String),
    /// Published strictly before the instant.
    Before(DateTime<Utc>),
    /// Published strictly after the instant.
    After(DateTime<Utc>),
    Not(Box<Trigger>),
    And(Box<Trigger>, Box<Trigger>),
    Or(Box<Trigger>, Box<Trigger>),
}

impl Trigger {
    pub fn title(phrase: &str) -> Self {
        Trigger::Title(phrase.to_lowercase())
    }

    pub fn description(phrase: &str) -> Self {
        Trigger::Description(phrase.to_lowercase())
    }

    /// `value` is US Eastern wall-clock time, see [`time::parse_eastern`].
    pub fn before(value: &str) -> Result<Self, TimeError> {
        time::parse_eastern(value).map(Trigger::Before)
    }

    pub fn after(value: &str) -> Result<Self, TimeError> {
        time::parse_eastern(value).map(Trigger::After)
    }

    pub fn not(inner: Trigger) -> Self {
        Trigger::Not(Box::new(inner))
    }

    pub fn and(left: Trigger, right: Trigger) -> Self {
        Trigger::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Trigger, right: Trigger) -> Self {
        Trigger::Or(Box::new(left), Box::new(right))
    }

    pub fn kind(&self) -> TriggerKind {
        match self {
            Trigger::Title(_) => TriggerKind::Title,
            Trigger::Description(_) => TriggerKind::Description,
            Trigger::Before(_) => TriggerKind::Before,
            Trigger::After(_) => TriggerKind::After,
            Trigger::Not(_) => TriggerKind::Not,
            Trigger::And(..) => TriggerKind::And,
            Trigger::Or(..) => TriggerKind::Or,
        }
    }

    /// Returns true if the item should raise an alert.
    pub fn evaluate(&self, item: &NewsItem) -> bool {
        match self {
            Trigger::Title(phrase) => text::matches_as_word(&item.title, phrase),
            Trigger::Description(phrase) => text::matches_as_word(&item.description, phrase),
            Trigger::Before(threshold) => item.published_at < *threshold,
            Trigger::After(threshold) => item.published_at > *threshold,
            Trigger::Not(inner) => !inner.evaluate(item),
            Trigger::And(left, right) => left.evaluate(item) && right.evaluate(item),
            Trigger::Or(left, right) => left.evaluate(item) || right.evaluate(item),
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Title(phrase) | Trigger::Description(phrase) => {
                write!(f, "{}({:?})", self.kind(), phrase)
            }
            Trigger::Before(instant) | Trigger::After(instant) => {
                write!(f, "{}({} ET)", self.kind(), time::format_eastern(instant))
            }
            Trigger::Not(inner) => write!(f, "NOT({})", inner),
            Trigger::And(left, right) | Trigger::Or(left, right) => {
                write!(f, "{}({}, {})", self.kind(), left, right)
            }
        }
    }
}

/// The ordered list of activated triggers.
///
/// Duplicates are kept. An item passes if any trigger in the list fires.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerList {
    triggers: Vec<Trigger>,
}

impl TriggerList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, trigger: Trigger) {
        self.triggers.push(trigger);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Trigger> {
        self.triggers.iter()
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    /// True as soon as one trigger accepts the item, in list order.
    pub fn fires(&self, item: &NewsItem) -> bool {
        self.triggers.iter().any(|trigger| trigger.evaluate(item))
    }
}

impl From<Vec<Trigger>> for TriggerList {
    fn from(triggers: Vec<Trigger>) -> Self {
        Self { triggers }
    }
}

impl FromIterator<Trigger> for TriggerList {
    fn from_iter<I: IntoIterator<Item = Trigger>>(iter: I) -> Self {
        Self {
            triggers: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a TriggerList {
    type Item = &'a Trigger;
    type IntoIter = std::slice::Iter<'a, Trigger>;

    fn into_iter(self) -> Self::IntoIter {
        self.triggers.iter()
    }
}
