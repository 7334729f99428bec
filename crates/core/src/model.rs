use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Anything mirrored in a [`crate::state::CollectionState`] is keyed by its own id.
pub trait Entity {
    fn id(&self) -> &str;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum WeekDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl WeekDay {
    pub const ALL: [WeekDay; 7] = [
        WeekDay::Monday,
        WeekDay::Tuesday,
        WeekDay::Wednesday,
        WeekDay::Thursday,
        WeekDay::Friday,
        WeekDay::Saturday,
        WeekDay::Sunday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WeekDay::Monday => "monday",
            WeekDay::Tuesday => "tuesday",
            WeekDay::Wednesday => "wednesday",
            WeekDay::Thursday => "thursday",
            WeekDay::Friday => "friday",
            WeekDay::Saturday => "saturday",
            WeekDay::Sunday => "sunday",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            WeekDay::Monday => "Monday",
            WeekDay::Tuesday => "Tuesday",
            WeekDay::Wednesday => "Wednesday",
            WeekDay::Thursday => "Thursday",
            WeekDay::Friday => "Friday",
            WeekDay::Saturday => "Saturday",
            WeekDay::Sunday => "Sunday",
        }
    }
}

impl fmt::Display for WeekDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WeekDay {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monday" | "mon" => Ok(WeekDay::Monday),
            "tuesday" | "tue" => Ok(WeekDay::Tuesday),
            "wednesday" | "wed" => Ok(WeekDay::Wednesday),
            "thursday" | "thu" => Ok(WeekDay::Thursday),
            "friday" | "fri" => Ok(WeekDay::Friday),
            "saturday" | "sat" => Ok(WeekDay::Saturday),
            "sunday" | "sun" => Ok(WeekDay::Sunday),
            other => Err(anyhow!(
                "Unknown day '{}': expected monday|tuesday|wednesday|thursday|friday|saturday|sunday",
                other
            )),
        }
    }
}

impl ValueEnum for WeekDay {
    fn value_variants<'a>() -> &'a [Self] {
        &Self::ALL
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        let name = self.as_str();
        Some(clap::builder::PossibleValue::new(name).alias(&name[..3]))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TimeBlock {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeBlock {
    pub const ALL: [TimeBlock; 4] = [
        TimeBlock::Morning,
        TimeBlock::Afternoon,
        TimeBlock::Evening,
        TimeBlock::Night,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeBlock::Morning => "morning",
            TimeBlock::Afternoon => "afternoon",
            TimeBlock::Evening => "evening",
            TimeBlock::Night => "night",
        }
    }
}

impl fmt::Display for TimeBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TimeBlock {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "morning" | "am" => Ok(TimeBlock::Morning),
            "afternoon" => Ok(TimeBlock::Afternoon),
            "evening" | "pm" => Ok(TimeBlock::Evening),
            "night" => Ok(TimeBlock::Night),
            other => Err(anyhow!(
                "Unknown time block '{}': expected morning|afternoon|evening|night",
                other
            )),
        }
    }
}

impl ValueEnum for TimeBlock {
    fn value_variants<'a>() -> &'a [Self] {
        &Self::ALL
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.as_str()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Entity for Note {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoutineItem {
    pub id: String,
    pub title: String,
    pub day: WeekDay,
    pub time_block: TimeBlock,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub notes: Vec<Note>,
}

impl Entity for RoutineItem {
    fn id(&self) -> &str {
        &self.id
    }
}

impl RoutineItem {
    /// Display order inside the weekly grid: day, block, time range, then title.
    pub fn display_cmp(&self, other: &Self) -> Ordering {
        self.day
            .cmp(&other.day)
            .then(self.time_block.cmp(&other.time_block))
            .then_with(|| self.time_range.cmp(&other.time_range))
            .then_with(|| self.title.cmp(&other.title))
            .then_with(|| self.id.cmp(&other.id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRoutineItem {
    pub title: String,
    pub day: WeekDay,
    pub time_block: TimeBlock,
    pub completed: bool,
    pub time_range: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub emoji: Option<String>,
    pub color: Option<String>,
}

impl NewRoutineItem {
    pub fn new(day: WeekDay, time_block: TimeBlock, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            day,
            time_block,
            completed: false,
            time_range: None,
            description: None,
            category: None,
            emoji: None,
            color: None,
        }
    }

    pub fn normalized(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            time_range: non_blank(self.time_range),
            description: non_blank(self.description),
            category: non_blank(self.category),
            emoji: non_blank(self.emoji),
            color: non_blank(self.color),
            ..self
        }
    }
}

/// The mutable fields of a [`RoutineItem`]. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutineItemUpdate {
    pub title: Option<String>,
    pub day: Option<WeekDay>,
    pub time_block: Option<TimeBlock>,
    pub time_range: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub emoji: Option<String>,
    pub color: Option<String>,
    pub completed: Option<bool>,
}

impl RoutineItemUpdate {
    pub fn completion(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    /// Blank strings are never written remotely, so they must not be merged locally either.
    pub fn normalized(self) -> Self {
        Self {
            title: non_blank(self.title),
            time_range: non_blank(self.time_range),
            description: non_blank(self.description),
            category: non_blank(self.category),
            emoji: non_blank(self.emoji),
            color: non_blank(self.color),
            ..self
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn apply_to(&self, item: &mut RoutineItem) {
        if let Some(title) = &self.title {
            item.title = title.clone();
        }
        if let Some(day) = self.day {
            item.day = day;
        }
        if let Some(time_block) = self.time_block {
            item.time_block = time_block;
        }
        if let Some(time_range) = &self.time_range {
            item.time_range = Some(time_range.clone());
        }
        if let Some(description) = &self.description {
            item.description = Some(description.clone());
        }
        if let Some(category) = &self.category {
            item.category = Some(category.clone());
        }
        if let Some(emoji) = &self.emoji {
            item.emoji = Some(emoji.clone());
        }
        if let Some(color) = &self.color {
            item.color = Some(color.clone());
        }
        if let Some(completed) = self.completed {
            item.completed = completed;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub date: String,
    pub read_time: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Entity for BlogPost {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBlogPost {
    pub title: String,
    pub description: String,
    pub content: String,
    pub date: String,
    pub read_time: String,
    pub author: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlogPostUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub date: Option<String>,
    pub read_time: Option<String>,
    pub author: Option<String>,
    pub image: Option<String>,
}

impl BlogPostUpdate {
    pub fn normalized(self) -> Self {
        Self {
            title: non_blank(self.title),
            description: non_blank(self.description),
            content: non_blank(self.content),
            date: non_blank(self.date),
            read_time: non_blank(self.read_time),
            author: non_blank(self.author),
            image: non_blank(self.image),
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn apply_to(&self, post: &mut BlogPost) {
        if let Some(title) = &self.title {
            post.title = title.clone();
        }
        if let Some(description) = &self.description {
            post.description = description.clone();
        }
        if let Some(content) = &self.content {
            post.content = content.clone();
        }
        if let Some(date) = &self.date {
            post.date = date.clone();
        }
        if let Some(read_time) = &self.read_time {
            post.read_time = read_time.clone();
        }
        if let Some(author) = &self.author {
            post.author = author.clone();
        }
        if let Some(image) = &self.image {
            post.image = Some(image.clone());
        }
    }
}

/// Listing filter for routine items; every unset field matches everything.
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub day: Option<WeekDay>,
    pub time_block: Option<TimeBlock>,
    pub category: Option<String>,
    pub completed: Option<bool>,
}

impl ItemFilter {
    pub fn matches(&self, item: &RoutineItem) -> bool {
        if self.day.is_some_and(|day| day != item.day) {
            return false;
        }
        if self
            .time_block
            .is_some_and(|block| block != item.time_block)
        {
            return false;
        }
        if let Some(category) = &self.category {
            let matches_category = item
                .category
                .as_deref()
                .is_some_and(|value| value.eq_ignore_ascii_case(category.trim()));
            if !matches_category {
                return false;
            }
        }
        if self.completed.is_some_and(|done| done != item.completed) {
            return false;
        }
        true
    }
}

#[derive(Clone, Copy)]
pub struct DefaultSeed {
    pub title: &'static str,
    pub day: WeekDay,
    pub time_block: TimeBlock,
}

/// Seeded into an empty local store on first run.
pub const DEFAULT_ROUTINE_ITEMS: &[DefaultSeed] = &[
    DefaultSeed {
        title: "Morning Exercise",
        day: WeekDay::Monday,
        time_block: TimeBlock::Morning,
    },
    DefaultSeed {
        title: "Team Meeting",
        day: WeekDay::Monday,
        time_block: TimeBlock::Afternoon,
    },
    DefaultSeed {
        title: "JavaScript Learning",
        day: WeekDay::Tuesday,
        time_block: TimeBlock::Morning,
    },
    DefaultSeed {
        title: "Cook Dinner",
        day: WeekDay::Wednesday,
        time_block: TimeBlock::Evening,
    },
    DefaultSeed {
        title: "Weekly Review",
        day: WeekDay::Friday,
        time_block: TimeBlock::Afternoon,
    },
    DefaultSeed {
        title: "Weekend Hike",
        day: WeekDay::Saturday,
        time_block: TimeBlock::Morning,
    },
];

impl DefaultSeed {
    pub fn to_new_item(self) -> NewRoutineItem {
        NewRoutineItem::new(self.day, self.time_block, self.title)
    }
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn item(id: &str, day: WeekDay, block: TimeBlock) -> RoutineItem {
        RoutineItem {
            id: id.to_string(),
            title: format!("Item {id}"),
            day,
            time_block: block,
            completed: false,
            time_range: None,
            description: None,
            category: None,
            emoji: None,
            color: None,
            notes: Vec::new(),
        }
    }

    #[rstest]
    #[case("monday", WeekDay::Monday)]
    #[case("Wed", WeekDay::Wednesday)]
    #[case(" SUNDAY ", WeekDay::Sunday)]
    fn parses_week_days(#[case] raw: &str, #[case] expected: WeekDay) {
        assert_eq!(raw.parse::<WeekDay>().unwrap(), expected);
    }

    #[test]
    fn rejects_unknown_time_block() {
        let err = "brunch".parse::<TimeBlock>().unwrap_err();
        assert!(err.to_string().contains("Unknown time block 'brunch'"));
    }

    #[test]
    fn normalized_update_drops_blank_strings() {
        let update = RoutineItemUpdate {
            title: Some("  Stretch  ".into()),
            description: Some("   ".into()),
            category: Some(String::new()),
            ..RoutineItemUpdate::default()
        }
        .normalized();

        assert_eq!(update.title.as_deref(), Some("Stretch"));
        assert!(update.description.is_none());
        assert!(update.category.is_none());
    }

    #[test]
    fn update_applies_only_set_fields() {
        let mut target = item("a", WeekDay::Monday, TimeBlock::Morning);
        target.description = Some("keep me".into());
        let update = RoutineItemUpdate {
            time_block: Some(TimeBlock::Night),
            emoji: Some("🌙".into()),
            completed: Some(true),
            ..RoutineItemUpdate::default()
        };

        update.apply_to(&mut target);

        assert_eq!(target.id, "a");
        assert_eq!(target.time_block, TimeBlock::Night);
        assert_eq!(target.emoji.as_deref(), Some("🌙"));
        assert_eq!(target.description.as_deref(), Some("keep me"));
        assert!(target.completed);
    }

    #[test]
    fn filter_matches_category_case_insensitively() {
        let mut health = item("a", WeekDay::Monday, TimeBlock::Morning);
        health.category = Some("Health".into());
        let other = item("b", WeekDay::Monday, TimeBlock::Morning);

        let filter = ItemFilter {
            category: Some("health".into()),
            ..ItemFilter::default()
        };
        assert!(filter.matches(&health));
        assert!(!filter.matches(&other));
    }

    #[test]
    fn display_order_follows_week_then_block() {
        let mut items = vec![
            item("c", WeekDay::Tuesday, TimeBlock::Morning),
            item("b", WeekDay::Monday, TimeBlock::Night),
            item("a", WeekDay::Monday, TimeBlock::Morning),
        ];
        items.sort_by(|a, b| a.display_cmp(b));
        let ids: Vec<&str> = items.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn routine_item_serializes_camel_case() {
        let mut target = item("a", WeekDay::Friday, TimeBlock::Evening);
        target.time_range = Some("18:00-19:00".into());
        let value = serde_json::to_value(&target).unwrap();
        assert_eq!(value["timeBlock"], "evening");
        assert_eq!(value["timeRange"], "18:00-19:00");
        assert!(value.get("emoji").is_none());
    }
}
