//! Event store contract
//!
//! The analytics engine only reads. Any backend that can answer
//! [`EventStore::find`] can drive it; [`crate::Database`] is the SQLite
//! implementation.

use crate::error::Result;
use crate::types::Event;
use crate::window::TimeWindow;

/// Category constraint on a query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TypeFilter {
    /// Any category
    #[default]
    Any,
    /// Exactly this category
    Equals(String),
    /// Any of these categories
    In(Vec<String>),
}

impl TypeFilter {
    /// Build an `In` filter from string slices.
    pub fn any_of(categories: &[&str]) -> Self {
        TypeFilter::In(categories.iter().map(|c| c.to_string()).collect())
    }

    pub fn matches(&self, event_type: &str) -> bool {
        match self {
            TypeFilter::Any => true,
            TypeFilter::Equals(category) => category == event_type,
            TypeFilter::In(categories) => categories.iter().any(|c| c == event_type),
        }
    }
}

/// Query parameters for [`EventStore::find`].
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Owner whose events are searched
    pub user_id: String,
    /// Closed window the event's `start_time` must fall in
    pub start_within: Option<TimeWindow>,
    /// Closed window the event's `end_time` must fall in
    pub end_within: Option<TimeWindow>,
    /// Category constraint
    pub event_type: TypeFilter,
    /// Return events ordered by ascending `start_time`
    pub sorted: bool,
}

impl EventFilter {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Default::default()
        }
    }

    pub fn started_within(mut self, window: TimeWindow) -> Self {
        self.start_within = Some(window);
        self
    }

    pub fn ended_within(mut self, window: TimeWindow) -> Self {
        self.end_within = Some(window);
        self
    }

    pub fn of_type(mut self, event_type: TypeFilter) -> Self {
        self.event_type = event_type;
        self
    }

    pub fn sorted(mut self) -> Self {
        self.sorted = true;
        self
    }

    /// In-memory evaluation of the filter against one event.
    ///
    /// An event without a `start_time` never matches a start window.
    pub fn matches(&self, event: &Event) -> bool {
        if event.user_id != self.user_id || !self.event_type.matches(&event.event_type) {
            return false;
        }
        if let Some(window) = &self.start_within {
            match event.start_time {
                Some(start) if window.contains(start) => {}
                _ => return false,
            }
        }
        if let Some(window) = &self.end_within {
            match event.end_time {
                Some(end) if window.contains(end) => {}
                _ => return false,
            }
        }
        true
    }
}

/// Per-category totals produced by [`EventStore::aggregate_by_type`].
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTotals {
    pub event_type: String,
    pub total_hours: f64,
    pub event_count: i64,
}

/// Read-only access to stored events.
pub trait EventStore {
    /// Events matching `filter`, in arbitrary order unless `filter.sorted`.
    fn find(&self, filter: &EventFilter) -> Result<Vec<Event>>;

    /// Group matching events by category, summing hours and counting events.
    ///
    /// Groups come back ordered by total hours descending; equal totals keep
    /// the order in which their category was first seen. Malformed events
    /// add zero hours but still count. The default reduces [`Self::find`]
    /// in memory; backends may push the grouping down.
    fn aggregate_by_type(&self, filter: &EventFilter) -> Result<Vec<CategoryTotals>> {
        let events = self.find(filter)?;
        let mut groups: Vec<CategoryTotals> = Vec::new();

        for event in &events {
            let hours = event.duration_hours();
            match groups.iter_mut().find(|g| g.event_type == event.event_type) {
                Some(group) => {
                    group.total_hours += hours;
                    group.event_count += 1;
                }
                None => groups.push(CategoryTotals {
                    event_type: event.event_type.clone(),
                    total_hours: hours,
                    event_count: 1,
                }),
            }
        }

        // sort_by is stable, so ties keep first-seen order
        groups.sort_by(|a, b| b.total_hours.total_cmp(&a.total_hours));
        Ok(groups)
    }
}

/// A store over an in-memory list of events.
///
/// Insertion order stands in for storage order.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    events: Vec<Event>,
}

impl MemoryStore {
    pub fn new(events: Vec<Event>) -> Self {
        Self { events }
    }

    pub fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventStore for MemoryStore {
    fn find(&self, filter: &EventFilter) -> Result<Vec<Event>> {
        let mut found: Vec<Event> = self
            .events
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        if filter.sorted {
            found.sort_by_key(|e| e.start_time);
        }
        Ok(found)
    }
}
