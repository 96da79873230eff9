//! Calendar domain models.
//!
//! Provides the definition types a calendar is built from and the
//! recurrence rules that expand repeating intervals.
//!
//! # Domain Mappings
//!
//! | u-calendar | Project planning | Manufacturing | Healthcare |
//! |------------|------------------|---------------|------------|
//! | CalendarDefinition | Project calendar | Plant calendar | Ward roster |
//! | Static interval | Holiday | Maintenance stop | Closure day |
//! | Recurrent interval | Working hours | Shift | Clinic hours |
//! | Parent calendar | Company calendar | Site calendar | Hospital calendar |

mod calendar;
mod recurrence;
mod time_zone;

pub use calendar::{
    CalendarDefinition, CalendarInterval, IntervalKind, TimeWindow, DEPTH_PRIORITY_STEP,
};
pub use recurrence::{EndSchedule, Frequency, RecurrenceRule};
pub use time_zone::{from_millis, saturating_add, to_millis, TimeZone};

pub(crate) use time_zone::convert as convert_time_zone;
