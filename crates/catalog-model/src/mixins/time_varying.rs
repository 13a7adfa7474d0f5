use std::sync::Arc;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use wms_common::time::{current_index, parse_iso8601};
use wms_common::DiscreteTime;

use crate::model::BaseModel;
use crate::traits::{ModelTraits, TraitDefinition, TraitLayer};

static DISCRETE_TIME_TRAITS: Lazy<Arc<ModelTraits>> = Lazy::new(|| {
    ModelTraits::object(
        "DiscreteTimeTraits",
        vec![
            TraitDefinition::string("time", "The date and time, in ISO8601 format."),
            TraitDefinition::string("tag", "The value sent to the server for this time."),
        ],
    )
});

pub struct TimeVaryingTraits;

impl TraitLayer for TimeVaryingTraits {
    const NAME: &'static str = "TimeVaryingTraits";

    fn definitions() -> Vec<TraitDefinition> {
        vec![
            TraitDefinition::string(
                "currentTime",
                "The current time at which to show this dataset.",
            ),
            TraitDefinition::composite_array(
                "discreteTimes",
                "The discrete times at which this dataset is available.",
                Arc::clone(&DISCRETE_TIME_TRAITS),
            ),
        ]
    }
}

pub trait TimeVaryingMixin: BaseModel {
    /// Available times, oldest first.
    fn discrete_times(&self) -> Vec<DiscreteTime> {
        let mut times: Vec<DiscreteTime> =
            self.model().get_as("discreteTimes").unwrap_or_default();
        times.sort_by(|a, b| a.time.cmp(&b.time));
        times
    }

    fn current_time(&self) -> Option<DateTime<Utc>> {
        parse_iso8601(&self.model().get_string("currentTime")?).ok()
    }

    fn is_time_varying(&self) -> bool {
        !self.discrete_times().is_empty()
    }

    /// Latest available time not after `currentTime`; the latest overall when
    /// `currentTime` is unset.
    fn current_discrete_time(&self) -> Option<DiscreteTime> {
        let times = self.discrete_times();
        let index = current_index(&times, self.current_time().as_ref())?;
        times.into_iter().nth(index)
    }

    /// The time after the current one, for prefetching.
    fn next_discrete_time(&self) -> Option<DiscreteTime> {
        let times = self.discrete_times();
        let index = current_index(&times, self.current_time().as_ref())?;
        times.into_iter().nth(index + 1)
    }
}
