//! Event-bus protocol shared by all runtime components.
//!
//! This module defines all message payloads exchanged between the planner
//! logic, the view model, and runtime configuration handlers.

use std::path::PathBuf;

use crate::config::Config;
use crate::festival::{Film, FilmId, Rating, Screening, ScreeningId};

/// Top-level envelope for all bus traffic.
#[derive(Debug, Clone)]
pub enum Message {
    Plan(PlanMessage),
    View(ViewMessage),
    Config(ConfigMessage),
    /// Cooperative termination request for all manager threads.
    Shutdown,
}

/// Ordered batch of screenings being split back into standalone entries.
///
/// Built once per triggering action and consumed by the planner; the
/// screenings are carried exactly as given, same order, same identities.
#[derive(Debug, Clone)]
pub struct UncombineTitlesRequest {
    screenings: Vec<Screening>,
}

impl UncombineTitlesRequest {
    pub fn new(screenings: Vec<Screening>) -> Self {
        Self { screenings }
    }

    pub fn screenings(&self) -> &[Screening] {
        &self.screenings
    }
}

/// Planner-domain commands and notifications.
#[derive(Debug, Clone)]
pub enum PlanMessage {
    /// Load a festival program file, replacing the current plan.
    LoadProgram(PathBuf),
    ProgramLoaded {
        film_count: usize,
        screening_count: usize,
    },
    ProgramLoadFailed(String),
    /// UI requested selection of a currently rendered screening row.
    SelectScreening(usize),
    DeselectAll,
    /// Merge the named screenings under one synthesized combination film.
    CombineTitles {
        screening_ids: Vec<ScreeningId>,
    },
    /// Restore the carried screenings to their pre-combine films.
    UncombineTitles(UncombineTitlesRequest),
    ToggleAttendance(ScreeningId),
    RateFilm {
        film_id: FilmId,
        rating: Rating,
    },
    /// Full plan state, broadcast after restore and after every mutation.
    PlanChanged(PlanSnapshot),
}

/// Point-in-time view of the plan as the planner reports it.
#[derive(Debug, Clone, Default)]
pub struct PlanSnapshot {
    /// Screenings in display order.
    pub screenings: Vec<Screening>,
    /// Films referenced by the screenings above.
    pub films: Vec<Film>,
    /// Selected row in `screenings`, if any.
    pub selected_index: Option<usize>,
}

impl PlanSnapshot {
    /// Selected screening, when the selection is set and in range.
    pub fn current_screening(&self) -> Option<&Screening> {
        self.selected_index.and_then(|i| self.screenings.get(i))
    }

    /// Film of the selected screening.
    pub fn current_film(&self) -> Option<&Film> {
        let screening = self.current_screening()?;
        self.films.iter().find(|f| f.id == screening.film_id)
    }
}

/// View-model notifications.
#[derive(Debug, Clone)]
pub enum ViewMessage {
    WindowTitleChanged(String),
    RowsChanged(usize),
}

/// Runtime configuration updates.
#[derive(Debug, Clone)]
pub enum ConfigMessage {
    ConfigChanged(Config),
}
