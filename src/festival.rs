//! Festival domain model: films, screenings, and the ordered screening list
//! that backs the planner.

use chrono::NaiveDateTime;
use log::debug;
use uuid::Uuid;

pub type FilmId = String;
pub type ScreeningId = String;

/// Audience rating for a film, clamped to 0..=10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
pub struct Rating(u8);

impl Rating {
    pub const MAX: u8 = 10;

    pub fn new(value: u8) -> Rating {
        Rating(value.min(Self::MAX))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

// Every way in clamps, including program files with oversized values.
impl<'de> serde::Deserialize<'de> for Rating {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = u8::deserialize(deserializer)?;
        Ok(Rating::new(value))
    }
}

/// A film in the festival program.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Film {
    pub id: FilmId,
    pub title: String,
    pub duration_minutes: u32,
    #[serde(default)]
    pub rating: Option<Rating>,
    /// Synthesized by a combine-titles action rather than read from the program.
    #[serde(default)]
    pub combined: bool,
}

impl Film {
    pub fn new(id: &str, title: &str, duration_minutes: u32) -> Film {
        Film {
            id: id.to_string(),
            title: title.to_string(),
            duration_minutes,
            rating: None,
            combined: false,
        }
    }
}

/// One scheduled showing of a film.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Screening {
    pub id: ScreeningId,
    pub film_id: FilmId,
    /// Name of the screen or venue hall.
    pub screen: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    #[serde(default)]
    pub attending: bool,
    /// Film this screening pointed at before it was combined, if ever.
    #[serde(default)]
    pub combined_from: Option<FilmId>,
}

/// Read-only view of a component's current selection and screening list.
///
/// `current_screening`, when present, is always drawn from `screenings`,
/// and `current_film` is that screening's film. Absence means no selection
/// and is a valid state.
pub trait ScreeningProvider {
    fn current_film(&self) -> Option<&Film>;
    fn current_screening(&self) -> Option<&Screening>;
    fn screenings(&self) -> &[Screening];
}

/// Anything whose display title can be set.
pub trait Titled {
    fn set_title(&mut self, title: &str);
}

/// Failure modes of a combine-titles action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CombineError {
    /// Fewer than two distinct known screenings were named.
    NotEnoughScreenings,
    UnknownScreening(ScreeningId),
}

impl std::fmt::Display for CombineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CombineError::NotEnoughScreenings => {
                write!(f, "combining titles requires at least two screenings")
            }
            CombineError::UnknownScreening(id) => write!(f, "unknown screening id {}", id),
        }
    }
}

impl std::error::Error for CombineError {}

/// Ordered list of screenings with the planner's selection state.
#[derive(Debug, Clone, Default)]
pub struct ScreeningList {
    films: Vec<Film>,
    screenings: Vec<Screening>,
    selected_index: Option<usize>,
}

impl ScreeningList {
    pub fn new() -> ScreeningList {
        ScreeningList::default()
    }

    /// Replace the whole plan with freshly loaded program content.
    /// Clears the selection since row identities changed.
    pub fn set_program(&mut self, films: Vec<Film>, screenings: Vec<Screening>) {
        self.films = films;
        self.screenings = screenings;
        self.selected_index = None;
    }

    pub fn films(&self) -> &[Film] {
        &self.films
    }

    pub fn film(&self, id: &str) -> Option<&Film> {
        self.films.iter().find(|f| f.id == id)
    }

    pub fn num_screenings(&self) -> usize {
        self.screenings.len()
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected_index
    }

    /// Select the screening at `index`. Out-of-range indices are ignored.
    pub fn select(&mut self, index: usize) {
        if index < self.screenings.len() {
            self.selected_index = Some(index);
        } else {
            debug!("select: index {} out of bounds", index);
        }
    }

    pub fn deselect(&mut self) {
        self.selected_index = None;
    }

    /// Set the attendance flag on one screening. Unknown ids are ignored.
    pub fn toggle_attendance(&mut self, id: &str) {
        match self.screenings.iter_mut().find(|s| s.id == id) {
            Some(screening) => screening.attending = !screening.attending,
            None => debug!("toggle_attendance: unknown screening {}", id),
        }
    }

    /// Set the rating on one film. Unknown ids are ignored.
    pub fn rate_film(&mut self, id: &str, rating: Rating) {
        match self.films.iter_mut().find(|f| f.id == id) {
            Some(film) => film.rating = Some(rating),
            None => debug!("rate_film: unknown film {}", id),
        }
    }

    /// Merge the named screenings under one synthesized combination film.
    ///
    /// The new film's title joins each member film's title once, in
    /// screening order. Every named screening is repointed at the new film
    /// and remembers its earliest pre-combine film for a later uncombine.
    pub fn combine_titles(&mut self, screening_ids: &[ScreeningId]) -> Result<FilmId, CombineError> {
        if let Some(missing) = screening_ids
            .iter()
            .find(|id| !self.screenings.iter().any(|s| s.id == **id))
        {
            return Err(CombineError::UnknownScreening(missing.clone()));
        }
        let mut member_indices = Vec::new();
        for (index, screening) in self.screenings.iter().enumerate() {
            if screening_ids.contains(&screening.id) {
                member_indices.push(index);
            }
        }
        if member_indices.len() < 2 {
            return Err(CombineError::NotEnoughScreenings);
        }

        let mut member_film_ids: Vec<FilmId> = Vec::new();
        for index in &member_indices {
            let film_id = &self.screenings[*index].film_id;
            if !member_film_ids.contains(film_id) {
                member_film_ids.push(film_id.clone());
            }
        }

        let mut titles = Vec::new();
        let mut total_minutes = 0u32;
        for film_id in &member_film_ids {
            if let Some(film) = self.film(film_id) {
                titles.push(film.title.clone());
                total_minutes += film.duration_minutes;
            }
        }

        let combined_id = Uuid::new_v4().to_string();
        self.films.push(Film {
            id: combined_id.clone(),
            title: titles.join(" & "),
            duration_minutes: total_minutes,
            rating: None,
            combined: true,
        });

        for index in member_indices {
            let screening = &mut self.screenings[index];
            if screening.combined_from.is_none() {
                screening.combined_from = Some(screening.film_id.clone());
            }
            screening.film_id = combined_id.clone();
        }
        self.drop_orphaned_combination_films();

        Ok(combined_id)
    }

    /// Restore the given screenings to their pre-combine films, in the
    /// given order. Screenings that were never combined are skipped.
    pub fn uncombine_titles(&mut self, screenings: &[Screening]) {
        for requested in screenings {
            let Some(screening) = self.screenings.iter_mut().find(|s| s.id == requested.id)
            else {
                debug!("uncombine_titles: unknown screening {}", requested.id);
                continue;
            };
            if let Some(original) = screening.combined_from.take() {
                screening.film_id = original;
            }
        }
        self.drop_orphaned_combination_films();
    }

    // Program films stay even when unscreened; synthesized ones do not.
    fn drop_orphaned_combination_films(&mut self) {
        let screenings = &self.screenings;
        self.films
            .retain(|film| !film.combined || screenings.iter().any(|s| s.film_id == film.id));
    }
}

impl ScreeningProvider for ScreeningList {
    fn current_film(&self) -> Option<&Film> {
        let screening = self.current_screening()?;
        self.film(&screening.film_id)
    }

    fn current_screening(&self) -> Option<&Screening> {
        self.selected_index.and_then(|i| self.screenings.get(i))
    }

    fn screenings(&self) -> &[Screening] {
        &self.screenings
    }
}
