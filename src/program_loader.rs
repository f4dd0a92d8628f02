//! Festival program file ingest.
//!
//! A program file is a JSON document with `films` and `screenings` arrays.
//! Screening times use `YYYY-MM-DDTHH:MM:SS` (chrono's `NaiveDateTime`
//! default format).

use std::path::Path;

use log::info;

use crate::festival::{Film, Screening};

/// A festival program as stored on disk.
#[derive(Debug, serde::Deserialize)]
pub struct ProgramFile {
    pub films: Vec<Film>,
    pub screenings: Vec<Screening>,
}

#[derive(Debug)]
pub enum ProgramError {
    Io(std::io::Error),
    Json(serde_json::Error),
    DuplicateFilm(String),
    DuplicateScreening(String),
    /// A screening references a film id the program does not define.
    UnknownFilm {
        screening_id: String,
        film_id: String,
    },
    /// A screening ends at or before its start.
    InvalidTimes(String),
}

impl std::fmt::Display for ProgramError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProgramError::Io(e) => write!(f, "failed to read program file: {}", e),
            ProgramError::Json(e) => write!(f, "failed to parse program file: {}", e),
            ProgramError::DuplicateFilm(id) => write!(f, "duplicate film id {}", id),
            ProgramError::DuplicateScreening(id) => write!(f, "duplicate screening id {}", id),
            ProgramError::UnknownFilm {
                screening_id,
                film_id,
            } => write!(
                f,
                "screening {} references unknown film {}",
                screening_id, film_id
            ),
            ProgramError::InvalidTimes(id) => {
                write!(f, "screening {} does not end after it starts", id)
            }
        }
    }
}

impl std::error::Error for ProgramError {}

impl From<std::io::Error> for ProgramError {
    fn from(e: std::io::Error) -> Self {
        ProgramError::Io(e)
    }
}

impl From<serde_json::Error> for ProgramError {
    fn from(e: serde_json::Error) -> Self {
        ProgramError::Json(e)
    }
}

/// Read and validate a program file, returning films and screenings in
/// program order.
pub fn load_program(path: &Path) -> Result<(Vec<Film>, Vec<Screening>), ProgramError> {
    let content = std::fs::read_to_string(path)?;
    let program: ProgramFile = serde_json::from_str(&content)?;
    validate_program(&program)?;
    info!(
        "Loaded program from {}: {} films, {} screenings",
        path.display(),
        program.films.len(),
        program.screenings.len()
    );
    Ok((program.films, program.screenings))
}

fn validate_program(program: &ProgramFile) -> Result<(), ProgramError> {
    for (index, film) in program.films.iter().enumerate() {
        if program.films[..index].iter().any(|f| f.id == film.id) {
            return Err(ProgramError::DuplicateFilm(film.id.clone()));
        }
    }
    for (index, screening) in program.screenings.iter().enumerate() {
        if program.screenings[..index]
            .iter()
            .any(|s| s.id == screening.id)
        {
            return Err(ProgramError::DuplicateScreening(screening.id.clone()));
        }
        if !program.films.iter().any(|f| f.id == screening.film_id) {
            return Err(ProgramError::UnknownFilm {
                screening_id: screening.id.clone(),
                film_id: screening.film_id.clone(),
            });
        }
        if screening.end <= screening.start {
            return Err(ProgramError::InvalidTimes(screening.id.clone()));
        }
    }
    Ok(())
}
