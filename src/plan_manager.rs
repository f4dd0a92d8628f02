//! Planner thread: owns the screening list, persists mutations, and
//! broadcasts plan snapshots over the bus.

use std::path::Path;

use log::{debug, error, info, warn};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::{Receiver, Sender};

use crate::{
    config::Config,
    db_manager::DbManager,
    festival::{FilmId, Rating, ScreeningId, ScreeningList, ScreeningProvider},
    program_loader,
    protocol::{self, PlanSnapshot, UncombineTitlesRequest},
};

pub struct PlanManager {
    screening_list: ScreeningList,
    config: Config,
    bus_consumer: Receiver<protocol::Message>,
    bus_producer: Sender<protocol::Message>,
    db_manager: DbManager,
}

impl PlanManager {
    pub fn new(
        screening_list: ScreeningList,
        bus_consumer: Receiver<protocol::Message>,
        bus_producer: Sender<protocol::Message>,
        db_manager: DbManager,
    ) -> Self {
        Self {
            screening_list,
            config: Config::default(),
            bus_consumer,
            bus_producer,
            db_manager,
        }
    }

    pub fn run(&mut self) {
        match self.db_manager.load_plan() {
            Ok((films, screenings)) => {
                if !screenings.is_empty() {
                    info!(
                        "Restoring plan from database: {} films, {} screenings",
                        films.len(),
                        screenings.len()
                    );
                }
                self.screening_list.set_program(films, screenings);
                self.broadcast_plan_changed();
            }
            Err(e) => {
                error!("Failed to restore plan from database: {}", e);
            }
        }

        loop {
            match self.bus_consumer.blocking_recv() {
                Ok(protocol::Message::Shutdown) => {
                    debug!("PlanManager: Shutting down");
                    break;
                }
                Ok(protocol::Message::Plan(message)) => self.handle_plan_message(message),
                Ok(protocol::Message::Config(protocol::ConfigMessage::ConfigChanged(config))) => {
                    self.handle_config_changed(config);
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!("PlanManager: Bus receiver lagged, skipped {}", skipped);
                }
                Err(RecvError::Closed) => {
                    debug!("PlanManager: Bus closed, exiting");
                    break;
                }
            }
        }
    }

    fn handle_plan_message(&mut self, message: protocol::PlanMessage) {
        match message {
            protocol::PlanMessage::LoadProgram(path) => {
                debug!("PlanManager: Loading program {:?}", path);
                self.load_program(&path);
            }
            protocol::PlanMessage::SelectScreening(index) => {
                self.screening_list.select(index);
                self.broadcast_plan_changed();
            }
            protocol::PlanMessage::DeselectAll => {
                self.screening_list.deselect();
                self.broadcast_plan_changed();
            }
            protocol::PlanMessage::CombineTitles { screening_ids } => {
                self.combine_titles(&screening_ids);
            }
            protocol::PlanMessage::UncombineTitles(request) => {
                self.uncombine_titles(&request);
            }
            protocol::PlanMessage::ToggleAttendance(id) => {
                self.screening_list.toggle_attendance(&id);
                if let Some(screening) =
                    self.screening_list.screenings().iter().find(|s| s.id == id)
                {
                    let attending = screening.attending;
                    if self.config.planner.autosave {
                        if let Err(e) = self.db_manager.update_attendance(&id, attending) {
                            error!("Failed to persist attendance for {}: {}", id, e);
                        }
                    }
                }
                self.broadcast_plan_changed();
            }
            protocol::PlanMessage::RateFilm { film_id, rating } => {
                self.rate_film(&film_id, rating);
            }
            // Notifications we emit ourselves.
            protocol::PlanMessage::PlanChanged(_)
            | protocol::PlanMessage::ProgramLoaded { .. }
            | protocol::PlanMessage::ProgramLoadFailed(_) => {}
        }
    }

    fn handle_config_changed(&mut self, config: Config) {
        let program_file = config.program.program_file.clone();
        self.config = config;
        if self.screening_list.num_screenings() == 0 && !program_file.is_empty() {
            info!("Plan is empty, loading configured program {}", program_file);
            self.load_program(Path::new(&program_file));
        }
    }

    fn load_program(&mut self, path: &Path) {
        match program_loader::load_program(path) {
            Ok((films, screenings)) => {
                let film_count = films.len();
                let screening_count = screenings.len();
                if let Err(e) = self.db_manager.replace_plan(&films, &screenings) {
                    error!("Failed to persist loaded program: {}", e);
                }
                self.screening_list.set_program(films, screenings);
                let _ = self.bus_producer.send(protocol::Message::Plan(
                    protocol::PlanMessage::ProgramLoaded {
                        film_count,
                        screening_count,
                    },
                ));
                self.broadcast_plan_changed();
            }
            Err(e) => {
                error!("Failed to load program {:?}: {}", path, e);
                let _ = self.bus_producer.send(protocol::Message::Plan(
                    protocol::PlanMessage::ProgramLoadFailed(e.to_string()),
                ));
            }
        }
    }

    fn combine_titles(&mut self, screening_ids: &[ScreeningId]) {
        let combined_before = self.combined_film_ids();
        match self.screening_list.combine_titles(screening_ids) {
            Ok(combined_id) => {
                info!(
                    "Combined {} screenings under film {}",
                    screening_ids.len(),
                    combined_id
                );
                if self.config.planner.autosave {
                    self.persist_combine_result(&combined_before, Some(&combined_id));
                }
                self.broadcast_plan_changed();
            }
            Err(e) => {
                error!("Combine titles failed: {}", e);
            }
        }
    }

    fn uncombine_titles(&mut self, request: &UncombineTitlesRequest) {
        let combined_before = self.combined_film_ids();
        self.screening_list.uncombine_titles(request.screenings());
        info!(
            "Uncombined {} screenings",
            request.screenings().len()
        );
        if self.config.planner.autosave {
            self.persist_combine_result(&combined_before, None);
            for requested in request.screenings() {
                if let Some(screening) = self
                    .screening_list
                    .screenings()
                    .iter()
                    .find(|s| s.id == requested.id)
                {
                    if let Err(e) = self.db_manager.update_screening_film(screening) {
                        error!("Failed to persist screening {}: {}", screening.id, e);
                    }
                }
            }
        }
        self.broadcast_plan_changed();
    }

    /// Persist the film-table delta of a combine or uncombine: insert the
    /// new combination film (if any), repoint its screenings, and delete
    /// combination films that lost their last screening.
    fn persist_combine_result(&self, combined_before: &[FilmId], new_film_id: Option<&FilmId>) {
        if let Some(film_id) = new_film_id {
            if let Some(film) = self.screening_list.film(film_id) {
                if let Err(e) = self.db_manager.insert_film(film) {
                    error!("Failed to persist combined film {}: {}", film_id, e);
                }
            }
            for screening in self
                .screening_list
                .screenings()
                .iter()
                .filter(|s| s.film_id == *film_id)
            {
                if let Err(e) = self.db_manager.update_screening_film(screening) {
                    error!("Failed to persist screening {}: {}", screening.id, e);
                }
            }
        }
        for dropped in combined_before
            .iter()
            .filter(|id| self.screening_list.film(id).is_none())
        {
            if let Err(e) = self.db_manager.delete_film(dropped) {
                error!("Failed to delete combined film {}: {}", dropped, e);
            }
        }
    }

    fn combined_film_ids(&self) -> Vec<FilmId> {
        self.screening_list
            .films()
            .iter()
            .filter(|f| f.combined)
            .map(|f| f.id.clone())
            .collect()
    }

    fn rate_film(&mut self, film_id: &str, rating: Rating) {
        self.screening_list.rate_film(film_id, rating);
        if self.config.planner.autosave && self.screening_list.film(film_id).is_some() {
            if let Err(e) = self.db_manager.update_rating(film_id, rating) {
                error!("Failed to persist rating for {}: {}", film_id, e);
            }
        }
        self.broadcast_plan_changed();
    }

    fn broadcast_plan_changed(&self) {
        let snapshot = PlanSnapshot {
            screenings: self.screening_list.screenings().to_vec(),
            films: self.screening_list.films().to_vec(),
            selected_index: self.screening_list.selected_index(),
        };
        let _ = self
            .bus_producer
            .send(protocol::Message::Plan(protocol::PlanMessage::PlanChanged(
                snapshot,
            )));
    }
}
