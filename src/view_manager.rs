//! Table view model: display rows, selection mirror, and window title.
//!
//! Consumes plan snapshots from the bus and rebuilds what a table-based
//! frontend would render. No rendering happens here; the frontend reads
//! the rows and title, this module keeps them consistent with the plan.

use log::{debug, warn};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::{Receiver, Sender};

use crate::{
    config::{Config, APP_TITLE},
    festival::{Film, Screening, ScreeningProvider, Titled},
    protocol::{self, PlanSnapshot},
};

/// Window chrome state owned by the view model.
#[derive(Debug, Clone, Default)]
pub struct WindowChrome {
    title: String,
}

impl WindowChrome {
    pub fn title(&self) -> &str {
        &self.title
    }
}

impl Titled for WindowChrome {
    fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }
}

/// One rendered screening row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreeningRow {
    pub film_title: String,
    pub screen: String,
    pub day: String,
    pub time: String,
    pub attending: bool,
    /// Empty when the film is unrated or the ratings column is hidden.
    pub rating: String,
}

pub struct ViewManager {
    bus_receiver: Receiver<protocol::Message>,
    bus_sender: Sender<protocol::Message>,
    config: Config,
    snapshot: PlanSnapshot,
    rows: Vec<ScreeningRow>,
    chrome: WindowChrome,
}

impl ViewManager {
    pub fn new(
        bus_receiver: Receiver<protocol::Message>,
        bus_sender: Sender<protocol::Message>,
    ) -> Self {
        let mut chrome = WindowChrome::default();
        chrome.set_title(APP_TITLE);
        Self {
            bus_receiver,
            bus_sender,
            config: Config::default(),
            snapshot: PlanSnapshot::default(),
            rows: Vec::new(),
            chrome,
        }
    }

    pub fn run(&mut self) {
        loop {
            match self.bus_receiver.blocking_recv() {
                Ok(protocol::Message::Shutdown) => {
                    debug!("ViewManager: Shutting down");
                    break;
                }
                Ok(protocol::Message::Plan(protocol::PlanMessage::PlanChanged(snapshot))) => {
                    self.apply_snapshot(snapshot);
                }
                Ok(protocol::Message::Config(protocol::ConfigMessage::ConfigChanged(config))) => {
                    self.config = config;
                    self.rebuild();
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!("ViewManager: Bus receiver lagged, skipped {}", skipped);
                }
                Err(RecvError::Closed) => {
                    debug!("ViewManager: Bus closed, exiting");
                    break;
                }
            }
        }
    }

    pub fn rows(&self) -> &[ScreeningRow] {
        &self.rows
    }

    pub fn window_title(&self) -> &str {
        self.chrome.title()
    }

    fn apply_snapshot(&mut self, snapshot: PlanSnapshot) {
        self.snapshot = snapshot;
        self.rebuild();
    }

    fn rebuild(&mut self) {
        let rows: Vec<ScreeningRow> = self
            .snapshot
            .screenings
            .iter()
            .map(|screening| self.build_row(screening))
            .collect();
        self.rows = rows;
        let _ = self.bus_sender.send(protocol::Message::View(
            protocol::ViewMessage::RowsChanged(self.rows.len()),
        ));

        let title = match self.snapshot.current_film() {
            Some(film) => self
                .config
                .ui
                .window_title_template
                .replace("{film}", &film.title),
            None => APP_TITLE.to_string(),
        };
        if title != self.chrome.title() {
            self.chrome.set_title(&title);
            let _ = self.bus_sender.send(protocol::Message::View(
                protocol::ViewMessage::WindowTitleChanged(title),
            ));
        }
    }

    fn build_row(&self, screening: &Screening) -> ScreeningRow {
        let film = self
            .snapshot
            .films
            .iter()
            .find(|f| f.id == screening.film_id);
        let film_title = film
            .map(|f| f.title.clone())
            .unwrap_or_else(|| screening.film_id.clone());
        let rating = if self.config.ui.show_ratings_column {
            film.and_then(|f| f.rating)
                .map(|r| r.value().to_string())
                .unwrap_or_default()
        } else {
            String::new()
        };
        let time_format = if self.config.ui.use_24_hour_clock {
            "%H:%M"
        } else {
            "%I:%M %p"
        };
        ScreeningRow {
            film_title,
            screen: screening.screen.clone(),
            day: screening.start.format("%a %d %b").to_string(),
            time: format!(
                "{} - {}",
                screening.start.format(time_format),
                screening.end.format(time_format)
            ),
            attending: screening.attending,
            rating,
        }
    }
}

impl ScreeningProvider for ViewManager {
    fn current_film(&self) -> Option<&Film> {
        self.snapshot.current_film()
    }

    fn current_screening(&self) -> Option<&Screening> {
        self.snapshot.current_screening()
    }

    fn screenings(&self) -> &[Screening] {
        &self.snapshot.screenings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::{Duration, Instant};
    use tokio::sync::broadcast::{self, error::TryRecvError};

    use crate::festival::test_support::sample_plan;
    use crate::festival::Rating;

    fn view_manager() -> ViewManager {
        let (bus_sender, _) = broadcast::channel(1024);
        let receiver = bus_sender.subscribe();
        ViewManager::new(receiver, bus_sender)
    }

    fn loaded_snapshot(selected_index: Option<usize>) -> PlanSnapshot {
        let (films, screenings) = sample_plan();
        PlanSnapshot {
            screenings,
            films,
            selected_index,
        }
    }

    #[test]
    fn test_set_title_is_reflected_by_chrome() {
        let mut chrome = WindowChrome::default();
        chrome.set_title("Opening Night");
        assert_eq!(chrome.title(), "Opening Night");
    }

    #[test]
    fn test_window_title_tracks_current_film() {
        let mut manager = view_manager();
        manager.apply_snapshot(loaded_snapshot(Some(1)));
        assert_eq!(manager.window_title(), "Festival Planner - The Harvest");

        manager.apply_snapshot(loaded_snapshot(None));
        assert_eq!(manager.window_title(), APP_TITLE);
    }

    #[test]
    fn test_provider_invariant_holds_through_view() {
        let mut manager = view_manager();
        manager.apply_snapshot(loaded_snapshot(Some(2)));

        let current = manager.current_screening().expect("selection set");
        assert!(manager.screenings().iter().any(|s| s.id == current.id));
        assert_eq!(
            manager.current_film().expect("film resolves").id,
            current.film_id
        );
    }

    #[test]
    fn test_rows_follow_clock_and_rating_preferences() {
        let mut manager = view_manager();
        let mut snapshot = loaded_snapshot(None);
        snapshot.films[0].rating = Some(Rating::new(8));
        snapshot.screenings[0].attending = true;
        manager.apply_snapshot(snapshot.clone());

        let row = &manager.rows()[0];
        assert_eq!(row.film_title, "Slow Light");
        assert_eq!(row.day, "Thu 29 Jan");
        assert_eq!(row.time, "14:00 - 15:30");
        assert!(row.attending);
        assert_eq!(row.rating, "8");

        let mut config = Config::default();
        config.ui.use_24_hour_clock = false;
        config.ui.show_ratings_column = false;
        manager.config = config;
        manager.rebuild();

        let row = &manager.rows()[0];
        assert_eq!(row.time, "02:00 PM - 03:30 PM");
        assert_eq!(row.rating, "");
    }

    #[test]
    fn test_run_loop_emits_view_notifications() {
        let (bus_sender, _) = broadcast::channel(1024);
        let manager_receiver = bus_sender.subscribe();
        let manager_sender = bus_sender.clone();
        let mut receiver = bus_sender.subscribe();
        let handle = thread::spawn(move || {
            let mut manager = ViewManager::new(manager_receiver, manager_sender);
            manager.run();
        });

        bus_sender
            .send(protocol::Message::Plan(protocol::PlanMessage::PlanChanged(
                loaded_snapshot(Some(0)),
            )))
            .expect("send snapshot");

        let mut saw_rows = false;
        let mut saw_title = false;
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline && !(saw_rows && saw_title) {
            match receiver.try_recv() {
                Ok(protocol::Message::View(protocol::ViewMessage::RowsChanged(count))) => {
                    assert_eq!(count, 4);
                    saw_rows = true;
                }
                Ok(protocol::Message::View(protocol::ViewMessage::WindowTitleChanged(title))) => {
                    assert_eq!(title, "Festival Planner - Slow Light");
                    saw_title = true;
                }
                Ok(_) => {}
                Err(TryRecvError::Empty) => thread::sleep(Duration::from_millis(5)),
                Err(_) => break,
            }
        }
        assert!(saw_rows && saw_title);

        bus_sender
            .send(protocol::Message::Shutdown)
            .expect("send shutdown");
        handle.join().expect("view manager thread should exit");
    }
}
