mod config;
mod config_persistence;
mod db_manager;
mod festival;
mod plan_manager;
mod program_loader;
mod protocol;
mod view_manager;

use std::thread;

use config::Config;
use db_manager::DbManager;
use festival::ScreeningList;
use log::info;
use plan_manager::PlanManager;
use protocol::{ConfigMessage, Message};
use tokio::sync::broadcast;
use view_manager::ViewManager;

fn panic_payload_to_string(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        return (*s).to_string();
    }
    if let Some(s) = payload.downcast_ref::<String>() {
        return s.clone();
    }
    "non-string panic payload".to_string()
}

fn sanitize_config(mut config: Config) -> Config {
    if !config.ui.window_title_template.contains("{film}") {
        log::warn!(
            "Window title template {:?} has no {{film}} placeholder, using default",
            config.ui.window_title_template
        );
        config.ui.window_title_template = Config::default().ui.window_title_template;
    }
    config
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut clog = colog::default_builder();
    clog.filter(None, log::LevelFilter::Debug);
    clog.init();

    std::panic::set_hook(Box::new(|panic_info| {
        let current_thread = std::thread::current();
        let thread_name = current_thread.name().unwrap_or("unnamed");
        log::error!("panic in thread '{}': {}", thread_name, panic_info);
    }));

    let config_dir = dirs::config_dir().expect("Could not find config directory");
    let config_file = config_dir.join("festplan.toml");

    if !config_file.exists() {
        let default_config = Config::default();
        info!(
            "Config file not found. Creating default config. path={}",
            config_file.display()
        );
        config_persistence::save_config(&config_file, &default_config, &default_config)?;
    }

    let config_content = std::fs::read_to_string(&config_file)?;
    let parsed_config = toml::from_str::<Config>(&config_content).unwrap_or_default();
    let config = sanitize_config(parsed_config.clone());
    if config != parsed_config {
        // Keep the on-disk file in sync with what the runtime actually uses.
        config_persistence::save_config(&config_file, &parsed_config, &config)?;
    }

    // Bus for communication between components
    let (bus_sender, _) = broadcast::channel(1024);

    // Setup plan manager
    let plan_manager_bus_receiver = bus_sender.subscribe();
    let plan_manager_bus_sender = bus_sender.clone();
    let db_manager = DbManager::new().expect("Failed to initialize database");
    let plan_manager_handle = thread::spawn(move || {
        let mut plan_manager = PlanManager::new(
            ScreeningList::new(),
            plan_manager_bus_receiver,
            plan_manager_bus_sender,
            db_manager,
        );
        plan_manager.run();
    });

    // Setup view manager
    let view_manager_bus_sender = bus_sender.clone();
    let view_manager_handle = thread::spawn(move || {
        let run_result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut view_manager = ViewManager::new(
                view_manager_bus_sender.subscribe(),
                view_manager_bus_sender.clone(),
            );
            view_manager.run();
        }));
        if let Err(payload) = run_result {
            log::error!(
                "ViewManager thread terminated due to panic: {}",
                panic_payload_to_string(payload.as_ref())
            );
        }
    });

    let bus_sender_clone = bus_sender.clone();
    let _ = bus_sender_clone.send(Message::Config(ConfigMessage::ConfigChanged(config)));

    let shutdown_sender = bus_sender.clone();
    ctrlc::set_handler(move || {
        info!("Interrupt received, shutting down");
        let _ = shutdown_sender.send(Message::Shutdown);
    })?;

    let _ = plan_manager_handle.join();
    let _ = view_manager_handle.join();

    info!("Application exiting");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_restores_broken_title_template() {
        let mut config = Config::default();
        config.ui.window_title_template = "no placeholder here".to_string();
        let sanitized = sanitize_config(config);
        assert!(sanitized.ui.window_title_template.contains("{film}"));
    }

    #[test]
    fn test_sanitize_keeps_custom_template_with_placeholder() {
        let mut config = Config::default();
        config.ui.window_title_template = "{film} @ IFFR".to_string();
        let sanitized = sanitize_config(config.clone());
        assert_eq!(sanitized, config);
    }
}
