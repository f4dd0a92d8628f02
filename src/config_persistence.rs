//! Comment-preserving config file updates.
//!
//! Rewrites only the keys whose values changed so user comments and
//! formatting in `festplan.toml` survive saves.

use std::path::Path;

use log::warn;
use toml_edit::{value, DocumentMut, Item, Table};

use crate::config::Config;

fn set_table_value_preserving_decor(table: &mut Table, key: &str, item: Item) {
    let existing_value_decor = table
        .get(key)
        .and_then(|current| current.as_value().map(|value| value.decor().clone()));
    table[key] = item;
    if let Some(existing_value_decor) = existing_value_decor {
        if let Some(next_value) = table[key].as_value_mut() {
            *next_value.decor_mut() = existing_value_decor;
        }
    }
}

fn set_table_scalar_if_changed<T, F>(
    table: &mut Table,
    key: &str,
    previous_value: T,
    next_value: T,
    to_item: F,
) where
    T: PartialEq + Copy,
    F: FnOnce(T) -> Item,
{
    if table.contains_key(key) && previous_value == next_value {
        return;
    }
    set_table_value_preserving_decor(table, key, to_item(next_value));
}

fn ensure_section_table(document: &mut DocumentMut, key: &str) {
    let root = document.as_table_mut();
    let should_replace = !matches!(root.get(key), Some(item) if item.is_table());
    if should_replace {
        root.insert(key, Item::Table(Table::new()));
    }
}

fn write_config_to_document(document: &mut DocumentMut, previous: &Config, config: &Config) {
    ensure_section_table(document, "program");
    ensure_section_table(document, "ui");
    ensure_section_table(document, "planner");

    {
        let program = document["program"]
            .as_table_mut()
            .expect("program should be a table");
        if !program.contains_key("program_file")
            || previous.program.program_file != config.program.program_file
        {
            set_table_value_preserving_decor(
                program,
                "program_file",
                value(config.program.program_file.clone()),
            );
        }
    }

    {
        let ui = document["ui"].as_table_mut().expect("ui should be a table");
        if !ui.contains_key("window_title_template")
            || previous.ui.window_title_template != config.ui.window_title_template
        {
            set_table_value_preserving_decor(
                ui,
                "window_title_template",
                value(config.ui.window_title_template.clone()),
            );
        }
        set_table_scalar_if_changed(
            ui,
            "use_24_hour_clock",
            previous.ui.use_24_hour_clock,
            config.ui.use_24_hour_clock,
            value,
        );
        set_table_scalar_if_changed(
            ui,
            "show_ratings_column",
            previous.ui.show_ratings_column,
            config.ui.show_ratings_column,
            value,
        );
    }

    {
        let planner = document["planner"]
            .as_table_mut()
            .expect("planner should be a table");
        set_table_scalar_if_changed(
            planner,
            "autosave",
            previous.planner.autosave,
            config.planner.autosave,
            value,
        );
    }
}

/// Save `config` to `path`, editing the existing document in place so
/// comments are kept. Falls back to a fresh document when the file is
/// missing or unparseable.
pub fn save_config(
    path: &Path,
    previous: &Config,
    config: &Config,
) -> Result<(), std::io::Error> {
    let mut document = match std::fs::read_to_string(path) {
        Ok(content) => content.parse::<DocumentMut>().unwrap_or_else(|e| {
            warn!(
                "Config at {} is not valid TOML ({}); rewriting from scratch",
                path.display(),
                e
            );
            DocumentMut::new()
        }),
        Err(_) => DocumentMut::new(),
    };

    write_config_to_document(&mut document, previous, config);
    std::fs::write(path, document.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_save_preserves_user_comments() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("festplan.toml");
        std::fs::write(
            &path,
            "# my notes\n[ui]\nuse_24_hour_clock = true # keep it\n",
        )
        .expect("seed config");

        let previous = Config::default();
        let mut next = Config::default();
        next.ui.show_ratings_column = false;
        save_config(&path, &previous, &next).expect("save config");

        let written = std::fs::read_to_string(&path).expect("read config");
        assert!(written.contains("# my notes"));
        assert!(written.contains("use_24_hour_clock = true # keep it"));
        assert!(written.contains("show_ratings_column = false"));
    }

    #[test]
    fn test_saved_config_parses_back() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("festplan.toml");

        let mut next = Config::default();
        next.program.program_file = "/tmp/program.json".to_string();
        next.planner.autosave = false;
        save_config(&path, &Config::default(), &next).expect("save config");

        let written = std::fs::read_to_string(&path).expect("read config");
        let parsed: Config = toml::from_str(&written).expect("round trip");
        assert_eq!(parsed, next);
    }
}
