//! Key dispatch.
//!
//! Keys either mutate presentation state in place or spawn a controller
//! action on a cloned handle. Actions are never awaited here; their output
//! lands in shared controller state and shows up on the next draw. A
//! request in flight gates re-submission, nothing else.

use std::path::Path;

use anyhow::Result;
use banter_core::{
    CodingStatus, ImageQuality, ImageSize, ImageStyle, TabKind, AVAILABLE_CHAT_MODELS,
    AVAILABLE_IMAGE_MODELS,
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, InputMode, InputPurpose};
use crate::tui::AppEvent;

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
            app.reap_tasks().await;
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Ctrl-C always quits
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return;
    }

    if app.show_config {
        handle_config_key(app, key);
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal(app, key),
        InputMode::Editing => handle_editing(app, key),
    }
}

fn handle_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => {
            app.should_quit = true;
        }
        KeyCode::Tab => app.select_tab(app.active_tab.next()),
        KeyCode::BackTab => app.select_tab(app.active_tab.previous()),
        KeyCode::Char('c') => {
            app.show_config = true;
            app.status = None;
        }
        KeyCode::Char('m') => cycle_chat_model(app),
        KeyCode::Char('M') => cycle_image_model(app),
        KeyCode::PageUp => app.scroll_offset = app.scroll_offset.saturating_add(5),
        KeyCode::PageDown => app.scroll_offset = app.scroll_offset.saturating_sub(5),
        _ => match app.active_tab {
            TabKind::Chat => handle_chat_normal(app, key),
            TabKind::Image => handle_image_normal(app, key),
            TabKind::Coding => handle_coding_normal(app, key),
        },
    }
}

fn handle_chat_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('i') | KeyCode::Enter => app.begin_editing(InputPurpose::Message),
        KeyCode::Char('u') => app.begin_editing(InputPurpose::UploadPath),
        KeyCode::Up | KeyCode::Char('k') => {
            app.scroll_offset = app.scroll_offset.saturating_add(1);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            app.scroll_offset = app.scroll_offset.saturating_sub(1);
        }
        _ => {}
    }
}

fn handle_image_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('i') | KeyCode::Enter => app.begin_editing(InputPurpose::Message),
        KeyCode::Char('u') => app.begin_editing(InputPurpose::UploadPath),
        KeyCode::Char('s') => {
            let image = app.workbench.image();
            let next = cycle(&ImageSize::ALL, image.options().size);
            image.set_size(next);
        }
        KeyCode::Char('h') => {
            let image = app.workbench.image();
            let next = cycle(&ImageQuality::ALL, image.options().quality);
            image.set_quality(next);
        }
        KeyCode::Char('v') => {
            let image = app.workbench.image();
            let next = cycle(&ImageStyle::ALL, image.options().style);
            image.set_style(next);
        }
        KeyCode::Up | KeyCode::Char('k') => {
            app.scroll_offset = app.scroll_offset.saturating_add(1);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            app.scroll_offset = app.scroll_offset.saturating_sub(1);
        }
        _ => {}
    }
}

fn handle_coding_normal(app: &mut App, key: KeyEvent) {
    let status = app.workbench.coding().status();
    match key.code {
        KeyCode::Char('i') => match status {
            CodingStatus::Unauthenticated => app.begin_editing(InputPurpose::Token),
            CodingStatus::Connected => app.begin_editing(InputPurpose::Message),
            _ => {}
        },
        KeyCode::Enter => match status {
            CodingStatus::Unauthenticated => app.begin_editing(InputPurpose::Token),
            CodingStatus::RepositoryListReady | CodingStatus::Error => connect_selected(app),
            CodingStatus::Connected => app.begin_editing(InputPurpose::Message),
            _ => {}
        },
        KeyCode::Down | KeyCode::Char('j') => {
            if status.is_connected() {
                app.file_nav_down();
            } else {
                app.repository_nav_down();
            }
        }
        KeyCode::Up | KeyCode::Char('k') => {
            if status.is_connected() {
                app.file_nav_up();
            } else {
                app.repository_nav_up();
            }
        }
        KeyCode::Char(' ') => toggle_selected_file(app),
        KeyCode::Char('a') => {
            if status.is_connected() && !app.workbench.coding().is_loading() {
                let coding = app.workbench.coding().clone();
                app.action_tasks.push(tokio::spawn(async move {
                    coding.analyze_selected_files().await;
                }));
            }
        }
        KeyCode::Char('r') => {
            // The stuck state after a failed listing; elsewhere the list is
            // either already loaded or about to be
            if status == CodingStatus::Authenticated {
                let coding = app.workbench.coding().clone();
                app.action_tasks.push(tokio::spawn(async move {
                    coding.fetch_repositories().await;
                }));
            }
        }
        KeyCode::Char('x') => {
            if status.is_connected() {
                app.file_state.select(None);
                let coding = app.workbench.coding().clone();
                app.action_tasks.push(tokio::spawn(async move {
                    coding.disconnect().await;
                }));
            }
        }
        KeyCode::Char('L') => {
            if status.is_authenticated() && !status.is_busy() {
                app.repository_state.select(None);
                app.file_state.select(None);
                let coding = app.workbench.coding().clone();
                app.action_tasks.push(tokio::spawn(async move {
                    coding.logout().await;
                }));
            }
        }
        _ => {}
    }
}

fn handle_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
            app.input_purpose = InputPurpose::Message;
        }
        KeyCode::Enter => submit_input(app),
        KeyCode::Backspace => {
            if app.input_cursor > 0 {
                app.input_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.input.chars().count();
            if app.input_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.input_cursor = app.input_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.input_cursor = (app.input_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.input_cursor = 0;
        }
        KeyCode::End => {
            app.input_cursor = app.input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
            app.input.insert(byte_pos, c);
            app.input_cursor += 1;
        }
        _ => {}
    }
}

/// Submit the input line to the active tab's controller.
///
/// When the target is busy the buffer is left intact so the draft survives;
/// otherwise the buffer is taken and the action spawned.
fn submit_input(app: &mut App) {
    if app.active_tab_busy() {
        return;
    }

    let purpose = app.input_purpose;
    let text = app.take_input();
    app.input_mode = InputMode::Normal;
    app.input_purpose = InputPurpose::Message;
    if text.is_empty() {
        return;
    }

    app.scroll_offset = 0;

    match (app.active_tab, purpose) {
        (TabKind::Chat, InputPurpose::Message) => {
            let chat = app.workbench.chat().clone();
            app.action_tasks.push(tokio::spawn(async move {
                chat.send(&text).await;
            }));
        }
        (TabKind::Chat, InputPurpose::UploadPath) => {
            let chat = app.workbench.chat().clone();
            app.action_tasks.push(tokio::spawn(async move {
                chat.upload(Path::new(&text)).await;
            }));
        }
        (TabKind::Image, InputPurpose::Message) => {
            let image = app.workbench.image().clone();
            app.action_tasks.push(tokio::spawn(async move {
                image.generate(&text).await;
            }));
        }
        (TabKind::Image, InputPurpose::UploadPath) => {
            let image = app.workbench.image().clone();
            let prompt = image.prompt();
            app.action_tasks.push(tokio::spawn(async move {
                let prompt = (!prompt.is_empty()).then_some(prompt);
                image.upload(Path::new(&text), prompt.as_deref()).await;
            }));
        }
        (TabKind::Coding, InputPurpose::Token) => {
            let coding = app.workbench.coding().clone();
            app.action_tasks.push(tokio::spawn(async move {
                coding.authenticate(&text).await;
            }));
        }
        (TabKind::Coding, InputPurpose::Message) => {
            let coding = app.workbench.coding().clone();
            app.action_tasks.push(tokio::spawn(async move {
                coding.send(&text).await;
            }));
        }
        // No upload endpoint on the coding tab, and tokens only mean
        // anything there
        (TabKind::Coding, InputPurpose::UploadPath)
        | (TabKind::Chat, InputPurpose::Token)
        | (TabKind::Image, InputPurpose::Token) => {}
    }
}

fn handle_config_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.show_config = false;
        }
        KeyCode::Enter => submit_config(app),
        KeyCode::Left => {
            app.config_model_idx = app.config_model_idx.saturating_sub(1);
        }
        KeyCode::Right => {
            app.config_model_idx =
                (app.config_model_idx + 1).min(AVAILABLE_CHAT_MODELS.len() - 1);
        }
        KeyCode::Backspace => {
            app.api_key_input.pop();
        }
        KeyCode::Char(c) => {
            app.api_key_input.push(c);
        }
        _ => {}
    }
}

fn submit_config(app: &mut App) {
    if app.config_task.is_some() {
        return;
    }

    let api_key = app.api_key_input.trim().to_string();
    if api_key.is_empty() {
        app.status = Some("API key cannot be empty".to_string());
        return;
    }

    let chat_model = AVAILABLE_CHAT_MODELS[app.config_model_idx].to_string();
    let image_model = app.workbench.image_model();
    let workbench = app.workbench.clone();
    app.status = None;
    app.config_task = Some(tokio::spawn(async move {
        match workbench.configure(&api_key, &chat_model, &image_model).await {
            Ok(()) => Ok("Configuration saved successfully!".to_string()),
            Err(e) => Err(format!("Failed to save configuration: {e}")),
        }
    }));
}

fn cycle_chat_model(app: &mut App) {
    if app.model_task.is_some() || !app.workbench.is_configured() {
        return;
    }

    let current = app.workbench.chat_model();
    let idx = AVAILABLE_CHAT_MODELS
        .iter()
        .position(|m| *m == current)
        .unwrap_or(0);
    let next = AVAILABLE_CHAT_MODELS[(idx + 1) % AVAILABLE_CHAT_MODELS.len()].to_string();

    let workbench = app.workbench.clone();
    app.model_task = Some(tokio::spawn(async move {
        match workbench.set_chat_model(&next).await {
            Ok(()) => format!("Model updated to: {next}"),
            Err(e) => format!("Failed to update model: {e}"),
        }
    }));
}

fn cycle_image_model(app: &mut App) {
    if app.model_task.is_some() || !app.workbench.is_configured() {
        return;
    }

    let current = app.workbench.image_model();
    let idx = AVAILABLE_IMAGE_MODELS
        .iter()
        .position(|m| *m == current)
        .unwrap_or(0);
    let next = AVAILABLE_IMAGE_MODELS[(idx + 1) % AVAILABLE_IMAGE_MODELS.len()].to_string();

    let workbench = app.workbench.clone();
    app.model_task = Some(tokio::spawn(async move {
        match workbench.set_image_model(&next).await {
            Ok(()) => format!("Image model updated to: {next}"),
            Err(e) => format!("Failed to update image model: {e}"),
        }
    }));
}

fn connect_selected(app: &mut App) {
    let coding = app.workbench.coding().clone();
    if coding.status().is_busy() {
        return;
    }

    let repositories = coding.repositories();
    if repositories.is_empty() {
        return;
    }
    let idx = app
        .repository_state
        .selected()
        .unwrap_or(0)
        .min(repositories.len() - 1);
    let repository = repositories[idx].clone();

    app.file_state.select(None);
    app.scroll_offset = 0;
    app.action_tasks.push(tokio::spawn(async move {
        coding.connect(&repository).await;
    }));
}

fn toggle_selected_file(app: &mut App) {
    let coding = app.workbench.coding();
    if !coding.status().is_connected() {
        return;
    }

    let files = coding.available_files();
    if files.is_empty() {
        return;
    }
    let idx = app.file_state.selected().unwrap_or(0).min(files.len() - 1);
    coding.toggle_file(&files[idx]);
}

fn cycle<T: Copy + PartialEq>(all: &[T], current: T) -> T {
    let idx = all.iter().position(|v| *v == current).unwrap_or(0);
    all[(idx + 1) % all.len()]
}

fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_wraps_around() {
        assert_eq!(cycle(&ImageQuality::ALL, ImageQuality::Standard), ImageQuality::Hd);
        assert_eq!(cycle(&ImageQuality::ALL, ImageQuality::Hd), ImageQuality::Standard);
        assert_eq!(cycle(&ImageSize::ALL, ImageSize::Portrait), ImageSize::Square);
    }

    #[test]
    fn test_char_to_byte_index_handles_multibyte() {
        let s = "héllo";
        assert_eq!(char_to_byte_index(s, 0), 0);
        assert_eq!(char_to_byte_index(s, 2), 3);
        assert_eq!(char_to_byte_index(s, 99), s.len());
    }
}
