//! Persisted window geometry and viewer preferences.
//!
//! Both live in small text files under the per-user config directory
//! (`window_state.txt`, `settings.txt`). On Windows the geometry is also
//! mirrored to the registry. Nothing here is fatal: unreadable or malformed
//! files simply mean defaults.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

const APP_DIR: &str = "mddrop";
const WINDOW_FILE: &str = "window_state.txt";
const SETTINGS_FILE: &str = "settings.txt";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowState {
    pub pos: [f32; 2],
    pub size: [f32; 2],
    pub maximized: bool,
}

/// User preferences that survive restarts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppSettings {
    pub dark_mode: bool,
    pub zoom: f32,
    /// Use the native file dialog when the host has one.
    pub native_dialog: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            dark_mode: true,
            zoom: 1.0,
            native_dialog: true,
        }
    }
}

fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            let mut p = PathBuf::from(appdata);
            p.push(APP_DIR);
            return Some(p);
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            let mut p = PathBuf::from(home);
            p.push("Library/Application Support");
            p.push(APP_DIR);
            return Some(p);
        }
    }

    // Linux / others: XDG or ~/.config
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        let mut p = PathBuf::from(xdg);
        p.push(APP_DIR);
        return Some(p);
    }
    if let Ok(home) = std::env::var("HOME") {
        let mut p = PathBuf::from(home);
        p.push(".config");
        p.push(APP_DIR);
        return Some(p);
    }
    None
}

fn config_file(name: &str) -> Option<PathBuf> {
    config_dir().map(|mut dir| {
        dir.push(name);
        dir
    })
}

/// Write `contents` to `name` in the config dir, creating the dir. A host
/// without any config dir is not an error.
fn write_config_file(name: &str, contents: &str) -> std::io::Result<()> {
    let Some(dir) = config_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&dir)?;
    let mut f = fs::File::create(dir.join(name))?;
    f.write_all(contents.as_bytes())
}

pub fn load_window_state() -> Option<WindowState> {
    #[cfg(windows)]
    {
        if let Some(ws) = load_window_state_registry() {
            return Some(ws);
        }
    }
    let s = fs::read_to_string(config_file(WINDOW_FILE)?).ok()?;
    // "x y w h max"
    let parts: Vec<&str> = s.split_whitespace().collect();
    if parts.len() < 5 {
        return None;
    }
    let x = parts[0].parse::<f32>().ok()?;
    let y = parts[1].parse::<f32>().ok()?;
    let w = parts[2].parse::<f32>().ok()?;
    let h = parts[3].parse::<f32>().ok()?;
    Some(WindowState {
        pos: [x, y],
        size: [w, h],
        maximized: parse_flag(parts[4]),
    })
}

pub fn save_window_state(state: &WindowState) -> std::io::Result<()> {
    #[cfg(windows)]
    {
        if let Err(e) = save_window_state_registry(state) {
            log::warn!("failed to write window state to registry: {e}");
        }
    }
    write_config_file(
        WINDOW_FILE,
        &format!(
            "{} {} {} {} {}\n",
            state.pos[0], state.pos[1], state.size[0], state.size[1], state.maximized as u8
        ),
    )
}

pub fn sanitize_window_state(ws: WindowState) -> Option<WindowState> {
    if !ws.pos[0].is_finite()
        || !ws.pos[1].is_finite()
        || !ws.size[0].is_finite()
        || !ws.size[1].is_finite()
    {
        return None;
    }

    let min_w = 480.0f32;
    let min_h = 360.0f32;
    let max_w = 10000.0f32;
    let max_h = 10000.0f32;
    let max_pos = 20000.0f32;

    Some(WindowState {
        pos: [ws.pos[0].clamp(0.0, max_pos), ws.pos[1].clamp(0.0, max_pos)],
        size: [ws.size[0].clamp(min_w, max_w), ws.size[1].clamp(min_h, max_h)],
        maximized: ws.maximized,
    })
}

fn parse_flag(value: &str) -> bool {
    matches!(value, "1" | "true" | "True")
}

/// Load settings; missing keys keep their defaults and unknown keys are
/// ignored.
pub fn load_app_settings() -> AppSettings {
    let mut settings = AppSettings::default();
    let Some(path) = config_file(SETTINGS_FILE) else {
        return settings;
    };
    let Ok(contents) = fs::read_to_string(&path) else {
        return settings;
    };
    for line in contents.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "theme" => match value {
                "dark" => settings.dark_mode = true,
                "light" => settings.dark_mode = false,
                other => log::debug!("ignoring unknown theme {other:?} in settings"),
            },
            "zoom" => {
                if let Some(zoom) = value.parse::<f32>().ok().filter(|z| z.is_finite() && *z > 0.0)
                {
                    settings.zoom = zoom;
                }
            }
            "native_dialog" => settings.native_dialog = parse_flag(value),
            _ => {}
        }
    }
    settings
}

pub fn save_app_settings(settings: &AppSettings) -> std::io::Result<()> {
    let theme = if settings.dark_mode { "dark" } else { "light" };
    write_config_file(
        SETTINGS_FILE,
        &format!(
            "theme={theme}\nzoom={}\nnative_dialog={}\n",
            settings.zoom, settings.native_dialog
        ),
    )
}

#[cfg(all(windows, not(test)))]
fn load_window_state_registry() -> Option<WindowState> {
    use winreg::enums::HKEY_CURRENT_USER;
    use winreg::RegKey;
    let hkcu = RegKey::predef(HKEY_CURRENT_USER);
    let key = hkcu.open_subkey("Software\\mddrop").ok()?;
    let x: u32 = key.get_value("PosX").ok()?;
    let y: u32 = key.get_value("PosY").ok()?;
    let w: u32 = key.get_value("Width").ok()?;
    let h: u32 = key.get_value("Height").ok()?;
    let maximized: u32 = key.get_value("Maximized").unwrap_or(0);
    Some(WindowState {
        pos: [x as f32, y as f32],
        size: [w as f32, h as f32],
        maximized: maximized != 0,
    })
}

#[cfg(all(windows, not(test)))]
fn save_window_state_registry(state: &WindowState) -> std::io::Result<()> {
    use winreg::enums::{HKEY_CURRENT_USER, KEY_READ, KEY_WRITE};
    use winreg::RegKey;
    let hkcu = RegKey::predef(HKEY_CURRENT_USER);
    let (key, _disp) = hkcu.create_subkey_with_flags("Software\\mddrop", KEY_READ | KEY_WRITE)?;
    let to_u32 = |v: f32| -> u32 {
        if v.is_finite() {
            v.clamp(0.0, u32::MAX as f32).round() as u32
        } else {
            0
        }
    };
    key.set_value("PosX", &to_u32(state.pos[0]))?;
    key.set_value("PosY", &to_u32(state.pos[1]))?;
    key.set_value("Width", &to_u32(state.size[0]))?;
    key.set_value("Height", &to_u32(state.size[1]))?;
    key.set_value("Maximized", &(state.maximized as u32))?;
    Ok(())
}

// Tests never touch the real registry.
#[cfg(all(windows, test))]
fn load_window_state_registry() -> Option<WindowState> {
    None
}

#[cfg(all(windows, test))]
fn save_window_state_registry(_state: &WindowState) -> std::io::Result<()> {
    Ok(())
}
