// Light/dark palettes for the viewer.
//
// `ThemeColors` holds every color that changes with the theme: document
// elements, the drop zone, alerts and the copy toast. `apply_dark_mode_visuals()`
// switches egui's own visuals to match.

use egui::Color32;

/// Palette for theme-dependent UI elements.
///
/// Rendering code calls `ThemeColors::current(dark_mode)` to get the active
/// palette.
pub struct ThemeColors {
    // Links
    pub link: Color32,
    pub link_internal: Color32,
    // Code blocks
    pub code_bg: Color32,
    pub code_border: Color32,
    pub code_label: Color32,
    pub code_fallback_text: Color32,
    // Inline code
    pub inline_code_bg: Color32,
    pub inline_code_fg: Color32,
    // Blockquotes
    pub blockquote_bg: Color32,
    pub blockquote_border: Color32,
    pub blockquote_text: Color32,
    pub blockquote_bar: Color32,
    // Lists
    pub list_marker: Color32,
    // Drop zone
    pub drop_zone_bg: Color32,
    pub drop_zone_border: Color32,
    pub drop_zone_hover_bg: Color32,
    pub drop_zone_hover_border: Color32,
    pub drop_zone_text: Color32,
    // Alerts and toasts
    pub alert_error: Color32,
    pub alert_info: Color32,
    pub toast_ok: Color32,
    pub toast_failed: Color32,
    // Status bar
    pub status_hint: Color32,
}

impl ThemeColors {
    pub const DARK: Self = Self {
        link: Color32::from_rgb(120, 190, 255),
        link_internal: Color32::from_rgb(135, 206, 250),
        code_bg: Color32::from_rgb(30, 30, 30),
        code_border: Color32::from_rgb(60, 60, 60),
        code_label: Color32::from_rgb(140, 140, 140),
        code_fallback_text: Color32::from_rgb(220, 220, 220),
        inline_code_bg: Color32::from_rgb(30, 30, 30),
        inline_code_fg: Color32::from_rgb(180, 255, 180),
        blockquote_bg: Color32::from_rgb(24, 24, 24),
        blockquote_border: Color32::from_rgb(40, 40, 40),
        blockquote_text: Color32::WHITE,
        blockquote_bar: Color32::from_rgb(255, 103, 25),
        list_marker: Color32::from_rgb(160, 160, 160),
        drop_zone_bg: Color32::from_rgb(18, 18, 18),
        drop_zone_border: Color32::from_rgb(70, 70, 70),
        drop_zone_hover_bg: Color32::from_rgb(20, 36, 52),
        drop_zone_hover_border: Color32::from_rgb(120, 190, 255),
        drop_zone_text: Color32::from_rgb(190, 190, 190),
        alert_error: Color32::from_rgb(255, 120, 110),
        alert_info: Color32::from_rgb(200, 160, 80),
        toast_ok: Color32::from_rgb(120, 210, 140),
        toast_failed: Color32::from_rgb(255, 120, 110),
        status_hint: Color32::GRAY,
    };

    pub const LIGHT: Self = Self {
        link: Color32::from_rgb(0, 102, 204),
        link_internal: Color32::from_rgb(0, 80, 180),
        code_bg: Color32::from_rgb(245, 245, 245),
        code_border: Color32::from_rgb(210, 210, 210),
        code_label: Color32::from_rgb(120, 120, 120),
        code_fallback_text: Color32::from_rgb(50, 50, 50),
        inline_code_bg: Color32::WHITE,
        inline_code_fg: Color32::from_rgb(60, 80, 150),
        blockquote_bg: Color32::from_rgb(245, 245, 248),
        blockquote_border: Color32::from_rgb(215, 215, 220),
        blockquote_text: Color32::from_rgb(40, 40, 40),
        blockquote_bar: Color32::from_rgb(255, 103, 25),
        list_marker: Color32::from_rgb(90, 90, 90),
        drop_zone_bg: Color32::from_rgb(250, 250, 250),
        drop_zone_border: Color32::from_rgb(190, 190, 190),
        drop_zone_hover_bg: Color32::from_rgb(232, 242, 255),
        drop_zone_hover_border: Color32::from_rgb(0, 102, 204),
        drop_zone_text: Color32::from_rgb(70, 70, 70),
        alert_error: Color32::from_rgb(190, 30, 30),
        alert_info: Color32::from_rgb(160, 100, 20),
        toast_ok: Color32::from_rgb(20, 130, 50),
        toast_failed: Color32::from_rgb(190, 30, 30),
        status_hint: Color32::from_rgb(130, 130, 130),
    };

    /// Returns the palette for the given mode.
    pub fn current(dark_mode: bool) -> &'static Self {
        if dark_mode {
            &Self::DARK
        } else {
            &Self::LIGHT
        }
    }

    /// Returns the syntect theme name for the given mode.
    pub fn syntect_theme(dark_mode: bool) -> &'static str {
        if dark_mode {
            "base16-ocean.dark"
        } else {
            "InspiredGitHub"
        }
    }

    /// Drop zone fill and border, highlighted while a drag hovers.
    pub fn drop_zone(&self, hovered: bool) -> (Color32, Color32) {
        if hovered {
            (self.drop_zone_hover_bg, self.drop_zone_hover_border)
        } else {
            (self.drop_zone_bg, self.drop_zone_border)
        }
    }
}

/// Apply dark or light visuals, with true-black panels in dark mode.
/// Clones the current style to keep spacing set by `configure_egui_style()`.
pub fn apply_dark_mode_visuals(ctx: &egui::Context, dark: bool) {
    let mut style = (*ctx.style()).clone();
    style.visuals = if dark {
        egui::Visuals::dark()
    } else {
        egui::Visuals::light()
    };
    if dark {
        style.visuals.window_fill = Color32::BLACK;
        style.visuals.panel_fill = Color32::BLACK;
        style.visuals.faint_bg_color = Color32::from_gray(20);
        style.visuals.extreme_bg_color = Color32::BLACK;
    }
    ctx.set_style(style);
}
