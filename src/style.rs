use iced::Color;

// Surfaces
pub const BG_DARK: Color = Color::from_rgb(0.05, 0.06, 0.08);
pub const BG_CARD: Color = Color::from_rgb(0.11, 0.13, 0.17);

pub const STROKE_DIM: Color = Color::from_rgb(0.2, 0.22, 0.28);

// Accents
pub const ACCENT_BLUE: Color = Color::from_rgb(0.35, 0.65, 0.95);
pub const ACCENT_CYAN: Color = Color::from_rgb(0.2, 0.85, 0.85);
pub const ACCENT_GREEN: Color = Color::from_rgb(0.2, 0.8, 0.5);
pub const ACCENT_ORANGE: Color = Color::from_rgb(0.95, 0.6, 0.2);
pub const ACCENT_RED: Color = Color::from_rgb(0.95, 0.35, 0.35);

// Text
pub const TEXT_BRIGHT: Color = Color::from_rgb(0.96, 0.97, 0.99);
pub const TEXT_MUTED: Color = Color::from_rgb(0.6, 0.63, 0.7);

pub const TOOLTIP_BG: Color = Color::from_rgba(0.11, 0.13, 0.17, 0.95);
