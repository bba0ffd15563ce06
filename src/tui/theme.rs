use ratatui::style::{Color, Modifier, Style};

pub struct Theme {
    pub normal: Style,
    pub selected: Style,
    pub required: Style,
    /// Fields edited since the form was built
    pub modified: Style,
    pub header: Style,
    /// Raw model output and summaries
    pub preview: Style,
    pub error: Style,
    pub success: Style,
    /// Steps whose prerequisites are not met
    pub disabled: Style,
    pub help: Style,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            normal: Style::default().fg(Color::White),
            selected: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            required: Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
            modified: Style::default().fg(Color::Magenta),
            header: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            preview: Style::default().fg(Color::Green),
            error: Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::BOLD),
            success: Style::default().fg(Color::Green),
            disabled: Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::DIM),
            help: Style::default().fg(Color::DarkGray),
        }
    }

    pub fn light() -> Self {
        Self {
            normal: Style::default().fg(Color::Black),
            selected: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            required: Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::BOLD),
            modified: Style::default().fg(Color::Magenta),
            header: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            preview: Style::default().fg(Color::DarkGray),
            error: Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::BOLD),
            success: Style::default().fg(Color::Green),
            disabled: Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::DIM),
            help: Style::default().fg(Color::Gray),
        }
    }

    /// Theme named in the UI config; anything but "light" is dark
    pub fn named(name: &str) -> Self {
        if name.eq_ignore_ascii_case("light") {
            Self::light()
        } else {
            Self::dark()
        }
    }
}
