//! Colours and bordered panels for the terminal dashboard.

use ratatui::prelude::*;
use ratatui::widgets::{Block, BorderType, Borders, Padding};

/// Colours grouped by purpose.
#[derive(Clone, Debug)]
pub struct Theme {
    pub text_primary: Color,
    pub text_secondary: Color,
    pub text_muted: Color,
    pub accent: Color,
    /// Positive PnL, BUY rows
    pub success: Color,
    pub warning: Color,
    /// Negative PnL, SELL rows
    pub error: Color,
    pub border: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            text_primary: Color::White,
            text_secondary: Color::Gray,
            text_muted: Color::DarkGray,
            accent: Color::Cyan,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            border: Color::DarkGray,
        }
    }
}

impl Theme {
    pub fn pnl(&self, profitable: bool) -> Color {
        if profitable {
            self.success
        } else {
            self.error
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PanelStyle {
    #[default]
    Default,
    Accent,
    Warning,
}

/// Rounded, titled block with theme colours.
#[derive(Clone)]
pub struct Panel<'a> {
    title: Option<&'a str>,
    style: PanelStyle,
    theme: &'a Theme,
}

impl<'a> Panel<'a> {
    pub fn new(theme: &'a Theme) -> Self {
        Self {
            title: None,
            style: PanelStyle::Default,
            theme,
        }
    }

    pub fn title(mut self, title: &'a str) -> Self {
        self.title = Some(title);
        self
    }

    pub fn style(mut self, style: PanelStyle) -> Self {
        self.style = style;
        self
    }

    pub fn block(&self) -> Block<'a> {
        let (border_color, title_color) = match self.style {
            PanelStyle::Default => (self.theme.border, self.theme.text_secondary),
            PanelStyle::Accent => (self.theme.accent, self.theme.accent),
            PanelStyle::Warning => (self.theme.warning, self.theme.warning),
        };

        let mut block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(border_color))
            .padding(Padding::horizontal(1));

        if let Some(title) = self.title {
            block = block.title(Span::styled(
                format!(" {} ", title),
                Style::default().fg(title_color).bold(),
            ));
        }
        block
    }
}
