//! Colour palette for terminal output.

use owo_colors::Style;

/// Styles applied to the status glyphs and echoed remote output.
///
/// Every field is a no-op style unless built with [`Styles::colored`].
#[derive(Default, Clone, Copy)]
pub struct Styles {
    pub success: Style,
    pub warning: Style,
    pub info: Style,
    /// Arrow in front of in-progress workflow steps.
    pub step: Style,
    /// Key labels and lines streamed back from the server.
    pub dim: Style,
}

impl Styles {
    /// Palette for a colour-capable terminal.
    #[must_use]
    pub fn colored() -> Self {
        Self {
            success: Style::new().green(),
            warning: Style::new().yellow(),
            info: Style::new().blue(),
            step: Style::new().cyan(),
            dim: Style::new().dimmed(),
        }
    }

    #[must_use]
    pub fn for_terminal(use_colors: bool) -> Self {
        if use_colors { Self::colored() } else { Self::default() }
    }
}
