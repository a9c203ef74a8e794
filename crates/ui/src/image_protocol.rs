//! Picks the terminal graphics protocol used by the fullscreen photo.

use ratatui_image::picker::{Capability, Picker, ProtocolType, cap_parser::QueryStdioOptions};

/// Environment hints about the hosting terminal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct TerminalHints {
    pub kitty_window: bool,
    pub term_is_kitty: bool,
    pub iterm: bool,
    pub tmux: bool,
}

impl TerminalHints {
    pub(crate) fn from_env() -> Self {
        let non_empty = |key: &str| {
            std::env::var(key)
                .ok()
                .is_some_and(|value| !value.trim().is_empty())
        };
        let contains = |key: &str, needle: &str| {
            std::env::var(key)
                .ok()
                .is_some_and(|value| value.contains(needle))
        };
        Self {
            kitty_window: non_empty("KITTY_WINDOW_ID"),
            term_is_kitty: std::env::var("TERM")
                .ok()
                .is_some_and(|term| term.trim().starts_with("xterm-kitty")),
            iterm: non_empty("ITERM_SESSION_ID")
                || contains("TERM_PROGRAM", "iTerm")
                || contains("LC_TERMINAL", "iTerm"),
            tmux: std::env::var_os("TMUX").is_some(),
        }
    }

    /// Querying stdio stalls on terminals that never answer, so only ask when a hint says
    /// a graphics-capable terminal is likely. Inside tmux we must ask to see the outer one.
    pub(crate) fn should_query(&self) -> bool {
        self.kitty_window || self.term_is_kitty || self.iterm || self.tmux
    }

    pub(crate) fn query_timeout(&self) -> std::time::Duration {
        if self.kitty_window || self.term_is_kitty || self.iterm {
            std::time::Duration::from_millis(1500)
        } else if self.tmux {
            std::time::Duration::from_millis(300)
        } else {
            std::time::Duration::ZERO
        }
    }

    /// Kitty graphics are preferred when the terminal is known to be kitty, or it
    /// advertised the capability. iTerm2 answers kitty queries but renders them badly.
    pub(crate) fn kitty_usable(&self, capabilities: &[Capability]) -> bool {
        if self.iterm {
            return false;
        }
        self.kitty_window
            || capabilities
                .iter()
                .any(|cap| matches!(cap, Capability::Kitty))
    }
}

pub(crate) fn build_picker(hints: &TerminalHints) -> Picker {
    let mut picker = if hints.should_query() {
        let mut options = QueryStdioOptions::default();
        options.timeout = hints.query_timeout();
        Picker::from_query_stdio_with_options(options).unwrap_or_else(|_| Picker::halfblocks())
    } else {
        Picker::halfblocks()
    };
    if hints.kitty_usable(picker.capabilities()) {
        picker.set_protocol_type(ProtocolType::Kitty);
    }
    picker.set_background_color(image::Rgba([0u8, 0u8, 0u8, 255u8]));
    picker
}

pub(crate) fn protocol_label(picker: &Picker) -> &'static str {
    match picker.protocol_type() {
        ProtocolType::Halfblocks => "halfblocks",
        ProtocolType::Sixel => "sixel",
        ProtocolType::Kitty => "kitty",
        ProtocolType::Iterm2 => "iterm2",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_terminal_is_not_queried() {
        let hints = TerminalHints::default();
        assert!(!hints.should_query());
        assert_eq!(hints.query_timeout(), std::time::Duration::ZERO);
    }

    #[test]
    fn tmux_gets_short_query() {
        let hints = TerminalHints {
            tmux: true,
            ..TerminalHints::default()
        };
        assert!(hints.should_query());
        assert_eq!(hints.query_timeout(), std::time::Duration::from_millis(300));
    }

    #[test]
    fn kitty_over_ssh_is_queried() {
        let hints = TerminalHints {
            term_is_kitty: true,
            ..TerminalHints::default()
        };
        assert!(hints.should_query());
        assert_eq!(hints.query_timeout(), std::time::Duration::from_millis(1500));
        assert!(!hints.kitty_usable(&[]));
        assert!(hints.kitty_usable(&[Capability::Kitty]));
    }

    #[test]
    fn iterm_never_uses_kitty() {
        let hints = TerminalHints {
            iterm: true,
            kitty_window: true,
            ..TerminalHints::default()
        };
        assert!(!hints.kitty_usable(&[Capability::Kitty]));
    }

    #[test]
    fn halfblocks_label() {
        assert_eq!(protocol_label(&Picker::halfblocks()), "halfblocks");
    }
}
