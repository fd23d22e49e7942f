//! Terminal-agnostic keyboard input.

/// Keyboard input abstraction.
///
/// Decouples application logic from terminal libraries so the same key
/// handling runs under simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    /// Printable character.
    Char(char),
    /// Enter/Return key.
    Enter,
    /// Backspace key.
    Backspace,
    /// Escape key (close detail, cancel prompt, quit from the list).
    Esc,
    /// Up arrow key.
    Up,
    /// Down arrow key.
    Down,
    /// Home key (first room).
    Home,
    /// End key (last room).
    End,
}
