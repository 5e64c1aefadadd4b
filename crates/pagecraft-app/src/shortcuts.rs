//! Help listing for the editor's keyboard and pointer shortcuts.
//!
//! The key handling itself lives in the dispatcher; this is the text shown
//! by `pagecraft shortcuts`.

/// A shortcut definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortcut {
    pub key: &'static str,
    pub ctrl: bool,
    pub shift: bool,
    pub description: &'static str,
}

impl Shortcut {
    pub const fn new(key: &'static str, ctrl: bool, shift: bool, description: &'static str) -> Self {
        Self {
            key,
            ctrl,
            shift,
            description,
        }
    }

    /// Format for display (e.g. "Ctrl+Shift+Z").
    pub fn format(&self) -> String {
        let mut parts = Vec::new();
        if self.ctrl {
            parts.push("Ctrl");
        }
        if self.shift {
            parts.push("Shift");
        }
        parts.push(self.key);
        parts.join("+")
    }
}

/// Registry of every shortcut.
pub struct ShortcutRegistry;

impl ShortcutRegistry {
    pub fn all() -> Vec<Shortcut> {
        vec![
            Shortcut::new("Z", true, false, "Undo"),
            Shortcut::new("Z", true, true, "Redo"),
            Shortcut::new("Y", true, false, "Redo"),
            Shortcut::new("C", true, false, "Copy selected shape"),
            Shortcut::new("V", true, false, "Paste shape"),
            Shortcut::new("Delete", false, false, "Delete selected shape (erase while editing text)"),
            Shortcut::new("Backspace", false, false, "Delete selected shape (erase while editing text)"),
            Shortcut::new("Escape", false, false, "Clear selection or stop editing text"),
            Shortcut::new("Space", false, false, "Toggle pan mode"),
            Shortcut::new("Enter", false, false, "Edit selected text (new line while editing)"),
            Shortcut::new("Double-click", false, false, "Edit text"),
            Shortcut::new("Ctrl+Wheel", false, false, "Zoom at pointer"),
        ]
    }

    pub fn print_all() {
        println!("\n=== Shortcuts ===");
        for shortcut in Self::all() {
            println!("  {:20} {}", shortcut.format(), shortcut.description);
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format() {
        assert_eq!(Shortcut::new("Z", true, true, "Redo").format(), "Ctrl+Shift+Z");
        assert_eq!(Shortcut::new("Escape", false, false, "").format(), "Escape");
    }

    #[test]
    fn test_combinations_are_unique() {
        let all = ShortcutRegistry::all();
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert!(a.format() != b.format(), "duplicate shortcut {}", a.format());
            }
        }
    }

    #[test]
    fn test_enter_starts_text_editing() {
        let enter = ShortcutRegistry::all().into_iter().find(|s| s.key == "Enter").unwrap();
        assert!(enter.description.starts_with("Edit selected text"));
    }
}
