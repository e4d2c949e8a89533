//! Utility functions shared by the directory and workflow modules

/// Canonical form for user ids. Registration and login both pass through
/// here, so lookups match regardless of the casing the caller typed.
pub fn normalize_id(id: &str) -> String {
    id.trim().to_lowercase()
}

/// Shorten a free-text message for inclusion in a history line. Cuts on a
/// char boundary and marks the cut with an ellipsis.
pub fn excerpt(message: &str, limit: usize) -> String {
    if message.chars().count() <= limit {
        return message.to_string();
    }

    let cut: String = message.chars().take(limit).collect();
    format!("{cut}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize_id("  KASU/20/1234 "), "kasu/20/1234");
        assert_eq!(normalize_id("Admin1"), "admin1");
    }

    #[test]
    fn excerpt_keeps_short_messages_whole() {
        assert_eq!(excerpt("short note", 70), "short note");
    }

    #[test]
    fn excerpt_cuts_on_char_boundaries() {
        // multibyte input must not split a char
        let msg = "résultat manquant pour l'épreuve".repeat(4);
        let cut = excerpt(&msg, 70);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), 73);
    }
}
