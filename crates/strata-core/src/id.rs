//! Unique id generation for pipeline-originated messages.

/// Returns a 32-character hexadecimal id.
///
/// Used for messages the pipeline itself originates (station-info requests,
/// heartbeats); records arriving from producers keep their producer ids.
pub fn glass_id() -> String {
    let value: u128 = rand::random();
    format!("{value:032X}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_have_expected_shape() {
        let id = glass_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn ids_are_unique_in_practice() {
        let mut seen = std::collections::HashSet::new();
        for _ in 0..1000 {
            assert!(seen.insert(glass_id()));
        }
    }
}
