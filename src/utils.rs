// src/utils.rs

/// Deterministic chat room id for a user/therapist pair.
///
/// User and therapist ids come from separate sequences, so a bare number
/// does not identify a participant. Each side is tagged with its role,
/// which also makes the id independent of who opens the room.
pub fn room_id_for(user_id: i32, therapist_id: i32) -> String {
    format!("u{}_t{}", user_id, therapist_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_id_tags_participant_roles() {
        assert_eq!(room_id_for(7, 42), "u7_t42");
    }

    #[test]
    fn test_swapped_ids_are_distinct_rooms() {
        // user 3 with therapist 5 is not user 5 with therapist 3
        assert_ne!(room_id_for(3, 5), room_id_for(5, 3));
    }

    #[test]
    fn test_same_numeric_id_on_both_sides() {
        assert_eq!(room_id_for(3, 3), "u3_t3");
    }
}
