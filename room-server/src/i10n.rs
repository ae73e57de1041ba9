//! Static failure-reason text, grounded on `original_source`'s
//! `i10n.get_i10n_text("zh-rCN", key)` lookups scattered through `main.py`.
//! The wire format only ever carries an opaque UTF-8 reason string here, so
//! swapping the original's Chinese strings for English ones is a content
//! choice, not a protocol change. No locale negotiation: a single table.

pub fn text(key: &str) -> &'static str {
    match key {
        "room_already_exist" => "room already exists",
        "room_not_exist" => "room does not exist",
        "user_already_exist" => "user already in room",
        "not_in_room" => "not in a room",
        "not_host" => "not the room host",
        "not_select_chart" => "room is not selecting a chart",
        _ => "unknown error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_keys_resolve() {
        assert_eq!(text("not_host"), "not the room host");
    }

    #[test]
    fn unknown_key_has_a_fallback() {
        assert_eq!(text("made_up_key"), "unknown error");
    }
}
