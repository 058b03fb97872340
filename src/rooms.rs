use lazy_static::lazy_static;
use regex::Regex;

pub const THE_RIAD: &str = "The Riad";
pub const THE_DOUARIA: &str = "The Douaria";

/// Separator between room names of a multi-room booking
pub const ROOM_JOIN: &str = " / ";

/// One entry of the room table: raw unit/listing text matching `pattern`
/// is the canonical `room` in `property`.
pub struct RoomPattern {
    pub pattern: Regex,
    pub room: &'static str,
    pub property: &'static str,
}

impl RoomPattern {
    fn new(pattern: &str, room: &'static str, property: &'static str) -> Self {
        RoomPattern {
            pattern: Regex::new(pattern).unwrap(),
            room,
            property,
        }
    }
}

lazy_static! {
    // Order matters: Douaria entries come first so "Double Room at the
    // Douaria" never falls through to the Riad's generic double room.
    // Every canonical room name also matches its own entry.
    pub static ref ROOM_PATTERNS: Vec<RoomPattern> = vec![
        RoomPattern::new(
            r"(?i)(annex|douaria).*(family|whole|entire)|(family|whole|entire).*(annex|douaria)",
            "Douaria Entire",
            THE_DOUARIA,
        ),
        RoomPattern::new(
            r"(?i)ahlam|(annex|douaria).*double|double.*(annex|douaria)",
            "Ahlam",
            THE_DOUARIA,
        ),
        RoomPattern::new(
            r"(?i)amal|(annex|douaria).*(twin|single)|(twin|single).*(annex|douaria)",
            "Amal",
            THE_DOUARIA,
        ),
        RoomPattern::new(r"(?i)jewel|^\s*double room", "Jewel Box", THE_RIAD),
        RoomPattern::new(r"(?i)bliss|deluxe", "Bliss", THE_RIAD),
        RoomPattern::new(r"(?i)\blove\b|suite", "Love", THE_RIAD),
        RoomPattern::new(r"(?i)heart|family|triple", "Heart", THE_RIAD),
    ];
}

/// Canonical room and property for a raw unit/listing string
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoomMatch {
    pub room: String,
    pub property: String,
}

fn match_segment(segment: &str) -> Option<&'static RoomPattern> {
    ROOM_PATTERNS
        .iter()
        .find(|entry| entry.pattern.is_match(segment))
}

fn property_by_keyword(raw: &str) -> &'static str {
    let lowered = raw.to_lowercase();
    if lowered.contains("annex") || lowered.contains("douaria") {
        THE_DOUARIA
    } else {
        // "medina"/"riad" and anything unrecognised
        THE_RIAD
    }
}

/// Map a raw unit string, possibly listing several rooms, to canonical names
///
/// Segments are split on `,` and `/`; each matched segment contributes its
/// room name. Unmatched input keeps its raw text as the room. The property is
/// taken from the first matched room, or guessed from keywords.
pub fn map_rooms(raw: &str) -> RoomMatch {
    let raw = raw.trim();
    let matched: Vec<&RoomPattern> = raw
        .split([',', '/'])
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .filter_map(match_segment)
        .collect();

    let room = if matched.is_empty() {
        raw.to_string()
    } else {
        matched
            .iter()
            .map(|entry| entry.room)
            .collect::<Vec<_>>()
            .join(ROOM_JOIN)
    };

    let property = match matched.first() {
        Some(entry) => entry.property,
        None => property_by_keyword(raw),
    };

    RoomMatch {
        room,
        property: property.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_rooms() {
        let riad = map_rooms("Double Room at The Riad");
        assert_eq!(riad.room, "Jewel Box");
        assert_eq!(riad.property, THE_RIAD);

        let annex = map_rooms("Double Room at the Douaria");
        assert_eq!(annex.room, "Ahlam");
        assert_eq!(annex.property, THE_DOUARIA);

        assert_eq!(map_rooms("Entire Douaria (sleeps 6)").room, "Douaria Entire");
    }

    #[test]
    fn multi_room_booking() {
        let rooms = map_rooms("Deluxe Double Room, Family Room");
        assert_eq!(rooms.room, "Bliss / Heart");
        assert_eq!(rooms.property, THE_RIAD);
    }

    #[test]
    fn unmatched_keeps_raw_text() {
        let rooms = map_rooms("Garden studio in the annex");
        assert_eq!(rooms.room, "Garden studio in the annex");
        assert_eq!(rooms.property, THE_DOUARIA);

        assert_eq!(map_rooms("Rooftop tent").property, THE_RIAD);
    }

    #[test]
    fn canonical_names_map_to_themselves() {
        for entry in ROOM_PATTERNS.iter() {
            let again = map_rooms(entry.room);
            assert_eq!(again.room, entry.room);
            assert_eq!(again.property, entry.property);
        }
    }
}
