// src/utils/avatar.rs

use serde::{Deserialize, Serialize};

/// What the front end draws for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Avatar {
    Icon {
        icon: String,
        #[serde(rename = "bgColor")]
        bg_color: String,
    },
    Initials {
        initials: String,
        #[serde(rename = "bgColor")]
        bg_color: String,
    },
}

/// Avatar payload as stored in the identity provider's photo field.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PhotoPayload {
    avatar_icon: Option<String>,
    avatar_bg_color: Option<String>,
}

/// Stable colour for a name: `hsl(h, 70%, 60%)`, with `h` from the classic
/// `c + (h << 5) - h` string hash over UTF-16 units (32-bit shift semantics).
pub fn color_for_name(name: &str) -> String {
    let mut hash: i64 = 0;
    for unit in name.encode_utf16() {
        let shifted = (hash as i32).wrapping_shl(5) as i64;
        hash = unit as i64 + shifted - hash;
    }
    let hue = hash.abs() % 360;
    format!("hsl({}, 70%, 60%)", hue)
}

/// First letter of every word, upper-cased.
pub fn initials(name: &str) -> String {
    name.split(' ')
        .filter(|w| !w.is_empty())
        .filter_map(|w| w.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

pub fn avatar_for(display_name: &str, icon: Option<&str>, bg_color: Option<&str>) -> Avatar {
    let bg_color = bg_color
        .filter(|c| !c.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| color_for_name(display_name));

    match icon.filter(|i| !i.trim().is_empty()) {
        Some(icon) => Avatar::Icon {
            icon: icon.to_string(),
            bg_color,
        },
        None => Avatar::Initials {
            initials: initials(display_name),
            bg_color,
        },
    }
}

/// Decodes the provider's photo field. Anything unrecognised shows initials.
pub fn avatar_from_photo(display_name: &str, photo: Option<&str>) -> Avatar {
    let payload = photo.and_then(|raw| match serde_json::from_str::<PhotoPayload>(raw) {
        Ok(payload) => Some(payload),
        Err(e) => {
            tracing::debug!("Unrecognised avatar payload, using initials: {}", e);
            None
        }
    });

    match payload {
        Some(p) => avatar_for(
            display_name,
            p.avatar_icon.as_deref(),
            p.avatar_bg_color.as_deref(),
        ),
        None => avatar_for(display_name, None, None),
    }
}

/// Encodes the avatar for the provider's photo field.
pub fn photo_payload(icon: Option<&str>, bg_color: Option<&str>) -> Option<String> {
    if icon.is_none() && bg_color.is_none() {
        return None;
    }
    serde_json::to_string(&PhotoPayload {
        avatar_icon: icon.map(str::to_string),
        avatar_bg_color: bg_color.map(str::to_string),
    })
    .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colour_is_deterministic() {
        assert_eq!(color_for_name("Ada Lovelace"), color_for_name("Ada Lovelace"));
        assert_eq!(color_for_name(""), "hsl(0, 70%, 60%)");
        // "a" hashes to 97
        assert_eq!(color_for_name("a"), "hsl(97, 70%, 60%)");
        // "ab": 98 + (97 << 5) - 97 = 3105 -> 3105 % 360 = 225
        assert_eq!(color_for_name("ab"), "hsl(225, 70%, 60%)");
    }

    #[test]
    fn initials_skip_extra_spaces() {
        assert_eq!(initials("ada  lovelace"), "AL");
        assert_eq!(initials(""), "");
    }

    #[test]
    fn icon_without_colour_gets_derived_colour() {
        let avatar = avatar_for("Ada", Some("fas fa-cat"), None);
        assert_eq!(
            avatar,
            Avatar::Icon {
                icon: "fas fa-cat".into(),
                bg_color: color_for_name("Ada"),
            }
        );
    }

    #[test]
    fn garbage_photo_falls_back_to_initials() {
        let avatar = avatar_from_photo("Grace Hopper", Some("https://example.com/me.png"));
        assert!(matches!(avatar, Avatar::Initials { ref initials, .. } if initials == "GH"));
    }

    #[test]
    fn photo_payload_round_trips() {
        let raw = photo_payload(Some("fas fa-dog"), Some("#123456")).unwrap();
        let avatar = avatar_from_photo("X", Some(&raw));
        assert_eq!(
            avatar,
            Avatar::Icon {
                icon: "fas fa-dog".into(),
                bg_color: "#123456".into(),
            }
        );
        assert_eq!(photo_payload(None, None), None);
    }
}
