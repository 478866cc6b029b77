//! Slug and SKU derivation.
//!
//! Only entity constructors call these, and only when the caller left the
//! field blank.

const FOLD_TABLE: &[(&str, char)] = &[
    ("àáạảãâầấậẩẫăằắặẳẵäåāą", 'a'),
    ("èéẹẻẽêềếệểễëēę", 'e'),
    ("ìíịỉĩïîī", 'i'),
    ("òóọỏõôồốộổỗơờớợởỡöøō", 'o'),
    ("ùúụủũưừứựửữüûū", 'u'),
    ("ỳýỵỷỹÿ", 'y'),
    ("đð", 'd'),
    ("çćč", 'c'),
    ("ñń", 'n'),
    ("śš", 's'),
    ("źżž", 'z'),
    ("ł", 'l'),
];

fn fold_char(c: char) -> Option<char> {
    if c.is_ascii() {
        return Some(c);
    }
    FOLD_TABLE
        .iter()
        .find(|(set, _)| set.contains(c))
        .map(|(_, base)| *base)
}

/// Lowercase, strip diacritics (`đ` becomes `d`), drop anything that is not
/// alphanumeric, turn separators into single hyphens and trim hyphens from
/// both ends.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;

    for c in text.chars().flat_map(char::to_lowercase) {
        match fold_char(c) {
            Some(c) if c.is_ascii_alphanumeric() => {
                if pending_hyphen && !slug.is_empty() {
                    slug.push('-');
                }
                pending_hyphen = false;
                slug.push(c);
            }
            Some(c) if c.is_whitespace() || c == '-' || c == '_' || c == '/' || c == '.' => {
                pending_hyphen = true;
            }
            // punctuation and unmapped scripts are dropped
            _ => {}
        }
    }

    slug
}

/// `PREFIX-ABC-XXXXXX`: initials of up to three name words plus a
/// time-sorted suffix.
pub fn generate_sku(prefix: &str, name: &str) -> String {
    let initials: String = slugify(name)
        .split('-')
        .filter_map(|word| word.chars().next())
        .take(3)
        .collect::<String>()
        .to_uppercase();
    let id = crate::TsidGenerator::generate();
    let suffix = &id[id.len() - 6..];

    if initials.is_empty() {
        format!("{}-{}", prefix, suffix)
    } else {
        format!("{}-{}-{}", prefix, initials, suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vietnamese_names() {
        assert_eq!(slugify("Sâm Ngọc Linh 6 năm tuổi"), "sam-ngoc-linh-6-nam-tuoi");
        assert_eq!(slugify("Đà Nẵng Riverside"), "da-nang-riverside");
        assert_eq!(slugify("Hồng sâm Hàn Quốc"), "hong-sam-han-quoc");
        assert_eq!(slugify("ĐƯỜNG PHỐ"), "duong-pho");
    }

    #[test]
    fn test_separators_and_punctuation() {
        assert_eq!(slugify("  Hello,   World!! "), "hello-world");
        assert_eq!(slugify("a -- b__c/d.e"), "a-b-c-d-e");
        assert_eq!(slugify("Căn hộ (2PN) & 3PN"), "can-ho-2pn-3pn");
        assert_eq!(slugify("---"), "");
        assert_eq!(slugify("Café Crème"), "cafe-creme");
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(slugify("Tin tức"), slugify("tin   TỨC"));
    }

    #[test]
    fn test_sku_shape() {
        let sku = generate_sku("GS", "Hồng sâm Hàn Quốc 6 năm");
        assert!(sku.starts_with("GS-HSH-"), "{}", sku);
        assert_eq!(sku.len(), "GS-HSH-".len() + 6);

        let bare = generate_sku("GS", "!!!");
        assert_eq!(bare.len(), "GS-".len() + 6);
    }
}
