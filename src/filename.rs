//! Encoded export file names.
//!
//! Every exported note is written under a name that carries its notebook,
//! title, and the tail of its id, e.g.
//! `Notebook[Trips]__Note[France]__Id[ab12].enex`. The same names later come
//! back inside answer citations, so the codec doubles as the citation
//! decoder.
//!
//! Two delimiter schemes exist. A [`FilenameCodec`] is bound to exactly one
//! of them so that encoding and decoding always agree.
//!
//! Decoding is best effort: a notebook or title that itself contains the
//! delimiter tokens (`]__Note[`, `__Id__`, ...) cannot be recovered exactly.
//! A mangled name never swallows the names that follow it; each candidate
//! ends at its own `.enex` and starts at the last `Notebook` prefix before it.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::models::CitationEntry;

/// Extension of every exported file.
pub const ENEX_EXTENSION: &str = ".enex";

/// Number of trailing id characters kept in a file name.
pub const ID_SUFFIX_LEN: usize = 4;

/// Characters that are not allowed in file names on common filesystems.
const ILLEGAL_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

static BRACKETED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Notebook\[(.*?)\]__Note\[(.*?)\]__Id\[([^\]]*)\]\.enex$")
        .expect("valid bracketed name regex")
});

static UNDERSCORED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Notebook__(.*?)__Note__(.*?)__Id__([^\s.,/\\]*)\.enex$")
        .expect("valid underscored name regex")
});

/// Delimiter layout of an encoded file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilenameScheme {
    /// `Notebook[<n>]__Note[<t>]__Id[<id>].enex`
    #[default]
    Bracketed,
    /// `Notebook__<n>__Note__<t>__Id__<id>.enex`
    Underscored,
}

impl FromStr for FilenameScheme {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bracketed" => Ok(Self::Bracketed),
            "underscored" => Ok(Self::Underscored),
            other => Err(ConfigError::UnknownScheme(other.to_string())),
        }
    }
}

impl fmt::Display for FilenameScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bracketed => write!(f, "bracketed"),
            Self::Underscored => write!(f, "underscored"),
        }
    }
}

/// Encoder/decoder for one [`FilenameScheme`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilenameCodec {
    scheme: FilenameScheme,
}

impl FilenameCodec {
    pub fn new(scheme: FilenameScheme) -> Self {
        Self { scheme }
    }

    pub fn scheme(&self) -> FilenameScheme {
        self.scheme
    }

    /// Build the sanitized file name for a note.
    ///
    /// Only the last [`ID_SUFFIX_LEN`] characters of `note_id` are kept.
    pub fn encode(&self, notebook: &str, title: &str, note_id: &str) -> String {
        let id = id_suffix(note_id);
        let raw = match self.scheme {
            FilenameScheme::Bracketed => {
                format!("Notebook[{notebook}]__Note[{title}]__Id[{id}]{ENEX_EXTENSION}")
            }
            FilenameScheme::Underscored => {
                format!("Notebook__{notebook}__Note__{title}__Id__{id}{ENEX_EXTENSION}")
            }
        };
        sanitize(&raw)
    }

    /// Extract every encoded name found in `text`, in order of appearance.
    ///
    /// `text` may hold full paths, comma-separated lists, or surrounding
    /// prose. Returns an empty vector when nothing matches.
    pub fn decode_all(&self, text: &str) -> Vec<CitationEntry> {
        let prefix = self.prefix();
        let mut entries = Vec::new();
        let mut rest = text;

        while let Some(end) = rest.find(ENEX_EXTENSION) {
            let (candidate, tail) = rest.split_at(end + ENEX_EXTENSION.len());
            rest = tail;
            let Some(start) = candidate.rfind(prefix) else {
                continue;
            };
            if let Some(caps) = self.pattern().captures(&candidate[start..]) {
                entries.push(CitationEntry {
                    notebook: caps[1].to_string(),
                    title: caps[2].to_string(),
                    id_suffix: caps
                        .get(3)
                        .map(|m| m.as_str().to_string())
                        .filter(|s| !s.is_empty()),
                });
            }
        }
        entries
    }

    /// Decode a single file name (or path), if it is an encoded name.
    pub fn decode(&self, name: &str) -> Option<CitationEntry> {
        self.decode_all(name).into_iter().next()
    }

    fn prefix(&self) -> &'static str {
        match self.scheme {
            FilenameScheme::Bracketed => "Notebook[",
            FilenameScheme::Underscored => "Notebook__",
        }
    }

    fn pattern(&self) -> &'static Regex {
        match self.scheme {
            FilenameScheme::Bracketed => &BRACKETED_RE,
            FilenameScheme::Underscored => &UNDERSCORED_RE,
        }
    }
}

/// Replace every filesystem-illegal character with `_`.
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if ILLEGAL_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// The last [`ID_SUFFIX_LEN`] characters of `note_id`.
pub fn id_suffix(note_id: &str) -> String {
    let len = note_id.chars().count();
    note_id
        .chars()
        .skip(len.saturating_sub(ID_SUFFIX_LEN))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bracketed() -> FilenameCodec {
        FilenameCodec::new(FilenameScheme::Bracketed)
    }

    fn underscored() -> FilenameCodec {
        FilenameCodec::new(FilenameScheme::Underscored)
    }

    #[test]
    fn test_encode_bracketed() {
        let name = bracketed().encode("Trips", "France", "77bd1ddc-a2f4-ff71-f982-c8e00b99ab12");
        assert_eq!(name, "Notebook[Trips]__Note[France]__Id[ab12].enex");
    }

    #[test]
    fn test_encode_underscored() {
        let name = underscored().encode("Trips", "France", "ab12");
        assert_eq!(name, "Notebook__Trips__Note__France__Id__ab12.enex");
    }

    #[test]
    fn test_short_id_kept_whole() {
        let name = bracketed().encode("A", "B", "x9");
        assert!(name.ends_with("__Id[x9].enex"));
    }

    #[test]
    fn test_round_trip_both_schemes() {
        let cases = [
            ("Health", "Right Elbow Pain - 01-11-23", "9f3c"),
            ("Family", "Appointment with Dr. Patel", "0a0b"),
            ("Home", "Groceries, weekly", "ffff"),
        ];
        for codec in [bracketed(), underscored()] {
            for (nb, title, id) in cases {
                let decoded = codec.decode_all(&codec.encode(nb, title, id));
                assert_eq!(decoded.len(), 1, "{:?}: {}", codec.scheme(), title);
                assert_eq!(decoded[0].notebook, nb);
                assert_eq!(decoded[0].title, title);
                assert_eq!(decoded[0].id_suffix.as_deref(), Some(id));
            }
        }
    }

    #[test]
    fn test_sanitizes_illegal_characters() {
        let name = bracketed().encode("Work/Projects", "Q3: plan <draft>? \"v2\" a|b*c\\d", "1234");
        for c in ILLEGAL_CHARS {
            assert!(!name.contains(*c), "{:?} survived in {}", c, name);
        }
        assert!(name.contains("Work_Projects"));
        assert!(name.contains("Q3_ plan _draft__ _v2_ a_b_c_d"));
    }

    #[test]
    fn test_decode_multiple_with_paths() {
        let text = ": /data/notes/Notebook[Health]__Note[Elbow]__Id[77bd].enex, \
                    /data/notes/Notebook[Health]__Note[Physio visit]__Id[dc51].enex";
        let decoded = bracketed().decode_all(text);
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].title, "Elbow");
        assert_eq!(decoded[1].title, "Physio visit");
        assert_eq!(decoded[1].notebook, "Health");
    }

    #[test]
    fn test_mangled_name_does_not_swallow_next() {
        let text = "SOURCES: /x/Notebook[A]__Note[broken.enex, /x/Notebook[B]__Note[C]__Id[1234].enex";
        let decoded = bracketed().decode_all(text);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].notebook, "B");
        assert_eq!(decoded[0].title, "C");
        assert_eq!(decoded[0].id_suffix.as_deref(), Some("1234"));

        let text = "Notebook__A__Note__broken.enex, Notebook__B__Note__C__Id__1234.enex";
        let decoded = underscored().decode_all(text);
        assert_eq!(decoded.len(), 1);
        assert_eq!((decoded[0].notebook.as_str(), decoded[0].title.as_str()), ("B", "C"));
    }

    #[test]
    fn test_decode_no_match_is_empty() {
        assert!(bracketed().decode_all("I don't know.").is_empty());
        assert!(bracketed().decode_all("").is_empty());
    }

    #[test]
    fn test_schemes_do_not_cross_decode() {
        let name = underscored().encode("A", "B", "1234");
        assert!(bracketed().decode_all(&name).is_empty());
    }

    #[test]
    fn test_scheme_from_str() {
        assert_eq!(
            "Underscored".parse::<FilenameScheme>().unwrap(),
            FilenameScheme::Underscored
        );
        assert!("dashes".parse::<FilenameScheme>().is_err());
    }
}
