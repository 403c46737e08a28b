//! Decomposes logo descriptors into one canonical value per axis.
//!
//! Resolution order per axis: a token inside the composite string (last one wins), then the
//! separately supplied structured field, then the default. Parsing never fails; anything it
//! cannot use is reported as a note.

use serde::{Deserialize, Serialize};

use crate::domain::logo::{
    ApplicationMethod, CompositeLogo, DecorationMethod, LogoDescriptor, LogoHints, LogoSize,
    ResolvedLogo,
};

const TOKEN_SEPARATORS: [char; 5] = ['+', ',', ';', '&', '|'];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AxisValue {
    Size(LogoSize),
    Decoration(DecorationMethod),
    Application(ApplicationMethod),
}

/// Longest phrases first so `"3d embroidery"` beats `"embroidery"`.
const VOCABULARY: &[(&[&str], AxisValue)] = &[
    (&["3d", "puff", "embroidery"], AxisValue::Decoration(DecorationMethod::ThreeDEmbroidery)),
    (&["3d", "embroidery"], AxisValue::Decoration(DecorationMethod::ThreeDEmbroidery)),
    (&["3d", "embroidered"], AxisValue::Decoration(DecorationMethod::ThreeDEmbroidery)),
    (&["puff", "embroidery"], AxisValue::Decoration(DecorationMethod::ThreeDEmbroidery)),
    (&["flat", "embroidery"], AxisValue::Decoration(DecorationMethod::FlatEmbroidery)),
    (&["laser", "cut"], AxisValue::Decoration(DecorationMethod::LaserCut)),
    (&["rubber", "patch"], AxisValue::Decoration(DecorationMethod::RubberPatch)),
    (&["pvc", "patch"], AxisValue::Decoration(DecorationMethod::RubberPatch)),
    (&["leather", "patch"], AxisValue::Decoration(DecorationMethod::LeatherPatch)),
    (&["woven", "patch"], AxisValue::Decoration(DecorationMethod::WovenPatch)),
    (&["printed", "patch"], AxisValue::Decoration(DecorationMethod::PrintedPatch)),
    (&["sublimated", "patch"], AxisValue::Decoration(DecorationMethod::PrintedPatch)),
    (&["screen", "print"], AxisValue::Decoration(DecorationMethod::ScreenPrint)),
    (&["screen", "printed"], AxisValue::Decoration(DecorationMethod::ScreenPrint)),
    (&["extra", "large"], AxisValue::Size(LogoSize::ExtraLarge)),
    (&["x", "large"], AxisValue::Size(LogoSize::ExtraLarge)),
    (&["3d"], AxisValue::Decoration(DecorationMethod::ThreeDEmbroidery)),
    (&["puff"], AxisValue::Decoration(DecorationMethod::ThreeDEmbroidery)),
    (&["embroidery"], AxisValue::Decoration(DecorationMethod::FlatEmbroidery)),
    (&["embroidered"], AxisValue::Decoration(DecorationMethod::FlatEmbroidery)),
    (&["flat"], AxisValue::Decoration(DecorationMethod::FlatEmbroidery)),
    (&["laser"], AxisValue::Decoration(DecorationMethod::LaserCut)),
    (&["rubber"], AxisValue::Decoration(DecorationMethod::RubberPatch)),
    (&["pvc"], AxisValue::Decoration(DecorationMethod::RubberPatch)),
    (&["leather"], AxisValue::Decoration(DecorationMethod::LeatherPatch)),
    (&["woven"], AxisValue::Decoration(DecorationMethod::WovenPatch)),
    (&["sublimated"], AxisValue::Decoration(DecorationMethod::PrintedPatch)),
    (&["screenprint"], AxisValue::Decoration(DecorationMethod::ScreenPrint)),
    (&["xl"], AxisValue::Size(LogoSize::ExtraLarge)),
    (&["small"], AxisValue::Size(LogoSize::Small)),
    (&["medium"], AxisValue::Size(LogoSize::Medium)),
    (&["large"], AxisValue::Size(LogoSize::Large)),
    (&["direct"], AxisValue::Application(ApplicationMethod::Direct)),
    (&["run"], AxisValue::Application(ApplicationMethod::Run)),
    (&["velcro"], AxisValue::Application(ApplicationMethod::Velcro)),
    (&["satin"], AxisValue::Application(ApplicationMethod::Satin)),
];

const LONGEST_PHRASE: usize = 3;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoParse {
    pub logo: ResolvedLogo,
    pub notes: Vec<String>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LogoSpecParser;

#[derive(Default)]
struct AxisMatches {
    size: Option<LogoSize>,
    decoration: Option<DecorationMethod>,
    application: Option<ApplicationMethod>,
}

impl AxisMatches {
    fn record(&mut self, value: AxisValue) {
        match value {
            AxisValue::Size(size) => self.size = Some(size),
            AxisValue::Decoration(decoration) => self.decoration = Some(decoration),
            AxisValue::Application(application) => self.application = Some(application),
        }
    }

    fn is_empty(&self) -> bool {
        self.size.is_none() && self.decoration.is_none() && self.application.is_none()
    }
}

impl LogoSpecParser {
    pub fn resolve(&self, descriptor: &LogoDescriptor) -> LogoParse {
        match descriptor {
            LogoDescriptor::Simple(logo) => LogoParse { logo: *logo, notes: Vec::new() },
            LogoDescriptor::Composite(composite) => self.decompose(composite),
        }
    }

    pub fn decompose(&self, composite: &CompositeLogo) -> LogoParse {
        let mut notes = Vec::new();
        let mut found = AxisMatches::default();

        for raw in &composite.raw_tokens {
            for token in raw.split(TOKEN_SEPARATORS).map(str::trim).filter(|t| !t.is_empty()) {
                let matched = match_phrases(&words(token));
                if matched.is_empty() {
                    notes.push(format!("ignored unrecognized logo token `{token}`"));
                }
                for value in matched {
                    found.record(value);
                }
            }
        }

        if found.is_empty() && composite.hints.is_empty() {
            let raw = composite.raw_tokens.join(" + ");
            let logo = ResolvedLogo::default();
            notes.push(if raw.trim().is_empty() {
                format!("empty logo description; using defaults ({logo})")
            } else {
                format!("could not read logo description `{raw}`; using defaults ({logo})")
            });
            return LogoParse { logo, notes };
        }

        let hints = HintValues::parse(&composite.hints, &mut notes);

        let decoration = pick(
            "decoration",
            found.decoration,
            hints.decoration,
            ResolvedLogo::DEFAULT_DECORATION,
            DecorationMethod::label,
            &mut notes,
        );
        let size = pick(
            "size",
            found.size,
            hints.size,
            ResolvedLogo::DEFAULT_SIZE,
            LogoSize::label,
            &mut notes,
        );
        let application = pick(
            "application",
            found.application,
            hints.application,
            ResolvedLogo::DEFAULT_APPLICATION,
            ApplicationMethod::label,
            &mut notes,
        );

        LogoParse { logo: ResolvedLogo::new(decoration, size, application), notes }
    }

    pub fn parse_size(&self, raw: &str) -> Option<LogoSize> {
        exact(raw).and_then(|value| match value {
            AxisValue::Size(size) => Some(size),
            _ => None,
        })
    }

    pub fn parse_decoration(&self, raw: &str) -> Option<DecorationMethod> {
        exact(raw).and_then(|value| match value {
            AxisValue::Decoration(decoration) => Some(decoration),
            _ => None,
        })
    }

    pub fn parse_application(&self, raw: &str) -> Option<ApplicationMethod> {
        exact(raw).and_then(|value| match value {
            AxisValue::Application(application) => Some(application),
            _ => None,
        })
    }
}

struct HintValues {
    size: Option<LogoSize>,
    decoration: Option<DecorationMethod>,
    application: Option<ApplicationMethod>,
}

impl HintValues {
    fn parse(hints: &LogoHints, notes: &mut Vec<String>) -> Self {
        let parser = LogoSpecParser;
        let mut read = |field: &str, raw: Option<&String>| -> Option<AxisValue> {
            let raw = raw?.trim();
            if raw.is_empty() {
                return None;
            }
            let parsed = match field {
                "size" => parser.parse_size(raw).map(AxisValue::Size),
                "decoration" => parser.parse_decoration(raw).map(AxisValue::Decoration),
                _ => parser.parse_application(raw).map(AxisValue::Application),
            };
            if parsed.is_none() {
                notes.push(format!("ignored unrecognized logo {field} `{raw}`"));
            }
            parsed
        };

        let size = match read("size", hints.size.as_ref()) {
            Some(AxisValue::Size(size)) => Some(size),
            _ => None,
        };
        let decoration = match read("decoration", hints.decoration_method.as_ref()) {
            Some(AxisValue::Decoration(decoration)) => Some(decoration),
            _ => None,
        };
        let application = match read("application", hints.application_method.as_ref()) {
            Some(AxisValue::Application(application)) => Some(application),
            _ => None,
        };
        Self { size, decoration, application }
    }
}

fn pick<T: Copy + PartialEq>(
    axis: &str,
    composite: Option<T>,
    structured: Option<T>,
    default: T,
    label: fn(&T) -> &'static str,
    notes: &mut Vec<String>,
) -> T {
    match (composite, structured) {
        (Some(from_text), Some(from_field)) => {
            if from_text != from_field {
                notes.push(format!(
                    "logo {axis} `{}` from the description overrides the {axis} field `{}`",
                    label(&from_text),
                    label(&from_field)
                ));
            }
            from_text
        }
        (Some(from_text), None) => from_text,
        (None, Some(from_field)) => from_field,
        (None, None) => {
            notes.push(format!("logo {axis} not specified; using {}", label(&default)));
            default
        }
    }
}

fn words(token: &str) -> Vec<String> {
    token
        .split(|ch: char| !ch.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_ascii_lowercase)
        .collect()
}

fn match_phrases(words: &[String]) -> Vec<AxisValue> {
    let mut matched = Vec::new();
    let mut index = 0;
    while index < words.len() {
        let hit = (1..=LONGEST_PHRASE.min(words.len() - index)).rev().find_map(|width| {
            let window = &words[index..index + width];
            VOCABULARY
                .iter()
                .find(|(phrase, _)| {
                    phrase.len() == width && phrase.iter().zip(window).all(|(p, w)| p == w)
                })
                .map(|(_, value)| (width, *value))
        });
        match hit {
            Some((width, value)) => {
                matched.push(value);
                index += width;
            }
            None => index += 1,
        }
    }
    matched
}

/// A value whose words form exactly one vocabulary phrase.
fn exact(raw: &str) -> Option<AxisValue> {
    let words = words(raw);
    VOCABULARY
        .iter()
        .find(|(phrase, _)| {
            phrase.len() == words.len() && phrase.iter().zip(&words).all(|(p, w)| p == w)
        })
        .map(|(_, value)| *value)
}
