//! Rule-based make/model extraction used while the remote classifier is
//! unavailable.
//!
//! The only text signal available offline is the upload's file name or the
//! submitted URL, so a photo named `IMG_0042.jpg` cannot be identified here no
//! matter what it shows. Callers fall back to manual entry in that case.

use shared::EligibleVehicle;

use crate::catalog::Catalog;
use crate::config::FallbackConfidence;

pub const UNKNOWN_MODEL: &str = "Unknown";

const BODY_TYPES: &[&str] = &[
    "sedan",
    "coupe",
    "suv",
    "convertible",
    "hatchback",
    "wagon",
    "minivan",
    "pickup",
    "van",
    "cab",
    "truck",
];

/// Lower-cases and drops everything that is not a letter or digit, so
/// `Model 3` and `model3` compare equal.
pub fn compact(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Lower-cased words of `text`. Any run of non-alphanumerics separates two
/// words, so `my_chevy_bolt_ev.jpg` yields `my chevy bolt ev jpg`.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Whether consecutive words starting at `start` spell `phrase` exactly,
/// ignoring the spacing inside the phrase. `["model3"]` and
/// `["model", "3"]` both spell `Model 3`; `["etransit"]` does not spell
/// `Transit`.
fn spells_at(words: &[String], start: usize, phrase: &str) -> bool {
    let target = compact(phrase);
    if target.is_empty() {
        return false;
    }
    let mut joined = String::new();
    for word in &words[start..] {
        joined.push_str(word);
        if joined == target {
            return true;
        }
        if !target.starts_with(&joined) {
            return false;
        }
    }
    false
}

/// `phrase` appears in `words` on word boundaries.
pub fn contains_phrase(words: &[String], phrase: &str) -> bool {
    (0..words.len()).any(|start| spells_at(words, start, phrase))
}

/// `words` begin with `phrase`, possibly followed by more words.
pub fn starts_with_phrase(words: &[String], phrase: &str) -> bool {
    !words.is_empty() && spells_at(words, 0, phrase)
}

/// Splits a classifier label such as `Tesla Model S Sedan 2012` into
/// `("Tesla", "Model S")`. Body type and year tokens end the model name.
pub fn parse_class_name(label: &str) -> Option<(String, String)> {
    let mut tokens = label.split_whitespace();
    let make = tokens.next()?;
    let model: Vec<&str> = tokens
        .take_while(|token| {
            let lower = token.to_lowercase();
            !BODY_TYPES.contains(&lower.as_str()) && !token.chars().all(|c| c.is_ascii_digit())
        })
        .collect();
    if model.is_empty() {
        return None;
    }
    Some((make.to_string(), model.join(" ")))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractedVehicle {
    /// Both make and a catalog model were found in the text.
    Identified(EligibleVehicle),
    /// A manufacturer was recognised but none of its catalog models.
    MakeOnly { make: String },
}

impl ExtractedVehicle {
    pub fn make(&self) -> &str {
        match self {
            ExtractedVehicle::Identified(vehicle) => &vehicle.make,
            ExtractedVehicle::MakeOnly { make } => make,
        }
    }

    pub fn model(&self) -> &str {
        match self {
            ExtractedVehicle::Identified(vehicle) => &vehicle.model,
            ExtractedVehicle::MakeOnly { .. } => UNKNOWN_MODEL,
        }
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, ExtractedVehicle::MakeOnly { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EligibilityVerdict {
    pub name: String,
    pub qualified: bool,
    pub confidence: f32,
    pub reason: String,
    pub vehicle: Option<EligibleVehicle>,
}

#[derive(Debug, Clone, Copy)]
pub struct LocalMatcher {
    catalog: &'static Catalog,
    confidence: FallbackConfidence,
}

impl Default for LocalMatcher {
    fn default() -> Self {
        Self::new(Catalog::global(), FallbackConfidence::default())
    }
}

impl LocalMatcher {
    pub fn new(catalog: &'static Catalog, confidence: FallbackConfidence) -> Self {
        Self {
            catalog,
            confidence,
        }
    }

    pub fn catalog(&self) -> &'static Catalog {
        self.catalog
    }

    /// First known manufacturer in list order wins, then the first of its
    /// catalog models found in the text. Names only match on word
    /// boundaries: `ford_white_transit_van.jpg` names no `E-Transit`.
    pub fn match_from_text(&self, text: &str) -> Option<ExtractedVehicle> {
        let words = tokenize(text);
        if words.is_empty() {
            return None;
        }

        let make = self
            .catalog
            .known_makes()
            .iter()
            .find(|known| contains_phrase(&words, known.alias))?
            .canonical;

        let model = self
            .catalog
            .models_for(make)
            .find(|vehicle| contains_phrase(&words, &vehicle.model));

        Some(match model {
            Some(vehicle) => ExtractedVehicle::Identified(vehicle.clone()),
            None => ExtractedVehicle::MakeOnly {
                make: make.to_string(),
            },
        })
    }

    /// Never fails: every input yields a verdict.
    pub fn check_eligibility(&self, make: &str, model: &str) -> EligibilityVerdict {
        let make = make.trim();
        let model = model.trim();
        if make.is_empty() || compact(model).is_empty() {
            return EligibilityVerdict {
                name: "Unknown vehicle".to_string(),
                qualified: false,
                confidence: 0.0,
                reason: "Unable to identify vehicle make and model".to_string(),
                vehicle: None,
            };
        }

        let canonical = self.canonical_make(make);
        match self.catalog.lookup(canonical, model) {
            Some(vehicle) => EligibilityVerdict {
                name: vehicle.display_name(),
                qualified: true,
                confidence: self.confidence.qualified,
                reason: format!(
                    "{} ({}) is eligible for Clean Cars 4 All tax benefits ({})",
                    vehicle.display_name(),
                    vehicle.vehicle_type,
                    vehicle.years
                ),
                vehicle: Some(vehicle.clone()),
            },
            None => EligibilityVerdict {
                name: format!("{make} {model}"),
                qualified: false,
                confidence: self.confidence.not_qualified,
                reason: format!(
                    "{make} {model} is not in the Clean Cars 4 All eligible vehicle database. \
                     Only BEVs (Battery Electric Vehicles) and PHEVs (Plug-in Hybrid Electric \
                     Vehicles) from 2015+ may qualify."
                ),
                vehicle: None,
            },
        }
    }

    /// Catalog entry for a remote class label, if the label names one.
    pub fn vehicle_for_label(&self, label: &str) -> Option<&'static EligibleVehicle> {
        let (make, model) = parse_class_name(label)?;
        self.catalog.lookup(self.canonical_make(&make), &model)
    }

    fn canonical_make<'a>(&self, make: &'a str) -> &'a str {
        self.catalog
            .known_makes()
            .iter()
            .find(|known| known.alias.eq_ignore_ascii_case(make))
            .map(|known| known.canonical)
            .unwrap_or(make)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::VehicleType;

    fn matcher() -> LocalMatcher {
        LocalMatcher::default()
    }

    #[test]
    fn compact_strips_separators() {
        assert_eq!(compact("My_Chevy-Bolt EV.jpg"), "mychevyboltevjpg");
        assert_eq!(compact(" - "), "");
    }

    #[test]
    fn tokenize_splits_on_separator_runs() {
        assert_eq!(
            tokenize("My_Chevy--Bolt EV.jpg"),
            vec!["my", "chevy", "bolt", "ev", "jpg"]
        );
        assert!(tokenize("__").is_empty());
    }

    #[test]
    fn phrases_match_on_word_boundaries() {
        let words = tokenize("ford_white_transit_van.jpg");
        assert!(contains_phrase(&words, "Transit"));
        assert!(!contains_phrase(&words, "E-Transit"));
        assert!(contains_phrase(&tokenize("tesla_model3"), "Model 3"));
        assert!(contains_phrase(&tokenize("tesla model 3"), "Model 3"));
        assert!(!contains_phrase(&tokenize("bmw_mini_3"), "i3"));
        assert!(starts_with_phrase(&tokenize("Bolt EV Premier"), "Bolt EV"));
        assert!(!starts_with_phrase(&tokenize("i30"), "i3"));
    }

    #[test]
    fn neighbouring_words_do_not_form_a_model() {
        let found = matcher().match_from_text("ford_white_transit_van.jpg").unwrap();
        assert_eq!(found.make(), "Ford");
        assert!(found.is_partial());

        let found = matcher().match_from_text("bmw_mini_3.jpg").unwrap();
        assert_eq!(found.make(), "BMW");
        assert!(found.is_partial());
    }

    #[test]
    fn make_must_be_a_whole_word() {
        assert!(matcher().match_from_text("program_notes.jpg").is_none());
        assert!(matcher().match_from_text("kiawah_island.png").is_none());
    }

    #[test]
    fn extracts_alias_and_model_from_file_name() {
        let found = matcher().match_from_text("my_chevy_bolt_ev.jpg").unwrap();
        assert_eq!(found.make(), "Chevrolet");
        assert_eq!(found.model(), "Bolt EV");
        assert!(!found.is_partial());
    }

    #[test]
    fn extracts_model_written_without_space() {
        let found = matcher().match_from_text("tesla_model3.jpg").unwrap();
        assert_eq!(found.model(), "Model 3");
    }

    #[test]
    fn make_without_catalog_model_is_partial() {
        let found = matcher().match_from_text("toyota-camry-2019.png").unwrap();
        assert_eq!(found.make(), "Toyota");
        assert_eq!(found.model(), UNKNOWN_MODEL);
        assert!(found.is_partial());
    }

    #[test]
    fn vw_alias_is_canonicalised() {
        let found = matcher().match_from_text("https://cdn.example.com/vw-id4.webp").unwrap();
        assert_eq!(found.make(), "Volkswagen");
        assert_eq!(found.model(), "ID.4");
    }

    #[test]
    fn unrelated_text_matches_nothing() {
        assert!(matcher().match_from_text("random_photo.jpg").is_none());
        assert!(matcher().match_from_text("img001.jpg").is_none());
        assert!(matcher().match_from_text("").is_none());
    }

    #[test]
    fn list_order_breaks_ties() {
        // Both makes appear; Tesla precedes Nissan in the known list.
        let found = matcher().match_from_text("nissan_leaf_vs_tesla.jpg").unwrap();
        assert_eq!(found.make(), "Tesla");
        assert!(found.is_partial());
    }

    #[test]
    fn eligible_vehicle_qualifies() {
        let verdict = matcher().check_eligibility("Tesla", "Model 3");
        assert!(verdict.qualified);
        assert_eq!(verdict.confidence, 0.75);
        assert_eq!(verdict.vehicle.as_ref().unwrap().vehicle_type, VehicleType::Bev);
        assert!(verdict.reason.contains("Tesla Model 3 (BEV)"));
        assert!(verdict.reason.contains("2015-2025"));
    }

    #[test]
    fn absent_vehicle_does_not_qualify() {
        let verdict = matcher().check_eligibility("Toyota", "Camry");
        assert!(!verdict.qualified);
        assert_eq!(verdict.confidence, 0.60);
        assert_eq!(verdict.name, "Toyota Camry");
        assert!(verdict.reason.contains("2015+"));
    }

    #[test]
    fn empty_input_is_unidentified() {
        let verdict = matcher().check_eligibility("", "");
        assert!(!verdict.qualified);
        assert_eq!(verdict.confidence, 0.0);
        assert_eq!(verdict.reason, "Unable to identify vehicle make and model");

        assert_eq!(matcher().check_eligibility("Tesla", "   ").confidence, 0.0);
    }

    #[test]
    fn manual_alias_resolves_to_catalog_make() {
        let verdict = matcher().check_eligibility("chevy", "volt");
        assert!(verdict.qualified);
        assert_eq!(verdict.name, "Chevrolet Volt");
    }

    #[test]
    fn longer_model_input_does_not_match_shorter_catalog_model() {
        assert!(!matcher().check_eligibility("Polestar", "1 2020").qualified);
        assert!(!matcher().check_eligibility("BMW", "i30").qualified);
        assert!(!matcher().check_eligibility("Kia", "EV60").qualified);
    }

    #[test]
    fn trim_level_after_full_model_still_qualifies() {
        let verdict = matcher().check_eligibility("Chevrolet", "Bolt EV Premier");
        assert!(verdict.qualified);
        assert_eq!(verdict.name, "Chevrolet Bolt EV");
    }

    #[test]
    fn custom_confidence_levels_are_used() {
        let matcher = LocalMatcher::new(
            Catalog::global(),
            FallbackConfidence {
                qualified: 0.9,
                not_qualified: 0.5,
            },
        );
        assert_eq!(matcher.check_eligibility("Nissan", "Leaf").confidence, 0.9);
        assert_eq!(matcher.check_eligibility("Nissan", "Altima").confidence, 0.5);
    }

    #[test]
    fn class_labels_parse_to_make_and_model() {
        assert_eq!(
            parse_class_name("Tesla Model S Sedan 2012"),
            Some(("Tesla".to_string(), "Model S".to_string()))
        );
        assert_eq!(
            parse_class_name("Chevrolet Volt Hatchback 2012"),
            Some(("Chevrolet".to_string(), "Volt".to_string()))
        );
        assert_eq!(parse_class_name("Tesla"), None);
        assert_eq!(parse_class_name("Ford 2012"), None);
    }

    #[test]
    fn labels_map_to_catalog_entries() {
        let vehicle = matcher().vehicle_for_label("Chevrolet Volt Hatchback 2012").unwrap();
        assert_eq!(vehicle.vehicle_type, VehicleType::Phev);
        assert!(matcher().vehicle_for_label("Honda Accord Sedan 2012").is_none());
    }
}
