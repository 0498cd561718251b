use lazy_static::lazy_static;
use shared::{EligibleVehicle, VehicleType, YearRange};

use crate::matcher::{compact, starts_with_phrase, tokenize};

const MIN_SEARCH_LEN: usize = 2;

// make, model, first year, last year, type
const ELIGIBLE: &[(&str, &str, u16, u16, VehicleType)] = &[
    ("Tesla", "Model S", 2015, 2025, VehicleType::Bev),
    ("Tesla", "Model 3", 2015, 2025, VehicleType::Bev),
    ("Tesla", "Model X", 2015, 2025, VehicleType::Bev),
    ("Tesla", "Model Y", 2020, 2025, VehicleType::Bev),
    ("Chevrolet", "Bolt EV", 2017, 2025, VehicleType::Bev),
    ("Chevrolet", "Bolt EUV", 2022, 2025, VehicleType::Bev),
    ("Chevrolet", "Volt", 2015, 2019, VehicleType::Phev),
    ("Nissan", "Leaf", 2015, 2025, VehicleType::Bev),
    ("Nissan", "Ariya", 2023, 2025, VehicleType::Bev),
    ("Toyota", "Prius Prime", 2017, 2025, VehicleType::Phev),
    ("Toyota", "RAV4 Prime", 2021, 2025, VehicleType::Phev),
    ("Toyota", "bZ4X", 2023, 2025, VehicleType::Bev),
    ("Honda", "Clarity", 2018, 2021, VehicleType::Phev),
    ("Ford", "Mustang Mach-E", 2021, 2025, VehicleType::Bev),
    ("Ford", "F-150 Lightning", 2022, 2025, VehicleType::Bev),
    ("Ford", "E-Transit", 2022, 2025, VehicleType::Bev),
    ("Hyundai", "Ioniq 5", 2022, 2025, VehicleType::Bev),
    ("Hyundai", "Ioniq 6", 2023, 2025, VehicleType::Bev),
    ("Hyundai", "Kona Electric", 2019, 2025, VehicleType::Bev),
    ("Kia", "EV6", 2022, 2025, VehicleType::Bev),
    ("Kia", "Niro EV", 2019, 2025, VehicleType::Bev),
    ("BMW", "i3", 2015, 2021, VehicleType::Bev),
    ("BMW", "i4", 2022, 2025, VehicleType::Bev),
    ("BMW", "iX", 2022, 2025, VehicleType::Bev),
    ("Mercedes-Benz", "EQS", 2022, 2025, VehicleType::Bev),
    ("Mercedes-Benz", "EQE", 2023, 2025, VehicleType::Bev),
    ("Volkswagen", "ID.4", 2021, 2025, VehicleType::Bev),
    ("Audi", "e-tron", 2019, 2025, VehicleType::Bev),
    ("Audi", "Q4 e-tron", 2022, 2025, VehicleType::Bev),
    ("Rivian", "R1T", 2022, 2025, VehicleType::Bev),
    ("Rivian", "R1S", 2022, 2025, VehicleType::Bev),
    ("Polestar", "2", 2021, 2025, VehicleType::Bev),
    ("Lucid", "Air", 2022, 2025, VehicleType::Bev),
];

/// Manufacturer names recognised in free text, in match priority order.
/// Aliases map to the canonical catalog spelling.
const KNOWN_MAKES: &[(&str, &str)] = &[
    ("Tesla", "Tesla"),
    ("Chevrolet", "Chevrolet"),
    ("Chevy", "Chevrolet"),
    ("Nissan", "Nissan"),
    ("Toyota", "Toyota"),
    ("Honda", "Honda"),
    ("Ford", "Ford"),
    ("Hyundai", "Hyundai"),
    ("Kia", "Kia"),
    ("BMW", "BMW"),
    ("Mercedes", "Mercedes-Benz"),
    ("Mercedes-Benz", "Mercedes-Benz"),
    ("Volkswagen", "Volkswagen"),
    ("VW", "Volkswagen"),
    ("Audi", "Audi"),
    ("Rivian", "Rivian"),
    ("Polestar", "Polestar"),
    ("Lucid", "Lucid"),
    ("Volvo", "Volvo"),
    ("Porsche", "Porsche"),
    ("Jaguar", "Jaguar"),
    ("Mazda", "Mazda"),
    ("Subaru", "Subaru"),
    ("Mitsubishi", "Mitsubishi"),
    ("Lexus", "Lexus"),
    ("Acura", "Acura"),
    ("Cadillac", "Cadillac"),
    ("GMC", "GMC"),
    ("Jeep", "Jeep"),
    ("Dodge", "Dodge"),
    ("Chrysler", "Chrysler"),
    ("Ram", "Ram"),
    ("Buick", "Buick"),
    ("Lincoln", "Lincoln"),
];

lazy_static! {
    static ref BUILTIN: Catalog = Catalog::builtin();
}

/// A manufacturer spelling as it may appear in text, with its canonical name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownMake {
    pub alias: &'static str,
    pub canonical: &'static str,
}

/// Read-only list of vehicles that qualify for the incentive program.
#[derive(Debug, Clone)]
pub struct Catalog {
    vehicles: Vec<EligibleVehicle>,
    makes: Vec<KnownMake>,
}

impl Catalog {
    /// Process-wide catalog, built on first use.
    pub fn global() -> &'static Catalog {
        &BUILTIN
    }

    fn builtin() -> Self {
        let vehicles = ELIGIBLE
            .iter()
            .map(|&(make, model, start, end, vehicle_type)| EligibleVehicle {
                make: make.to_string(),
                model: model.to_string(),
                years: YearRange::new(start, end),
                vehicle_type,
            })
            .collect();
        let makes = KNOWN_MAKES
            .iter()
            .map(|&(alias, canonical)| KnownMake { alias, canonical })
            .collect();
        Self { vehicles, makes }
    }

    pub fn vehicles(&self) -> &[EligibleVehicle] {
        &self.vehicles
    }

    pub fn known_makes(&self) -> &[KnownMake] {
        &self.makes
    }

    pub fn models_for<'a>(&'a self, make: &str) -> impl Iterator<Item = &'a EligibleVehicle> + use<'a> {
        let make = make.trim().to_string();
        self.vehicles
            .iter()
            .filter(move |vehicle| vehicle.make.eq_ignore_ascii_case(&make))
    }

    /// Exact make, and a catalog model that contains `model` (ignoring case,
    /// spacing and punctuation). A `model` that begins with a whole catalog
    /// model followed by more words (`Bolt EV Premier`) also matches. First
    /// catalog entry wins.
    pub fn lookup(&self, make: &str, model: &str) -> Option<&EligibleVehicle> {
        let wanted = compact(model);
        if wanted.is_empty() {
            return None;
        }
        let words = tokenize(model);
        self.models_for(make).find(|vehicle| {
            compact(&vehicle.model).contains(&wanted) || starts_with_phrase(&words, &vehicle.model)
        })
    }

    /// Entries whose make or model contains `query`. Queries shorter than
    /// two characters return nothing.
    pub fn search(&self, query: &str) -> Vec<EligibleVehicle> {
        let query = query.trim();
        if query.chars().count() < MIN_SEARCH_LEN {
            return Vec::new();
        }
        let needle = query.to_lowercase();
        self.vehicles
            .iter()
            .filter(|vehicle| {
                vehicle.make.to_lowercase().contains(&needle)
                    || vehicle.model.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }
}
