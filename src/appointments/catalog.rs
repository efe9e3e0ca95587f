//! Bookable services, grouped by appointment category.

pub const CATALOG: &[(&str, &[&str])] = &[
    (
        "Consultation",
        &[
            "Eye consult",
            "Dental consult",
            "General consult",
            "Physician specialist",
            "Gynecological consult",
            "Antenatal consult",
        ],
    ),
    (
        "Medical screening",
        &[
            "Full body checkup",
            "Cardiac screening",
            "Diabetes screening",
            "Cancer screening",
            "Vision screening",
            "Hearing screening",
        ],
    ),
];

pub fn categories() -> impl Iterator<Item = &'static str> {
    CATALOG.iter().map(|(category, _)| *category)
}

pub fn sub_types(category: &str) -> Option<&'static [&'static str]> {
    CATALOG
        .iter()
        .find(|(c, _)| *c == category)
        .map(|(_, subs)| *subs)
}

/// Whether `sub_type` is offered under `category`.
pub fn is_valid(category: &str, sub_type: &str) -> bool {
    sub_types(category).is_some_and(|subs| subs.contains(&sub_type))
}
