//! Species → morphology reference page lookup.

/// Reference pages live on the haematologyetc wiki; the anchor is appended
/// as the `title` query parameter.
pub const REFERENCE_BASE_URL: &str = "https://haematologyetc.org/index.php?title=";

/// One entry per species the prompt teaches. Lookup is by exact name.
const SPECIES_ANCHORS: [(&str, &str); 5] = [
    ("Plasmodium falciparum", "Plasmodium_falciparum:_Morphology"),
    ("Plasmodium vivax", "Plasmodium_vivax:_Morphology"),
    ("Plasmodium ovale", "Plasmodium_ovale:_Morphology"),
    ("Plasmodium malariae", "Plasmodium_malariae:_Morphology"),
    ("Plasmodium knowlesi", "Plasmodium_knowlesi:_Morphology"),
];

/// Documentation anchor for a species display name, if it is one of the five.
pub fn anchor_for(species: &str) -> Option<&'static str> {
    SPECIES_ANCHORS
        .iter()
        .find(|(name, _)| *name == species)
        .map(|(_, anchor)| *anchor)
}

/// Full reference URL for a species display name.
pub fn reference_url(species: &str) -> Option<String> {
    anchor_for(species).map(|anchor| format!("{REFERENCE_BASE_URL}{anchor}"))
}

pub fn known_species() -> impl Iterator<Item = &'static str> {
    SPECIES_ANCHORS.iter().map(|(name, _)| *name)
}
