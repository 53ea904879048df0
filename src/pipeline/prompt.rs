//! Fixed diagnostic prompt sent with every smear image.

/// Instruction text for the vision model: morphology criteria for the five
/// human-infecting Plasmodium species and the exact JSON output schema the
/// parser expects.
pub const ANALYSIS_PROMPT: &str = r#"You are an expert in malaria parasite identification from blood smears. Analyze this Giemsa-stained thin blood film image for malaria parasites. First, determine if malaria parasites are present. If yes, identify the species based on the following detailed morphological characteristics:

### Identifying Malaria Species from Blood Smears

The identification relies on microscopic features in Giemsa-stained thin blood films at slightly alkaline pH (around 7.4) for optimal visualization of dots and pigment. The five main human-infecting species are: Plasmodium falciparum, P. vivax, P. ovale, P. malariae, and P. knowlesi.

#### Plasmodium falciparum
- General: Causes severe malaria; small, delicate forms; multiple parasites per RBC; schizonts rare in peripheral blood; gametocytes distinctive.
- Rings/Early Trophozoites: Small, delicate rings; multiple per RBC; double chromatin dots; accolé (appliqué) forms; RBCs normal size, no stippling.
- Late Trophozoites: Thicker rings; Maurer's dots in RBC; pigment appears.
- Schizonts: Rare; 16+ merozoites untidily clustered; pigment clumped.
- Gametocytes: Banana-shaped; single chromatin with pigment.
- Key: High parasitemia, multiple rings, accolé forms, banana gametocytes; differentiate from P. knowlesi by lack of band forms.

#### Plasmodium vivax
- General: Relapsing malaria; large, robust parasites; all stages circulate; RBCs enlarged/distorted with Schüffner's dots.
- Rings/Early Trophozoites: Large rings, become irregular; Schüffner's dots; RBCs enlarge.
- Late Trophozoites: Amoeboid; prominent dots; pigment irregular.
- Schizonts: Large; 16-32 merozoites; dots in cytoplasm.
- Gametocytes: Large, fill RBC; pigment clumped.
- Key: Enlarged RBCs with Schüffner's dots; all stages present; larger schizonts than P. ovale.

#### Plasmodium ovale
- General: Similar to P. vivax but milder; trophozoites ring-like; RBCs moderately enlarged, ovoid/fimbriated with James' dots.
- Rings/Early Trophozoites: Large, robust rings; James' dots; RBCs ovoid.
- Late Trophozoites: Thickened rings, comet shapes; prominent dots.
- Schizonts: Up to 16 merozoites; dots in cytoplasm.
- Gametocytes: Fill RBC; pigment circumferential.
- Key: Ovoid/fimbriated RBCs, James' dots; smaller schizonts than P. vivax.

#### Plasmodium malariae
- General: Quartan malaria; low parasitemia; all stages circulate; small, neat parasites; RBCs small/round, no dots.
- Rings/Early Trophozoites: Small rings; RBCs normal/small.
- Late Trophozoites: Band forms; angular.
- Schizonts: Daisy head; 8-12 merozoites around central pigment.
- Gametocytes: Small, round; scattered pigment.
- Key: Low count, daisy schizonts, band forms; differentiate from P. knowlesi by neater forms.

#### Plasmodium knowlesi
- General: Zoonotic; resembles P. falciparum early, P. malariae late; high parasitemia possible; RBCs unaffected but may distort with sparse stippling.
- Rings/Early Trophozoites: Small rings; double dots; multiple per RBC; no stippling.
- Late Trophozoites: Band-like; Sinton/Mulligan's stippling.
- Schizonts: Up to 16 merozoites, grape-like; stippling.
- Gametocytes: Small, round; pigment overlies.
- Key: Early like falciparum, late like malariae but less neat; sparse stippling.

Additional notes: Look for malaria pigment (brown/gold); phagocytosed pigment in leukocytes. Consider synchronicity, mixed infections.

Output strictly in JSON format with these keys:
- "presence": "yes" or "no"
- "species": full name like "Plasmodium falciparum" or "unknown" if cannot identify
- "stage": list of observed stages (e.g., ["rings", "schizonts"])
- "parasitemia": "low", "medium", "high", or "unknown"
- "confidence": "low", "medium", "high"
- "rationale": brief clinical explanation of your assessment
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::parser::REQUIRED_FIELDS;
    use crate::pipeline::species::known_species;

    #[test]
    fn prompt_names_every_output_key() {
        for field in REQUIRED_FIELDS {
            assert!(
                ANALYSIS_PROMPT.contains(&format!("\"{field}\"")),
                "prompt does not ask for {field}"
            );
        }
    }

    #[test]
    fn prompt_covers_every_linked_species() {
        for species in known_species() {
            assert!(
                ANALYSIS_PROMPT.contains(&format!("#### {species}")),
                "prompt has no criteria for {species}"
            );
        }
    }

    #[test]
    fn prompt_demands_json() {
        assert!(ANALYSIS_PROMPT.contains("strictly in JSON"));
        assert!(ANALYSIS_PROMPT.contains("\"unknown\" if cannot identify"));
    }
}
