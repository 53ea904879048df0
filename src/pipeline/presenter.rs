//! Report rendering for a parsed analysis.
//!
//! The same `Report` feeds the HTML page, the Markdown export, and the JSON
//! API. The reference link is shown only for a positive finding on one of the
//! five linked species.

use std::fmt::Write as _;

use serde::Serialize;

use super::parser::{AnalysisResult, Presence};
use super::species;

pub const LABEL_PRESENCE: &str = "Presence of malaria parasites";
pub const LABEL_SPECIES: &str = "Identified species";
pub const LABEL_STAGES: &str = "Observed stages";
pub const LABEL_PARASITEMIA: &str = "Parasitemia level";
pub const LABEL_CONFIDENCE: &str = "Confidence level";
pub const LABEL_RATIONALE: &str = "Rationale";

/// Joins the observed stage names.
pub const STAGE_SEPARATOR: &str = ", ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportLine {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceLink {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub lines: Vec<ReportLine>,
    pub link: Option<ReferenceLink>,
    pub result: AnalysisResult,
}

/// Build the report for a valid result.
pub fn present(result: &AnalysisResult) -> Report {
    let lines = vec![
        line(LABEL_PRESENCE, result.presence.as_str()),
        line(LABEL_SPECIES, &result.species),
        line(LABEL_STAGES, &result.stage.join(STAGE_SEPARATOR)),
        line(LABEL_PARASITEMIA, result.parasitemia.as_str()),
        line(LABEL_CONFIDENCE, result.confidence.as_str()),
        line(LABEL_RATIONALE, &result.rationale),
    ];

    Report {
        lines,
        link: reference_link(result),
        result: result.clone(),
    }
}

/// Morphology link for a positive result on a known species.
pub fn reference_link(result: &AnalysisResult) -> Option<ReferenceLink> {
    if result.presence != Presence::Yes {
        return None;
    }
    species::reference_url(&result.species).map(|url| ReferenceLink {
        label: format!("{} Morphology", result.species),
        url,
    })
}

fn line(label: &'static str, value: &str) -> ReportLine {
    ReportLine {
        label,
        value: value.to_string(),
    }
}

impl Report {
    pub fn value(&self, label: &str) -> Option<&str> {
        self.lines
            .iter()
            .find(|l| l.label == label)
            .map(|l| l.value.as_str())
    }

    /// Markdown rendition: bold labels, rationale as its own paragraph.
    pub fn to_markdown(&self) -> String {
        let mut out = String::from("### Analysis Results\n\n");
        for l in &self.lines {
            if l.label == LABEL_RATIONALE {
                let _ = write!(out, "**{}:**\n\n{}\n\n", l.label, l.value);
            } else {
                let _ = write!(out, "**{}:** {}\n\n", l.label, l.value);
            }
        }
        if let Some(link) = &self.link {
            let _ = writeln!(out, "Learn more: [{}]({})", link.label, link.url);
        }
        out
    }

    /// HTML fragment; every model-provided string is escaped.
    pub fn to_html(&self) -> String {
        let mut out = String::from("<section class=\"report\">\n<h2>Analysis Results</h2>\n<dl>\n");
        for l in &self.lines {
            let _ = writeln!(
                out,
                "<dt>{}</dt><dd>{}</dd>",
                escape_html(l.label),
                escape_html(&l.value)
            );
        }
        out.push_str("</dl>\n");
        if let Some(link) = &self.link {
            let _ = writeln!(
                out,
                "<p class=\"reference\">Learn more: <a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a></p>",
                escape_html(&link.url),
                escape_html(&link.label)
            );
        }
        out.push_str("</section>\n");
        out
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::parser::{parse_analysis, Confidence, Parasitemia};

    fn result(presence: &str, species: &str) -> AnalysisResult {
        AnalysisResult {
            presence: Presence::from(presence.to_string()),
            species: species.to_string(),
            stage: vec!["rings".into(), "schizonts".into()],
            parasitemia: Parasitemia::High,
            confidence: Confidence::Medium,
            rationale: "Multiple rings per cell.".into(),
        }
    }

    #[test]
    fn falciparum_positive_links_to_morphology() {
        let report = present(&result("yes", "Plasmodium falciparum"));
        let link = report.link.unwrap();
        assert!(link.url.contains("Plasmodium_falciparum:_Morphology"));
        assert_eq!(link.label, "Plasmodium falciparum Morphology");
    }

    #[test]
    fn unknown_species_never_links() {
        assert!(present(&result("yes", "unknown")).link.is_none());
        assert!(present(&result("no", "unknown")).link.is_none());
    }

    #[test]
    fn negative_result_never_links() {
        for name in species::known_species() {
            assert!(present(&result("no", name)).link.is_none());
        }
    }

    #[test]
    fn non_exact_presence_never_links() {
        assert!(present(&result("Yes", "Plasmodium vivax")).link.is_none());
    }

    #[test]
    fn out_of_table_species_never_links() {
        assert!(present(&result("yes", "Babesia microti")).link.is_none());
    }

    #[test]
    fn vivax_example_renders_all_fields() {
        let parsed = parse_analysis(
            r#"{"presence":"yes","species":"Plasmodium vivax","stage":["rings","trophozoites"],"parasitemia":"medium","confidence":"high","rationale":"Enlarged RBCs with Schüffner's dots observed."}"#,
        )
        .unwrap();
        let report = present(&parsed);
        assert_eq!(report.value(LABEL_PRESENCE), Some("yes"));
        assert_eq!(report.value(LABEL_SPECIES), Some("Plasmodium vivax"));
        assert_eq!(report.value(LABEL_STAGES), Some("rings, trophozoites"));
        assert_eq!(report.value(LABEL_PARASITEMIA), Some("medium"));
        assert_eq!(report.value(LABEL_CONFIDENCE), Some("high"));
        assert_eq!(
            report.value(LABEL_RATIONALE),
            Some("Enlarged RBCs with Schüffner's dots observed.")
        );
        assert_eq!(
            report.link.unwrap().url,
            "https://haematologyetc.org/index.php?title=Plasmodium_vivax:_Morphology"
        );
    }

    #[test]
    fn lines_follow_schema_order() {
        let report = present(&result("yes", "unknown"));
        let labels: Vec<_> = report.lines.iter().map(|l| l.label).collect();
        assert_eq!(
            labels,
            vec![
                LABEL_PRESENCE,
                LABEL_SPECIES,
                LABEL_STAGES,
                LABEL_PARASITEMIA,
                LABEL_CONFIDENCE,
                LABEL_RATIONALE
            ]
        );
    }

    #[test]
    fn empty_stage_list_renders_empty() {
        let mut r = result("no", "unknown");
        r.stage.clear();
        assert_eq!(present(&r).value(LABEL_STAGES), Some(""));
    }

    #[test]
    fn markdown_matches_report() {
        let md = present(&result("yes", "Plasmodium ovale")).to_markdown();
        assert!(md.contains("**Observed stages:** rings, schizonts"));
        assert!(md.contains("**Rationale:**\n\nMultiple rings per cell."));
        assert!(md.contains(
            "Learn more: [Plasmodium ovale Morphology](https://haematologyetc.org/index.php?title=Plasmodium_ovale:_Morphology)"
        ));
    }

    #[test]
    fn html_escapes_model_text() {
        let mut r = result("yes", "unknown");
        r.rationale = "<script>alert('x')</script> & more".into();
        let html = present(&r).to_html();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt; &amp; more"));
    }

    #[test]
    fn html_includes_link_only_when_present() {
        assert!(present(&result("yes", "Plasmodium malariae"))
            .to_html()
            .contains("Plasmodium_malariae:_Morphology"));
        assert!(!present(&result("no", "Plasmodium malariae"))
            .to_html()
            .contains("Learn more"));
    }
}
