//! Industry vocabulary: variant table, mis-typed terms and vacuous terms.

use crate::types::EntityLabel;

/// Variant -> canonical industry term.
pub(super) const INDUSTRY_VARIANTS: &[(&str, &str)] = &[
    // Aerospace & defense
    ("aerospace", "aerospace"),
    ("aerospace industry", "aerospace"),
    ("aviation", "aerospace"),
    ("commercial aviation", "aerospace"),
    ("aerospace and defense", "aerospace"),
    ("aerospace & defense", "aerospace"),
    ("a&d", "aerospace"),
    ("defense", "defense"),
    ("defense industry", "defense"),
    ("military", "defense"),
    ("defense & aerospace", "defense"),
    // Automotive
    ("automotive", "automotive"),
    ("automotive industry", "automotive"),
    ("auto", "automotive"),
    ("automobile", "automotive"),
    ("automobiles", "automotive"),
    ("auto industry", "automotive"),
    ("vehicle", "automotive"),
    ("vehicles", "automotive"),
    ("car", "automotive"),
    ("cars", "automotive"),
    ("autonomous vehicles", "automotive"),
    ("electric vehicles", "automotive"),
    ("ev", "automotive"),
    // Medical devices & life sciences
    ("medical devices", "medical devices"),
    ("medical device", "medical devices"),
    ("med device", "medical devices"),
    ("med devices", "medical devices"),
    ("medtech", "medical devices"),
    ("medical technology", "medical devices"),
    ("healthcare devices", "medical devices"),
    ("medical", "medical devices"),
    ("healthcare", "healthcare"),
    ("health care", "healthcare"),
    ("dentistry", "healthcare"),
    ("life sciences", "life sciences"),
    ("pharmaceutical", "life sciences"),
    ("pharmaceuticals", "life sciences"),
    ("pharma", "life sciences"),
    ("biopharma", "life sciences"),
    ("biotech", "life sciences"),
    ("biotechnology", "life sciences"),
    ("pharmaceutical manufacturing", "life sciences"),
    // Industrial & manufacturing
    ("industrial", "industrial equipment"),
    ("industrial equipment", "industrial equipment"),
    ("industrial machinery", "industrial equipment"),
    ("heavy equipment", "industrial equipment"),
    ("machinery", "industrial equipment"),
    ("industrial manufacturing", "manufacturing"),
    ("manufacturing", "manufacturing"),
    ("manufacturing industry", "manufacturing"),
    ("discrete manufacturing", "manufacturing"),
    ("process manufacturing", "manufacturing"),
    ("semiconductor manufacturing", "semiconductor"),
    // Consumer
    ("consumer electronics", "consumer electronics"),
    ("electronics", "consumer electronics"),
    ("consumer goods", "consumer goods"),
    ("consumer products", "consumer goods"),
    ("food and beverage", "consumer goods"),
    ("food & beverage", "consumer goods"),
    // Energy & utilities
    ("energy", "energy"),
    ("energy industry", "energy"),
    ("oil and gas", "energy"),
    ("oil & gas", "energy"),
    ("utilities", "utilities"),
    ("power generation", "utilities"),
    ("nuclear", "nuclear"),
    ("nuclear energy", "nuclear"),
    ("nuclear industry", "nuclear"),
    // Transportation
    ("rail", "rail"),
    ("railway", "rail"),
    ("railroad", "rail"),
    ("rail industry", "rail"),
    ("transportation", "transportation"),
    ("transport", "transportation"),
    ("logistics", "transportation"),
    ("marine", "marine"),
    ("maritime", "marine"),
    ("shipbuilding", "marine"),
    // Technology
    ("semiconductor", "semiconductor"),
    ("semiconductors", "semiconductor"),
    ("chip industry", "semiconductor"),
    ("telecommunications", "telecommunications"),
    ("telecom", "telecommunications"),
    ("telco", "telecommunications"),
    ("communications", "telecommunications"),
    ("software", "software"),
    ("software industry", "software"),
    ("saas", "software"),
    // Financial services
    ("financial services", "financial services"),
    ("finance", "financial services"),
    ("financial", "financial services"),
    ("banking", "financial services"),
    ("fintech", "financial services"),
    ("insurance", "financial services"),
    // Space
    ("space", "space"),
    ("space industry", "space"),
    ("space systems", "space"),
    ("satellite", "space"),
    ("satellites", "space"),
    // Public sector
    ("government", "government"),
    ("public sector", "government"),
    ("federal", "government"),
    // Construction
    ("aec", "construction"),
    ("architecture", "construction"),
    ("construction", "construction"),
    ("engineering construction", "construction"),
];

/// Concepts the extractor mistook for industries.
pub(super) const CONCEPT_TERMS: &[&str] = &[
    "artificial intelligence",
    "automation",
    "digital transformation",
    "e-commerce",
    "iot",
    "internet of things",
    "machine learning",
    "ai",
    "ml",
    "software development",
    "product development",
    "systems development",
    "systems and software engineering",
    "engineering",
    "software factories",
    "workforce software",
    "consumer product development",
    "quality",
    "safety",
    "safety-critical",
    "sustainability",
    "global supply chain",
    "supply chain",
];

/// Standards bodies, agencies and companies mistaken for industries.
pub(super) const ORGANIZATION_TERMS: &[&str] = &[
    "iso",
    "iec",
    "ieee",
    "rtca",
    "sae",
    "ecss",
    "cenelec",
    "incose",
    "fda",
    "faa",
    "easa",
    "tüv süd",
    "tuv sud",
    "tüv rheinland",
    "ul",
    "sgs",
    "bureau veritas",
    "intertek",
    "nasa",
    "pmi",
    "jama software",
    "nikola",
    "finnish red cross",
];

/// Too vague to be an industry.
pub(super) const VACUOUS_TERMS: &[&str] = &[
    "industry",
    "industries",
    "general",
    "regulated",
    "regulated industry",
    "regulated industries",
    "regulated products",
    "multiple industries",
    "various industries",
    "other industries",
    "smbs",
    "ffrdc",
];

/// Reclassification targets, in lookup order.
pub(super) fn reclassify_terms() -> impl Iterator<Item = (&'static str, EntityLabel)> {
    CONCEPT_TERMS
        .iter()
        .map(|t| (*t, EntityLabel::Concept))
        .chain(ORGANIZATION_TERMS.iter().map(|t| (*t, EntityLabel::Organization)))
}
