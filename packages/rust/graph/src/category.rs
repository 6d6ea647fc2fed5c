//! Display categories for graph nodes.
//!
//! Documents are matched against an ordered table of substring checks and
//! the first matching row wins; [`GraphCategory::GeneralCivil`] is the
//! fallback.

use rulegraph_shared::CorpusEntry;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GraphCategory {
    #[serde(rename = "Electronic Filing")]
    ElectronicFiling,
    #[serde(rename = "Motion Practice")]
    MotionPractice,
    #[serde(rename = "Tentative Rulings")]
    TentativeRulings,
    #[serde(rename = "Ex Parte")]
    ExParte,
    #[serde(rename = "Complex Civil")]
    ComplexCivil,
    #[serde(rename = "Discovery")]
    Discovery,
    #[serde(rename = "Service & Notice")]
    ServiceNotice,
    #[serde(rename = "Local Rules")]
    LocalRules,
    #[serde(rename = "Department Specific")]
    DepartmentSpecific,
    #[serde(rename = "Judge Specific")]
    JudgeSpecific,
    #[serde(rename = "Filing Procedures")]
    FilingProcedures,
    #[serde(rename = "General Civil")]
    GeneralCivil,
}

impl GraphCategory {
    pub fn label(&self) -> &'static str {
        match self {
            Self::ElectronicFiling => "Electronic Filing",
            Self::MotionPractice => "Motion Practice",
            Self::TentativeRulings => "Tentative Rulings",
            Self::ExParte => "Ex Parte",
            Self::ComplexCivil => "Complex Civil",
            Self::Discovery => "Discovery",
            Self::ServiceNotice => "Service & Notice",
            Self::LocalRules => "Local Rules",
            Self::DepartmentSpecific => "Department Specific",
            Self::JudgeSpecific => "Judge Specific",
            Self::FilingProcedures => "Filing Procedures",
            Self::GeneralCivil => "General Civil",
        }
    }
}

/// One row of the category table.
///
/// A row matches when the content contains one of `content` (and, if
/// `content_also` is non-empty, one of those too), or the title contains
/// one of `title`, or the URL contains one of `url`, or `needs_judge` is
/// set and the document names a judge.
struct CategoryRule {
    category: GraphCategory,
    content: &'static [&'static str],
    content_also: &'static [&'static str],
    title: &'static [&'static str],
    url: &'static [&'static str],
    needs_judge: bool,
}

const fn rule(category: GraphCategory) -> CategoryRule {
    CategoryRule {
        category,
        content: &[],
        content_also: &[],
        title: &[],
        url: &[],
        needs_judge: false,
    }
}

static CATEGORY_TABLE: &[CategoryRule] = &[
    CategoryRule {
        content: &["e-filing", "electronic filing"],
        title: &["e-filing"],
        url: &["efiling", "e-filing"],
        ..rule(GraphCategory::ElectronicFiling)
    },
    CategoryRule {
        content: &["motion"],
        content_also: &["practice", "procedure"],
        ..rule(GraphCategory::MotionPractice)
    },
    CategoryRule {
        content: &["tentative ruling"],
        title: &["tentative"],
        url: &["tentative"],
        ..rule(GraphCategory::TentativeRulings)
    },
    CategoryRule {
        content: &["ex parte"],
        title: &["ex parte"],
        url: &["ex-parte", "exparte"],
        ..rule(GraphCategory::ExParte)
    },
    CategoryRule {
        content: &["complex civil"],
        title: &["complex"],
        ..rule(GraphCategory::ComplexCivil)
    },
    CategoryRule {
        content: &["discovery"],
        title: &["discovery"],
        ..rule(GraphCategory::Discovery)
    },
    CategoryRule {
        content: &["service", "notice"],
        ..rule(GraphCategory::ServiceNotice)
    },
    CategoryRule {
        content: &["local rule"],
        title: &["local rule"],
        url: &["local-rule"],
        ..rule(GraphCategory::LocalRules)
    },
    CategoryRule {
        content: &["department"],
        content_also: &["judge"],
        ..rule(GraphCategory::DepartmentSpecific)
    },
    CategoryRule {
        needs_judge: true,
        ..rule(GraphCategory::JudgeSpecific)
    },
    CategoryRule {
        content: &["filing"],
        title: &["filing"],
        ..rule(GraphCategory::FilingProcedures)
    },
];

impl CategoryRule {
    fn matches(&self, content: &str, title: &str, url: &str, has_judge: bool) -> bool {
        let any = |haystack: &str, needles: &[&str]| needles.iter().any(|n| haystack.contains(n));
        let content_hit = any(content, self.content)
            && (self.content_also.is_empty() || any(content, self.content_also));
        content_hit
            || any(title, self.title)
            || any(url, self.url)
            || (self.needs_judge && has_judge)
    }
}

/// Category of a document node.
pub fn categorize(entry: &CorpusEntry) -> GraphCategory {
    let content = entry.document.source_text.to_lowercase();
    let title = entry.document.title.to_lowercase();
    let url = entry.document.url.to_lowercase();
    let has_judge = !entry.classification.entities.judges.is_empty();

    CATEGORY_TABLE
        .iter()
        .find(|row| row.matches(&content, &title, &url, has_judge))
        .map(|row| row.category)
        .unwrap_or(GraphCategory::GeneralCivil)
}
