//! Markdown rendering of previews and apply summaries.

use super::{ApplySummary, FixPreview};
use crate::dedup::{absorbed_by_label, DuplicateGroup, GroupMember};
use crate::filter::DeletionCandidate;
use crate::merge::MergeStrategy;
use crate::relabel::ReclassifyCandidate;

fn count(member: &GroupMember) -> String {
    member
        .relationship_count
        .map_or_else(|| "?".to_string(), |c| c.to_string())
}

fn render_groups(out: &mut String, title: &str, groups: &[DuplicateGroup], limit: usize) {
    if groups.is_empty() {
        return;
    }
    out.push_str(&format!("\n## {} ({} groups)\n\n", title, groups.len()));
    for group in groups.iter().take(limit) {
        out.push_str(&format!(
            "- **{}** keeps `{}` [{}] ({} rels)",
            group.key,
            group.primary.id,
            group.primary.label,
            count(&group.primary)
        ));
        if let Some(rename) = &group.rename {
            out.push_str(&format!(", renamed to \"{}\"", rename.to));
        }
        out.push('\n');
        for member in &group.absorbed {
            out.push_str(&format!(
                "  - absorbs `{}` \"{}\" [{}] ({} rels)\n",
                member.id,
                member.name,
                member.label,
                count(member)
            ));
        }
    }
    if groups.len() > limit {
        out.push_str(&format!("- ... and {} more\n", groups.len() - limit));
    }
}

fn render_deletions(out: &mut String, title: &str, candidates: &[DeletionCandidate], limit: usize) {
    if candidates.is_empty() {
        return;
    }
    out.push_str(&format!("\n## {} ({} nodes)\n\n", title, candidates.len()));
    for candidate in candidates.iter().take(limit) {
        out.push_str(&format!(
            "- `{}` \"{}\" [{}]: {} rels lost\n",
            candidate.member.id,
            candidate.member.name,
            candidate.member.label,
            count(&candidate.member)
        ));
    }
    if candidates.len() > limit {
        out.push_str(&format!("- ... and {} more\n", candidates.len() - limit));
    }
}

fn render_relabels(out: &mut String, title: &str, candidates: &[ReclassifyCandidate], limit: usize) {
    if candidates.is_empty() {
        return;
    }
    out.push_str(&format!("\n## {} ({})\n\n", title, candidates.len()));
    for candidate in candidates.iter().take(limit) {
        out.push_str(&format!(
            "- \"{}\" -> {} ({} rels)\n",
            candidate.member.name,
            candidate.target,
            count(&candidate.member)
        ));
    }
}

/// Render a preview, listing at most `limit` items per section.
pub fn render_preview(preview: &FixPreview, limit: usize) -> String {
    let report = &preview.report;
    let counts = report.counts();
    let mut out = String::new();

    out.push_str("# Graph fix preview\n\n");
    out.push_str(&format!(
        "Captured {} over {} nodes.\n\n",
        report.captured_at.to_rfc3339(),
        report.node_count
    ));
    out.push_str("| Fix | Candidates |\n|---|---|\n");
    for (name, value) in [
        ("Name normalization", counts.renames),
        ("Definition backfill", counts.definitions),
        ("Generic term deletions", counts.generic_deletions),
        ("Taxonomy deletions", counts.taxonomy_deletions),
        ("Mislabeled challenges", counts.mislabeled_challenges),
        ("Same-label merges", counts.same_label_merges),
        ("Taxonomy merges and renames", counts.taxonomy_merges),
        ("Taxonomy reclassifications", counts.taxonomy_reclassifications),
        ("Lexical variant merges", counts.lexical_merges),
        ("Cross-label merges", counts.cross_label_merges),
        ("Unknown terms (review)", counts.unknown_terms),
    ] {
        out.push_str(&format!("| {} | {} |\n", name, value));
    }
    out.push_str(&format!(
        "\nRelationships retargeted: {}. Relationships deleted: {}.\n",
        preview.relationships_to_retarget, preview.relationships_to_delete
    ));

    if !report.renames.is_empty() {
        out.push_str(&format!("\n## Name normalization ({})\n\n", report.renames.len()));
        for rename in report.renames.iter().take(limit) {
            out.push_str(&format!("- \"{}\" -> \"{}\" [{}]\n", rename.from, rename.to, rename.label));
        }
    }
    if !report.definitions.is_empty() {
        out.push_str(&format!("\n## Definition backfill ({})\n\n", report.definitions.len()));
        for candidate in report.definitions.iter().take(limit) {
            out.push_str(&format!("- \"{}\" [{}]\n", candidate.name, candidate.label));
        }
    }

    render_deletions(&mut out, "Generic terms", &report.generic, limit);
    render_deletions(&mut out, "Vacuous industries", &report.taxonomy.delete, limit);
    render_relabels(&mut out, "Mislabeled challenges", &report.mislabeled, limit);
    render_groups(&mut out, "Same-label duplicates", &report.same_label, limit);
    render_groups(&mut out, "Industry consolidation", &report.taxonomy.keep, limit);

    render_relabels(&mut out, "Industry reclassification", &report.taxonomy.reclassify, limit);

    render_groups(&mut out, "Lexical variants", &report.lexical, limit);
    render_groups(&mut out, "Cross-label duplicates", &report.cross_label, limit);

    let absorbed = absorbed_by_label(&report.cross_label);
    if !absorbed.is_empty() {
        out.push_str("\n| Winning label | Absorbed from |\n|---|---|\n");
        for (winner, losers) in &absorbed {
            let from: Vec<String> = losers
                .iter()
                .map(|(label, n)| format!("{} x{}", label, n))
                .collect();
            out.push_str(&format!("| {} | {} |\n", winner, from.join(", ")));
        }
    }

    if !report.taxonomy.unknown.is_empty() {
        out.push_str(&format!(
            "\n## Unknown industry terms ({}), manual review\n\n",
            report.taxonomy.unknown.len()
        ));
        for member in report.taxonomy.unknown.iter().take(limit) {
            out.push_str(&format!("- \"{}\" (`{}`)\n", member.name, member.id));
        }
    }

    out
}

/// Render an apply summary.
pub fn render_summary(summary: &ApplySummary) -> String {
    let mut out = String::new();
    out.push_str("# Graph fix summary\n\n");

    let strategy = match summary.strategy {
        Some(MergeStrategy::Bulk) => "bulk",
        Some(MergeStrategy::Manual) => "manual",
        None => "none",
    };
    out.push_str(&format!("- Merge strategy: {}", strategy));
    if summary.degraded {
        out.push_str(" (degraded: bulk merge unavailable)");
    }
    out.push('\n');
    out.push_str(&format!("- Changes applied: {}\n", summary.total_changes()));
    out.push_str(&format!(
        "- Relationships migrated: {}, removed: {}\n",
        summary.relationships_migrated(),
        summary.relationships_removed()
    ));
    if let Some(ms) = summary.duration_ms() {
        out.push_str(&format!("- Duration: {} ms\n", ms));
    }
    if summary.cancelled {
        out.push_str("- **Cancelled** before all stages ran\n");
    }
    if let Some(reason) = &summary.aborted {
        out.push_str(&format!("- **Aborted**: {}\n", reason));
    }
    match summary.remaining {
        Some(remaining) if summary.converged() => out.push_str(&format!(
            "- Converged ({} unknown terms left for review)\n",
            remaining.unknown_terms
        )),
        Some(remaining) => out.push_str(&format!(
            "- Not converged: {} candidates remain\n",
            remaining.total()
        )),
        None => out.push_str("- Convergence not checked\n"),
    }

    out.push_str("\n| Stage | Applied | Migrated | Collapsed | Removed | Skipped | Errors |\n");
    out.push_str("|---|---|---|---|---|---|---|\n");
    for stage in &summary.stages {
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} |\n",
            stage.stage,
            stage.applied,
            stage.relationships_migrated,
            stage.relationships_collapsed,
            stage.relationships_removed,
            stage.skipped.len(),
            stage.errors.len()
        ));
    }

    let errors: Vec<_> = summary.errors().collect();
    if !errors.is_empty() {
        out.push_str("\n## Errors\n\n");
        for error in errors {
            out.push_str(&format!(
                "- [{}] {} `{}`: {}\n",
                error.stage, error.code, error.item, error.message
            ));
        }
    }

    let skipped: Vec<_> = summary.skipped().collect();
    if !skipped.is_empty() {
        out.push_str("\n## Skipped\n\n");
        for item in skipped {
            out.push_str(&format!("- [{}] {}: {}\n", item.stage, item.item, item.reason));
        }
    }

    out
}
