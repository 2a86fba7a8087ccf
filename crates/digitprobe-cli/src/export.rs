//! CSV and Markdown renderings of a ranked comparison.

use digitprobe_core::Comparison;
use digitprobe_core::compare::{ComparisonRow, MetricDelta};

const COLUMNS: &[&str] = &[
    "file",
    "N",
    "severity",
    "score",
    "chi_square",
    "chi_square_delta",
    "compress_ratio",
    "compress_ratio_rel_delta",
    "runs_z",
    "runs_z_delta",
    "autocorr_max_abs",
    "autocorr_max_abs_delta",
    "ngram_best",
    "ngram_best_delta",
    "schur_z",
    "schur_z_delta",
];

/// Quote a CSV field when it contains a comma, quote or newline.
fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn metric_pairs(row: &ComparisonRow) -> [MetricDelta; 6] {
    let d = &row.deltas;
    [
        d.chi_square,
        d.compress_ratio,
        d.runs_z,
        d.autocorr_max_abs,
        d.ngram_best,
        d.schur_z,
    ]
}

pub fn to_csv(cmp: &Comparison) -> String {
    let mut out = COLUMNS.join(",");
    out.push('\n');
    for row in &cmp.rows {
        let mut fields = vec![
            escape_field(&row.label),
            row.n.to_string(),
            row.severity.to_string(),
            format!("{:.6}", row.score),
        ];
        for m in metric_pairs(row) {
            fields.push(format!("{:.6}", m.value));
            fields.push(format!("{:.6}", m.delta));
        }
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

/// Escape characters that break a Markdown table cell.
fn md_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

pub fn to_markdown(cmp: &Comparison) -> String {
    let mut out = format!(
        "# digitprobe comparison\n\nBaseline: `{}` (N={}), scoring model `{}` v{}\n\n",
        cmp.baseline, cmp.baseline_n, cmp.model_id, cmp.model_version
    );
    out.push_str(
        "| # | file | N | severity | score | chi² (Δ) | zlib (Δ rel) | runs Z (Δ) | max\\|ρ\\| (Δ) | n-gram (Δ) | Schur z (Δ) |\n",
    );
    out.push_str("|---|---|---:|---|---:|---:|---:|---:|---:|---:|---:|\n");
    for (rank, row) in cmp.rows.iter().enumerate() {
        let d = &row.deltas;
        out.push_str(&format!(
            "| {} | {} | {} | {} | {:.3} | {:.2} ({:+.2}) | {:.4} ({:+.2}%) | {:+.2} ({:+.2}) | {:.4} ({:+.4}) | {:.2}% ({:+.2} pp) | {:+.2} ({:+.2}) |\n",
            rank + 1,
            md_cell(&row.label),
            row.n,
            row.severity,
            row.score,
            d.chi_square.value,
            d.chi_square.delta,
            d.compress_ratio.value,
            d.compress_ratio.delta * 100.0,
            d.runs_z.value,
            d.runs_z.delta,
            d.autocorr_max_abs.value,
            d.autocorr_max_abs.delta,
            d.ngram_best.value * 100.0,
            d.ngram_best.delta * 100.0,
            d.schur_z.value,
            d.schur_z.delta,
        ));
    }
    let noted: Vec<&ComparisonRow> = cmp.rows.iter().filter(|r| !r.notes.is_empty()).collect();
    if !noted.is_empty() {
        out.push_str("\n## Notes\n\n");
        for row in noted {
            for note in &row.notes {
                out.push_str(&format!("- `{}`: {}\n", md_cell(&row.label), note));
            }
        }
    }
    out
}
