//! Terminal rendering for analysis results and feedback review queues.
//!
//! Results and queues go to stdout; progress lines go to stderr so piped
//! output stays clean.

use std::io::{self, Write};

use chrono::{DateTime, Utc};
use legality_core::{
    AnalysisJob, AnalysisResults, Bucket, Buckets, CompoundRisk, FeedbackRecord, RiskyClause,
    VisibilityWindow,
};

const MAX_LIST_ITEMS: usize = 10;
const SNIPPET_LEN: usize = 160;

// ── Job progress ──

/// Overwrite the current stderr line with the job's progress.
pub fn print_progress(job: &AnalysisJob) {
    let name = if job.filename.is_empty() {
        job.analysis_id.as_str()
    } else {
        job.filename.as_str()
    };
    eprint!("\r  {:<40} {:>3}%  {}", truncate(name, 40), job.progress, job.status);
    let _ = io::stderr().flush();
}

// ── Results ──

/// Print a results summary card followed by the flagged clauses.
pub fn print_results(results: &AnalysisResults) -> io::Result<()> {
    let mut out = io::stdout().lock();
    write_results(&mut out, results)?;
    out.flush()
}

/// Render the results card into `out`.
pub fn write_results(out: &mut impl Write, results: &AnalysisResults) -> io::Result<()> {
    let doc = &results.document;
    let summary = &results.summary;

    writeln!(out, "=== {} ===", doc.filename)?;
    writeln!(out)?;
    writeln!(out, "Summary")?;
    writeln!(out, "  {:<26} {}", "overall_risk", summary.overall_risk)?;
    writeln!(out, "  {:<26} {:.1}", "average_risk_score", summary.average_risk_score)?;
    writeln!(out, "  {:<26} {}", "total_chunks", doc.total_chunks)?;
    writeln!(out, "  {:<26} {}", "risky_clauses_found", doc.risky_clauses_found)?;
    writeln!(out, "  {:<26} {}", "compound_risks_found", summary.compound_risks_found)?;
    if !summary.categories_flagged.is_empty() {
        writeln!(
            out,
            "  {:<26} {}",
            "categories_flagged",
            summary.categories_flagged.join(", ")
        )?;
    }
    writeln!(out)?;

    if !results.risky_clauses.is_empty() {
        writeln!(out, "Risky Clauses ({}):", results.risky_clauses.len())?;
        for clause in &results.risky_clauses {
            write_clause(out, clause)?;
        }
        writeln!(out)?;
    }

    if !results.compound_risks.is_empty() {
        writeln!(out, "Compound Risks ({}):", results.compound_risks.len())?;
        for risk in &results.compound_risks {
            write_compound(out, risk)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn write_clause(out: &mut impl Write, clause: &RiskyClause) -> io::Result<()> {
    writeln!(
        out,
        "  [{}] {:<24} {:>3}  {}",
        clause.chunk_id, clause.category, clause.risk_score, clause.risk_level
    )?;
    writeln!(out, "      {}", truncate(&clause.original_text, SNIPPET_LEN))?;
    if !clause.suggested_fix.is_empty() {
        writeln!(out, "      fix: {}", truncate(&clause.suggested_fix, SNIPPET_LEN))?;
    }
    let show = clause.key_changes.len().min(MAX_LIST_ITEMS);
    for change in &clause.key_changes[..show] {
        writeln!(out, "        - {change}")?;
    }
    if clause.key_changes.len() > MAX_LIST_ITEMS {
        writeln!(
            out,
            "        ... and {} more",
            clause.key_changes.len() - MAX_LIST_ITEMS
        )?;
    }
    Ok(())
}

fn write_compound(out: &mut impl Write, risk: &CompoundRisk) -> io::Result<()> {
    writeln!(
        out,
        "  {:<30} {:<10} {:.1}",
        risk.risk_type, risk.severity, risk.risk_score
    )?;
    writeln!(out, "      {}", truncate(&risk.description, SNIPPET_LEN))?;
    if !risk.affected_clauses.is_empty() {
        writeln!(out, "      affects: {}", risk.affected_clauses.join(", "))?;
    }
    if !risk.mitigation.is_empty() {
        writeln!(out, "      mitigation: {}", truncate(&risk.mitigation, SNIPPET_LEN))?;
    }
    Ok(())
}

// ── Feedback queues ──

/// Print every review bucket, with a note when the visibility window hid fix reviews.
pub fn print_buckets(buckets: &Buckets<'_>, window: VisibilityWindow, now: DateTime<Utc>) {
    for bucket in [Bucket::FalsePositiveReview, Bucket::FixReview, Bucket::Approved] {
        let records = buckets.get(bucket);
        println!("{} ({})", bucket.title(), records.len());
        if records.is_empty() {
            println!("  (empty)");
        }
        for record in records {
            print_feedback_line(record, now);
        }
        if bucket == Bucket::FixReview && buckets.hidden_fix_reviews > 0 {
            println!(
                "  ({} older than {} days hidden)",
                buckets.hidden_fix_reviews,
                window.length().num_days()
            );
        }
        println!();
    }
}

fn print_feedback_line(record: &FeedbackRecord, now: DateTime<Utc>) {
    let age = record
        .timestamp
        .map(|ts| format_age(now - ts))
        .unwrap_or_else(|| "-".to_string());
    print!(
        "  #{:<6} {:<14} {:<24} {:>5}",
        record.id.as_str(),
        record.feedback_type.as_str(),
        truncate(&record.category, 24),
        age
    );
    if let Some(verdict) = record.approved {
        print!("  {}", if verdict { "good fix" } else { "bad fix" });
    }
    println!();
    println!("      {}", truncate(&record.clause_text, SNIPPET_LEN));
}

/// Print one feedback record in full.
pub fn print_feedback_card(record: &FeedbackRecord) {
    println!("=== feedback #{} ===", record.id);
    println!("  {:<26} {}", "type", record.feedback_type.as_str());
    println!("  {:<26} {}", "status", record.status);
    if let Some(ts) = record.timestamp {
        println!("  {:<26} {}", "timestamp", ts.format("%Y-%m-%d %H:%M UTC"));
    }
    if !record.category.is_empty() {
        println!("  {:<26} {}", "category", record.category);
    }
    if let Some(score) = record.system_risk_score {
        println!("  {:<26} {}", "system_risk_score", score);
    }
    if let Some(verdict) = record.approved {
        println!("  {:<26} {}", "fix_approved", if verdict { "yes" } else { "no" });
    }
    println!();
    print_block("Clause", &record.clause_text);
    print_block("Suggested fix", &record.suggested_fix);
    print_block("User comment", &record.user_comment);
    if record.has_debate() {
        for (label, text) in [
            ("Pessimist", &record.pessimist_analysis),
            ("Optimist", &record.optimist_analysis),
            ("Arbiter", &record.arbiter_reasoning),
        ] {
            if let Some(text) = text {
                print_block(label, text);
            }
        }
    }
}

fn print_block(header: &str, text: &str) {
    if text.trim().is_empty() {
        return;
    }
    println!("{header}");
    for line in text.lines() {
        println!("  {line}");
    }
    println!();
}

// ── Helpers ──

/// Cut `s` to at most `max` characters, marking the cut with `...`.
fn truncate(s: &str, max: usize) -> String {
    let s = s.trim();
    if s.chars().count() <= max {
        return s.to_string();
    }
    let keep: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{keep}...")
}

fn format_age(age: chrono::TimeDelta) -> String {
    if age.num_days() > 0 {
        format!("{}d", age.num_days())
    } else if age.num_hours() > 0 {
        format!("{}h", age.num_hours())
    } else {
        format!("{}m", age.num_minutes().max(0))
    }
}
