//! Output formatting for API responses

use anyhow::Result;
use serde_json::Value;
use std::time::Duration;

use portgate_api::ApiResponse;
use portgate_common::{ProbeResult, ProbeStatus};

/// Print a response in the specified format
pub fn print_response(response: &ApiResponse, format: &str, elapsed: Duration) -> Result<()> {
    if !response.is_success() {
        let reason = response.body["error"].as_str().unwrap_or("request failed");
        eprintln!("error ({}): {}", response.status, reason);
        return Ok(());
    }

    match format.trim().to_lowercase().as_str() {
        "json" | "j" => println!("{}", serde_json::to_string_pretty(&response.body)?),
        "csv" | "c" => print!("{}", render_csv(&collect_results(&response.body)?)),
        _ => print!("{}", render_table(&collect_results(&response.body)?, elapsed)),
    }
    Ok(())
}

/// Pull probe results out of either response shape.
fn collect_results(body: &Value) -> Result<Vec<ProbeResult>> {
    if let Some(results) = body.get("results") {
        return Ok(serde_json::from_value(results.clone())?);
    }
    match body.get("result") {
        Some(result) => Ok(vec![serde_json::from_value(result.clone())?]),
        None => Ok(Vec::new()),
    }
}

/// ASCII table of every result plus a summary block.
fn render_table(results: &[ProbeResult], elapsed: Duration) -> String {
    if results.is_empty() {
        return "\nNo results to display.\n\n".to_string();
    }

    let mut out = String::new();
    out.push_str(&format!("\n{:-<72}\n", ""));
    out.push_str(&format!("{:<28} {:<8} {:<10} {:<24}\n", "HOST", "PORT", "STATUS", "DETAIL"));
    out.push_str(&format!("{:-<72}\n", ""));

    let mut open = 0;
    let mut closed = 0;
    let mut other = 0;
    for r in results {
        match r.status {
            ProbeStatus::Open => open += 1,
            ProbeStatus::Closed => closed += 1,
            ProbeStatus::Timeout | ProbeStatus::Error => other += 1,
        }
        out.push_str(&format!(
            "{:<28} {:<8} {:<10} {:<24}\n",
            r.host,
            r.port,
            r.status,
            truncate(r.error_detail.as_deref().unwrap_or(""), 24)
        ));
    }

    out.push_str(&format!("{:-<72}\n", ""));
    out.push_str("\nSummary:\n");
    out.push_str(&format!("  Total scanned: {}\n", results.len()));
    out.push_str(&format!("  Open: {open}\n"));
    out.push_str(&format!("  Closed: {closed}\n"));
    out.push_str(&format!("  Timeout/error: {other}\n"));
    out.push_str(&format!("  Duration: {}\n\n", format_duration(elapsed)));
    out
}

fn render_csv(results: &[ProbeResult]) -> String {
    let mut out = String::from("host,port,status,detail,elapsed_ms\n");
    for r in results {
        let detail = r.error_detail.as_deref().unwrap_or("").replace('"', "\"\"");
        out.push_str(&format!(
            "{},{},{},\"{}\",{}\n",
            r.host, r.port, r.status, detail, r.elapsed_ms
        ));
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    } else {
        s.to_string()
    }
}

/// Format duration in a human-readable way
fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if total_secs == 0 {
        format!("{}ms", millis)
    } else if total_secs < 60 {
        if millis > 0 {
            format!("{}.{:03}s", total_secs, millis)
        } else {
            format!("{}s", total_secs)
        }
    } else {
        let mins = total_secs / 60;
        let secs = total_secs % 60;
        if secs > 0 {
            format!("{}m {}s", mins, secs)
        } else {
            format!("{}m", mins)
        }
    }
}
