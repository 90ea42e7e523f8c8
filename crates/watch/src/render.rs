#![forbid(unsafe_code)]

//! Plain-text tables for one dashboard frame.

use crate::poll::{DashboardView, FetchState};
use st_core::model::ActivityEvent;
use st_core::scene::{HealthBanner, Scene};
use st_core::{derive_scene, route_event};
use std::fmt::Write as _;
use tracing::warn;

/// Activity rows shown per frame; the rest of the fetched feed is dropped.
pub const ACTIVITY_ROWS: usize = 15;

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
    out.push('~');
    out
}

fn source_note<T>(out: &mut String, name: &str, state: &FetchState<T>) {
    match state {
        FetchState::Pending => {
            let _ = writeln!(out, "  {name}: no data yet");
        }
        FetchState::Stale { error, .. } => {
            let _ = writeln!(out, "  {name}: showing last good data ({error})");
        }
        FetchState::Failed(error) => {
            let _ = writeln!(out, "  {name}: unavailable ({error})");
        }
        FetchState::Fresh(_) => {}
    }
}

fn banner(out: &mut String, view: &DashboardView) {
    let banner = HealthBanner::build(view.ecosystem.value(), view.health.value());
    let loop_health = banner.loop_health.map_or("unknown", |state| state.as_str());
    let cycles = banner
        .cycle_count
        .map_or_else(|| "-".to_string(), |count| count.to_string());
    let overall = banner.overall.as_deref().unwrap_or("unknown");
    let _ = writeln!(
        out,
        "SNOW-TOWN  loop: {loop_health}  cycles: {cycles}  api: {overall}"
    );

    let dots: Vec<String> = banner
        .sources
        .iter()
        .map(|source| format!("{} {}", source.name, source.dot.as_str()))
        .collect();
    let _ = writeln!(out, "sources: {}", dots.join(" | "));
}

fn node_table(out: &mut String, scene: &Scene) {
    let _ = writeln!(
        out,
        "{:<14} {:>4} {:>5} {:<5} {:>7} {:>7} {:>7} {:<8} {:<8} {:<8} {:<12}",
        "NODE",
        "TIER",
        "SCALE",
        "WIRE",
        "OPACITY",
        "RECORDS",
        "PENDING",
        "HEALTH",
        "SEVERITY",
        "COLOR",
        "SHAPE"
    );
    for node in &scene.nodes {
        let _ = writeln!(
            out,
            "{:<14} {:>4} {:>5.2} {:<5} {:>7.2} {:>7} {:>7} {:<8} {:<8} {:<8} {:<12}",
            truncate(&node.display_name, 14),
            node.growth.tier,
            node.growth.scale,
            if node.growth.wireframe { "yes" } else { "no" },
            node.growth.opacity(),
            node.record_count,
            node.pending_count,
            node.health.as_str(),
            node.severity.as_str(),
            node.style.color_hex,
            node.style.geometry.as_str(),
        );
    }
}

fn edge_table(out: &mut String, scene: &Scene) {
    let _ = writeln!(out, "{:<28} {:<26} {:<8} {:<6}", "EDGE", "CARRIES", "FLOW", "LINE");
    for edge in &scene.edges {
        let route = format!("{} -> {}", edge.source, edge.target);
        let _ = writeln!(
            out,
            "{:<28} {:<26} {:<8} {:<6}",
            truncate(&route, 28),
            truncate(&edge.label, 26),
            edge.flow.as_str(),
            if edge.dashed() { "dashed" } else { "solid" },
        );
    }
}

fn activity_table(out: &mut String, events: &[ActivityEvent]) {
    let _ = writeln!(
        out,
        "{:<20} {:<14} {:<14} {:<32} {:<16}",
        "WHEN", "KIND", "STATUS", "TITLE", "OPEN"
    );
    if events.is_empty() {
        let _ = writeln!(out, "  (no activity)");
    }
    for event in events.iter().take(ACTIVITY_ROWS) {
        let open = route_event(event).map_or_else(|| "-".to_string(), |target| target.path());
        let _ = writeln!(
            out,
            "{:<20} {:<14} {:<14} {:<32} {:<16}",
            event.timestamp.to_rfc3339(),
            truncate(event.event_type.label(), 14),
            truncate(&event.status, 14),
            truncate(&event.title, 32),
            open,
        );
    }
}

/// Renders one frame. Sources that have not answered degrade to notes; the
/// rest of the frame is still drawn.
pub fn render_dashboard(view: &DashboardView) -> String {
    let mut out = String::new();
    banner(&mut out, view);

    let mut notes = String::new();
    source_note(&mut notes, "ecosystem", &view.ecosystem);
    source_note(&mut notes, "health", &view.health);
    source_note(&mut notes, "activity", &view.activity);
    if !notes.is_empty() {
        out.push_str(&notes);
    }
    out.push('\n');

    if let Some(snapshot) = view.ecosystem.value() {
        match derive_scene(snapshot) {
            Ok(scene) => {
                node_table(&mut out, &scene);
                out.push('\n');
                edge_table(&mut out, &scene);
                out.push('\n');
            }
            Err(err) => {
                warn!(error = %err, "snapshot rejected");
                let _ = writeln!(out, "ecosystem snapshot rejected: {err}\n");
            }
        }
    }

    if let Some(events) = view.activity.value() {
        activity_table(&mut out, events);
    }
    out
}
