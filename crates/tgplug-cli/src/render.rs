//! Text output for classification results.

use tgplug::{ClassificationResult, EnvironmentSignals, GraphicsProbe};

pub fn describe_memory(gib: Option<f64>) -> String {
    match gib {
        Some(gib) => format!("{gib} GiB"),
        None => "unknown".to_string(),
    }
}

pub fn describe_graphics(graphics: &GraphicsProbe) -> String {
    match graphics {
        GraphicsProbe::Unavailable => "no graphics context".to_string(),
        GraphicsProbe::RendererHidden => "renderer hidden".to_string(),
        GraphicsProbe::Renderer(name) => name.clone(),
    }
}

/// Multi-line report of the inputs and the verdict.
pub fn classification_report(signals: &EnvironmentSignals, result: &ClassificationResult) -> String {
    let user_agent = if signals.user_agent.is_empty() {
        "(empty)"
    } else {
        signals.user_agent.as_str()
    };
    let reasons = if result.reasons.is_empty() {
        "none".to_string()
    } else {
        result
            .reasons
            .iter()
            .map(|r| r.label())
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut out = String::new();
    out.push_str(&format!("  Verdict:     {}\n", result.summary()));
    out.push_str(&format!("  Reasons:     {reasons}\n"));
    out.push_str(&format!("  User agent:  {user_agent}\n"));
    out.push_str(&format!("  Memory:      {}\n", describe_memory(signals.device_memory_gib)));
    out.push_str(&format!("  Graphics:    {}\n", describe_graphics(&signals.graphics)));
    out.push_str(&format!(
        "  Stored:      {}\n",
        signals.stored_preference.as_deref().unwrap_or("none")
    ));
    out
}
