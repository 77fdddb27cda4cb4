//! Terminal output formatting with colors.

use colored::Colorize;

use crate::error::{Error, Result};
use crate::types::{PerfSample, ProcessorCapabilities};

/// Format probe results for a startup banner.
pub fn format_capabilities(caps: &ProcessorCapabilities) -> String {
    let mut output = String::new();
    let sep = "\u{2500}".repeat(48);
    let fm = caps.decoded();

    output.push_str("aperf-sampler\n");
    output.push_str(&sep);
    output.push('\n');

    output.push_str(&format!(
        "  Vendor:   {}\n",
        if caps.is_target_vendor {
            "GenuineIntel".green().to_string()
        } else {
            "other".yellow().to_string()
        }
    ));
    output.push_str(&format!(
        "  Family:   {:#x}  Model: {:#x}  Stepping: {}\n",
        fm.family, fm.model, fm.stepping
    ));
    output.push_str(&format!(
        "  Counters: {}\n",
        if caps.supports_fast_counter_read {
            "\u{2713} APERF/MPERF available".green().to_string()
        } else {
            "\u{2717} APERF/MPERF not advertised".red().bold().to_string()
        }
    ));

    output.push_str(&sep);
    output.push('\n');
    output
}

/// Format the outcome of one acquisition as a single line.
pub fn format_sample(core: u32, outcome: &Result<PerfSample>) -> String {
    match outcome {
        Ok(sample) => format!(
            "  cpu{:<4} {} aperf={} mperf={}",
            core,
            "ok".green(),
            sample.aperf,
            sample.mperf
        ),
        Err(err @ Error::Timeout { .. }) => {
            format!("  cpu{:<4} {} {}", core, "gap".yellow(), err)
        }
        Err(err) => format!("  cpu{:<4} {} {}", core, "fail".red().bold(), err),
    }
}
