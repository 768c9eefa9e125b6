/*!
 * Reporting functionality for tokenkit
 *
 * Renders split results as console tables using the tabled library.
 */

use std::time::Duration;

use tabled::{
    settings::{object::Columns, Alignment, Modify, Padding, Style},
    Table, Tabled,
};

use crate::tokenizer::CacheStats;

/// Information about one produced chunk
#[derive(Debug, Clone, Default)]
pub struct ChunkInfo {
    /// Measured token count of the chunk
    pub tokens: usize,
    /// Number of characters in the chunk
    pub chars: usize,
    /// Leading text of the chunk
    pub preview: String,
}

impl ChunkInfo {
    /// Describe `chunk`, keeping at most `preview_len` characters of it
    pub fn new(chunk: &str, tokens: usize, preview_len: usize) -> Self {
        Self {
            tokens,
            chars: chunk.chars().count(),
            preview: preview(chunk, preview_len),
        }
    }
}

/// Summary of a split run
#[derive(Debug, Clone)]
pub struct SplitReport {
    /// Model used for counting
    pub model: String,
    /// Requested ceiling
    pub max_tokens: usize,
    /// Tokens in the whole input
    pub input_tokens: usize,
    /// Time taken to split
    pub duration: Duration,
    /// Details for each chunk, in order
    pub chunks: Vec<ChunkInfo>,
    /// Token cache statistics (if caching is enabled)
    pub cache: Option<CacheStats>,
}

/// Format of the report output
pub enum ReportFormat {
    /// Console table output
    ConsoleTable,
}

/// Report generator for split results
pub struct Reporter {
    format: ReportFormat,
}

impl Reporter {
    /// Create a new reporter
    pub fn new(format: ReportFormat) -> Self {
        Self { format }
    }

    /// Format a number with human-readable units
    fn format_number(&self, num: usize) -> String {
        if num >= 1_000_000 {
            format!("{:.1}M", num as f64 / 1_000_000.0)
        } else if num >= 1_000 {
            format!("{:.1}K", num as f64 / 1_000.0)
        } else {
            num.to_string()
        }
    }

    /// Generate a report string for a split run
    pub fn generate_report(&self, report: &SplitReport) -> String {
        match self.format {
            ReportFormat::ConsoleTable => self.generate_console_report(report),
        }
    }

    /// Print the report to stdout
    pub fn print_report(&self, report: &SplitReport) {
        println!("\n{}", self.generate_report(report));
    }

    fn create_summary_table(&self, report: &SplitReport) -> String {
        #[derive(Tabled)]
        struct SummaryRow {
            #[tabled(rename = "Metric")]
            key: String,

            #[tabled(rename = "Value")]
            value: String,
        }

        let mut rows = vec![
            SummaryRow {
                key: "Model".to_string(),
                value: report.model.clone(),
            },
            SummaryRow {
                key: "Process Time".to_string(),
                value: format!("{:.4?}", report.duration),
            },
            SummaryRow {
                key: "Input Tokens".to_string(),
                value: self.format_number(report.input_tokens),
            },
            SummaryRow {
                key: "Max Tokens".to_string(),
                value: self.format_number(report.max_tokens),
            },
            SummaryRow {
                key: "Chunks".to_string(),
                value: self.format_number(report.chunks.len()),
            },
        ];

        if let Some(stats) = report.cache {
            let total = stats.hits + stats.misses;
            let hit_rate = if total > 0 {
                format!("{:.1}%", (stats.hits as f64 / total as f64) * 100.0)
            } else {
                "0.0%".to_string()
            };

            rows.push(SummaryRow {
                key: "Cache Hit Rate".to_string(),
                value: format!("{} ({} hits / {} total)", hit_rate, stats.hits, total),
            });
        }

        let mut table = Table::new(rows);
        table
            .with(Style::rounded())
            .with(Padding::new(1, 1, 0, 0))
            .with(Modify::new(Columns::new(..)).with(Alignment::left()));

        table.to_string()
    }

    fn create_chunks_table(&self, report: &SplitReport) -> String {
        #[derive(Tabled)]
        struct ChunkRow {
            #[tabled(rename = "#")]
            index: usize,

            #[tabled(rename = "Tokens")]
            tokens: String,

            #[tabled(rename = "Chars")]
            chars: String,

            #[tabled(rename = "Preview")]
            preview: String,
        }

        let rows: Vec<ChunkRow> = report
            .chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| ChunkRow {
                index: i + 1,
                tokens: self.format_number(chunk.tokens),
                chars: self.format_number(chunk.chars),
                preview: chunk.preview.clone(),
            })
            .collect();

        let mut table = Table::new(rows);
        table
            .with(Style::rounded())
            .with(Padding::new(1, 1, 0, 0))
            .with(Modify::new(Columns::new(..)).with(Alignment::left()));

        table.to_string()
    }

    fn generate_console_report(&self, report: &SplitReport) -> String {
        format!(
            "CHUNKS\n{}\n\nSUMMARY\n{}",
            self.create_chunks_table(report),
            self.create_summary_table(report)
        )
    }
}

/// First `max_chars` characters of `text` on one line, with an ellipsis when cut
fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut cut: String = flat.chars().take(max_chars.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_flattens_and_truncates() {
        assert_eq!(preview("short\ntext", 20), "short text");
        assert_eq!(preview("abcdefghijklmnop", 8), "abcde...");
        assert_eq!(preview("ééééé", 4), "é...");
    }

    #[test]
    fn test_format_number() {
        let reporter = Reporter::new(ReportFormat::ConsoleTable);
        assert_eq!(reporter.format_number(999), "999");
        assert_eq!(reporter.format_number(1_500), "1.5K");
        assert_eq!(reporter.format_number(2_000_000), "2.0M");
    }

    #[test]
    fn test_report_lists_every_chunk() {
        let report = SplitReport {
            model: "openai:gpt-4o".to_string(),
            max_tokens: 10,
            input_tokens: 17,
            duration: Duration::from_millis(3),
            chunks: vec![
                ChunkInfo::new("first chunk of text", 9, 40),
                ChunkInfo::new("second chunk", 8, 40),
            ],
            cache: Some(CacheStats { hits: 1, misses: 3 }),
        };

        let output = Reporter::new(ReportFormat::ConsoleTable).generate_report(&report);
        assert!(output.contains("first chunk of text"));
        assert!(output.contains("second chunk"));
        assert!(output.contains("openai:gpt-4o"));
        assert!(output.contains("25.0% (1 hits / 4 total)"));
    }
}
