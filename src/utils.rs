//! Concrete progress sinks: console output and JSON lines.
use crate::report::{EpochReport, Reporter, TrainingSummary};
use serde::Serialize;
use std::io::{self, Write};

/// Prints every `every`-th epoch and a summary table per finished model.
#[derive(Debug, Clone)]
pub struct ConsoleReporter {
    every: usize,
    history: Vec<f64>,
}

impl ConsoleReporter {
    pub fn new(every: usize) -> Self {
        Self {
            every: every.max(1),
            history: Vec::new(),
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new(10)
    }
}

impl Reporter for ConsoleReporter {
    fn on_member(&mut self, index: usize, count: usize) {
        println!("\n--- model {}/{} ---", index + 1, count);
    }

    fn on_epoch(&mut self, report: &EpochReport) {
        self.history.push(mean(&report.rmse));
        if report.epoch % self.every == 0 {
            println!("epoch {:>5}  rmse {}", report.epoch, format_row(&report.rmse));
        }
    }

    fn on_finish(&mut self, summary: &TrainingSummary) {
        let title = match summary.member {
            Some(m) => format!("Model {} RMSE", m + 1),
            None => "RMSE".to_owned(),
        };
        print_summary_table(&self.history, &title);
        self.history.clear();
    }
}

/// Print a small table of a per-epoch series: first, last and average.
pub fn print_summary_table(values: &[f64], title: &str) {
    println!("\n{} Summary Table:", title);
    println!("+----------------+----------+");
    println!("| Epoch Range    |    Value |");
    println!("+----------------+----------+");
    if let (Some(first), Some(last)) = (values.first(), values.last()) {
        println!("| First Epoch    | {:>8.4} |", first);
        println!("| Last Epoch     | {:>8.4} |", last);
        println!("| All Epochs avg | {:>8.4} |", mean(values));
    }
    println!("+----------------+----------+");
}

/// Space-separated values with four decimals.
pub fn format_row(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| format!("{v:.4}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum Event<'a> {
    Member { index: usize, count: usize },
    Epoch(&'a EpochReport),
    Finish(&'a TrainingSummary),
}

/// Writes one JSON object per event.
///
/// Write errors are kept, later events are dropped, and the first error comes
/// back from [`JsonLinesReporter::into_inner`].
#[derive(Debug)]
pub struct JsonLinesReporter<W: Write> {
    out: W,
    error: Option<io::Error>,
}

impl<W: Write> JsonLinesReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out, error: None }
    }

    pub fn into_inner(mut self) -> io::Result<W> {
        match self.error.take() {
            Some(e) => Err(e),
            None => {
                self.out.flush()?;
                Ok(self.out)
            }
        }
    }

    fn emit(&mut self, event: &Event<'_>) {
        if self.error.is_some() {
            return;
        }
        let written = serde_json::to_writer(&mut self.out, event)
            .map_err(io::Error::from)
            .and_then(|()| self.out.write_all(b"\n"));
        if let Err(e) = written {
            log::warn!("json reporter stopped: {e}");
            self.error = Some(e);
        }
    }
}

impl<W: Write> Reporter for JsonLinesReporter<W> {
    fn on_member(&mut self, index: usize, count: usize) {
        self.emit(&Event::Member { index, count });
    }

    fn on_epoch(&mut self, report: &EpochReport) {
        self.emit(&Event::Epoch(report));
    }

    fn on_finish(&mut self, summary: &TrainingSummary) {
        self.emit(&Event::Finish(summary));
    }
}
