//! Batch processing of a domain spreadsheet
//!
//! Loads the input table, looks up every row's `Domain` value one at a time,
//! appends the three result columns and writes the output file once at the
//! end. Per-row failures are recorded in the row's status; only problems with
//! the input table or the output write abort the run.

use crate::{
    errors::CheckerError,
    opentip::DomainLookup,
    table::{read_table, write_table, CellValue, Table, TableFormat},
    QueryResult, CATEGORIES_COLUMN, DOMAIN_COLUMN, STATUS_COLUMN, ZONE_COLUMN,
};
use chrono::Utc;
use serde::Serialize;
use std::{
    io::{self, Write},
    path::Path,
    time::Instant,
};
use tracing::{debug, error, info};

/// Summary of one batch run
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    /// Rows in the input table
    pub total_domains: usize,
    /// Lookups that returned a report
    pub successful: usize,
    /// Lookups that failed on the wire or while decoding
    pub failed: usize,
    /// Rows skipped because the domain cell was blank
    pub invalid: usize,
    pub output_file: String,
    pub started_at: String,
    pub completed_at: String,
    pub total_duration_secs: f64,
}

impl BatchSummary {
    fn record(&mut self, result: &QueryResult) {
        if result.is_success() {
            self.successful += 1;
        } else if result.is_invalid() {
            self.invalid += 1;
        } else {
            self.failed += 1;
        }
    }
}

pub struct BatchProcessor<L> {
    lookup: L,
    show_progress: bool,
}

impl<L: DomainLookup> BatchProcessor<L> {
    pub fn new(lookup: L, show_progress: bool) -> Self {
        Self { lookup, show_progress }
    }

    pub fn lookup(&self) -> &L {
        &self.lookup
    }

    /// Run the batch and report the outcome on the console.
    ///
    /// Returns `true` once the output file has been written.
    pub async fn run(&self, input: &Path, output: &Path) -> bool {
        let line_break = if self.show_progress { "\n" } else { "" };

        match self.process(input, output).await {
            Ok(summary) => {
                println!(
                    "{}Successfully processed {} domains. Results saved to {}",
                    line_break,
                    summary.total_domains,
                    output.display()
                );
                info!(
                    "Batch complete: {} succeeded, {} failed, {} invalid in {:.1}s",
                    summary.successful, summary.failed, summary.invalid, summary.total_duration_secs
                );
                match serde_json::to_string(&summary) {
                    Ok(json) => debug!("Batch summary: {}", json),
                    Err(e) => debug!("Could not serialize batch summary: {}", e),
                }
                true
            }
            Err(CheckerError::EmptyInput) => {
                println!("{}", CheckerError::EmptyInput);
                false
            }
            Err(e) => {
                error!("Batch failed for {}: {}", input.display(), e);
                println!("{}Error processing file: {}", line_break, e);
                false
            }
        }
    }

    /// Enrich `input` and write the result to `output`.
    ///
    /// Nothing is written unless every row has been processed.
    pub async fn process(&self, input: &Path, output: &Path) -> Result<BatchSummary, CheckerError> {
        let started_at = Utc::now();
        let start = Instant::now();

        let mut table = read_table(input)?;
        let domain_index = table.require_column(DOMAIN_COLUMN)?;

        let total = table.len();
        if total == 0 {
            return Err(CheckerError::EmptyInput);
        }

        // Fail before spending any lookups on a run that cannot be saved
        TableFormat::for_output(output)?;

        let domains: Vec<Option<String>> = table
            .column(domain_index)
            .map(|cell| {
                if cell.is_blank() {
                    None
                } else {
                    Some(cell.to_string().trim().to_string())
                }
            })
            .collect();

        println!("Starting processing of {} domains...", total);

        let mut summary = BatchSummary {
            total_domains: total,
            successful: 0,
            failed: 0,
            invalid: 0,
            output_file: output.display().to_string(),
            started_at: started_at.to_rfc3339(),
            completed_at: String::new(),
            total_duration_secs: 0.0,
        };

        let mut results = Vec::with_capacity(total);
        for (processed, domain) in domains.iter().enumerate() {
            let result = match domain {
                Some(domain) => self.lookup.query(domain).await,
                None => QueryResult::invalid(),
            };
            debug!("Row {}: {:?} -> {}", processed + 1, domain, result.status);

            summary.record(&result);
            results.push(result);
            self.report_progress(processed + 1, total);
        }

        append_results(&mut table, results)?;
        write_table(output, &table)?;

        summary.completed_at = Utc::now().to_rfc3339();
        summary.total_duration_secs = start.elapsed().as_secs_f64();

        Ok(summary)
    }

    fn report_progress(&self, processed: usize, total: usize) {
        if !self.show_progress {
            return;
        }

        print!("\r{}", progress_line(processed, total));
        let _ = io::stdout().flush();
    }
}

fn progress_line(processed: usize, total: usize) -> String {
    let progress = processed as f64 / total as f64 * 100.0;
    format!("Processed {}/{} ({:.1}%)", processed, total, progress)
}

fn append_results(table: &mut Table, results: Vec<QueryResult>) -> Result<(), CheckerError> {
    let mut zones = Vec::with_capacity(results.len());
    let mut categories = Vec::with_capacity(results.len());
    let mut statuses = Vec::with_capacity(results.len());

    for result in results {
        zones.push(CellValue::Text(result.zone));
        categories.push(CellValue::Text(result.categories));
        statuses.push(CellValue::Text(result.status));
    }

    table.set_column(ZONE_COLUMN, zones)?;
    table.set_column(CATEGORIES_COLUMN, categories)?;
    table.set_column(STATUS_COLUMN, statuses)?;
    Ok(())
}
