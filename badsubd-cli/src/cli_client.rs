use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::time::Instant;

use tracing::debug;

use sql::{SqlFrontend, StatementResult};

use crate::cli_options::{CliOptions, OutputFormat};
use crate::pretty_util::{render_table, to_bytes_len_pretty, to_duration_pretty};

/// Drives one [`SqlFrontend`] from the command line: either a single
/// `--execute` statement, or an interactive line-at-a-time REPL.
pub struct CliClient {
    frontend: SqlFrontend,
    options: CliOptions,
}

impl CliClient {
    pub fn new(frontend: SqlFrontend, options: CliOptions) -> Self {
        CliClient { frontend, options }
    }

    /// Executes one statement and exits non-zero on failure, per the
    /// dialect's single-statement-per-call contract.
    pub fn run_once(&self, sql: &str) -> ExitCode {
        if self.execute_and_print(sql) {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }

    /// Reads statements from stdin, one per line, until EOF or
    /// `exit`/`quit`. Failures print the error's `Display` form and
    /// continue the loop rather than aborting the session.
    pub fn run_repl(&self) -> ExitCode {
        self.print_banner();

        let stdin = io::stdin();
        self.prompt();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let statement = line.trim();

            if statement.is_empty() {
                self.prompt();
                continue;
            }
            if statement.eq_ignore_ascii_case("exit") || statement.eq_ignore_ascii_case("quit") {
                break;
            }
            if let Some(table) = statement.strip_prefix("\\d") {
                self.describe_table(table.trim());
                self.prompt();
                continue;
            }

            self.execute_and_print(statement);
            self.prompt();
        }
        println!();
        ExitCode::SUCCESS
    }

    fn execute_and_print(&self, sql: &str) -> bool {
        let start = Instant::now();
        match self.frontend.execute(sql) {
            Ok(result) => {
                self.print_result(&result);
                let elapsed = start.elapsed();
                debug!(statement = sql, elapsed = %to_duration_pretty(&elapsed), "statement executed");
                if self.options.is_debug() {
                    eprintln!("-- ok ({})", to_duration_pretty(&elapsed));
                }
                true
            }
            Err(err) => {
                eprintln!("error: {err}");
                false
            }
        }
    }

    /// `\d <table>` meta-command: prints schema, row size, row count,
    /// and the on-disk size of the heap and every index file. Not part
    /// of the SQL dialect (§4.6) — a REPL convenience over
    /// [`engine::Engine::get_table_info`], the way `psql`'s `\d`
    /// resolves entirely client-side.
    fn describe_table(&self, table: &str) {
        if table.is_empty() {
            eprintln!("usage: \\d <table>");
            return;
        }
        match self.frontend.engine().get_table_info(table) {
            Ok(info) => {
                println!("table \"{}\"", info.table_name);
                for column in &info.columns {
                    let indexed = if info.indexed_columns.contains(column.name()) { " [indexed]" } else { "" };
                    println!("  {:<20} {}{}", column.name(), column.data_type().name(), indexed);
                }
                println!("row size: {} bytes", info.row_size);
                println!("total rows (incl. tombstoned): {}", info.total_rows);
                println!("heap file: {}", to_bytes_len_pretty(info.heap_size_bytes as usize));
                for (column, size) in &info.index_size_bytes {
                    println!("index on {column}: {}", to_bytes_len_pretty(*size as usize));
                }
            }
            Err(err) => eprintln!("error: {err}"),
        }
    }

    fn print_result(&self, result: &StatementResult) {
        match result {
            StatementResult::TableCreated => println!("table created"),
            StatementResult::Inserted { offset } => println!("inserted at offset {offset}"),
            StatementResult::Deleted(n) if *n < 0 => println!("table truncated"),
            StatementResult::Deleted(n) => println!("{n} row(s) deleted"),
            StatementResult::Rows(rows) => match self.options.format() {
                OutputFormat::Table => print!("{}", render_table(rows)),
                OutputFormat::Json => match serde_json::to_string_pretty(rows) {
                    Ok(text) => println!("{text}"),
                    Err(e) => eprintln!("error formatting rows as json: {e}"),
                },
                OutputFormat::Yaml => match serde_yaml::to_string(rows) {
                    Ok(text) => println!("{text}"),
                    Err(e) => eprintln!("error formatting rows as yaml: {e}"),
                },
            },
        }
    }

    fn print_banner(&self) {
        println!();
        println!("╔╗ ╔═╗╔╦╗╔═╗╦ ╦╔╗ ╔╦╗");
        println!("╠╩╗╠═╣ ║║╚═╗║ ║╠╩╗ ║║");
        println!("╚═╝╩ ╩═╩╝╚═╝╚═╝╚═╝═╩╝ a small single-node storage engine");
        println!();
        println!("Enter a statement and press Enter; `exit` or `quit` to leave.");
    }

    fn prompt(&self) {
        print!("badsubd> ");
        let _ = io::stdout().flush();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use badsubd_common::config::EngineConfig;
    use engine::Engine;

    fn client(format: OutputFormat) -> (tempfile::TempDir, CliClient) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = EngineConfig::default();
        config.set_data_dir(dir.path().to_path_buf());
        let frontend = SqlFrontend::new(Engine::open(config).unwrap());
        let client = CliClient::new(frontend, CliOptions::new(false, format));
        (dir, client)
    }

    #[test]
    fn a_valid_statement_runs_successfully() {
        let (_dir, client) = client(OutputFormat::Table);
        assert!(client.execute_and_print("CREATE TABLE users (id INT, login VARCHAR(10))"));
        assert!(client.execute_and_print("INSERT INTO users VALUES (1, 'alice')"));
    }

    #[test]
    fn an_invalid_statement_reports_failure_without_panicking() {
        let (_dir, client) = client(OutputFormat::Json);
        assert!(!client.execute_and_print("DROP TABLE users"));
    }

    #[test]
    fn run_once_does_not_panic_on_success_or_failure() {
        let (_dir, client) = client(OutputFormat::Yaml);
        client.run_once("CREATE TABLE t (id INT)");
        client.run_once("not a statement");
    }

    #[test]
    fn describe_table_does_not_panic_for_known_or_unknown_tables() {
        let (_dir, client) = client(OutputFormat::Table);
        client.execute_and_print("CREATE TABLE users (id INT, login VARCHAR(10))");
        client.describe_table("users");
        client.describe_table("missing");
        client.describe_table("");
    }
}
