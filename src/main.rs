use anyhow::{anyhow, Result};
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use crossterm::style::Stylize;
use logview::api_client::{AttributeSearchClient, CatalogAttributeClient, HttpAttributeClient};
use logview::config::config::Config;
use logview::location::{Location, MemoryLocation};
use logview::logging;
use logview::options::{Format, InitialOptions};
use logview::options_menu::{OptionsMenu, OptionsMenuEvent, OptionsMenuProps};
use logview::raw_log_view::{load_records, LogRecord, RawLogView};
use logview::store::fs::FileStore;
use logview::store::memory::InMemoryStore;
use logview::store::KeyValueStore;
use logview::utils::app_paths::AppPaths;
use reedline::{
    FileBackedHistory, Prompt, PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus,
    Reedline, Signal,
};
use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_LOCATION: &str = "http://localhost/logs/logs-explorer";

type Menu = OptionsMenu<Box<dyn KeyValueStore>, MemoryLocation>;

struct OptionsPrompt;

impl Prompt for OptionsPrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        Cow::Borrowed("logview")
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _edit_mode: PromptEditMode) -> Cow<'_, str> {
        Cow::Borrowed("> ")
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed("... ")
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<'_, str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };
        Cow::Owned(format!(
            "({}reverse search: {})",
            prefix, history_search.term
        ))
    }
}

fn print_help() {
    println!("{}", "logview - list view options".blue().bold());
    println!();
    println!("{}", "Usage:".yellow());
    println!("  logview [OPTIONS]");
    println!();
    println!("{}", "Options:".yellow());
    println!("  {}     - Start from this URL", "--url <URL>".green());
    println!("  {} - Serve lookups from a JSON catalog", "--catalog <FILE>".green());
    println!("  {}    - Log records to render (JSON lines)", "--logs <FILE>".green());
    println!("  {} - Initial columns, comma separated", "--columns <A,B>".green());
    println!("  {}      - Keep options in memory only", "--ephemeral".green());
    println!("  {} - Generate config file with defaults", "--generate-config".green());
    println!();
    println!("{}", "Commands:".yellow());
    println!("  {}   - Type into the add-column search", "search <text>".green());
    println!("  {}   - Add a column", "select <key>".green());
    println!("  {}   - Remove a column", "remove <key>".green());
    println!("  {} - raw, table or list", "format <name>".green());
    println!("  {}   - Lines per row", "max-lines <n>".green());
    println!("  {}     - Focus / leave the search box", "focus | blur".green());
    println!("  {}         - Render the loaded logs", "view [row]".green());
    println!("  {}  - Show options, URL, recent logs", "show | url | logs".green());
    println!("  {}        - Exit", "quit".green());
    println!();
}

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|pos| args.get(pos + 1))
        .cloned()
}

fn print_menu(menu: &Menu) {
    let config = menu.config();

    println!(
        "{} {}   {} {}",
        "format:".yellow(),
        config.format.value,
        "max lines:".yellow(),
        config.max_lines.value
    );

    let columns: Vec<String> = config.add_column.value.iter().map(|c| c.key.clone()).collect();
    println!(
        "{} {}",
        "columns:".yellow(),
        if columns.is_empty() {
            "(none)".to_string()
        } else {
            columns.join(", ")
        }
    );

    if config.add_column.is_focused {
        println!(
            "{} {:?}{}",
            "search:".yellow(),
            config.add_column.search_text,
            if config.add_column.is_fetching {
                " (fetching)"
            } else {
                ""
            }
        );
    }

    if !config.add_column.options.is_empty() {
        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("attribute").add_attribute(Attribute::Bold),
            Cell::new("selected").add_attribute(Attribute::Bold),
        ]);
        for option in &config.add_column.options {
            table.add_row(vec![
                option.label.clone(),
                if option.selected { "yes" } else { "" }.to_string(),
            ]);
        }
        println!("{table}");
    }
}

async fn run_command(
    menu: &mut Menu,
    records: &[LogRecord],
    view: &mut RawLogView,
    line: &str,
) -> Result<()> {
    let (command, rest) = line
        .split_once(char::is_whitespace)
        .map(|(c, r)| (c, r.trim()))
        .unwrap_or((line, ""));

    match command {
        "help" | "\\help" => print_help(),
        "clear" | "\\clear" => print!("{esc}[2J{esc}[1;1H", esc = 27 as char),
        "show" => print_menu(menu),
        "url" => println!("{}", menu.location().url()),
        "focus" => menu.handle_event(OptionsMenuEvent::Focus)?,
        "blur" => menu.handle_event(OptionsMenuEvent::Blur)?,
        "search" => {
            if !menu.is_focused() {
                menu.handle_event(OptionsMenuEvent::Focus)?;
            }
            menu.handle_event(OptionsMenuEvent::Search(rest.to_string()))?;
            menu.settle().await;
            print_menu(menu);
        }
        "select" => {
            menu.handle_event(OptionsMenuEvent::Select(rest.to_string()))?;
            print_menu(menu);
        }
        "remove" => {
            menu.handle_event(OptionsMenuEvent::Remove(rest.to_string()))?;
            print_menu(menu);
        }
        "format" => {
            let format: Format = rest.parse()?;
            menu.handle_event(OptionsMenuEvent::FormatChanged(format))?;
            print_menu(menu);
        }
        "max-lines" => {
            let max_lines: u32 = rest
                .parse()
                .map_err(|_| anyhow!("max-lines expects a positive number"))?;
            menu.handle_event(OptionsMenuEvent::MaxLinesChanged(max_lines))?;
            print_menu(menu);
        }
        "view" => {
            if records.is_empty() {
                println!("{}", "No logs loaded. Start with --logs <FILE>.".yellow());
            } else {
                let active = if rest.is_empty() {
                    None
                } else {
                    Some(
                        rest.parse::<usize>()
                            .map_err(|_| anyhow!("view expects a row number"))?,
                    )
                };
                view.set_active(active);
                println!("{}", view.render(records, &menu.options()));
            }
        }
        "logs" => {
            let count = rest.parse().unwrap_or(20);
            if let Some(buffer) = logging::get_log_buffer() {
                for entry in buffer.get_recent(count) {
                    println!("{}", entry.format_for_display());
                }
            }
        }
        other => return Err(anyhow!("Unknown command '{}', try help", other)),
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_tracing();

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    if args.contains(&"--generate-config".to_string()) {
        let path = Config::get_config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, Config::create_default_with_comments())?;
        println!("Configuration file created at: {:?}", path);
        return Ok(());
    }

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", format!("Config error, using defaults: {}", e).red());
            Config::default()
        }
    };

    let client: Arc<dyn AttributeSearchClient> = match arg_value(&args, "--catalog") {
        Some(path) => Arc::new(CatalogAttributeClient::from_file(&PathBuf::from(path))?),
        None => Arc::new(HttpAttributeClient::new(
            &config.api.base_url,
            Duration::from_secs(config.api.timeout_secs),
        )?),
    };

    let store: Box<dyn KeyValueStore> = if args.contains(&"--ephemeral".to_string()) {
        Box::new(InMemoryStore::new())
    } else {
        let path = match &config.storage.path {
            Some(path) => path.clone(),
            None => AppPaths::storage_file()?,
        };
        Box::new(FileStore::open(path)?)
    };

    let location = MemoryLocation::parse(
        &arg_value(&args, "--url").unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
    )?;

    let initial_columns: Vec<String> = match arg_value(&args, "--columns") {
        Some(columns) => columns
            .split(',')
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect(),
        None => config.view.initial_columns.clone(),
    };
    let initial_options = InitialOptions {
        select_columns: (!initial_columns.is_empty()).then_some(initial_columns),
        ..Default::default()
    };

    let props = OptionsMenuProps::new(config.view.data_source, &config.view.aggregate_operator)
        .with_initial_options(initial_options);
    let mut menu = OptionsMenu::new(props, client, store, location)
        .with_debounce_ms(config.search.debounce_ms)
        .with_excluded_keys(&config.search.excluded_keys);
    menu.mount().await?;

    let records = match arg_value(&args, "--logs") {
        Some(path) => load_records(&PathBuf::from(path))?,
        None => Vec::new(),
    };
    let mut view = RawLogView::new(config.view.wrap_width).with_color(true);

    print_help();
    print_menu(&menu);

    let history = Box::new(FileBackedHistory::with_file(100, AppPaths::history_file()?)?);
    let mut line_editor = Reedline::create().with_history(history);
    let prompt = OptionsPrompt;

    loop {
        let sig = line_editor.read_line(&prompt)?;
        match sig {
            Signal::Success(buffer) => {
                let trimmed = buffer.trim();
                if trimmed.is_empty() {
                    menu.tick().await;
                    continue;
                }
                if trimmed == "quit" || trimmed == "exit" {
                    break;
                }

                if let Err(e) = run_command(&mut menu, &records, &mut view, trimmed).await {
                    eprintln!("{}", format!("Error: {:#}", e).red());
                }
            }
            Signal::CtrlD | Signal::CtrlC => {
                println!("\nGoodbye!");
                break;
            }
        }
    }

    Ok(())
}
