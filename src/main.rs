//! inkpot - Local-first account and page manager for Telegra.ph
#![allow(clippy::uninlined_format_args)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use inkpot::api::{self, HttpClient};
use inkpot::{
    Account, AccountChanges, AccountId, AccountStore, Config, Database, EncryptedFileVault,
    RecordStore, SecretVault, StoreError,
};

type Store = AccountStore<EncryptedFileVault, Database>;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (RUST_LOG=debug for verbose output)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let command = parse_args()?;
    match command {
        Command::Help => {
            print_help();
            return Ok(());
        }
        Command::Version => {
            print_version();
            return Ok(());
        }
        _ => {}
    }

    let mut config = Config::load()?;
    let client = HttpClient::with_base_url(&config.api_url, config.request_timeout())?;
    let mut store = open_store(&config)?;

    match command {
        Command::Accounts => list_accounts(&store),
        Command::Create {
            short_name,
            author_name,
            author_url,
        } => {
            let id = store
                .create_remote(
                    &client,
                    &short_name,
                    author_name.as_deref(),
                    author_url.as_deref(),
                )
                .await?;
            println!("✓ Created account {}", short_name);
            select_and_save(&mut store, &mut config, id)
        }
        Command::Import { token } => {
            let id = store.import_token(&client, &token).await?;
            let label = store.get(&id).map_or("", Account::label).to_string();
            println!("✓ Imported account {}", label);
            select_and_save(&mut store, &mut config, id)
        }
        Command::Select { account } => {
            let id = resolve(&store, Some(account.as_str()))?;
            select_and_save(&mut store, &mut config, id)
        }
        Command::Info { account } => {
            let id = resolve(&store, account.as_deref())?;
            let account = store.refresh(&id, &client).await?;
            store.save(&id)?;
            print_account(&id, &account, store.current_id() == Some(id));
            Ok(())
        }
        Command::Revoke { account } => {
            let id = resolve(&store, account.as_deref())?;
            let account = store.revoke(&id, &client).await?;
            println!("✓ Access token revoked, a new one was stored");
            if let Some(url) = &account.auth_url {
                println!("\nLog in on this browser with (valid for 5 minutes):\n\n  {}\n", url);
                if config.open_auth_url {
                    if let Err(e) = open::that(url) {
                        tracing::debug!("Failed to open browser: {e}");
                    }
                }
            }
            Ok(())
        }
        Command::Edit { account, changes } => {
            let id = resolve(&store, account.as_deref())?;
            let account = store.push_info(&id, &client, &changes).await?;
            println!("✓ Updated {}", account.label());
            Ok(())
        }
        Command::Delete { account } => {
            let id = resolve(&store, Some(account.as_str()))?;
            let removed = store.delete(&id)?;
            if config.current_account == Some(id) {
                config.current_account = store.current_id();
                config.save()?;
            }
            println!("✓ Removed {} from this device", removed.label());
            Ok(())
        }
        Command::Pages {
            account,
            offset,
            limit,
        } => {
            let id = resolve(&store, account.as_deref())?;
            let limit = limit.unwrap_or(config.page_list_limit);
            list_pages(&store, &client, &id, offset, limit).await
        }
        Command::Page { path } => show_page(&client, &path).await,
        Command::Publish {
            title,
            file,
            account,
        } => {
            let id = resolve(&store, account.as_deref())?;
            publish(&store, &client, &id, &title, &file).await
        }
        Command::EditPage {
            path,
            title,
            file,
            account,
        } => {
            let id = resolve(&store, account.as_deref())?;
            edit_page(&store, &client, &id, &path, &title, &file).await
        }
        Command::Views { path } => {
            let views = api::views(&client, &path).await?;
            println!("{} views", views.views);
            Ok(())
        }
        Command::Help | Command::Version => Ok(()),
    }
}

/// CLI commands
enum Command {
    Accounts,
    Create {
        short_name: String,
        author_name: Option<String>,
        author_url: Option<String>,
    },
    Import {
        token: String,
    },
    Select {
        account: String,
    },
    Info {
        account: Option<String>,
    },
    Revoke {
        account: Option<String>,
    },
    Edit {
        account: Option<String>,
        changes: AccountChanges,
    },
    Delete {
        account: String,
    },
    Pages {
        account: Option<String>,
        offset: u32,
        limit: Option<u32>,
    },
    Page {
        path: String,
    },
    Publish {
        title: String,
        file: PathBuf,
        account: Option<String>,
    },
    EditPage {
        path: String,
        title: String,
        file: PathBuf,
        account: Option<String>,
    },
    Views {
        path: String,
    },
    Help,
    Version,
}

/// Value following any of `names`
fn flag(args: &[String], names: &[&str]) -> Option<String> {
    args.iter()
        .position(|a| names.contains(&a.as_str()))
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn positional(args: &[String], index: usize, what: &str) -> Result<String> {
    args.get(index)
        .filter(|a| !a.starts_with('-'))
        .cloned()
        .ok_or_else(|| anyhow!("Missing {what}\nRun 'inkpot --help' for usage"))
}

fn parse_args() -> Result<Command> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() == 1 {
        return Ok(Command::Accounts);
    }

    let account = flag(&args, &["--account", "-a"]);

    match args[1].as_str() {
        "-h" | "--help" | "help" => Ok(Command::Help),
        "-v" | "--version" | "version" => Ok(Command::Version),

        "accounts" | "ls" => Ok(Command::Accounts),

        "create" => Ok(Command::Create {
            short_name: positional(&args, 2, "account name")?,
            author_name: flag(&args, &["--author"]),
            author_url: flag(&args, &["--url"]),
        }),

        "import" => Ok(Command::Import {
            token: positional(&args, 2, "access token")?,
        }),

        "select" | "use" => Ok(Command::Select {
            account: positional(&args, 2, "account")?,
        }),

        "info" | "refresh" => Ok(Command::Info { account }),

        "revoke" => Ok(Command::Revoke { account }),

        "edit" => {
            let changes = AccountChanges {
                short_name: flag(&args, &["--name"]),
                author_name: flag(&args, &["--author"]),
                author_url: flag(&args, &["--url"]),
            };
            if changes.is_empty() {
                return Err(anyhow!(
                    "Nothing to change\nUse --name, --author or --url"
                ));
            }
            Ok(Command::Edit { account, changes })
        }

        "delete" | "rm" => Ok(Command::Delete {
            account: positional(&args, 2, "account")?,
        }),

        "pages" => {
            let offset = flag(&args, &["--offset"])
                .and_then(|s| s.parse().ok())
                .unwrap_or(0);
            let limit = flag(&args, &["--limit", "-l"]).and_then(|s| s.parse().ok());
            Ok(Command::Pages {
                account,
                offset,
                limit,
            })
        }

        "page" => Ok(Command::Page {
            path: page_path(&positional(&args, 2, "page path")?),
        }),

        "publish" => Ok(Command::Publish {
            title: positional(&args, 2, "page title")?,
            file: PathBuf::from(positional(&args, 3, "content file")?),
            account,
        }),

        "edit-page" => Ok(Command::EditPage {
            path: page_path(&positional(&args, 2, "page path")?),
            title: positional(&args, 3, "page title")?,
            file: PathBuf::from(positional(&args, 4, "content file")?),
            account,
        }),

        "views" => Ok(Command::Views {
            path: page_path(&positional(&args, 2, "page path")?),
        }),

        other => Err(anyhow!(
            "Unknown command: {other}\nRun 'inkpot --help' for usage"
        )),
    }
}

/// Accept either a page path or a full telegra.ph URL
fn page_path(input: &str) -> String {
    input
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("telegra.ph/")
        .trim_matches('/')
        .to_string()
}

fn print_help() {
    let config_path = Config::default_path()
        .map_or_else(|_| "Unknown".to_string(), |p| p.display().to_string());

    println!(
        r#"inkpot - Local-first account and page manager for Telegra.ph

USAGE:
    inkpot                             List accounts
    inkpot [COMMAND]

ACCOUNTS:
    accounts                           List accounts on this device
    create <name> [OPTIONS]            Create a new Telegraph account
      Options:
        --author <name>                Default author name
        --url <link>                   Default author link
    import <token>                     Add an existing account by access token
    select <account>                   Make an account current
    info [-a <account>]                Refresh and show account details
    revoke [-a <account>]              Revoke the token and get a login link
    edit [-a <account>] [OPTIONS]      Change account details on Telegraph
      Options:
        --name <name>                  Account name
        --author <name>                Default author name
        --url <link>                   Default author link
    delete <account>                   Remove an account from this device

PAGES:
    pages [-a <account>] [OPTIONS]     List pages of an account
      Options:
        --offset <n>                   Skip the first n pages
        -l, --limit <n>                Number of pages (max 200)
    page <path>                        Show a page
    publish <title> <file> [-a <acc>]  Publish a text file as a new page
    edit-page <path> <title> <file>    Replace a page's title and content
              [-a <account>]
    views <path>                       Show page views

    <account> is an account name, a list number, or an account id,
    matched in that order. Without -a the current account is used.

OPTIONS:
    -h, --help                         Show this help message
    -v, --version                      Show version information

CONFIG:
    {}
"#,
        config_path
    );
}

fn print_version() {
    println!("inkpot {}", inkpot::VERSION);
}

fn open_store(config: &Config) -> Result<Store> {
    let vault = EncryptedFileVault::open()?;
    let db = Database::open()?;
    let mut store = AccountStore::initialize(vault, db).context("Failed to load accounts")?;
    store.reconcile().context("Failed to reconcile accounts")?;

    if let Some(id) = config.current_account {
        if let Err(e) = store.select(&id) {
            tracing::warn!(%id, "Saved account selection is stale: {e}");
        }
    }

    Ok(store)
}

fn select_and_save(store: &mut Store, config: &mut Config, id: AccountId) -> Result<()> {
    store.select(&id)?;
    config.current_account = Some(id);
    config.save()?;
    if let Some(account) = store.current() {
        println!("✓ Current account: {}", account.label());
    }
    Ok(())
}

/// Find an account by name, list number or id; fall back to the current one
fn resolve<V, R>(store: &AccountStore<V, R>, selector: Option<&str>) -> Result<AccountId>
where
    V: SecretVault,
    R: RecordStore,
{
    let Some(selector) = selector else {
        return store
            .current_id()
            .ok_or_else(|| anyhow!("No account selected\nRun: inkpot select <account>"));
    };

    if let Some((id, _)) = store
        .iter()
        .find(|(_, account)| account.short_name.as_deref() == Some(selector))
    {
        return Ok(id);
    }

    if let Ok(number) = selector.parse::<usize>() {
        return number
            .checked_sub(1)
            .and_then(|index| store.id_at(index))
            .ok_or_else(|| anyhow!("No account number {number}"));
    }

    if let Ok(id) = selector.parse::<AccountId>() {
        return store
            .get(&id)
            .map(|_| id)
            .ok_or_else(|| StoreError::NotFound(id).into());
    }

    Err(anyhow!("No account named {selector}"))
}

fn token_of<'a>(store: &'a Store, id: &AccountId) -> Result<&'a str> {
    let account = store.get(id).ok_or(StoreError::NotFound(*id))?;
    account
        .access_token
        .as_deref()
        .ok_or_else(|| StoreError::MissingToken.into())
}

fn print_account(id: &AccountId, account: &Account, current: bool) {
    let marker = if current { " (current)" } else { "" };
    println!("{}{}", account.label(), marker);
    println!("  id:      {}", id);
    if let Some(author) = &account.author_name {
        println!("  author:  {}", author);
    }
    if let Some(url) = &account.author_url {
        println!("  link:    {}", url);
    }
    if let Some(count) = account.page_count {
        println!("  pages:   {}", count);
    }
}

fn list_accounts(store: &Store) -> Result<()> {
    if store.is_empty() {
        println!("No accounts on this device.");
        println!("\nAdd an account with:");
        println!("  inkpot create <name>");
        println!("  inkpot import <token>");
        return Ok(());
    }

    let current = store.current_id();
    for (number, (id, account)) in store.iter().enumerate() {
        print!("{:>3}. ", number + 1);
        print_account(&id, account, current == Some(id));
    }

    Ok(())
}

async fn list_pages(
    store: &Store,
    client: &HttpClient,
    id: &AccountId,
    offset: u32,
    limit: u32,
) -> Result<()> {
    let token = token_of(store, id)?;
    let list = api::page_list(client, token, offset, limit).await?;

    if list.pages.is_empty() {
        println!("No pages.");
        return Ok(());
    }

    println!("{} pages\n", list.total_count);
    for page in &list.pages {
        println!("  {}  ({} views)", page.title, page.views);
        println!("    {}", page.url);
    }

    Ok(())
}

async fn show_page(client: &HttpClient, path: &str) -> Result<()> {
    let page = api::get_page(client, path).await?;

    println!("{}", page.title);
    if let Some(author) = &page.author_name {
        println!("by {}", author);
    }
    println!("{}\n{}", page.url, "─".repeat(60));

    for paragraph in page.plain_text().split("\n\n") {
        println!("{}\n", textwrap::fill(paragraph, 72));
    }

    Ok(())
}

async fn publish(
    store: &Store,
    client: &HttpClient,
    id: &AccountId,
    title: &str,
    file: &Path,
) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let account = store.get(id).ok_or(StoreError::NotFound(*id))?;
    let token = token_of(store, id)?;

    let page = api::create_page(
        client,
        token,
        account,
        title,
        inkpot::models::text_to_nodes(&text),
    )
    .await?;

    println!("✓ Published: {}", page.url);
    Ok(())
}

async fn edit_page(
    store: &Store,
    client: &HttpClient,
    id: &AccountId,
    path: &str,
    title: &str,
    file: &Path,
) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let token = token_of(store, id)?;

    let page = api::get_page(client, path).await?;
    let page = api::edit_page(
        client,
        token,
        &page,
        title,
        inkpot::models::text_to_nodes(&text),
    )
    .await?;

    println!("✓ Updated: {}", page.url);
    Ok(())
}
