//! Binary entrypoint for the Quinn Cash CLI.
//!
//! Kid commands:
//! - `status [--json]` - balance, today's earnings and what is waiting
//! - `spell` - play a round of "Spell it!" in the terminal
//! - `prizes list`, `request <prize>`, `trophies`, `history`, `tonight`
//!
//! Parent commands (prompt for the PIN):
//! - `grant`, `deduct`, `approve`, `decline`, `bonus`, `spell --bonus`
//! - `words add|toggle|delete`, `prizes add|update|delete`, `settings set`
//! - `tonight revoke|bank`, `set-pin`
//!
//! `init` writes a starter `config.toml` and seeds the word list.
//!
//! See the library crate docs for module-level details: `quinncash::`.
use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};

use quinncash::app::{play::play_round, App};
use quinncash::config::Config;
use quinncash::family::{parent, session, settings, shop, words, FamilyError};
use quinncash::spell::SpellError;
use quinncash::storage::types::{PrizeKind, VocabularyEntry};
use quinncash::validation::parse_amount;

#[derive(Parser)]
#[command(name = "quinncash")]
#[command(about = "Family reward tracker with a prize store and a spelling game")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config and seed the starter words
    Init,
    /// Show balance, today's earnings and pending items
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Play a round of "Spell it!"
    Spell {
        /// Start a bonus round that skips the daily cap (parent only)
        #[arg(long)]
        bonus: bool,
    },
    /// Manage the spelling word list
    Words {
        #[command(subcommand)]
        action: WordsCommand,
    },
    /// Browse and manage prizes
    Prizes {
        #[command(subcommand)]
        action: PrizesCommand,
    },
    /// Ask for a prize (by name or id)
    Request { prize: String },
    /// Approve a purchase request (parent)
    Approve { request: String },
    /// Decline a purchase request (parent)
    Decline { request: String },
    /// Show everything bought so far
    Trophies,
    /// Give Quinn Cash (parent)
    Grant {
        amount: String,
        #[arg(short, long, default_value = "")]
        note: String,
    },
    /// Take Quinn Cash away (parent)
    Deduct {
        amount: String,
        #[arg(short, long, default_value = "")]
        note: String,
        /// Allow the balance to go below zero
        #[arg(long)]
        force: bool,
    },
    /// Recent transactions
    History {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Show or change game settings
    Settings {
        #[command(subcommand)]
        action: Option<SettingsCommand>,
    },
    /// Set or change the parent PIN
    SetPin,
    /// Launch a bonus round for the next game (parent)
    Bonus,
    /// Tonight's three coins
    Tonight {
        #[command(subcommand)]
        action: Option<TonightCommand>,
    },
}

#[derive(Subcommand)]
enum WordsCommand {
    List,
    /// Add a word with its emoji (parent)
    Add { word: String, emoji: String },
    /// Switch a word on or off (parent)
    Toggle { word: String },
    /// Remove a word (parent)
    Delete { word: String },
}

#[derive(Subcommand)]
enum PrizesCommand {
    List,
    /// Add a prize (parent)
    Add {
        name: String,
        price: String,
        /// Repeatable experience instead of a one-off item
        #[arg(long)]
        experience: bool,
        #[arg(long, default_value = "🎁")]
        emoji: String,
    },
    /// Change price or availability (parent)
    Update {
        prize: String,
        #[arg(long)]
        price: Option<String>,
        #[arg(long)]
        available: Option<bool>,
    },
    /// Remove a prize (parent)
    Delete { prize: String },
    /// Requests waiting for approval
    Requests,
}

#[derive(Subcommand)]
enum SettingsCommand {
    Show,
    /// Change settings (parent)
    Set {
        /// Wrong taps before a word is revealed
        #[arg(long)]
        threshold: Option<u32>,
        /// Most Quinn Cash earned from regular rounds per day
        #[arg(long)]
        cap: Option<u32>,
    },
}

#[derive(Subcommand)]
enum TonightCommand {
    Show,
    /// Take away (or give back) coin 1, 2 or 3 (parent)
    Revoke { coin: u8 },
    /// Bank the remaining coins (parent)
    Bank,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            init_logging(&None, cli.verbose);
            run_init(&cli.config).await
        }
        command => {
            let config = Config::load(&cli.config).await?;
            init_logging(&Some(config.clone()), cli.verbose);
            let app = App::open(config)?;
            run(&app, command).await
        }
    }
}

async fn run(app: &App, command: Commands) -> Result<()> {
    match command {
        Commands::Init => {
            words::seed_starter_words(app.store())?;
            println!("Word list has {} words", words::list_words(app.store())?.len());
        }
        Commands::Status { json } => {
            let status = app.status()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!("{} has {} Quinn Cash", status.child_name, status.balance);
                println!(
                    "Spell it! today: {}/{}{}",
                    status.earned_today,
                    status.daily_cap,
                    if status.bonus_pending { " (bonus round ready!)" } else { "" }
                );
                println!(
                    "Tonight: {} coin(s){}",
                    status.tonight_remaining,
                    if status.tonight_banked { ", banked" } else { "" }
                );
                if status.pending_requests > 0 {
                    println!("{} prize request(s) waiting", status.pending_requests);
                }
            }
        }
        Commands::Spell { bonus } => run_spell(app, bonus).await?,
        Commands::Words { action } => match action {
            WordsCommand::List => {
                for entry in words::list_words(app.store())? {
                    let state = if entry.active { "" } else { " (off)" };
                    println!("{} {}{}", entry.glyph, entry.word, state);
                }
            }
            WordsCommand::Add { word, emoji } => {
                require_parent(app)?;
                let entry = words::add_word(app.store(), &word, &emoji)?;
                println!("Added {} {}", entry.glyph, entry.word);
            }
            WordsCommand::Toggle { word } => {
                require_parent(app)?;
                let entry = lookup_word(app, &word)?;
                let entry = words::toggle_word(app.store(), &entry.id)?;
                println!("{} is now {}", entry.word, if entry.active { "on" } else { "off" });
            }
            WordsCommand::Delete { word } => {
                require_parent(app)?;
                let entry = lookup_word(app, &word)?;
                words::delete_word(app.store(), &entry.id)?;
                println!("Removed {}", entry.word);
            }
        },
        Commands::Prizes { action } => match action {
            PrizesCommand::List => {
                let balance = app.store().balance(app.user_id())?;
                for prize in shop::available_prizes(app.store())? {
                    let mark = if balance >= prize.price as i64 { "" } else { " (save up!)" };
                    println!("{} {} - {}{}", prize.glyph, prize.name, prize.price, mark);
                }
            }
            PrizesCommand::Add {
                name,
                price,
                experience,
                emoji,
            } => {
                require_parent(app)?;
                let kind = if experience {
                    PrizeKind::Experience
                } else {
                    PrizeKind::Item
                };
                let prize = shop::add_prize(app.store(), &name, parse_amount(&price)?, kind, &emoji)?;
                println!("Added {} {} for {}", prize.glyph, prize.name, prize.price);
            }
            PrizesCommand::Update {
                prize,
                price,
                available,
            } => {
                require_parent(app)?;
                let found = shop::find_prize(app.store(), &prize)?;
                let price = price.as_deref().map(parse_amount).transpose()?;
                let updated = shop::update_prize(app.store(), &found.id, price, available)?;
                println!(
                    "{} now costs {}{}",
                    updated.name,
                    updated.price,
                    if updated.available { "" } else { " (hidden)" }
                );
            }
            PrizesCommand::Delete { prize } => {
                require_parent(app)?;
                let found = shop::find_prize(app.store(), &prize)?;
                shop::delete_prize(app.store(), &found.id)?;
                println!("Removed {}", found.name);
            }
            PrizesCommand::Requests => {
                for request in shop::pending_requests(app.store())? {
                    println!(
                        "{}  {} - {} ({})",
                        short_id(&request.id),
                        request.prize_name,
                        request.prize_price,
                        request.requested_at.format("%Y-%m-%d %H:%M")
                    );
                }
            }
        },
        Commands::Request { prize } => {
            let found = shop::find_prize(app.store(), &prize)?;
            match shop::request_prize(app.store(), app.user_id(), &found.id) {
                Ok(request) => println!(
                    "Asked for {} (request {}). A grown-up will take a look!",
                    request.prize_name,
                    short_id(&request.id)
                ),
                Err(FamilyError::InsufficientFunds { balance, needed }) => {
                    println!("You have {} but {} costs {}. Keep saving!", balance, found.name, needed)
                }
                Err(e) => return Err(e.into()),
            }
        }
        Commands::Approve { request } => {
            require_parent(app)?;
            let found = shop::find_request(app.store(), &request)?;
            let balance = shop::approve_request(app.store(), &found.id)?;
            println!("Approved {}. Balance is now {}", found.prize_name, balance);
        }
        Commands::Decline { request } => {
            require_parent(app)?;
            let found = shop::find_request(app.store(), &request)?;
            let declined = shop::decline_request(app.store(), &found.id)?;
            println!("Declined {}", declined.prize_name);
        }
        Commands::Trophies => {
            for entry in shop::trophy_case(app.store())? {
                println!(
                    "{} {} ({}) {}",
                    entry.glyph,
                    entry.prize_name,
                    entry.price,
                    entry.purchased_at.format("%Y-%m-%d")
                );
            }
        }
        Commands::Grant { amount, note } => {
            require_parent(app)?;
            let amount = parse_amount(&amount)?;
            let balance = parent::grant(app.store(), app.user_id(), amount, &note)?;
            println!("Granted {}. Balance is now {}", amount, balance);
        }
        Commands::Deduct {
            amount,
            note,
            force,
        } => {
            require_parent(app)?;
            let amount = parse_amount(&amount)?;
            let balance = parent::deduct(app.store(), app.user_id(), amount, &note, force)?;
            println!("Deducted {}. Balance is now {}", amount, balance);
        }
        Commands::History { limit, json } => {
            let log = parent::history(app.store(), app.user_id(), limit)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&log)?);
            } else {
                for tx in log {
                    println!(
                        "{}  {:+}  [{}] {}",
                        tx.created_at.format("%Y-%m-%d %H:%M"),
                        tx.amount,
                        tx.kind,
                        tx.note
                    );
                }
            }
        }
        Commands::Settings { action } => match action.unwrap_or(SettingsCommand::Show) {
            SettingsCommand::Show => {
                let s = settings::get_settings(app.store())?;
                println!("Wrong taps before reveal: {}", s.incorrect_threshold);
                println!("Daily cap: {}", s.daily_cap);
            }
            SettingsCommand::Set { threshold, cap } => {
                require_parent(app)?;
                let s = settings::update_settings(app.store(), threshold, cap)?;
                println!(
                    "Saved: {} wrong tap(s) before reveal, cap {} per day",
                    s.incorrect_threshold, s.daily_cap
                );
            }
        },
        Commands::SetPin => run_set_pin(app)?,
        Commands::Bonus => {
            require_parent(app)?;
            settings::launch_bonus(app.store())?;
            println!("Bonus round is ready for the next game!");
        }
        Commands::Tonight { action } => {
            let day = app.today();
            match action.unwrap_or(TonightCommand::Show) {
                TonightCommand::Show => {
                    let record = session::tonight(app.store(), app.user_id(), day)?;
                    let coins: String = (1..=record.coins_started)
                        .map(|c| if record.revoked.contains(&c) { "○ " } else { "● " })
                        .collect();
                    println!(
                        "Tonight: {}{}",
                        coins,
                        if record.banked { "(banked)" } else { "" }
                    );
                }
                TonightCommand::Revoke { coin } => {
                    require_parent(app)?;
                    let record = session::toggle_coin(app.store(), app.user_id(), day, coin)?;
                    println!("{} coin(s) left tonight", record.remaining());
                }
                TonightCommand::Bank => {
                    require_parent(app)?;
                    let record = session::bank(app.store(), app.user_id(), day)?;
                    println!("Banked {} coin(s)", record.coins_banked);
                }
            }
        }
    }

    Ok(())
}

async fn run_init(path: &str) -> Result<()> {
    if tokio::fs::try_exists(path).await.unwrap_or(false) {
        println!("{} already exists; leaving it alone.", path);
    } else {
        Config::create_default(path).await?;
        println!("Created default configuration at {}", path);
    }
    let config = Config::load(path).await?;
    let app = App::open(config)?;
    words::seed_starter_words(app.store())?;
    println!("Word list has {} words", words::list_words(app.store())?.len());
    println!("Next: run `quinncash set-pin` to protect parent mode.");
    Ok(())
}

async fn run_spell(app: &App, bonus: bool) -> Result<()> {
    if bonus {
        require_parent(app)?;
    }
    let mut started = match app.start_spelling(bonus, &mut rand::thread_rng()) {
        Ok(started) => started,
        Err(SpellError::DailyCapReached { earned, cap }) => {
            println!(
                "You earned {} of {} Quinn Cash from spelling today. Come back tomorrow!",
                earned, cap
            );
            return Ok(());
        }
        Err(SpellError::EmptyVocabulary) => {
            println!("There are no words to spell yet. Ask a grown-up to add some!");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let round = &mut started.round;
    println!(
        "Spell it!{} {} words. Type letters (or tile numbers, space separated) and press Enter.",
        if round.is_bonus() { " BONUS ROUND!" } else { "" },
        round.len()
    );
    if !round.is_bonus() && started.cap.remaining() < round.len() as u32 {
        println!("You can earn {} more today.", started.cap.remaining());
    }

    let input = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    let Some(mut settlement) = play_round(round, input, &mut stdout, app.config().game.tick_ms).await?
    else {
        println!("Round stopped. See you next time!");
        return Ok(());
    };

    match app.settle(&mut settlement) {
        Ok(Some(report)) => {
            println!(
                "You spelled {}/{} words and earned {} Quinn Cash!",
                report.earned, report.words, report.earned
            );
            if let Some(balance) = report.balance {
                println!("Balance: {}", balance);
            }
        }
        Ok(None) => {}
        Err(e @ SpellError::SettlementWriteFailure { .. }) => {
            warn!("settlement failed: {}", e);
            println!("Oops, your results could not be saved: {}", e);
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

fn require_parent(app: &App) -> Result<()> {
    let argon = app.config().security.argon2();
    if !parent::has_pin(app.store(), app.user_id())? {
        bail!("No parent PIN yet. Run `quinncash set-pin` first.");
    }
    let pin = rpassword::prompt_password("Parent PIN: ")?;
    match parent::verify_pin(app.store(), app.user_id(), pin.trim(), &argon) {
        Ok(()) => Ok(()),
        Err(FamilyError::WrongPin) => bail!("Wrong PIN."),
        Err(e) => Err(e.into()),
    }
}

fn run_set_pin(app: &App) -> Result<()> {
    let argon = app.config().security.argon2();
    if parent::has_pin(app.store(), app.user_id())? {
        let current = rpassword::prompt_password("Current PIN: ")?;
        parent::verify_pin(app.store(), app.user_id(), current.trim(), &argon)?;
    }
    let pin1 = rpassword::prompt_password("New 4-digit PIN: ")?;
    let pin2 = rpassword::prompt_password("Confirm PIN: ")?;
    if pin1.trim() != pin2.trim() {
        bail!("PINs do not match.");
    }
    parent::set_pin(app.store(), app.user_id(), pin1.trim(), &argon)?;
    info!("parent PIN set via CLI");
    println!("Parent PIN saved.");
    Ok(())
}

fn lookup_word(app: &App, key: &str) -> Result<VocabularyEntry> {
    words::find_word(app.store(), key)?.ok_or_else(|| anyhow!("No word '{}' in the list", key.trim()))
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // -v flags override the configured level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|c| c.logging.level.parse::<log::LevelFilter>().ok())
            .unwrap_or(log::LevelFilter::Warn),
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let file = config
        .as_ref()
        .and_then(|c| c.logging.file.as_ref())
        .and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });

    if let Some(f) = file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Echo to the console only when a person is watching it
        let is_tty = atty::is(atty::Stream::Stderr);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty && record.level() <= log::Level::Warn {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
        });
    }
    let _ = builder.try_init();
}
